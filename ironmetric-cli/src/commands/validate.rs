//! `ironmetric validate` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use ironmetric_processor::{ConfigLoader, MessageProcessor, ProcessorError};

use crate::cli::ValidateArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `validate` command.
///
/// Loads the rule file and compiles every rule into a fresh processor,
/// so that syntax and type errors in conditions are reported as well.
///
/// # Errors
///
/// Returns `CliError::Rule` if the file cannot be loaded or any rule fails to compile.
pub async fn execute(args: ValidateArgs, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %args.rules.display(), "validating rule file");

    let report = validate_rules(&args.rules).await;
    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Rule(format!("{} is invalid", args.rules.display())));
    }
    Ok(())
}

/// Build a validation report for a rule file. Never fails; errors end up in the report.
pub async fn validate_rules(path: &Path) -> RuleValidationReport {
    let source = path.display().to_string();
    match compile(path).await {
        Ok(processor) => {
            let stages = processor
                .rule_counts()
                .into_iter()
                .map(|(stage, rules)| StageRules {
                    stage: stage.as_str().to_owned(),
                    rules,
                })
                .collect();
            RuleValidationReport {
                source,
                valid: true,
                total: processor.rule_count(),
                order: processor
                    .stages()
                    .iter()
                    .map(|stage| stage.as_str().to_owned())
                    .collect(),
                stages,
                error: None,
            }
        }
        Err(e) => RuleValidationReport {
            source,
            valid: false,
            total: 0,
            order: Vec::new(),
            stages: Vec::new(),
            error: Some(e.to_string()),
        },
    }
}

async fn compile(path: &Path) -> Result<MessageProcessor, ProcessorError> {
    let config = ConfigLoader::load_file(path).await?;
    MessageProcessor::with_config(&config)
}

/// Rule count for one stage.
#[derive(Debug, Serialize)]
pub struct StageRules {
    pub stage: String,
    pub rules: usize,
}

/// Rule file validation result.
#[derive(Debug, Serialize)]
pub struct RuleValidationReport {
    pub source: String,
    pub valid: bool,
    pub total: usize,
    /// Effective stage execution order
    pub order: Vec<String>,
    pub stages: Vec<StageRules>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Validation: {}", self.source.bold())?;
        if let Some(error) = &self.error {
            writeln!(w, "  Status: {}", "INVALID".red().bold())?;
            writeln!(w, "  Error: {}", error)?;
            return Ok(());
        }

        writeln!(w, "  Status: {}", "VALID".green().bold())?;
        writeln!(w, "  Total rules: {}", self.total)?;
        writeln!(w)?;
        writeln!(w, "{:<28} {:>6}", "Stage", "Rules")?;
        writeln!(w, "{}", "-".repeat(35))?;
        for entry in self.stages.iter().filter(|s| s.rules > 0) {
            writeln!(w, "{:<28} {:>6}", entry.stage, entry.rules)?;
        }
        Ok(())
    }
}
