//! `ironmetric process` command handler
//!
//! Reads one JSON message per line, runs each through a [`MessageProcessor`]
//! and writes the surviving messages to stdout. Reports go to stderr so the
//! message stream stays clean.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use ironmetric_core::config::IronmetricConfig;
use ironmetric_core::message::Message;
use ironmetric_core::pipeline::{MessageHandler, ProcessOutcome};
use ironmetric_processor::MessageProcessor;

use crate::cli::{MessageFormat, ProcessArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Options for a single processing run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub format: MessageFormat,
    /// Meta keys promoted to tags in line protocol output
    pub meta_as_tags: Vec<String>,
    /// Write partially processed messages when a rule fails
    pub forward_on_error: bool,
}

/// Execute the `process` command.
///
/// # Errors
///
/// Returns `CliError::Rule` if the rule file cannot be loaded and
/// `CliError::Processing` if any input line was malformed or failed a rule.
/// In the latter case all other messages have already been written.
pub async fn execute(
    args: ProcessArgs,
    config: &IronmetricConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let rules_path = args.rules.clone().or_else(|| {
        (!config.processor.rules_path.is_empty())
            .then(|| PathBuf::from(&config.processor.rules_path))
    });
    let processor = build_processor(rules_path, config).await?;

    let options = ProcessOptions {
        format: args.format,
        meta_as_tags: config.processor.meta_as_tags.clone(),
        forward_on_error: config.processor.forward_on_error(),
    };

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if args.input == "-" {
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        let file = tokio::fs::File::open(&args.input).await?;
        Box::new(BufReader::new(file))
    };

    let mut out = std::io::BufWriter::new(std::io::stdout());
    let summary = run(&processor, reader, &mut out, &options).await?;
    out.flush()?;

    info!(
        input = %args.input,
        read = summary.read,
        processed = summary.processed,
        dropped = summary.dropped,
        errors = summary.errors,
        malformed = summary.malformed,
        skipped = summary.skipped,
        "processing finished"
    );
    writer.render_to(&mut std::io::stderr(), &summary)?;

    if summary.errors > 0 || summary.malformed > 0 || summary.skipped > 0 {
        return Err(CliError::Processing(format!(
            "{} failed, {} malformed, {} not encodable out of {} lines",
            summary.errors, summary.malformed, summary.skipped, summary.read
        )));
    }
    Ok(())
}

/// Create a processor from an optional rule file and the `[processor]` settings.
pub async fn build_processor(
    rules_path: Option<PathBuf>,
    config: &IronmetricConfig,
) -> Result<MessageProcessor, CliError> {
    let processor = MessageProcessor::new();
    if let Some(path) = rules_path {
        processor.load_config_file(&path).await?;
        info!(
            path = %path.display(),
            rules = processor.rule_count(),
            "processor rules loaded"
        );
    }
    if config.processor.normalize_units {
        processor.set_normalize_units(true);
    }
    Ok(processor)
}

/// Process every line of `reader` and write the results to `out`.
///
/// Empty lines are skipped. Malformed lines and failed messages are logged
/// and counted but never abort the run.
pub async fn run<R, W>(
    processor: &MessageProcessor,
    reader: R,
    out: &mut W,
    options: &ProcessOptions,
) -> Result<ProcessSummary, CliError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut summary = ProcessSummary::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        summary.read += 1;

        let message: Message = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(line = line_no, error = %e, "skipping malformed message");
                summary.malformed += 1;
                continue;
            }
        };

        match processor.handle(&message) {
            ProcessOutcome::Forward(mut processed) => {
                if write_message(out, &mut processed, options)? {
                    summary.processed += 1;
                } else {
                    summary.skipped += 1;
                }
            }
            ProcessOutcome::Drop => summary.dropped += 1,
            ProcessOutcome::Failed { mut partial, reason } => {
                warn!(
                    line = line_no,
                    name = %message.name(),
                    error = %reason,
                    forwarded = options.forward_on_error,
                    "message processing failed"
                );
                summary.errors += 1;
                if options.forward_on_error {
                    write_message(out, &mut partial, options)?;
                }
            }
        }
    }

    Ok(summary)
}

/// Write one message. NaN and infinite field values are removed first.
///
/// Returns `false` when nothing encodable is left: every field was
/// non-finite, or line protocol output was asked for a message with no fields.
fn write_message<W: Write>(
    out: &mut W,
    message: &mut Message,
    options: &ProcessOptions,
) -> Result<bool, CliError> {
    let removed = message.remove_non_finite_fields();
    if !removed.is_empty() {
        warn!(name = %message.name(), fields = ?removed, "dropping non-finite field values");
        if message.fields().is_empty() {
            return Ok(false);
        }
    }

    match options.format {
        MessageFormat::Json => {
            serde_json::to_writer(&mut *out, &*message)?;
            writeln!(out)?;
        }
        MessageFormat::Line => {
            let Some(line) = message.to_line_protocol(&options.meta_as_tags) else {
                warn!(name = %message.name(), "message has no fields for line protocol");
                return Ok(false);
            };
            writeln!(out, "{line}")?;
        }
    }
    Ok(true)
}

/// Counters for one processing run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    /// Non-empty input lines
    pub read: usize,
    /// Messages written after passing every stage
    pub processed: usize,
    /// Messages dropped by a rule
    pub dropped: usize,
    /// Messages that failed a rule
    pub errors: usize,
    /// Lines that were not valid messages
    pub malformed: usize,
    /// Processed messages with no field left to write
    pub skipped: usize,
}

impl Render for ProcessSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let errors = if self.errors > 0 {
            self.errors.to_string().red()
        } else {
            self.errors.to_string().normal()
        };
        writeln!(
            w,
            "Processed {} of {} messages: {} dropped, {} errors, {} malformed, {} skipped",
            self.processed.to_string().bold(),
            self.read,
            self.dropped,
            errors,
            self.malformed,
            self.skipped
        )
    }
}
