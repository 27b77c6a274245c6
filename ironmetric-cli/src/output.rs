//! Report rendering for `--output text|json`
//!
//! `ironmetric` writes two kinds of output. Processed messages are a data
//! stream: `process` encodes them itself (JSON lines or line protocol) and
//! always sends them to stdout. Everything else is a report for a person or a
//! script: the `validate` rule counts, the `units` breakdown, `config show`,
//! and the end-of-run process summary. Reports go through [`OutputWriter`].
//!
//! Because the process summary must not mix with the message stream, it is
//! rendered with [`OutputWriter::render_to`] onto stderr; the other reports
//! use [`OutputWriter::render`] onto stdout.

use std::io::Write;

use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Renders reports in the format chosen by the global `--output` flag.
///
/// A report type implements `Serialize` for `--output json` and [`Render`]
/// for the colored text form.
#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// ```
    /// use ironmetric_cli::cli::OutputFormat;
    /// use ironmetric_cli::output::OutputWriter;
    ///
    /// let writer = OutputWriter::new(OutputFormat::Json);
    /// assert_eq!(writer.format(), OutputFormat::Json);
    /// ```
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Render a report on stdout.
    pub fn render<T: Render + Serialize>(&self, report: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        self.render_to(&mut stdout.lock(), report)
    }

    /// Render a report on `w`. JSON reports are pretty-printed and end with a newline.
    pub fn render_to<T: Render + Serialize>(
        &self,
        w: &mut dyn Write,
        report: &T,
    ) -> Result<(), CliError> {
        match self.format {
            OutputFormat::Text => report.render_text(w)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *w, report)?;
                writeln!(w)?;
            }
        }
        Ok(())
    }
}

/// Text form of a report.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct StageCount {
        stage: &'static str,
        rules: usize,
    }

    impl Render for StageCount {
        fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
            writeln!(w, "{:<20} {}", self.stage, self.rules)
        }
    }

    fn render(format: OutputFormat, report: &StageCount) -> String {
        let mut buffer = Vec::new();
        OutputWriter::new(format)
            .render_to(&mut buffer, report)
            .expect("rendering should succeed");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_text_report_uses_render_impl() {
        let report = StageCount {
            stage: "drop_by_name",
            rules: 3,
        };
        let text = render(OutputFormat::Text, &report);
        assert_eq!(text.trim_end(), format!("{:<20} 3", "drop_by_name"));
    }

    #[test]
    fn test_json_report_is_pretty_and_newline_terminated() {
        let report = StageCount {
            stage: "rename",
            rules: 2,
        };
        let json = render(OutputFormat::Json, &report);

        assert!(json.ends_with("}\n"));
        assert!(json.contains("\n  \"stage\""), "pretty JSON should be indented");
        let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid JSON");
        assert_eq!(parsed["stage"], "rename");
        assert_eq!(parsed["rules"], 2);
    }
}
