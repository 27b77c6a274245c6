//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ironmetric -- telemetry message processor.
///
/// Use `ironmetric <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ironmetric", version, about, long_about = None)]
pub struct Cli {
    /// Path to the ironmetric.toml configuration file.
    #[arg(short, long, global = true, default_value = "ironmetric.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run JSON-lines messages through the processor.
    Process(ProcessArgs),

    /// Validate a processor rule file.
    Validate(ValidateArgs),

    /// Parse a unit string and optionally convert a value.
    Units(UnitsArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- process ----

/// Encoding used for processed messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    /// One JSON object per line.
    Json,
    /// InfluxDB line protocol.
    Line,
}

/// Read messages, apply the configured rules and write the survivors.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Rule file (.json, .yaml, .yml). Overrides `processor.rules_path`.
    #[arg(short, long)]
    pub rules: Option<PathBuf>,

    /// Input file with one JSON message per line, `-` for stdin.
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Encoding of the processed messages written to stdout.
    #[arg(short, long, default_value = "json")]
    pub format: MessageFormat,
}

// ---- validate ----

/// Load a rule file and report how many rules each stage holds.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Rule file to validate.
    pub rules: PathBuf,
}

// ---- units ----

/// Inspect a unit string.
#[derive(Args, Debug)]
pub struct UnitsArgs {
    /// Unit to parse (e.g. "MBytes/s", "kb", "°C").
    pub unit: String,

    /// Target unit for a conversion.
    #[arg(long)]
    pub to: Option<String>,

    /// Value to convert (requires --to).
    #[arg(long, requires = "to", allow_negative_numbers = true)]
    pub value: Option<f64>,
}

// ---- config ----

/// Manage ironmetric configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, processor).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify_structure() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parse_process_defaults() {
        let cli = Cli::try_parse_from(["ironmetric", "process"]).expect("should parse");
        assert_eq!(cli.config, PathBuf::from("ironmetric.toml"));
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Commands::Process(args) => {
                assert!(args.rules.is_none());
                assert_eq!(args.input, "-");
                assert_eq!(args.format, MessageFormat::Json);
            }
            other => panic!("expected process command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_process_all_options() {
        let cli = Cli::try_parse_from([
            "ironmetric",
            "process",
            "--rules",
            "rules.yaml",
            "--input",
            "messages.jsonl",
            "--format",
            "line",
        ])
        .expect("should parse");
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.rules, Some(PathBuf::from("rules.yaml")));
                assert_eq!(args.input, "messages.jsonl");
                assert_eq!(args.format, MessageFormat::Line);
            }
            other => panic!("expected process command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_process_rejects_unknown_format() {
        let result = Cli::try_parse_from(["ironmetric", "process", "--format", "csv"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_validate_requires_path() {
        assert!(Cli::try_parse_from(["ironmetric", "validate"]).is_err());

        let cli = Cli::try_parse_from(["ironmetric", "validate", "rules.json"])
            .expect("should parse");
        match cli.command {
            Commands::Validate(args) => assert_eq!(args.rules, PathBuf::from("rules.json")),
            other => panic!("expected validate command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_units_conversion() {
        let cli = Cli::try_parse_from([
            "ironmetric",
            "units",
            "Byte",
            "--to",
            "MB",
            "--value",
            "1024",
        ])
        .expect("should parse");
        match cli.command {
            Commands::Units(args) => {
                assert_eq!(args.unit, "Byte");
                assert_eq!(args.to.as_deref(), Some("MB"));
                assert_eq!(args.value, Some(1024.0));
            }
            other => panic!("expected units command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_units_value_requires_to() {
        let result = Cli::try_parse_from(["ironmetric", "units", "Byte", "--value", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parse_units_negative_value() {
        let cli = Cli::try_parse_from([
            "ironmetric",
            "units",
            "°C",
            "--to",
            "m°C",
            "--value",
            "-4.5",
        ])
        .expect("should parse");
        match cli.command {
            Commands::Units(args) => assert_eq!(args.value, Some(-4.5)),
            other => panic!("expected units command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["ironmetric", "config", "show", "--section", "processor"])
            .expect("should parse");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section.as_deref(), Some("processor"))
                }
                other => panic!("expected show action, got {other:?}"),
            },
            other => panic!("expected config command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ironmetric",
            "config",
            "validate",
            "--output",
            "json",
            "--log-level",
            "debug",
            "--config",
            "/etc/ironmetric/ironmetric.toml",
        ])
        .expect("should parse");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, PathBuf::from("/etc/ironmetric/ironmetric.toml"));
    }

    #[test]
    fn test_cli_parse_missing_subcommand_fails() {
        assert!(Cli::try_parse_from(["ironmetric"]).is_err());
    }
}
