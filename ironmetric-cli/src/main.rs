//! Ironmetric CLI -- telemetry message processor command-line tool

use std::path::Path;

use clap::Parser;

use ironmetric_cli::cli::{Cli, Commands};
use ironmetric_cli::commands;
use ironmetric_cli::error::CliError;
use ironmetric_cli::logging::init_tracing;
use ironmetric_cli::output::OutputWriter;
use ironmetric_core::config::IronmetricConfig;
use ironmetric_core::error::{ConfigError, IronmetricError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = match load_config(&cli.config).await {
        Ok(config) => config,
        // `config` reports load errors itself
        Err(_) if matches!(cli.command, Commands::Config(_)) => IronmetricConfig::default(),
        Err(e) => return Err(e),
    };
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
        config.validate()?;
    }

    init_tracing(&config.general).map_err(|e| CliError::Config(e.to_string()))?;
    ironmetric_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "ironmetric starting");

    let writer = OutputWriter::new(cli.output);
    match cli.command {
        Commands::Process(args) => commands::process::execute(args, &config, &writer).await,
        Commands::Validate(args) => commands::validate::execute(args, &writer).await,
        Commands::Units(args) => commands::units::execute(args, &writer),
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}

/// Load the configuration file, falling back to defaults (plus env overrides)
/// when the file does not exist.
async fn load_config(path: &Path) -> Result<IronmetricConfig, CliError> {
    match IronmetricConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(IronmetricError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = IronmetricConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}
