//! Command handlers -- one module per subcommand

pub mod config;
pub mod process;
pub mod units;
pub mod validate;
