//! CLI-specific error types and exit code mapping

use ironmetric_core::error::IronmetricError;
use ironmetric_processor::ProcessorError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Rule file could not be loaded or compiled.
    #[error("rule error: {0}")]
    Rule(String),

    /// One or more messages failed during processing.
    #[error("processing error: {0}")]
    Processing(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from ironmetric-core.
    #[error("{0}")]
    Core(#[from] IronmetricError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration or rule file error         |
    /// | 3    | Messages failed during processing        |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Rule(_) => 2,
            Self::Core(IronmetricError::Config(_)) => 2,
            Self::Processing(_) => 3,
            Self::Io(_) | Self::Core(IronmetricError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<ProcessorError> for CliError {
    fn from(e: ProcessorError) -> Self {
        match e {
            ProcessorError::Io(io) => Self::Io(io),
            other => Self::Rule(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ironmetric_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_rule_error() {
        let err = CliError::Rule("invalid rule".to_owned());
        assert_eq!(err.exit_code(), 2, "rule error should return exit code 2");
    }

    #[test]
    fn test_exit_code_processing_error() {
        let err = CliError::Processing("2 messages failed".to_owned());
        assert_eq!(
            err.exit_code(),
            3,
            "processing error should return exit code 3"
        );
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_command_error() {
        let err = CliError::Command("test error".to_owned());
        assert_eq!(err.exit_code(), 1, "command error should return exit code 1");
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        let err = CliError::JsonSerialize(json_err);
        assert_eq!(
            err.exit_code(),
            1,
            "json serialize error should return exit code 1"
        );
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = IronmetricError::Config(ConfigError::FileNotFound {
            path: "ironmetric.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_core_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CliError = IronmetricError::Io(io_err).into();
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = err.to_string();
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }

    #[test]
    fn test_from_processor_compile_error() {
        let err: CliError = ProcessorError::Compile {
            condition: "name ==".to_owned(),
            reason: "unexpected end of input".to_owned(),
        }
        .into();
        match &err {
            CliError::Rule(msg) => assert!(msg.contains("name ==")),
            other => panic!("expected Rule error variant, got {other:?}"),
        }
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_from_processor_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CliError = ProcessorError::Io(io_err).into();
        assert!(matches!(err, CliError::Io(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let cli_err: CliError = io_err.into();
        match cli_err {
            CliError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::PermissionDenied),
            _ => panic!("expected Io error variant"),
        }
    }
}
