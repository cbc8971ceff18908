//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the linedup application.
///
/// - 0: Success (pipeline completed)
/// - 1: General error (I/O failure, malformed shard, unexpected failure)
/// - 2: Configuration error (caught before any filesystem work)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the pipeline completed normally.
    Success = 0,
    /// General error: an I/O or unexpected error aborted the run.
    GeneralError = 1,
    /// Configuration error: invalid options, rejected before any file work.
    ConfigError = 2,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LD000",
            Self::GeneralError => "LD001",
            Self::ConfigError => "LD002",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::ConfigError.as_i32(), 2);
    }

    #[test]
    fn test_code_prefixes() {
        assert_eq!(ExitCode::Success.code_prefix(), "LD000");
        assert_eq!(ExitCode::GeneralError.code_prefix(), "LD001");
        assert_eq!(ExitCode::ConfigError.code_prefix(), "LD002");
    }

    #[test]
    fn test_structured_error() {
        let err = anyhow::anyhow!("something failed");
        let structured = StructuredError::new(&err, ExitCode::GeneralError);
        assert_eq!(structured.code, "LD001");
        assert_eq!(structured.exit_code, 1);
        assert!(structured.message.contains("something failed"));
    }
}
