//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the picdupe binary.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (unexpected failure, invalid configuration)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 3: Partial success (some files could not be hashed, or the cache
///   was unavailable)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: Scan completed and duplicates were found.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: Scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Partial success: Scan completed but some files failed.
    PartialSuccess = 3,
    /// Interrupted: Scan was cancelled by the user.
    Interrupted = 130,
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
            Self::Success => "PD000",
            Self::GeneralError => "PD001",
            Self::NoDuplicates => "PD002",
            Self::PartialSuccess => "PD003",
            Self::Interrupted => "PD130",
        }
    }

    /// Exit code for a finished scan.
    ///
    /// Cancellation wins over partial failure, which wins over the
    /// duplicates/no-duplicates distinction.
    #[must_use]
    pub fn for_scan(found_duplicates: bool, had_failures: bool, cancelled: bool) -> Self {
        if cancelled {
            Self::Interrupted
        } else if had_failures {
            Self::PartialSuccess
        } else if found_duplicates {
            Self::Success
        } else {
            Self::NoDuplicates
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        // All variants fit in a u8.
        Self::from(code.as_i32() as u8)
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "PD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }

    /// Serialize to a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
