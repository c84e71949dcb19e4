use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the accessibility provider and the locator.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element is not enabled: {0}")]
    ElementNotEnabled(String),

    #[error("Failed to scroll element into view: {0}")]
    ScrollFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AutomationError {
    /// True when the error means "nothing matched within the budget".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AutomationError::ElementNotFound(_) | AutomationError::Timeout(_)
        )
    }
}

/// Robot-level failure taxonomy.
///
/// `NotFound` and `VerificationFailure` abandon the current ticket,
/// `ParseFailure` quarantines a single file, `IoFailure` is logged and the
/// remaining files continue. `Config` is only produced during global setup.
#[derive(Error, Debug)]
pub enum RobotError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("File name does not match the expected layout: {0}")]
    ParseFailure(String),

    #[error("Verification failed: {0}")]
    VerificationFailure(String),

    #[error("Automation provider failure: {0}")]
    ProviderFailure(#[from] AutomationError),

    #[error("I/O failure on {path}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Ticket error: {0}")]
    Ticket(String),

    /// A workflow stopped at `step`; `kind` is how that step failed.
    #[error("Workflow abandoned at step '{step}' ({kind}): {reason}")]
    Abandoned {
        step: String,
        kind: ErrorKind,
        reason: String,
    },
}

/// Serializable category of a [`RobotError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ParseFailure,
    VerificationFailure,
    ProviderFailure,
    IoFailure,
    Config,
    Ticket,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::ParseFailure => "parse failure",
            ErrorKind::VerificationFailure => "verification failure",
            ErrorKind::ProviderFailure => "provider failure",
            ErrorKind::IoFailure => "I/O failure",
            ErrorKind::Config => "configuration",
            ErrorKind::Ticket => "ticket",
        };
        f.write_str(name)
    }
}

impl RobotError {
    /// An abandoned workflow reports the kind of its failing step.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RobotError::NotFound(_) => ErrorKind::NotFound,
            RobotError::ParseFailure(_) => ErrorKind::ParseFailure,
            RobotError::VerificationFailure(_) => ErrorKind::VerificationFailure,
            RobotError::ProviderFailure(_) => ErrorKind::ProviderFailure,
            RobotError::IoFailure { .. } => ErrorKind::IoFailure,
            RobotError::Config(_) => ErrorKind::Config,
            RobotError::Ticket(_) => ErrorKind::Ticket,
            RobotError::Abandoned { kind, .. } => *kind,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RobotError::IoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Failures of the spreadsheet converter seam.
#[derive(Error, Debug)]
pub enum ConverterError {
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Conversion failed: {reason}")]
    ConversionFailed {
        reason: String,
        stderr: Option<String>,
    },

    #[error("Conversion timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
