use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Pipeline error: {0}")]
    Pipeline(String),
    #[error("Please upload an image file (got {0})")]
    UnsupportedMediaType(String),
    #[error("No image selected")]
    NoImageSelected,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Enhancement(#[from] EnhancementError),
}

/// Categorized failure of a single enhancement request.
///
/// The `Display` output is the message shown to the user; use
/// [`EnhancementError::category`] to branch on the kind of failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnhancementError {
    #[error(
        "Failed to enhance image: Image is too large. Please use an image smaller than {}MB.",
        mebibytes(.max_bytes)
    )]
    PayloadTooLarge { size_bytes: u64, max_bytes: u64 },
    #[error("Enhancement timed out. Please try with a smaller image.")]
    Timeout { after: Duration },
    #[error("Network error. Please check your connection and try again.")]
    NetworkFailure(String),
    #[error("Failed to enhance image: {}", backend_message(.message, .status))]
    BackendError {
        message: Option<String>,
        status: Option<u16>,
    },
    #[error("Failed to enhance image: Invalid response from enhancement API")]
    InvalidBackendResponse(String),
    #[error("Enhancement was cancelled.")]
    Cancelled { superseded_by: Option<Uuid> },
}

fn mebibytes(bytes: &u64) -> u64 {
    bytes / (1024 * 1024)
}

fn backend_message(message: &Option<String>, status: &Option<u16>) -> String {
    match (message, status) {
        (Some(message), _) => message.clone(),
        (None, Some(status)) => format!("Server error: {}", status),
        (None, None) => "Unknown error occurred".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    PayloadTooLarge,
    Timeout,
    NetworkFailure,
    BackendError,
    InvalidBackendResponse,
    Cancelled,
}

impl EnhancementError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EnhancementError::PayloadTooLarge { .. } => ErrorCategory::PayloadTooLarge,
            EnhancementError::Timeout { .. } => ErrorCategory::Timeout,
            EnhancementError::NetworkFailure(_) => ErrorCategory::NetworkFailure,
            EnhancementError::BackendError { .. } => ErrorCategory::BackendError,
            EnhancementError::InvalidBackendResponse(_) => ErrorCategory::InvalidBackendResponse,
            EnhancementError::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Transport failures and timeouts are worth retrying later; rejected
    /// input is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EnhancementError::NetworkFailure(_) | EnhancementError::Timeout { .. }
        )
    }
}

/// Failure to reach a backend at all, as opposed to a backend reporting an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to connect to backend: {0}")]
    Connect(String),
    #[error("Request to backend failed: {0}")]
    Request(String),
    #[error("Backend task failed: {0}")]
    Task(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}
