//! Error types for the anticap library.

use thiserror::Error;

/// Boxed source error carried by [`CaptchaError::Transport`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the anticap library.
#[derive(Error, Debug)]
pub enum CaptchaError {
    /// Missing client key, empty task, unpublished task, bad proxy URL
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller-supplied input rejected before any request was made
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Request payload could not be encoded
    #[error("Unable to serialize request: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Connection, write or response decode failure
    #[error("Service communication error: {0}")]
    Transport(#[source] BoxError),

    /// The service reported an error or answered with an unrecognized shape
    #[error("Service error: {code}{}", describe(.description))]
    Service {
        code: String,
        description: Option<String>,
    },

    /// The solution did not contain the expected string field
    #[error("Unable to find field '{field}' in the solution")]
    Extraction { field: &'static str },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptchaError {
    /// Wrap any error as a transport failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        CaptchaError::Transport(err.into())
    }

    /// Service error with the reported code, or `"unknown"` when absent.
    pub fn service(code: Option<&str>, description: Option<&str>) -> Self {
        CaptchaError::Service {
            code: code.unwrap_or(UNKNOWN_ERROR_CODE).to_string(),
            description: description.map(str::to_string),
        }
    }

    /// The service error code, if this is a [`CaptchaError::Service`].
    pub fn service_code(&self) -> Option<&str> {
        match self {
            CaptchaError::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for CaptchaError {
    fn from(err: reqwest::Error) -> Self {
        CaptchaError::Transport(Box::new(err))
    }
}

fn describe(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

/// Error code used when the service response carries no `errorCode`.
pub const UNKNOWN_ERROR_CODE: &str = "unknown";

/// Result type alias for anticap operations.
pub type Result<T> = std::result::Result<T, CaptchaError>;
