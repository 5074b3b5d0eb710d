use crate::cert::SerialNumber;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaError {
    #[error("Certificate not found: {0}")]
    NotFound(String),

    #[error("Multiple certificates match: {0}")]
    MultipleMatches(String),

    #[error("Certificate is disabled: {0}")]
    AccessDenied(String),

    #[error("Empty certificate request")]
    EmptyRequest,

    #[error("Signing failed for serial {serial}: {reason}")]
    SigningFailed { serial: SerialNumber, reason: String },

    #[error("Metadata parsing error: {0}")]
    Parse(String),

    #[error("Toolkit invocation timed out after {timeout_secs}s: {command}")]
    ToolkitTimeout { command: String, timeout_secs: u64 },

    #[error("Toolkit error: {0}")]
    Toolkit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T> = std::result::Result<T, CaError>;
