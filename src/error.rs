//! Error handling module.
use thiserror::Error;

/// IRR Explorer client error enum.
#[derive(Error, Debug)]
pub enum IrrExplorerError {
    #[error("NetworkError: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JsonError: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IoError: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid prefix format: {0}")]
    InvalidPrefix(String),

    #[error("Invalid ASN format: {0}")]
    InvalidAsn(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    /// A single record failed model validation. Collection parsers drop the
    /// record instead of returning this to callers.
    #[error("InvalidRecord: {0}")]
    InvalidRecord(String),

    #[error("Unable to connect to {base_url}: {reason}")]
    Unreachable { base_url: String, reason: String },

    #[error("client already closed")]
    ClientClosed,
}
