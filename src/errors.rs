//! Error types for reqforge

use thiserror::Error;

/// Main error type for reqforge
#[derive(Error, Debug)]
pub enum ReqforgeError {
    /// The resolved request URL could not be parsed. Raised before any
    /// network I/O is attempted.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A user script failed: pre-request scripts propagate this to the
    /// caller and abort the request.
    #[error("Script error: {0}")]
    Script(String),

    /// Transport-level failure: the request never produced an HTTP
    /// response. Distinct from a received-but-erroneous status code,
    /// which is not an error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    Argument(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<rquickjs::Error> for ReqforgeError {
    fn from(err: rquickjs::Error) -> Self {
        ReqforgeError::Script(format!("JavaScript error: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, ReqforgeError>;
