use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphitiError>;

#[derive(Error, Debug)]
pub enum GraphitiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered, but not with a success status.
    #[error("{0}")]
    Probe(String),

    /// Raised by a caller-supplied connectivity check.
    #[error("{0}")]
    Check(String),
}

impl GraphitiError {
    pub fn check(msg: impl Into<String>) -> Self {
        GraphitiError::Check(msg.into())
    }
}
