use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv_async::Error),

    #[error("Invalid address pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{path} does not have a {column} header")]
    MissingColumn { column: String, path: String },
}

pub type Result<T> = std::result::Result<T, NotifyError>;

/// Why a batch was not delivered. Applies to every address in the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("API error (status {status}, code {code:?}): {message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Transport(err.to_string())
    }
}
