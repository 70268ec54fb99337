// shared/src/lib.rs

use std::time::Duration;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("rate limit exceeded, please try again in a few minutes")]
    RateLimited { retry_after: Option<Duration> },
    #[error("upstream error: {status} - {body}")]
    Upstream { status: u16, body: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport: {0}")]
    Transport(String),
    #[error("storage: {0}")]
    Storage(String),
}

impl Error {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Error::RateLimited { .. })
    }

    /// Server supplied delay hint, only ever present on `RateLimited`.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;
