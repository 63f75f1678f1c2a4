use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("No cached response for {0}")]
    CacheMiss(String),

    #[error("Cache storage error: {0}")]
    Storage(String),

    #[error("Install of {partition} failed at {url}: {reason}")]
    Install {
        partition: String,
        url: String,
        reason: String,
    },

    #[error("Cache version {0} has not been installed")]
    NotInstalled(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<std::io::Error> for CacheError {
    fn from(e: std::io::Error) -> Self {
        CacheError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for CacheError {
    fn from(e: reqwest::Error) -> Self {
        CacheError::Network(e.to_string())
    }
}
