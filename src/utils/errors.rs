use thiserror::Error;

/// Main error type for the counsel client
#[derive(Error, Debug)]
pub enum CounselError {
    /// The request never produced a usable response (connection, timeout, TLS)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The backend answered with `success: false`
    #[error("API error: {0}")]
    ApiError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<reqwest::Error> for CounselError {
    fn from(err: reqwest::Error) -> Self {
        CounselError::NetworkError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CounselError>;
