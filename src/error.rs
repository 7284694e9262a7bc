use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Azure error: {0}")]
    Azure(#[from] azure_core::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("value unavailable for secret '{0}'")]
    ValueUnavailable(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
