use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnfluffedError {
    #[error("Backend returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid ASIN '{0}': expected 10 uppercase letters or digits")]
    InvalidAsin(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
