use thiserror::Error;

pub use anyhow::Context;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to parse feed payload: {0}")]
    Parse(String),
    #[error("timed out waiting for the feed")]
    Timeout,
    #[error("feed connection closed")]
    ConnectionClosed,
    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    pub fn message<T: Into<String>>(msg: T) -> Self {
        AppError::Message(msg.into())
    }

    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        AppError::InvalidArgument(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        AppError::Parse(msg.into())
    }

    /// Transport-level failures that end a fetch with whatever was already collected.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Timeout | AppError::ConnectionClosed | AppError::WebSocket(_) | AppError::Io(_)
        )
    }
}
