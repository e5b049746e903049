use thiserror::Error;

#[derive(Debug, Error)]
pub enum OpsError {
    #[error("IO_FAILURE: {0}")]
    Io(#[from] std::io::Error),
    #[error("BAD_JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("REMOTE: {0}")]
    Remote(String),
    #[error("INVALID_INPUT: {0}")]
    Input(String),
    #[error("REJECTED: {0}")]
    Rejected(#[from] crate::engine::Rejection),
}

impl From<reqwest::Error> for OpsError {
    fn from(value: reqwest::Error) -> Self {
        Self::Remote(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OpsError>;
