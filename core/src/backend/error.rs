use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend returned HTTP status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("backend request failed: {0}")]
    Transport(String),
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("backend request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl BackendError {
    /// 仅传输层错误与 5xx 允许重试。
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Transport(_) => true,
            BackendError::Status { status, .. } => *status >= 500,
            BackendError::InvalidUrl(_) | BackendError::Decode(_) | BackendError::Join(_) => false,
        }
    }
}
