use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("realtime connection failed: {reason}")]
    Connection { reason: String },
    #[error("realtime connection timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
    #[error("media operation failed: {reason}")]
    Media { reason: String },
}

impl TransportError {
    pub fn connection<S: Into<String>>(reason: S) -> Self {
        Self::Connection {
            reason: reason.into(),
        }
    }

    pub fn media<S: Into<String>>(reason: S) -> Self {
        Self::Media {
            reason: reason.into(),
        }
    }
}

/// 数据通道负载解码失败的原因，仅用于日志，不向用户暴露。
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("payload is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is missing the `type` discriminator")]
    MissingType,
    #[error("unknown payload type `{0}`")]
    UnknownType(String),
}
