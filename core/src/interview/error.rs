use thiserror::Error;

use crate::backend::BackendError;
use crate::transport::TransportError;

use super::phase::SessionPhase;

#[derive(Debug, Error)]
pub enum SessionError {
    /// 缺少实时服务地址等配置，阻止会话开始。
    #[error("configuration error: {0}")]
    Configuration(String),
    /// 凭据获取或实时握手失败，可回到角色选择后重试。
    #[error("connection error: {0}")]
    Connection(String),
    #[error("`{action}` is not allowed in phase `{from}`")]
    InvalidTransition {
        from: SessionPhase,
        action: &'static str,
    },
    #[error("session attempt was superseded before it completed")]
    Aborted,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("selection store failure: {0}")]
    Selection(#[from] anyhow::Error),
}

impl SessionError {
    /// 是否需要在界面上直接提示用户。
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            SessionError::Configuration(_) | SessionError::Connection(_)
        )
    }
}
