use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::TransportError;
use super::types::RoomEvent;

/// 实时媒体房间的接入端口。
///
/// 具体的 SDK（如 LiveKit 客户端）在外部实现该 trait，连接成功后返回房间句柄
/// 以及按投递顺序排列的房间事件流。
#[async_trait]
pub trait RoomConnector: Send + Sync {
    async fn connect(
        &self,
        url: &str,
        token: &str,
    ) -> Result<(Box<dyn RoomSession>, mpsc::Receiver<RoomEvent>), TransportError>;
}

/// 已建立的房间连接。
#[async_trait]
pub trait RoomSession: Send + Sync {
    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), TransportError>;

    /// 挂载远端音频轨道到本地播放输出。
    async fn attach_audio(&self, track_sid: &str) -> Result<(), TransportError>;

    /// 释放远端音频轨道的播放输出。
    async fn detach_audio(&self, track_sid: &str);

    async fn close(&self);
}
