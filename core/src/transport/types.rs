use bytes::Bytes;

use crate::interview::types::{CoachSuggestion, TranscriptEntry};

/// 房间连接向适配器投递的原始事件，顺序与传输层投递顺序一致。
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// 应用层数据通道负载。
    Data(Bytes),
    /// 远端音频轨道已订阅。
    TrackSubscribed { track_sid: String },
    /// 远端音频轨道已取消订阅。
    TrackUnsubscribed { track_sid: String },
    /// 房间被远端或网络关闭。
    Disconnected { reason: Option<String> },
}

/// 数据通道解复用后的类型化事件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataEvent {
    TranscriptUpdate(TranscriptEntry),
    Suggestion(CoachSuggestion),
    AiSpeaking(bool),
}

impl DataEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            DataEvent::TranscriptUpdate(_) => TYPE_TRANSCRIPT_UPDATE,
            DataEvent::Suggestion(_) => TYPE_AI_SUGGESTION,
            DataEvent::AiSpeaking(_) => TYPE_AI_SPEAKING,
        }
    }
}

pub(crate) const TYPE_TRANSCRIPT_UPDATE: &str = "TRANSCRIPT_UPDATE";
pub(crate) const TYPE_AI_SUGGESTION: &str = "AI_SUGGESTION";
pub(crate) const TYPE_AI_SPEAKING: &str = "AI_SPEAKING";
