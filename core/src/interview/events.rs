use crate::backend::types::AnalyticsReport;

use super::phase::PhaseUpdate;
use super::types::{CoachSuggestion, ConnectionState, TranscriptEntry};

/// 面向界面层广播的会话事件。
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Phase(PhaseUpdate),
    Transcript(TranscriptEntry),
    Suggestion(CoachSuggestion),
    Connection(ConnectionState),
    Notice(SessionNotice),
    Analytics(AnalyticsStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl SessionNotice {
    pub fn new<S: Into<String>>(level: NoticeLevel, message: S) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// 结束阶段的分析报告生成进度。
#[derive(Debug, Clone)]
pub enum AnalyticsStatus {
    Pending,
    Ready(AnalyticsReport),
    Skipped { reason: String },
    Failed { message: String },
}

impl AnalyticsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsStatus::Pending => "pending",
            AnalyticsStatus::Ready(_) => "ready",
            AnalyticsStatus::Skipped { .. } => "skipped",
            AnalyticsStatus::Failed { .. } => "failed",
        }
    }
}
