use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::phase::ParticipantRole;

/// 单条转写记录，插入顺序即时间顺序。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub speaker: ParticipantRole,
    pub text: String,
    pub timestamp: SystemTime,
}

impl TranscriptEntry {
    pub fn new<S: Into<String>>(speaker: ParticipantRole, text: S) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }

    pub fn at<S: Into<String>>(speaker: ParticipantRole, text: S, timestamp: SystemTime) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp,
        }
    }
}

/// 后端实时下发的教练提示。
///
/// 字段名以后端当前的 snake_case 负载为准，仅接受直接别名，
/// 不在客户端推导旧版字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachSuggestion {
    #[serde(alias = "suggestion")]
    pub suggestion_text: String,
    #[serde(alias = "category")]
    pub verdict_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, alias = "prior_round", skip_serializing_if = "Option::is_none")]
    pub prior_round_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_quote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_quote: Option<String>,
}

impl CoachSuggestion {
    pub fn new<S: Into<String>, C: Into<String>>(suggestion_text: S, verdict_category: C) -> Self {
        Self {
            suggestion_text: suggestion_text.into(),
            verdict_category: verdict_category.into(),
            issue_type: None,
            reasoning: None,
            prior_round_ref: None,
            prior_quote: None,
            current_quote: None,
        }
    }
}

/// 双方各自最近一次发言组成的问答对。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestExchange {
    pub interviewer: TranscriptEntry,
    pub candidate: TranscriptEntry,
}

/// 由传输适配器维护的连接快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionState {
    pub connected: bool,
    pub mic_enabled: bool,
    pub ai_speaking: bool,
}
