use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::interview::types::LatestExchange;

/// `POST /interview/start` 返回的房间凭据。
///
/// `realtime_url` 缺失表示后端未配置实时服务，客户端不得尝试连接。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InterviewCredentials {
    #[serde(alias = "roomName")]
    pub room_name: String,
    pub token: String,
    #[serde(default, alias = "realtimeUrl", alias = "livekit_url", alias = "livekitUrl")]
    pub realtime_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnalyticsRequest<'a> {
    pub transcript: &'a str,
}

/// 结束阶段展示的分析报告；未建模的字段原样保留。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyticsReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// `POST /coach/suggest` 的请求体：只携带最近一轮问答。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestRequest {
    pub question: String,
    pub answer: String,
}

impl From<&LatestExchange> for SuggestRequest {
    fn from(exchange: &LatestExchange) -> Self {
        Self {
            question: exchange.interviewer.text.clone(),
            answer: exchange.candidate.text.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub message: &'a str,
}
