//! 招聘后端的调用约定。
//!
//! 后端是黑盒协作方：凭据签发、实时教练提示与结束后的分析报告都在服务端完成。

mod http;

pub mod error;
pub mod types;

pub use error::BackendError;
pub use http::HttpInterviewBackend;
pub use types::{AnalyticsReport, InterviewCredentials, SuggestRequest};

use async_trait::async_trait;
use serde_json::Value;

use crate::interview::phase::ParticipantRole;
use crate::interview::types::CoachSuggestion;

#[async_trait]
pub trait InterviewBackend: Send + Sync {
    /// `POST /interview/start?role={role}`
    async fn start_interview(
        &self,
        role: ParticipantRole,
    ) -> Result<InterviewCredentials, BackendError>;

    /// `POST /candidate/{id}/analytics`
    async fn generate_analytics(
        &self,
        candidate_id: &str,
        transcript: &str,
    ) -> Result<AnalyticsReport, BackendError>;

    /// `POST /coach/suggest`
    async fn suggest(&self, request: &SuggestRequest) -> Result<CoachSuggestion, BackendError>;

    /// `POST /coach/chat`，请求与响应原样透传。
    async fn chat(&self, message: &str) -> Result<Value, BackendError>;
}
