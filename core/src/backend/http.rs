//! 基于 ureq 的后端 HTTP 客户端。
//!
//! ureq 为阻塞式客户端，每次请求都放到 `spawn_blocking` 中执行；
//! 单次请求受超时约束，传输错误与 5xx 按固定退避有限重试。

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::interview::phase::ParticipantRole;
use crate::interview::types::CoachSuggestion;

use super::error::BackendError;
use super::types::{
    AnalyticsReport, AnalyticsRequest, ChatRequest, InterviewCredentials, SuggestRequest,
};
use super::InterviewBackend;

const TARGET: &str = "interview_backend";
pub(crate) const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct HttpInterviewBackend {
    agent: ureq::Agent,
    base_url: String,
    api_token: Option<String>,
    max_retry: u8,
}

#[derive(Debug, Clone)]
struct PreparedRequest {
    url: String,
    query: Vec<(&'static str, String)>,
    body: String,
}

impl HttpInterviewBackend {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout)
            .build();
        Self {
            agent,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            max_retry: config.max_retry,
        }
    }

    /// 逐段拼接路径，每段都做百分号编码，调用方传入的标识不会改变请求目标。
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<String, BackendError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| BackendError::InvalidUrl(format!("{}: {err}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| BackendError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.into())
    }

    async fn post<B, T>(
        &self,
        segments: &[&str],
        query: Vec<(&'static str, String)>,
        body: &B,
    ) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = PreparedRequest {
            url: self.endpoint(segments)?,
            query,
            body: serde_json::to_string(body)?,
        };

        let max_attempts = self.max_retry.saturating_add(1);
        let mut attempts: u8 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            let agent = self.agent.clone();
            let token = self.api_token.clone();
            let prepared = request.clone();

            let result = tokio::task::spawn_blocking(move || execute(&agent, token, prepared))
                .await
                .map_err(BackendError::from)
                .and_then(|result| result);

            match result {
                Ok(text) => {
                    debug!(target: TARGET, url = %request.url, attempts, "backend request succeeded");
                    return Ok(serde_json::from_str(&text)?);
                }
                Err(err) if err.is_retryable() && attempts < max_attempts => {
                    warn!(
                        target: TARGET,
                        %err,
                        url = %request.url,
                        attempts,
                        "backend request failed, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
                Err(err) => {
                    warn!(
                        target: TARGET,
                        %err,
                        url = %request.url,
                        attempts,
                        "backend request failed"
                    );
                    return Err(err);
                }
            }
        }
    }
}

fn execute(
    agent: &ureq::Agent,
    token: Option<String>,
    request: PreparedRequest,
) -> Result<String, BackendError> {
    let mut call = agent
        .post(&request.url)
        .set("Content-Type", "application/json")
        .set("Accept", "application/json");
    for (key, value) in &request.query {
        call = call.query(key, value);
    }
    if let Some(token) = token.as_deref() {
        call = call.set("Authorization", &format!("Bearer {token}"));
    }

    match call.send_string(&request.body) {
        Ok(response) => response
            .into_string()
            .map_err(|err| BackendError::Transport(err.to_string())),
        Err(ureq::Error::Status(status, response)) => {
            let message = response
                .into_string()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            Err(BackendError::Status { status, message })
        }
        Err(ureq::Error::Transport(transport)) => {
            Err(BackendError::Transport(transport.to_string()))
        }
    }
}

#[async_trait]
impl InterviewBackend for HttpInterviewBackend {
    async fn start_interview(
        &self,
        role: ParticipantRole,
    ) -> Result<InterviewCredentials, BackendError> {
        self.post(
            &["interview", "start"],
            vec![("role", role.as_str().to_string())],
            &Value::Object(Default::default()),
        )
        .await
    }

    async fn generate_analytics(
        &self,
        candidate_id: &str,
        transcript: &str,
    ) -> Result<AnalyticsReport, BackendError> {
        self.post(
            &["candidate", candidate_id, "analytics"],
            Vec::new(),
            &AnalyticsRequest { transcript },
        )
        .await
    }

    async fn suggest(&self, request: &SuggestRequest) -> Result<CoachSuggestion, BackendError> {
        self.post(&["coach", "suggest"], Vec::new(), request).await
    }

    async fn chat(&self, message: &str) -> Result<Value, BackendError> {
        self.post(&["coach", "chat"], Vec::new(), &ChatRequest { message })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::time::Duration;

    fn config(base: &str) -> ClientConfig {
        ClientConfig {
            api_base_url: base.to_string(),
            api_token: None,
            request_timeout: Duration::from_millis(200),
            max_retry: 1,
            connect_timeout: Duration::from_secs(1),
            selection_path: None,
            log_dir: None,
        }
    }

    #[test]
    fn endpoint_joins_without_duplicate_slashes() {
        let backend = HttpInterviewBackend::new(&config("https://api.example.com/v1/"));
        assert_eq!(
            backend.endpoint(&["interview", "start"]).expect("endpoint"),
            "https://api.example.com/v1/interview/start"
        );
        assert_eq!(
            backend
                .endpoint(&["candidate", "c-1", "analytics"])
                .expect("endpoint"),
            "https://api.example.com/v1/candidate/c-1/analytics"
        );
    }

    #[test]
    fn endpoint_encodes_reserved_characters_in_segments() {
        let backend = HttpInterviewBackend::new(&config("https://api.example.com"));
        assert_eq!(
            backend
                .endpoint(&["candidate", "team/42?admin=1#x", "analytics"])
                .expect("endpoint"),
            "https://api.example.com/candidate/team%2F42%3Fadmin=1%23x/analytics"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let backend = HttpInterviewBackend::new(&config("not a url"));
        let err = backend
            .endpoint(&["coach", "chat"])
            .expect_err("base url must parse");
        assert!(matches!(err, BackendError::InvalidUrl(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn candidate_id_stays_a_single_path_segment_on_the_wire() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = std::thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");

            let mut content_length = 0usize;
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).expect("header");
                if header == "\r\n" || header.is_empty() {
                    break;
                }
                if let Some(value) = header.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().expect("content length");
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("body");

            let mut stream = stream;
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
                )
                .expect("write response");
            request_line
        });

        let backend = HttpInterviewBackend::new(&config(&format!("http://{addr}")));
        backend
            .generate_analytics("team/42?admin=1", "interviewer: hi")
            .await
            .expect("analytics");

        let request_line = server.join().expect("server thread");
        assert_eq!(
            request_line.trim_end(),
            "POST /candidate/team%2F42%3Fadmin=1/analytics HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn unreachable_backend_surfaces_transport_error() {
        // 端口 9 (discard) 通常无人监听，连接应被拒绝。
        let backend = HttpInterviewBackend::new(&config("http://127.0.0.1:9"));
        let err = backend
            .start_interview(ParticipantRole::Interviewer)
            .await
            .expect_err("request must fail");
        assert!(matches!(err, BackendError::Transport(_)));
    }
}
