//! 面试会话控制器。
//!
//! 控制器是 [`SessionPhase`] 的唯一权威：只有它可以申请房间凭据、驱动阶段迁移
//! 以及拆除实时传输。状态锁不会跨越后端请求或实时握手持有。

pub mod aggregator;
pub mod error;
pub mod events;
pub mod phase;
pub mod selection;
pub mod types;

pub use aggregator::{TranscriptAggregator, MAX_SUGGESTIONS};
pub use error::SessionError;
pub use events::{AnalyticsStatus, NoticeLevel, SessionEvent, SessionNotice};
pub use phase::{ParticipantRole, PhaseUpdate, SessionPhase};
pub use selection::{
    FileSelectionStore, InterviewerSelection, MemorySelectionStore, SelectionStore,
};
pub use types::{CoachSuggestion, ConnectionState, LatestExchange, TranscriptEntry};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result as AnyResult;
use serde_json::Value;
use tokio::sync::{broadcast, Mutex};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::backend::{
    AnalyticsReport, HttpInterviewBackend, InterviewBackend, SuggestRequest,
};
use crate::config::{ClientConfig, SessionConfig};
use crate::telemetry::events::{
    record_analytics_outcome, record_coaching_fetch, record_phase_transition,
};
use crate::transport::{RoomConnector, TransportAdapter, TransportError};

const TARGET: &str = "session_controller";

#[derive(Default)]
struct ControllerState {
    phase: SessionPhase,
    role: Option<ParticipantRole>,
    /// 每次进入 Connecting 或被结束/关闭时递增，用于识别过期的连接尝试。
    attempt: u64,
    transport: Option<TransportAdapter>,
    last_error: Option<String>,
    analytics: Option<AnalyticsReport>,
    interviewer: Option<InterviewerSelection>,
}

pub struct SessionController {
    config: SessionConfig,
    backend: Arc<dyn InterviewBackend>,
    connector: Arc<dyn RoomConnector>,
    selection_store: Arc<dyn SelectionStore>,
    aggregator: Arc<Mutex<TranscriptAggregator>>,
    state: Mutex<ControllerState>,
    /// 正在申请凭据的 `select_role` 令牌，0 表示空闲。
    starting: AtomicU64,
    start_seq: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

/// `select_role` 的占位守卫：无论正常返回、出错还是 future 被丢弃，都会释放占位。
struct StartGuard<'a> {
    starting: &'a AtomicU64,
    token: u64,
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        // 已被 shutdown 清除或被新的调用占用时不做处理。
        let _ = self
            .starting
            .compare_exchange(self.token, 0, Ordering::SeqCst, Ordering::SeqCst);
    }
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        backend: Arc<dyn InterviewBackend>,
        connector: Arc<dyn RoomConnector>,
        selection_store: Arc<dyn SelectionStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            backend,
            connector,
            selection_store,
            aggregator: Arc::new(Mutex::new(TranscriptAggregator::new())),
            state: Mutex::new(ControllerState::default()),
            starting: AtomicU64::new(0),
            start_seq: AtomicU64::new(0),
            events,
        }
    }

    /// 使用 HTTP 后端与文件存储构造控制器。
    pub fn from_client_config(
        client: &ClientConfig,
        session: SessionConfig,
        connector: Arc<dyn RoomConnector>,
    ) -> AnyResult<Self> {
        let store = match client.selection_path.as_ref() {
            Some(path) => FileSelectionStore::new(path.clone()),
            None => FileSelectionStore::with_default_path()?,
        };

        Ok(Self::new(
            session.with_client(client),
            Arc::new(HttpInterviewBackend::new(client)),
            connector,
            Arc::new(store),
        ))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.lock().await.phase
    }

    pub async fn role(&self) -> Option<ParticipantRole> {
        self.state.lock().await.role
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn analytics(&self) -> Option<AnalyticsReport> {
        self.state.lock().await.analytics.clone()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.state
            .lock()
            .await
            .transport
            .as_ref()
            .map(TransportAdapter::connection_state)
            .unwrap_or_default()
    }

    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        self.aggregator.lock().await.transcript().to_vec()
    }

    pub async fn suggestions(&self) -> Vec<CoachSuggestion> {
        self.aggregator.lock().await.suggestions()
    }

    pub async fn latest_exchange(&self) -> Option<LatestExchange> {
        self.aggregator.lock().await.latest_exchange()
    }

    /// 选择角色并建立实时会话，仅在 `RoleSelect` 阶段有效。
    pub async fn select_role(&self, role: ParticipantRole) -> Result<(), SessionError> {
        let (started_at, _start_guard) = {
            let mut state = self.state.lock().await;
            let token = self.start_seq.fetch_add(1, Ordering::SeqCst) + 1;
            if state.phase != SessionPhase::RoleSelect
                || self
                    .starting
                    .compare_exchange(0, token, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
            {
                return Err(SessionError::InvalidTransition {
                    from: state.phase,
                    action: "select_role",
                });
            }
            state.last_error = None;
            let guard = StartGuard {
                starting: &self.starting,
                token,
            };
            (state.attempt, guard)
        };

        info!(target: TARGET, %role, "requesting interview credentials");
        let credentials = match self.backend.start_interview(role).await {
            Ok(credentials) => credentials,
            Err(err) => {
                let message = format!("failed to start interview: {err}");
                self.fail_start(&message, "无法创建面试房间，请稍后重试。")
                    .await;
                return Err(SessionError::Connection(message));
            }
        };

        let Some(url) = credentials
            .realtime_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
        else {
            let message = "realtime service is not configured".to_string();
            self.fail_start(&message, "实时语音服务未配置，无法开始面试。")
                .await;
            return Err(SessionError::Configuration(message));
        };

        let (attempt, generation) = {
            let mut state = self.state.lock().await;
            if state.attempt != started_at || state.phase != SessionPhase::RoleSelect {
                warn!(target: TARGET, %role, "role selection superseded before connecting");
                return Err(SessionError::Aborted);
            }
            state.role = Some(role);
            state.attempt += 1;
            self.transition(&mut state, SessionPhase::Connecting, None)?;
            let generation = self.aggregator.lock().await.generation();
            (state.attempt, generation)
        };

        info!(
            target: TARGET,
            room = %credentials.room_name,
            attempt,
            "connecting realtime transport"
        );
        let mut adapter = TransportAdapter::new(
            Arc::clone(&self.connector),
            Arc::clone(&self.aggregator),
            self.events.clone(),
            self.config.enable_microphone,
            generation,
        );
        let result = match timeout(
            self.config.connect_timeout,
            adapter.connect(&url, &credentials.token),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout {
                timeout_ms: self.config.connect_timeout.as_millis() as u64,
            }),
        };

        let mut state = self.state.lock().await;
        if state.attempt != attempt {
            adapter.disconnect().await;
            warn!(target: TARGET, attempt, "connection attempt superseded, transport released");
            return Err(SessionError::Aborted);
        }

        match result {
            Ok(()) => {
                state.transport = Some(adapter);
                if state.phase == SessionPhase::Connecting {
                    self.transition(&mut state, SessionPhase::Active, None)?;
                }
                Ok(())
            }
            Err(err) => {
                adapter.disconnect().await;
                {
                    let mut aggregator = self.aggregator.lock().await;
                    aggregator.reset();
                    aggregator.advance_generation();
                }
                let message = err.to_string();
                state.last_error = Some(message.clone());
                self.transition(&mut state, SessionPhase::RoleSelect, Some(message.clone()))?;
                state.role = None;
                self.emit(SessionEvent::Notice(SessionNotice::new(
                    NoticeLevel::Error,
                    "实时连接失败，请重新选择角色后重试。",
                )));
                Err(SessionError::Connection(message))
            }
        }
    }

    /// 传输层握手完成的回调，仅在 `Connecting` 阶段有效。
    pub async fn on_transport_connected(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.phase != SessionPhase::Connecting {
            return Err(SessionError::InvalidTransition {
                from: state.phase,
                action: "on_transport_connected",
            });
        }
        self.transition(&mut state, SessionPhase::Active, None)
    }

    /// 结束会话：拆除传输、进入 `Ended`，随后尽力请求分析报告。
    pub async fn end_session(&self) -> Result<Option<AnalyticsReport>, SessionError> {
        let (transcript, lines, attempt) = {
            let mut state = self.state.lock().await;
            if !matches!(state.phase, SessionPhase::Active | SessionPhase::Connecting) {
                return Err(SessionError::InvalidTransition {
                    from: state.phase,
                    action: "end_session",
                });
            }

            if let Some(mut transport) = state.transport.take() {
                transport.disconnect().await;
            }
            state.attempt += 1;
            state.analytics = None;
            self.transition(&mut state, SessionPhase::Ended, None)?;

            let mut aggregator = self.aggregator.lock().await;
            aggregator.advance_generation();
            (
                aggregator.full_transcript_text(),
                aggregator.transcript().len(),
                state.attempt,
            )
        };

        Ok(self.request_analytics(transcript, lines, attempt).await)
    }

    /// 从 `Ended` 回到 `RoleSelect`，清空本次会话的全部状态。
    pub async fn restart(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if state.phase != SessionPhase::Ended {
            return Err(SessionError::InvalidTransition {
                from: state.phase,
                action: "restart",
            });
        }

        if let Some(mut transport) = state.transport.take() {
            transport.disconnect().await;
        }
        {
            let mut aggregator = self.aggregator.lock().await;
            aggregator.reset();
            aggregator.advance_generation();
        }
        state.attempt += 1;
        state.analytics = None;
        state.last_error = None;
        self.transition(&mut state, SessionPhase::RoleSelect, None)?;
        state.role = None;
        Ok(())
    }

    /// 切换本地麦克风；未连接时为空操作。
    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        let state = self.state.lock().await;
        if let Some(transport) = state.transport.as_ref() {
            transport.set_microphone_enabled(enabled).await?;
        }
        Ok(())
    }

    /// 用最近一轮问答向后端请求教练提示，成功时插入提示列表。
    pub async fn request_coaching_suggestion(
        &self,
    ) -> Result<Option<CoachSuggestion>, SessionError> {
        let (exchange, attempt) = {
            let state = self.state.lock().await;
            if state.phase != SessionPhase::Active {
                return Ok(None);
            }
            match self.aggregator.lock().await.latest_exchange() {
                Some(exchange) => (exchange, state.attempt),
                None => {
                    record_coaching_fetch("skipped", Some("incomplete exchange"));
                    return Ok(None);
                }
            }
        };

        match self.backend.suggest(&SuggestRequest::from(&exchange)).await {
            Ok(suggestion) => {
                let state = self.state.lock().await;
                if state.attempt != attempt || state.phase != SessionPhase::Active {
                    record_coaching_fetch("discarded", Some("session changed"));
                    return Ok(None);
                }
                self.aggregator
                    .lock()
                    .await
                    .push_suggestion(suggestion.clone());
                self.emit(SessionEvent::Suggestion(suggestion.clone()));
                record_coaching_fetch("applied", None);
                Ok(Some(suggestion))
            }
            Err(err) => {
                warn!(target: TARGET, %err, "coaching suggestion request failed");
                let message = err.to_string();
                record_coaching_fetch("failed", Some(message.as_str()));
                Ok(None)
            }
        }
    }

    /// 自由文本教练助手，请求与响应原样透传。
    pub async fn coach_chat(&self, message: &str) -> Result<Value, SessionError> {
        self.backend.chat(message).await.map_err(|err| {
            warn!(target: TARGET, %err, "coach chat request failed");
            SessionError::from(err)
        })
    }

    pub async fn select_interviewer(
        &self,
        selection: InterviewerSelection,
    ) -> Result<(), SessionError> {
        self.selection_store.save(&selection).await?;
        self.state.lock().await.interviewer = Some(selection);
        Ok(())
    }

    /// 读取已选面试官；首次调用时从存储加载。
    pub async fn selected_interviewer(&self) -> Option<InterviewerSelection> {
        if let Some(selection) = self.state.lock().await.interviewer.clone() {
            return Some(selection);
        }

        match self.selection_store.load().await {
            Ok(selection) => {
                let mut state = self.state.lock().await;
                if state.interviewer.is_none() {
                    state.interviewer = selection;
                }
                state.interviewer.clone()
            }
            Err(err) => {
                warn!(target: TARGET, %err, "failed to load interviewer selection");
                None
            }
        }
    }

    /// 页面卸载路径：无条件释放实时传输，并使进行中的连接尝试失效。
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.attempt += 1;
        self.starting.store(0, Ordering::SeqCst);
        if let Some(mut transport) = state.transport.take() {
            transport.disconnect().await;
        }
        self.aggregator.lock().await.advance_generation();
        info!(target: TARGET, phase = %state.phase, "session controller shut down");
    }

    async fn fail_start(&self, message: &str, notice: &str) {
        warn!(target: TARGET, error = message, "interview start failed");
        self.state.lock().await.last_error = Some(message.to_string());
        self.emit(SessionEvent::Notice(SessionNotice::new(
            NoticeLevel::Error,
            notice,
        )));
    }

    async fn request_analytics(
        &self,
        transcript: String,
        lines: usize,
        attempt: u64,
    ) -> Option<AnalyticsReport> {
        let candidate_id = self.config.candidate_id.as_deref();

        if lines == 0 {
            record_analytics_outcome(candidate_id, "skipped", 0, Some("empty transcript"));
            self.emit(SessionEvent::Analytics(AnalyticsStatus::Skipped {
                reason: "empty transcript".into(),
            }));
            return None;
        }

        let Some(candidate_id) = candidate_id else {
            record_analytics_outcome(None, "skipped", lines, Some("no candidate id"));
            self.emit(SessionEvent::Analytics(AnalyticsStatus::Skipped {
                reason: "no candidate id".into(),
            }));
            return None;
        };

        self.emit(SessionEvent::Analytics(AnalyticsStatus::Pending));
        match self.backend.generate_analytics(candidate_id, &transcript).await {
            Ok(report) => {
                record_analytics_outcome(Some(candidate_id), "ready", lines, None);
                let mut state = self.state.lock().await;
                if state.attempt == attempt && state.phase == SessionPhase::Ended {
                    state.analytics = Some(report.clone());
                }
                drop(state);
                self.emit(SessionEvent::Analytics(AnalyticsStatus::Ready(
                    report.clone(),
                )));
                Some(report)
            }
            Err(err) => {
                warn!(target: TARGET, %err, "analytics generation failed");
                let message = err.to_string();
                record_analytics_outcome(
                    Some(candidate_id),
                    "failed",
                    lines,
                    Some(message.as_str()),
                );
                self.emit(SessionEvent::Analytics(AnalyticsStatus::Failed { message }));
                None
            }
        }
    }

    fn transition(
        &self,
        state: &mut ControllerState,
        next: SessionPhase,
        reason: Option<String>,
    ) -> Result<(), SessionError> {
        let from = state.phase;
        if !from.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from,
                action: next.as_str(),
            });
        }

        state.phase = next;
        record_phase_transition(
            from.as_str(),
            next.as_str(),
            state.role.map(|role| role.as_str()),
            reason.as_deref(),
        );

        let mut update = PhaseUpdate::new(from, next, state.role);
        if let Some(reason) = reason {
            update = update.with_reason(reason);
        }
        self.emit(SessionEvent::Phase(update));
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}
