//! 实时传输适配器。
//!
//! 独占房间连接与音频挂载，把数据通道解复用为类型化事件并写入聚合器。
//! `disconnect` 必须在每条退出路径上被调用，且可以重复调用。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::interview::aggregator::TranscriptAggregator;
use crate::interview::events::{NoticeLevel, SessionEvent, SessionNotice};
use crate::interview::types::ConnectionState;
use crate::telemetry::events::{record_data_event_dropped, record_transport_teardown};

use super::codec::decode_data_event;
use super::error::TransportError;
use super::traits::{RoomConnector, RoomSession};
use super::types::{DataEvent, RoomEvent};

const TARGET: &str = "transport_adapter";

#[derive(Debug, Default)]
pub(crate) struct ConnectionFlags {
    connected: AtomicBool,
    mic_enabled: AtomicBool,
    ai_speaking: AtomicBool,
}

impl ConnectionFlags {
    pub(crate) fn snapshot(&self) -> ConnectionState {
        ConnectionState {
            connected: self.connected.load(Ordering::SeqCst),
            mic_enabled: self.mic_enabled.load(Ordering::SeqCst),
            ai_speaking: self.ai_speaking.load(Ordering::SeqCst),
        }
    }

    fn clear(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.mic_enabled.store(false, Ordering::SeqCst);
        self.ai_speaking.store(false, Ordering::SeqCst);
    }
}

pub struct TransportAdapter {
    connector: Arc<dyn RoomConnector>,
    aggregator: Arc<Mutex<TranscriptAggregator>>,
    events: broadcast::Sender<SessionEvent>,
    flags: Arc<ConnectionFlags>,
    attached: Arc<StdMutex<Vec<String>>>,
    room: Option<Arc<dyn RoomSession>>,
    pump: Option<JoinHandle<()>>,
    enable_microphone: bool,
    generation: u64,
}

impl TransportAdapter {
    pub fn new(
        connector: Arc<dyn RoomConnector>,
        aggregator: Arc<Mutex<TranscriptAggregator>>,
        events: broadcast::Sender<SessionEvent>,
        enable_microphone: bool,
        generation: u64,
    ) -> Self {
        Self {
            connector,
            aggregator,
            events,
            flags: Arc::new(ConnectionFlags::default()),
            attached: Arc::new(StdMutex::new(Vec::new())),
            room: None,
            pump: None,
            enable_microphone,
            generation,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.flags.snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.room.is_some()
    }

    pub fn attached_tracks(&self) -> Vec<String> {
        self.attached
            .lock()
            .map(|tracks| tracks.clone())
            .unwrap_or_default()
    }

    /// 建立房间连接；已连接时直接返回。
    pub async fn connect(&mut self, url: &str, token: &str) -> Result<(), TransportError> {
        if self.room.is_some() {
            debug!(target: TARGET, "connect called on live transport, ignoring");
            return Ok(());
        }

        info!(target: TARGET, %url, "connecting to realtime room");
        let (room, rx) = self.connector.connect(url, token).await?;
        let room: Arc<dyn RoomSession> = Arc::from(room);

        // 先登记房间与事件泵，握手被超时取消时 disconnect 仍能回收。
        self.room = Some(Arc::clone(&room));
        self.flags.connected.store(true, Ordering::SeqCst);
        self.pump = Some(tokio::spawn(pump_room_events(
            rx,
            Arc::clone(&room),
            Arc::clone(&self.aggregator),
            self.events.clone(),
            Arc::clone(&self.flags),
            Arc::clone(&self.attached),
            self.generation,
        )));

        if self.enable_microphone {
            match room.set_microphone_enabled(true).await {
                Ok(()) => self.flags.mic_enabled.store(true, Ordering::SeqCst),
                Err(err) => {
                    warn!(target: TARGET, %err, "failed to enable local microphone");
                    emit(
                        &self.events,
                        SessionEvent::Notice(SessionNotice::new(
                            NoticeLevel::Warn,
                            "麦克风开启失败，请检查设备权限后手动开启。",
                        )),
                    );
                }
            }
        }

        emit(&self.events, SessionEvent::Connection(self.flags.snapshot()));
        Ok(())
    }

    /// 切换本地音频发布状态；未连接时为空操作。
    pub async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        let Some(room) = self.room.as_ref() else {
            debug!(target: TARGET, enabled, "microphone toggle ignored, not connected");
            return Ok(());
        };

        room.set_microphone_enabled(enabled).await?;
        self.flags.mic_enabled.store(enabled, Ordering::SeqCst);
        emit(&self.events, SessionEvent::Connection(self.flags.snapshot()));
        Ok(())
    }

    /// 释放音频挂载、停止事件泵、关闭房间并清空本地引用。
    ///
    /// 返回时事件泵已经退出，之后不会再有写入到达聚合器。
    pub async fn disconnect(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            if let Err(err) = pump.await {
                if !err.is_cancelled() {
                    warn!(target: TARGET, %err, "room event pump panicked");
                }
            }
        }

        let tracks = self
            .attached
            .lock()
            .map(|mut tracks| std::mem::take(&mut *tracks))
            .unwrap_or_default();
        let had_room = self.room.is_some();

        if let Some(room) = self.room.take() {
            for track_sid in &tracks {
                room.detach_audio(track_sid).await;
            }
            room.close().await;
        }

        let was_connected = self.flags.snapshot().connected;
        self.flags.clear();

        if had_room || was_connected {
            record_transport_teardown(tracks.len(), had_room);
            emit(&self.events, SessionEvent::Connection(self.flags.snapshot()));
        }
    }
}

impl Drop for TransportAdapter {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.flags.clear();

        if let Some(room) = self.room.take() {
            let tracks = self
                .attached
                .lock()
                .map(|mut tracks| std::mem::take(&mut *tracks))
                .unwrap_or_default();
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        for track_sid in &tracks {
                            room.detach_audio(track_sid).await;
                        }
                        room.close().await;
                    });
                }
                Err(_) => warn!(
                    target: TARGET,
                    "transport dropped outside runtime, room close skipped"
                ),
            }
        }
    }
}

async fn pump_room_events(
    mut rx: mpsc::Receiver<RoomEvent>,
    room: Arc<dyn RoomSession>,
    aggregator: Arc<Mutex<TranscriptAggregator>>,
    events: broadcast::Sender<SessionEvent>,
    flags: Arc<ConnectionFlags>,
    attached: Arc<StdMutex<Vec<String>>>,
    generation: u64,
) {
    while let Some(event) = rx.recv().await {
        match event {
            RoomEvent::Data(payload) => match decode_data_event(&payload) {
                Ok(event) => {
                    apply_data_event(event, generation, &aggregator, &events, &flags).await
                }
                Err(err) => record_data_event_dropped(payload.len(), &err.to_string()),
            },
            RoomEvent::TrackSubscribed { track_sid } => {
                match room.attach_audio(&track_sid).await {
                    Ok(()) => {
                        if let Ok(mut tracks) = attached.lock() {
                            tracks.push(track_sid);
                        }
                    }
                    Err(err) => warn!(
                        target: TARGET,
                        %err,
                        %track_sid,
                        "failed to attach remote audio track"
                    ),
                }
            }
            RoomEvent::TrackUnsubscribed { track_sid } => {
                room.detach_audio(&track_sid).await;
                if let Ok(mut tracks) = attached.lock() {
                    tracks.retain(|sid| sid != &track_sid);
                }
            }
            RoomEvent::Disconnected { reason } => {
                warn!(
                    target: TARGET,
                    reason = reason.as_deref().unwrap_or("unknown"),
                    "realtime room disconnected"
                );
                flags.connected.store(false, Ordering::SeqCst);
                flags.ai_speaking.store(false, Ordering::SeqCst);
                emit(&events, SessionEvent::Connection(flags.snapshot()));
                emit(
                    &events,
                    SessionEvent::Notice(SessionNotice::new(
                        NoticeLevel::Warn,
                        "实时连接已断开，请结束本次面试后重新开始。",
                    )),
                );
                break;
            }
        }
    }

    debug!(target: TARGET, "room event pump finished");
}

async fn apply_data_event(
    event: DataEvent,
    generation: u64,
    aggregator: &Mutex<TranscriptAggregator>,
    events: &broadcast::Sender<SessionEvent>,
    flags: &ConnectionFlags,
) {
    let kind = event.kind();
    debug!(target: TARGET, kind, "applying data channel event");
    match event {
        DataEvent::TranscriptUpdate(entry) => {
            let mut aggregator = aggregator.lock().await;
            if !aggregator.accepts(generation) {
                record_stale_event(kind, generation, aggregator.generation());
                return;
            }
            aggregator.append_transcript(entry.clone());
            drop(aggregator);
            emit(events, SessionEvent::Transcript(entry));
        }
        DataEvent::Suggestion(suggestion) => {
            let mut aggregator = aggregator.lock().await;
            if !aggregator.accepts(generation) {
                record_stale_event(kind, generation, aggregator.generation());
                return;
            }
            aggregator.push_suggestion(suggestion.clone());
            drop(aggregator);
            emit(events, SessionEvent::Suggestion(suggestion));
        }
        DataEvent::AiSpeaking(speaking) => {
            flags.ai_speaking.store(speaking, Ordering::SeqCst);
            emit(events, SessionEvent::Connection(flags.snapshot()));
        }
    }
}

fn record_stale_event(kind: &str, generation: u64, current: u64) {
    debug!(
        target: TARGET,
        kind,
        generation,
        current,
        "dropping data event from a superseded session"
    );
}

fn emit(events: &broadcast::Sender<SessionEvent>, event: SessionEvent) {
    // 没有订阅者时发送失败属于正常情况。
    let _ = events.send(event);
}
