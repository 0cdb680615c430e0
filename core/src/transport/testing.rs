use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::TransportError;
use super::traits::{RoomConnector, RoomSession};
use super::types::RoomEvent;

#[derive(Debug, Default)]
pub(crate) struct RoomLog {
    pub mic: Vec<bool>,
    pub attached: Vec<String>,
    pub detached: Vec<String>,
    pub closed: usize,
}

pub(crate) struct ScriptedRoom {
    log: Arc<Mutex<RoomLog>>,
}

#[async_trait]
impl RoomSession for ScriptedRoom {
    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.log.lock().expect("room log poisoned").mic.push(enabled);
        Ok(())
    }

    async fn attach_audio(&self, track_sid: &str) -> Result<(), TransportError> {
        self.log
            .lock()
            .expect("room log poisoned")
            .attached
            .push(track_sid.to_string());
        Ok(())
    }

    async fn detach_audio(&self, track_sid: &str) {
        self.log
            .lock()
            .expect("room log poisoned")
            .detached
            .push(track_sid.to_string());
    }

    async fn close(&self) {
        self.log.lock().expect("room log poisoned").closed += 1;
    }
}

/// 可编程的房间接入端：记录调用，并把事件发送端交给测试。
#[derive(Default)]
pub(crate) struct ScriptedConnector {
    pub log: Arc<Mutex<RoomLog>>,
    senders: Mutex<Vec<mpsc::Sender<RoomEvent>>>,
    failure: Mutex<Option<TransportError>>,
    delay: Mutex<Option<Duration>>,
    connects: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(error: TransportError) -> Arc<Self> {
        let connector = Self::default();
        *connector.failure.lock().expect("failure lock poisoned") = Some(error);
        Arc::new(connector)
    }

    pub fn delayed(delay: Duration) -> Arc<Self> {
        let connector = Self::default();
        *connector.delay.lock().expect("delay lock poisoned") = Some(delay);
        Arc::new(connector)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// 最近一次连接的事件发送端。
    pub fn sender(&self) -> mpsc::Sender<RoomEvent> {
        self.senders
            .lock()
            .expect("senders lock poisoned")
            .last()
            .cloned()
            .expect("no room connected yet")
    }

    pub fn closed(&self) -> usize {
        self.log.lock().expect("room log poisoned").closed
    }
}

#[async_trait]
impl RoomConnector for ScriptedConnector {
    async fn connect(
        &self,
        _url: &str,
        _token: &str,
    ) -> Result<(Box<dyn RoomSession>, mpsc::Receiver<RoomEvent>), TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().expect("delay lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.lock().expect("failure lock poisoned").clone();
        if let Some(error) = failure {
            return Err(error);
        }

        let (tx, rx) = mpsc::channel(32);
        self.senders.lock().expect("senders lock poisoned").push(tx);
        Ok((
            Box::new(ScriptedRoom {
                log: Arc::clone(&self.log),
            }),
            rx,
        ))
    }
}
