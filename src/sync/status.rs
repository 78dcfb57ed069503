//! Status broadcast
//!
//! Single-producer, multi-subscriber fan-out for sync progress. Each
//! subscriber owns a bounded mailbox; a lagging subscriber loses the
//! oldest events rather than blocking the coordinator, and late
//! subscribers simply miss what came before.

use serde::Serialize;
use tokio::sync::broadcast;

/// Event severity / kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusLevel {
    Info,
    Progress,
    Success,
    Warning,
    Error,
}

/// One status event from the sync coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub level: StatusLevel,
    pub message: String,
    pub wallet: Option<String>,
    pub current: Option<u64>,
    pub total: Option<u64>,
    pub percentage: Option<f64>,
}

impl StatusEvent {
    fn new(level: StatusLevel, wallet: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            wallet: wallet.map(|w| w.to_string()),
            current: None,
            total: None,
            percentage: None,
        }
    }
}

/// Handle for emitting and subscribing to status events.
#[derive(Clone)]
pub struct StatusChannel {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// Fire-and-forget: an event with no subscribers is simply dropped.
    fn emit(&self, event: StatusEvent) {
        let _ = self.tx.send(event);
    }

    pub fn info(&self, wallet: Option<&str>, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Info, wallet, message));
    }

    pub fn success(&self, wallet: Option<&str>, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Success, wallet, message));
    }

    pub fn warning(&self, wallet: Option<&str>, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Warning, wallet, message));
    }

    pub fn error(&self, wallet: Option<&str>, message: impl Into<String>) {
        self.emit(StatusEvent::new(StatusLevel::Error, wallet, message));
    }

    pub fn progress(
        &self,
        wallet: Option<&str>,
        message: impl Into<String>,
        current: u64,
        total: u64,
    ) {
        let mut event = StatusEvent::new(StatusLevel::Progress, wallet, message);
        event.current = Some(current);
        event.total = Some(total);
        event.percentage = if total > 0 {
            Some(current as f64 / total as f64 * 100.0)
        } else {
            None
        };
        self.emit(event);
    }
}
