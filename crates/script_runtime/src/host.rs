//! Host Events
//!
//! Everything the engine asks the surrounding game to do (print text, play a
//! sound, open the trade screen, ...) goes out as a `HostEvent` through the
//! `Host` trait. The engine never waits on the host.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;

// ─────────────────────────────────────────────────────────────────────────────
// Host Event
// ─────────────────────────────────────────────────────────────────────────────

/// Callback requested by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    ShowMessage { text: String },
    PlaySound { sound_id: String },
    RoomMusicChanged { room_id: String, music_id: String },
    PlayerTeleported { room_id: String },
    StartConversation { npc_id: String },
    StartCombat { npc_id: String },
    StartTrade { npc_id: String },
    AdventureCompleted,
    /// Aborted or failed walk, dropped nested trigger
    Diagnostic { text: String },
}

impl HostEvent {
    pub fn message(text: impl Into<String>) -> Self {
        HostEvent::ShowMessage { text: text.into() }
    }

    pub fn diagnostic(text: impl Into<String>) -> Self {
        HostEvent::Diagnostic { text: text.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Receiver of host events
pub trait Host: Send + Sync {
    fn notify(&self, event: HostEvent);
}

/// Host that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {
    fn notify(&self, _event: HostEvent) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Publisher
// ─────────────────────────────────────────────────────────────────────────────

/// Fans host events out over a broadcast channel
///
/// Subscribe before triggering; events published with no subscriber are
/// dropped.
#[derive(Clone)]
pub struct HostPublisher {
    tx: broadcast::Sender<HostEvent>,
}

impl HostPublisher {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }
}

impl Default for HostPublisher {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Host for HostPublisher {
    fn notify(&self, event: HostEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Host event dropped, no subscribers");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recording Host
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps every event with the (tokio) instant it arrived
#[derive(Default)]
pub struct RecordingHost {
    events: Mutex<Vec<(Instant, HostEvent)>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().iter().map(|(_, e)| e.clone()).collect()
    }

    pub fn timed_events(&self) -> Vec<(Instant, HostEvent)> {
        self.events.lock().clone()
    }

    /// Texts of all ShowMessage events, in order
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|(_, e)| match e {
                HostEvent::ShowMessage { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|(_, e)| match e {
                HostEvent::Diagnostic { text } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Host for RecordingHost {
    fn notify(&self, event: HostEvent) {
        self.events.lock().push((Instant::now(), event));
    }
}
