//! Engine Handle
//!
//! A cloneable front for a spawned engine. Awaitable calls wait for the
//! engine's reply; `fire_*` calls only wait until the command is queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{mpsc, oneshot, watch};

use script_types::{Node, Value, World};

use super::{EngineError, EngineResult, PropertyUpdate};
use crate::walker::{TriggerReport, WalkReport};

// ─────────────────────────────────────────────────────────────────────────────
// Engine State
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle of a spawned engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Starting = 0,
    Running = 1,
    Stopping = 2,
    Stopped = 3,
}

impl EngineState {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Starting,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        *self == EngineState::Running
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineState::Starting => write!(f, "starting"),
            EngineState::Running => write!(f, "running"),
            EngineState::Stopping => write!(f, "stopping"),
            EngineState::Stopped => write!(f, "stopped"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Command
// ─────────────────────────────────────────────────────────────────────────────

/// Work queued for the engine task; `None` replies are fire-and-forget
pub enum EngineCommand {
    Trigger {
        owner_type: String,
        owner_id: String,
        event_tag: String,
        reply: Option<oneshot::Sender<TriggerReport>>,
    },
    ExecuteNode {
        node: Node,
        reply: Option<oneshot::Sender<WalkReport>>,
    },
    SetProperty {
        entity_type: String,
        entity_id: String,
        property: String,
        value: Value,
        reply: Option<oneshot::Sender<EngineResult<PropertyUpdate>>>,
    },
    GetProperty {
        entity_type: String,
        entity_id: String,
        property: String,
        reply: oneshot::Sender<EngineResult<Value>>,
    },
    AdvanceTurn {
        reply: Option<oneshot::Sender<TriggerReport>>,
    },
    Snapshot(oneshot::Sender<World>),
    Shutdown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine Handle
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state: Arc<AtomicU8>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl EngineHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<EngineCommand>,
        state: Arc<AtomicU8>,
        shutdown_tx: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            command_tx,
            state,
            shutdown_tx,
        }
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    async fn send(&self, command: EngineCommand) -> EngineResult<()> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| EngineError::NotRunning)
    }

    async fn request<T>(&self, command: EngineCommand, rx: oneshot::Receiver<T>) -> EngineResult<T> {
        self.send(command).await?;
        rx.await.map_err(|_| EngineError::ChannelClosed)
    }

    pub async fn trigger(&self, owner_type: &str, owner_id: &str, event_tag: &str) -> EngineResult<TriggerReport> {
        let (tx, rx) = oneshot::channel();
        self.request(trigger_command(owner_type, owner_id, event_tag, Some(tx)), rx)
            .await
    }

    pub async fn fire_trigger(&self, owner_type: &str, owner_id: &str, event_tag: &str) -> EngineResult<()> {
        self.send(trigger_command(owner_type, owner_id, event_tag, None)).await
    }

    pub async fn execute_node(&self, node: Node) -> EngineResult<WalkReport> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::ExecuteNode { node, reply: Some(tx) }, rx)
            .await
    }

    pub async fn set_property(
        &self,
        entity_type: &str,
        entity_id: &str,
        property: &str,
        value: Value,
    ) -> EngineResult<PropertyUpdate> {
        let (tx, rx) = oneshot::channel();
        let command = set_property_command(entity_type, entity_id, property, value, Some(tx));
        self.request(command, rx).await?
    }

    pub async fn fire_set_property(
        &self,
        entity_type: &str,
        entity_id: &str,
        property: &str,
        value: Value,
    ) -> EngineResult<()> {
        self.send(set_property_command(entity_type, entity_id, property, value, None))
            .await
    }

    pub async fn get_property(&self, entity_type: &str, entity_id: &str, property: &str) -> EngineResult<Value> {
        let (tx, rx) = oneshot::channel();
        let command = EngineCommand::GetProperty {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            property: property.to_string(),
            reply: tx,
        };
        self.request(command, rx).await?
    }

    pub async fn advance_turn(&self) -> EngineResult<TriggerReport> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::AdvanceTurn { reply: Some(tx) }, rx)
            .await
    }

    pub async fn fire_advance_turn(&self) -> EngineResult<()> {
        self.send(EngineCommand::AdvanceTurn { reply: None }).await
    }

    /// Copy of the current world
    pub async fn snapshot(&self) -> EngineResult<World> {
        let (tx, rx) = oneshot::channel();
        self.request(EngineCommand::Snapshot(tx), rx).await
    }

    /// Cancel any pending Delay and stop the engine
    ///
    /// Commands still queued behind the current one are dropped.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let _ = self.command_tx.send(EngineCommand::Shutdown).await;
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("state", &self.state())
            .finish()
    }
}

fn trigger_command(
    owner_type: &str,
    owner_id: &str,
    event_tag: &str,
    reply: Option<oneshot::Sender<TriggerReport>>,
) -> EngineCommand {
    EngineCommand::Trigger {
        owner_type: owner_type.to_string(),
        owner_id: owner_id.to_string(),
        event_tag: event_tag.to_string(),
        reply,
    }
}

fn set_property_command(
    entity_type: &str,
    entity_id: &str,
    property: &str,
    value: Value,
    reply: Option<oneshot::Sender<EngineResult<PropertyUpdate>>>,
) -> EngineCommand {
    EngineCommand::SetProperty {
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        property: property.to_string(),
        value,
        reply,
    }
}
