//! Script Engine
//!
//! The engine owns the world, the graph library, the handler registry and
//! the RNG. Used directly it is a plain async API; `spawn` moves it into a
//! task that processes one command at a time, so every trigger (including
//! any Delay it hits) completes before the next one starts.

mod actor;
mod handle;

pub use handle::*;

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use script_types::{Node, NodeType, Value, World};

use crate::accessor::{self, ChangeOutcome, EntityType, PropertyChange};
use crate::config::EngineConfig;
use crate::host::Host;
use crate::library::GraphLibrary;
use crate::registry::HandlerRegistry;
use crate::walker::{TriggerReport, WalkReport, Walker};

// ─────────────────────────────────────────────────────────────────────────────
// Engine Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced by the engine API
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("No property '{property}' on {entity_type} '{entity_id}'")]
    UnknownTarget {
        entity_type: EntityType,
        entity_id: String,
        property: String,
    },

    #[error("Engine not running")]
    NotRunning,

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result of a host-initiated property write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyUpdate {
    /// `None` when the value was already stored
    pub change: Option<PropertyChange>,
    /// Walks run by `Event_OnPropertyChanged` listeners
    pub walks: Vec<WalkReport>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Script Engine
// ─────────────────────────────────────────────────────────────────────────────

pub struct ScriptEngine {
    world: World,
    rng: StdRng,
    walker: Walker,
    config: Arc<EngineConfig>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl ScriptEngine {
    /// Engine with the built-in handlers
    pub fn new(world: World, library: GraphLibrary, host: Arc<dyn Host>, config: EngineConfig) -> Self {
        Self::with_registry(world, library, HandlerRegistry::with_builtins(), host, config)
    }

    pub fn with_registry(
        world: World,
        library: GraphLibrary,
        registry: HandlerRegistry,
        host: Arc<dyn Host>,
        config: EngineConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = Arc::new(config);
        let walker = Walker::new(
            Arc::new(registry),
            Arc::new(library),
            Arc::clone(&config),
            host,
            shutdown_rx,
        );

        tracing::debug!(
            graphs = walker.library().len(),
            handlers = walker.registry().len(),
            seeded = config.rng_seed.is_some(),
            "Script engine created"
        );

        Self {
            world,
            rng,
            walker,
            config,
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn library(&self) -> &GraphLibrary {
        self.walker.library()
    }

    /// Run every graph owned by `(owner_type, owner_id)` that has an entry
    /// node for `event_tag`
    pub async fn trigger_by_name(&mut self, owner_type: &str, owner_id: &str, event_tag: &str) -> TriggerReport {
        self.walker
            .trigger_by_name(&mut self.world, &mut self.rng, owner_type, owner_id, event_tag, 0)
            .await
    }

    /// Run one node as a throwaway one-node graph
    pub async fn execute_single_node(&mut self, node: Node) -> WalkReport {
        self.walker.execute_single_node(&mut self.world, &mut self.rng, node).await
    }

    /// Write a property through the accessor and fan the change out
    pub async fn set_property(
        &mut self,
        entity_type: &str,
        entity_id: &str,
        property: &str,
        value: Value,
    ) -> EngineResult<PropertyUpdate> {
        let parsed = parse_entity_type(entity_type)?;
        match accessor::apply_change(&mut self.world, parsed, entity_id, property, &value) {
            ChangeOutcome::Unmatched => Err(EngineError::UnknownTarget {
                entity_type: parsed,
                entity_id: entity_id.to_string(),
                property: property.to_string(),
            }),
            ChangeOutcome::Unchanged => Ok(PropertyUpdate {
                change: None,
                walks: Vec::new(),
            }),
            ChangeOutcome::Changed(change) => {
                let walks = self
                    .walker
                    .property_changed(&mut self.world, &mut self.rng, &change, 0)
                    .await;
                Ok(PropertyUpdate {
                    change: Some(change),
                    walks,
                })
            }
        }
    }

    pub fn get_property(&self, entity_type: &str, entity_id: &str, property: &str) -> EngineResult<Value> {
        let parsed = parse_entity_type(entity_type)?;
        accessor::get(&self.world, parsed, entity_id, property).ok_or_else(|| EngineError::UnknownTarget {
            entity_type: parsed,
            entity_id: entity_id.to_string(),
            property: property.to_string(),
        })
    }

    /// End the current turn: tick modifiers and combat, then fire
    /// `Event_OnTurnEnd` for every owner
    pub async fn advance_turn(&mut self) -> TriggerReport {
        let world = &mut self.world;
        world.game.turn = world.game.turn.saturating_add(1);
        for modifier in &mut world.modifiers {
            modifier.remaining_turns = modifier.remaining_turns.saturating_sub(1);
        }
        world.modifiers.retain(|m| m.remaining_turns > 0);
        if let Some(combat) = world.combat.as_mut() {
            combat.round = combat.round.saturating_add(1);
        }
        tracing::debug!(turn = world.game.turn, "Turn advanced");

        self.walker
            .trigger_for_all_owners(&mut self.world, &mut self.rng, NodeType::EventOnTurnEnd.tag(), 0)
            .await
    }

    /// Move the engine into its own task
    ///
    /// The join handle yields the final world once the engine stops.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<World>) {
        let (command_tx, command_rx) = mpsc::channel(self.config.command_queue_capacity.max(1));
        let state = Arc::new(std::sync::atomic::AtomicU8::new(EngineState::Starting as u8));
        let handle = EngineHandle::new(command_tx, Arc::clone(&state), Arc::clone(&self.shutdown_tx));
        let join_handle = tokio::spawn(actor::run_engine_loop(self, command_rx, state));
        (handle, join_handle)
    }
}

fn parse_entity_type(name: &str) -> EngineResult<EntityType> {
    EntityType::parse(name).ok_or_else(|| EngineError::UnknownEntityType(name.to_string()))
}
