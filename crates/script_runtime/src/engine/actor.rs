//! Engine Task Loop
//!
//! Drains the command queue one command at a time until shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;
use tracing::{debug, info};

use script_types::World;

use super::{EngineCommand, EngineState, ScriptEngine};
use crate::walker::wait_for_shutdown;

/// Run the engine until shutdown; yields the final world
pub(super) async fn run_engine_loop(
    mut engine: ScriptEngine,
    mut command_rx: mpsc::Receiver<EngineCommand>,
    state: Arc<AtomicU8>,
) -> World {
    state.store(EngineState::Running as u8, Ordering::SeqCst);
    info!(graphs = engine.library().len(), "Script engine started");

    let shutdown = wait_for_shutdown(engine.shutdown_tx.subscribe());
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                debug!("Received shutdown signal");
                break;
            }

            command = command_rx.recv() => {
                let Some(command) = command else {
                    debug!("All engine handles dropped");
                    break;
                };
                if !handle_command(&mut engine, command).await {
                    break;
                }
            }
        }
    }

    state.store(EngineState::Stopping as u8, Ordering::SeqCst);
    command_rx.close();
    let world = engine.into_world();
    state.store(EngineState::Stopped as u8, Ordering::SeqCst);
    info!("Script engine stopped");
    world
}

/// Process one command; false means stop
async fn handle_command(engine: &mut ScriptEngine, command: EngineCommand) -> bool {
    match command {
        EngineCommand::Trigger {
            owner_type,
            owner_id,
            event_tag,
            reply,
        } => {
            let report = engine.trigger_by_name(&owner_type, &owner_id, &event_tag).await;
            respond(reply, report);
        }
        EngineCommand::ExecuteNode { node, reply } => {
            let report = engine.execute_single_node(node).await;
            respond(reply, report);
        }
        EngineCommand::SetProperty {
            entity_type,
            entity_id,
            property,
            value,
            reply,
        } => {
            let result = engine.set_property(&entity_type, &entity_id, &property, value).await;
            if let Err(e) = &result {
                debug!(error = %e, "Property write rejected");
            }
            respond(reply, result);
        }
        EngineCommand::GetProperty {
            entity_type,
            entity_id,
            property,
            reply,
        } => {
            let _ = reply.send(engine.get_property(&entity_type, &entity_id, &property));
        }
        EngineCommand::AdvanceTurn { reply } => {
            let report = engine.advance_turn().await;
            respond(reply, report);
        }
        EngineCommand::Snapshot(reply) => {
            let _ = reply.send(engine.world().clone());
        }
        EngineCommand::Shutdown => {
            debug!("Received shutdown command");
            return false;
        }
    }
    true
}

fn respond<T>(reply: Option<tokio::sync::oneshot::Sender<T>>, value: T) {
    if let Some(tx) = reply {
        let _ = tx.send(value);
    }
}
