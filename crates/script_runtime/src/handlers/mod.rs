//! Built-in Node Handlers
//!
//! One module per handler family. Every handler treats missing or
//! unresolvable properties as "nothing to do": actions become no-ops that
//! continue on "Exec", conditions route "False".

mod actions;
mod conditions;
mod dialogue;
mod events;
mod flow;
mod variables;

use script_types::Node;

use crate::accessor::EntityType;
use crate::registry::HandlerRegistry;

/// Register all built-in handlers
pub(crate) fn register_builtin_handlers(registry: &mut HandlerRegistry) {
    events::register(registry);
    conditions::register(registry);
    actions::register(registry);
    flow::register(registry);
    variables::register(registry);
    dialogue::register(registry);
}

/// Non-blank string property
fn arg(node: &Node, key: &str) -> Option<String> {
    node.properties.get_str_opt(key)
}

/// `(EntityType, EntityId, PropertyName)`; the id may be blank for singletons
fn entity_target(node: &Node) -> Option<(EntityType, String, String)> {
    let entity_type = EntityType::parse(&arg(node, "EntityType")?)?;
    let entity_id = arg(node, "EntityId").unwrap_or_default();
    if entity_id.is_empty() && !entity_type.is_singleton() {
        return None;
    }
    let property = arg(node, "PropertyName")?;
    Some((entity_type, entity_id, property))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use script_types::{
        Door, GameObject, Node, Npc, Player, Quest, QuestState, Room, ScriptGraph, World,
    };

    use crate::context::{ExecutionContext, NodeOutput};
    use crate::host::RecordingHost;
    use crate::registry::HandlerRegistry;

    /// Small world shared by the handler tests
    pub fn world() -> World {
        World {
            rooms: vec![
                Room { id: "hall".into(), name: "Hall".into(), is_visited: true, ..Room::default() },
                Room { id: "cellar".into(), name: "Cellar".into(), is_dark: true, ..Room::default() },
            ],
            doors: vec![Door { id: "gate".into(), is_locked: true, ..Door::default() }],
            npcs: vec![Npc {
                id: "npc_guard".into(),
                name: "Guard".into(),
                room_id: "hall".into(),
                health: 10,
                max_health: 10,
                is_hostile: true,
                ..Npc::default()
            }],
            objects: vec![
                GameObject { id: "sword_01".into(), name: "Sword".into(), room_id: "hall".into(), ..GameObject::default() },
                GameObject { id: "potion".into(), name: "Potion".into(), ..GameObject::default() },
            ],
            player: Player {
                room_id: "hall".into(),
                gold: 10,
                health: 50,
                inventory: vec!["potion".into()],
                ..Player::default()
            },
            quests: vec![Quest { id: "q_main".into(), state: QuestState::Active, stage: 2, ..Quest::default() }],
            ..World::default()
        }
    }

    /// Run one node through the built-in handler for its type
    pub fn run(node: &Node, world: &mut World) -> (NodeOutput, Arc<RecordingHost>) {
        let host = RecordingHost::new_shared();
        let output = run_with_host(node, world, host.clone());
        (output, host)
    }

    pub fn run_with_host(node: &Node, world: &mut World, host: Arc<RecordingHost>) -> NodeOutput {
        let registry = HandlerRegistry::with_builtins();
        let graph = Arc::new(ScriptGraph::single(node.clone()));
        let mut rng = StdRng::seed_from_u64(42);
        let mut ctx = ExecutionContext::new(graph, world, &mut rng, host);
        let handler = registry.handler_for(node).expect("built-in handler");
        handler.handle(node, &mut ctx)
    }
}
