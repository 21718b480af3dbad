// Variable handlers - pure reads that cache (node id, "Value")

use rand::Rng;
use script_types::{Node, NodeType, Value};

use super::{arg, entity_target};
use crate::accessor;
use crate::context::{ExecutionContext, NodeOutput};
use crate::registry::HandlerRegistry;

type Read = fn(&Node, &mut ExecutionContext<'_>) -> Value;

pub(super) fn register(registry: &mut HandlerRegistry) {
    let reads: [(NodeType, Read); 13] = [
        (NodeType::VariableConstant, |node, _| node.properties.get_value("Value")),
        (NodeType::VariableGetVariable, |node, ctx| {
            arg(node, "Name")
                .and_then(|name| ctx.world.variable(&name).cloned())
                .unwrap_or_default()
        }),
        (NodeType::VariableGetFlag, |node, ctx| {
            Value::Bool(arg(node, "Flag").is_some_and(|flag| ctx.world.has_flag(&flag)))
        }),
        (NodeType::VariableGetProperty, get_property),
        (NodeType::VariablePlayerHealth, |_, ctx| Value::Int(ctx.world.player.health)),
        (NodeType::VariablePlayerGold, |_, ctx| Value::Int(ctx.world.player.gold)),
        (NodeType::VariablePlayerRoom, |_, ctx| Value::String(ctx.world.player.room_id.clone())),
        (NodeType::VariableNpcHealth, |node, ctx| {
            arg(node, "NpcId")
                .and_then(|id| ctx.world.npc(&id).map(|n| Value::Int(n.health)))
                .unwrap_or_default()
        }),
        (NodeType::VariableQuestStage, |node, ctx| {
            let stage = arg(node, "QuestId").and_then(|id| ctx.world.quest(&id).map(|q| q.stage));
            Value::Int(stage.unwrap_or(0))
        }),
        (NodeType::VariableTimeOfDay, |_, ctx| Value::Int(ctx.world.game.hour)),
        (NodeType::VariableTurnCount, |_, ctx| Value::Int(ctx.world.game.turn)),
        (NodeType::VariableInventoryCount, |_, ctx| Value::from(ctx.world.player.inventory.len())),
        (NodeType::VariableRandomNumber, random_number),
    ];

    for (node_type, read) in reads {
        registry.register_fn(node_type, move |node, ctx| NodeOutput::value(read(node, ctx)));
    }
}

fn get_property(node: &Node, ctx: &mut ExecutionContext<'_>) -> Value {
    entity_target(node)
        .and_then(|(entity_type, id, property)| accessor::get(ctx.world, entity_type, &id, &property))
        .unwrap_or_default()
}

/// Inclusive on both ends; swapped bounds are tolerated
fn random_number(node: &Node, ctx: &mut ExecutionContext<'_>) -> Value {
    let a = node.properties.get_int("Min", 0);
    let b = node.properties.get_int("Max", 100);
    let (min, max) = if a <= b { (a, b) } else { (b, a) };
    Value::Int(ctx.rng.gen_range(min..=max))
}
