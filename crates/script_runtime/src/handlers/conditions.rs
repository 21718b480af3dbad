// Condition handlers - pure boolean tests routed to "True" or "False"
//
// A condition never mutates the world and never selects any other port.
// Missing arguments or unknown entities test false.

use std::cmp::Ordering;

use rand::Rng;
use script_types::{Node, NodeType, QuestState, Value, ports};

use super::{arg, entity_target};
use crate::accessor;
use crate::context::{ExecutionContext, NodeOutput};
use crate::registry::HandlerRegistry;

type Test = fn(&Node, &mut ExecutionContext<'_>) -> bool;

pub(super) fn register(registry: &mut HandlerRegistry) {
    let tests: [(NodeType, Test); 31] = [
        (NodeType::ConditionHasItem, has_item),
        (NodeType::ConditionPlayerInRoom, player_in_room),
        (NodeType::ConditionRoomVisited, room_visited),
        (NodeType::ConditionRoomIsDark, room_is_dark),
        (NodeType::ConditionDoorIsOpen, door_is_open),
        (NodeType::ConditionDoorIsLocked, door_is_locked),
        (NodeType::ConditionNpcIsAlive, npc_is_alive),
        (NodeType::ConditionNpcIsHostile, npc_is_hostile),
        (NodeType::ConditionNpcInRoom, npc_in_room),
        (NodeType::ConditionObjectInRoom, object_in_room),
        (NodeType::ConditionObjectIsVisible, object_is_visible),
        (NodeType::ConditionObjectIsOpen, object_is_open),
        (NodeType::ConditionObjectIsLocked, object_is_locked),
        (NodeType::ConditionPlayerHealthAbove, player_health_above),
        (NodeType::ConditionPlayerHealthBelow, player_health_below),
        (NodeType::ConditionPlayerGoldAtLeast, player_gold_at_least),
        (NodeType::ConditionQuestNotStarted, quest_not_started),
        (NodeType::ConditionQuestActive, quest_active),
        (NodeType::ConditionQuestCompleted, quest_completed),
        (NodeType::ConditionQuestStageIs, quest_stage_is),
        (NodeType::ConditionFlagIsSet, flag_is_set),
        (NodeType::ConditionVariableEquals, variable_equals),
        (NodeType::ConditionVariableGreaterThan, variable_greater_than),
        (NodeType::ConditionVariableLessThan, variable_less_than),
        (NodeType::ConditionTimeOfDayBetween, time_of_day_between),
        (NodeType::ConditionIsNight, is_night),
        (NodeType::ConditionInCombat, in_combat),
        (NodeType::ConditionHasModifier, has_modifier),
        (NodeType::ConditionRandomChance, random_chance),
        (NodeType::ConditionPropertyEquals, property_equals),
        (NodeType::ConditionCompareValues, compare_values),
    ];

    for (node_type, test) in tests {
        registry.register_fn(node_type, move |node, ctx| NodeOutput::branch(test(node, ctx)));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player & Rooms
// ─────────────────────────────────────────────────────────────────────────────

fn has_item(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "ObjectId").is_some_and(|id| ctx.world.player.has_item(&id))
}

fn player_in_room(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "RoomId").is_some_and(|id| ctx.world.player.room_id.eq_ignore_ascii_case(&id))
}

fn room_visited(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "RoomId")
        .and_then(|id| ctx.world.room(&id).map(|r| r.is_visited))
        .unwrap_or(false)
}

fn room_is_dark(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "RoomId")
        .and_then(|id| ctx.world.room(&id).map(|r| r.is_dark))
        .unwrap_or(false)
}

fn player_health_above(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    threshold(node, "Value").is_some_and(|v| ctx.world.player.health > v)
}

fn player_health_below(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    threshold(node, "Value").is_some_and(|v| ctx.world.player.health < v)
}

fn player_gold_at_least(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    threshold(node, "Amount").is_some_and(|v| ctx.world.player.gold >= v)
}

fn threshold(node: &Node, key: &str) -> Option<i64> {
    node.properties.get(key).and_then(Value::coerce_int)
}

// ─────────────────────────────────────────────────────────────────────────────
// Doors, NPCs & Objects
// ─────────────────────────────────────────────────────────────────────────────

fn door_is_open(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "DoorId")
        .and_then(|id| ctx.world.door(&id).map(|d| d.is_open))
        .unwrap_or(false)
}

fn door_is_locked(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "DoorId")
        .and_then(|id| ctx.world.door(&id).map(|d| d.is_locked))
        .unwrap_or(false)
}

fn npc_is_alive(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "NpcId")
        .and_then(|id| ctx.world.npc(&id).map(|n| n.is_alive()))
        .unwrap_or(false)
}

fn npc_is_hostile(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "NpcId")
        .and_then(|id| ctx.world.npc(&id).map(|n| n.is_hostile))
        .unwrap_or(false)
}

fn npc_in_room(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    let (Some(npc_id), Some(room_id)) = (arg(node, "NpcId"), arg(node, "RoomId")) else {
        return false;
    };
    ctx.world
        .npc(&npc_id)
        .is_some_and(|n| n.room_id.eq_ignore_ascii_case(&room_id))
}

fn object_in_room(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    let (Some(object_id), Some(room_id)) = (arg(node, "ObjectId"), arg(node, "RoomId")) else {
        return false;
    };
    ctx.world
        .object(&object_id)
        .is_some_and(|o| o.room_id.eq_ignore_ascii_case(&room_id))
}

fn object_is_visible(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "ObjectId")
        .and_then(|id| ctx.world.object(&id).map(|o| o.is_visible))
        .unwrap_or(false)
}

fn object_is_open(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "ObjectId")
        .and_then(|id| ctx.world.object(&id).map(|o| o.is_open))
        .unwrap_or(false)
}

fn object_is_locked(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "ObjectId")
        .and_then(|id| ctx.world.object(&id).map(|o| o.is_locked))
        .unwrap_or(false)
}

// ─────────────────────────────────────────────────────────────────────────────
// Quests
// ─────────────────────────────────────────────────────────────────────────────

fn quest_in_state(node: &Node, ctx: &ExecutionContext<'_>, state: QuestState) -> bool {
    arg(node, "QuestId").is_some_and(|id| ctx.world.quest_state(&id) == state)
}

fn quest_not_started(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    quest_in_state(node, ctx, QuestState::NotStarted)
}

fn quest_active(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    quest_in_state(node, ctx, QuestState::Active)
}

fn quest_completed(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    quest_in_state(node, ctx, QuestState::Completed)
}

fn quest_stage_is(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    let (Some(id), Some(stage)) = (arg(node, "QuestId"), threshold(node, "Stage")) else {
        return false;
    };
    ctx.world.quest(&id).is_some_and(|q| q.stage == stage)
}

// ─────────────────────────────────────────────────────────────────────────────
// Flags & Variables
// ─────────────────────────────────────────────────────────────────────────────

fn flag_is_set(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "Flag").is_some_and(|flag| ctx.world.has_flag(&flag))
}

fn variable_equals(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    variable_vs_value(node, ctx).is_some_and(|(current, expected)| current.loosely_equals(&expected))
}

fn variable_greater_than(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    variable_vs_value(node, ctx)
        .and_then(|(current, expected)| current.compare(&expected))
        .is_some_and(|ord| ord == Ordering::Greater)
}

fn variable_less_than(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    variable_vs_value(node, ctx)
        .and_then(|(current, expected)| current.compare(&expected))
        .is_some_and(|ord| ord == Ordering::Less)
}

fn variable_vs_value(node: &Node, ctx: &ExecutionContext<'_>) -> Option<(Value, Value)> {
    let name = arg(node, "Name")?;
    let current = ctx.world.variable(&name)?.clone();
    let expected = node.properties.get("Value")?.clone();
    Some((current, expected))
}

// ─────────────────────────────────────────────────────────────────────────────
// Time, Combat & Modifiers
// ─────────────────────────────────────────────────────────────────────────────

/// `[From, To)` in hours; wraps past midnight when From > To
fn time_of_day_between(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    let (Some(from), Some(to)) = (threshold(node, "From"), threshold(node, "To")) else {
        return false;
    };
    let hour = ctx.world.game.hour;
    if from <= to {
        hour >= from && hour < to
    } else {
        hour >= from || hour < to
    }
}

fn is_night(_node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    ctx.world.game.is_night()
}

fn in_combat(_node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    ctx.world.combat.is_some()
}

fn has_modifier(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    arg(node, "ModifierId").is_some_and(|id| ctx.world.modifier(&id).is_some())
}

fn random_chance(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    let Some(percent) = node.properties.get("Percent").and_then(Value::coerce_float) else {
        return false;
    };
    ctx.rng.gen_range(0.0..100.0) < percent
}

// ─────────────────────────────────────────────────────────────────────────────
// Generic Comparisons
// ─────────────────────────────────────────────────────────────────────────────

fn property_equals(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    let Some((entity_type, entity_id, property)) = entity_target(node) else {
        return false;
    };
    let Some(expected) = node.properties.get("Value") else {
        return false;
    };
    accessor::get(ctx.world, entity_type, &entity_id, &property)
        .is_some_and(|current| current.loosely_equals(expected))
}

/// Compare a cached output against the `Value` property
fn compare_values(node: &Node, ctx: &mut ExecutionContext<'_>) -> bool {
    let Some(source) = arg(node, "SourceNodeId") else {
        return false;
    };
    let port = arg(node, "SourcePort").unwrap_or_else(|| ports::VALUE.to_string());
    let Some(left) = ctx.output(&source, &port).cloned() else {
        return false;
    };
    let right = node.properties.get_value("Value");
    let operator = arg(node, "Operator").unwrap_or_else(|| "==".to_string());
    apply_operator(&operator, &left, &right)
}

fn apply_operator(operator: &str, left: &Value, right: &Value) -> bool {
    let ordering = || left.compare(right);
    match operator.to_ascii_lowercase().as_str() {
        "==" | "=" | "eq" | "equals" => left.loosely_equals(right),
        "!=" | "<>" | "ne" | "notequals" => !left.loosely_equals(right),
        ">" | "gt" | "greaterthan" => ordering() == Some(Ordering::Greater),
        ">=" | "ge" | "greaterorequal" => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        "<" | "lt" | "lessthan" => ordering() == Some(Ordering::Less),
        "<=" | "le" | "lessorequal" => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run, run_with_host, world};
    use super::*;
    use crate::host::RecordingHost;
    use script_types::{ActiveCombat, NodeCategory};

    fn test(node: Node, world: &mut script_types::World) -> bool {
        let (out, _) = run(&node, world);
        match out.selected_port() {
            Some("True") => true,
            Some("False") => false,
            other => panic!("condition selected {:?}", other),
        }
    }

    #[test]
    fn test_has_item() {
        let mut world = world();
        let node = Node::new("c", NodeType::ConditionHasItem).prop("ObjectId", "sword_01");
        assert!(!test(node.clone(), &mut world));
        world.give_item("sword_01");
        assert!(test(node, &mut world));
    }

    #[test]
    fn test_every_condition_routes_true_or_false_without_mutation() {
        // Bare nodes: every argument missing
        for node_type in NodeType::ALL.iter().copied() {
            if node_type.category() != NodeCategory::Condition {
                continue;
            }
            let mut world = world();
            let before = world.clone();
            let (out, host) = run(&Node::new("c", node_type), &mut world);
            let port = out.selected_port().unwrap();
            assert!(port == "True" || port == "False", "{} selected {}", node_type, port);
            assert_eq!(world, before, "{} mutated the world", node_type);
            assert!(host.events().is_empty());
        }
    }

    #[test]
    fn test_missing_arguments_route_false() {
        let mut world = world();
        assert!(!test(Node::new("c", NodeType::ConditionNpcIsAlive), &mut world));
        assert!(!test(
            Node::new("c", NodeType::ConditionNpcIsAlive).prop("NpcId", "ghost"),
            &mut world
        ));
        assert!(test(
            Node::new("c", NodeType::ConditionNpcIsAlive).prop("NpcId", "NPC_GUARD"),
            &mut world
        ));
    }

    #[test]
    fn test_entity_conditions() {
        let mut world = world();
        assert!(test(Node::new("c", NodeType::ConditionRoomIsDark).prop("RoomId", "cellar"), &mut world));
        assert!(test(Node::new("c", NodeType::ConditionRoomVisited).prop("RoomId", "hall"), &mut world));
        assert!(test(Node::new("c", NodeType::ConditionDoorIsLocked).prop("DoorId", "gate"), &mut world));
        assert!(!test(Node::new("c", NodeType::ConditionDoorIsOpen).prop("DoorId", "gate"), &mut world));
        assert!(test(
            Node::new("c", NodeType::ConditionNpcInRoom).prop("NpcId", "npc_guard").prop("RoomId", "Hall"),
            &mut world
        ));
        assert!(test(
            Node::new("c", NodeType::ConditionObjectInRoom).prop("ObjectId", "sword_01").prop("RoomId", "hall"),
            &mut world
        ));
        assert!(test(Node::new("c", NodeType::ConditionPlayerInRoom).prop("RoomId", "hall"), &mut world));
    }

    #[test]
    fn test_thresholds() {
        let mut world = world();
        let above = |v: &str| Node::new("c", NodeType::ConditionPlayerHealthAbove).prop("Value", v);
        assert!(test(above("49"), &mut world));
        assert!(!test(above("50"), &mut world));
        assert!(!test(above("lots"), &mut world));
        assert!(test(Node::new("c", NodeType::ConditionPlayerGoldAtLeast).prop("Amount", 10), &mut world));
        assert!(test(Node::new("c", NodeType::ConditionPlayerHealthBelow).prop("Value", 51), &mut world));
    }

    #[test]
    fn test_quests() {
        let mut world = world();
        let quest = |t| Node::new("c", t).prop("QuestId", "q_main");
        assert!(test(quest(NodeType::ConditionQuestActive), &mut world));
        assert!(!test(quest(NodeType::ConditionQuestCompleted), &mut world));
        assert!(test(quest(NodeType::ConditionQuestStageIs).prop("Stage", "2"), &mut world));
        assert!(test(
            Node::new("c", NodeType::ConditionQuestNotStarted).prop("QuestId", "q_side"),
            &mut world
        ));
    }

    #[test]
    fn test_variables() {
        let mut world = world();
        world.set_variable("Count", Value::Int(3));
        let var = |t| Node::new("c", t).prop("Name", "count");
        assert!(test(var(NodeType::ConditionVariableEquals).prop("Value", "3"), &mut world));
        assert!(test(var(NodeType::ConditionVariableGreaterThan).prop("Value", 2), &mut world));
        assert!(!test(var(NodeType::ConditionVariableLessThan).prop("Value", 2), &mut world));
        assert!(!test(
            Node::new("c", NodeType::ConditionVariableEquals).prop("Name", "unset").prop("Value", 0),
            &mut world
        ));
    }

    #[test]
    fn test_time_of_day_wraps_midnight() {
        let mut world = world();
        let between = || Node::new("c", NodeType::ConditionTimeOfDayBetween).prop("From", 22).prop("To", 4);
        world.game.hour = 23;
        assert!(test(between(), &mut world));
        world.game.hour = 2;
        assert!(test(between(), &mut world));
        world.game.hour = 12;
        assert!(!test(between(), &mut world));
        assert!(!test(Node::new("c", NodeType::ConditionIsNight), &mut world));
    }

    #[test]
    fn test_combat_and_chance() {
        let mut world = world();
        assert!(!test(Node::new("c", NodeType::ConditionInCombat), &mut world));
        world.combat = Some(ActiveCombat { npc_id: "npc_guard".into(), round: 1 });
        assert!(test(Node::new("c", NodeType::ConditionInCombat), &mut world));

        assert!(test(Node::new("c", NodeType::ConditionRandomChance).prop("Percent", 100), &mut world));
        assert!(!test(Node::new("c", NodeType::ConditionRandomChance).prop("Percent", 0), &mut world));
    }

    #[test]
    fn test_property_equals() {
        let mut world = world();
        let node = Node::new("c", NodeType::ConditionPropertyEquals)
            .prop("EntityType", "Npc")
            .prop("EntityId", "npc_guard")
            .prop("PropertyName", "isHostile")
            .prop("Value", "true");
        assert!(test(node, &mut world));
        let player = Node::new("c", NodeType::ConditionPropertyEquals)
            .prop("EntityType", "Player")
            .prop("PropertyName", "Gold")
            .prop("Value", 10);
        assert!(test(player, &mut world));
    }

    #[test]
    fn test_compare_values_reads_output_cache() {
        use rand::SeedableRng;
        use std::sync::Arc;

        let mut world = world();
        let node = Node::new("cmp", NodeType::ConditionCompareValues)
            .prop("SourceNodeId", "gold")
            .prop("Operator", ">=")
            .prop("Value", 5);

        // Nothing cached yet
        let out = run_with_host(&node, &mut world, RecordingHost::new_shared());
        assert_eq!(out.selected_port(), Some("False"));

        let registry = crate::registry::HandlerRegistry::with_builtins();
        let graph = Arc::new(script_types::ScriptGraph::single(node.clone()));
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut ctx = ExecutionContext::new(graph, &mut world, &mut rng, RecordingHost::new_shared());
        ctx.set_output("gold", "Value", Value::Int(10));
        let out = registry.handler_for(&node).unwrap().handle(&node, &mut ctx);
        assert_eq!(out.selected_port(), Some("True"));
    }

    #[test]
    fn test_operators() {
        let three = Value::Int(3);
        assert!(apply_operator("!=", &three, &Value::from("4")));
        assert!(apply_operator("lt", &three, &Value::Float(3.5)));
        assert!(apply_operator("<=", &three, &Value::Int(3)));
        assert!(!apply_operator("??", &three, &three));
    }
}
