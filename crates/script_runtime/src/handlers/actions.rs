// Action handlers - mutate the world and/or call back into the host
//
// Actions continue on "Exec" unless they select one of their alternate
// ports (OnDeath, PlayerDied, NotEnough, OnInsufficient). A missing argument
// or an unknown entity makes the action a no-op.

use script_types::{ActiveCombat, ActiveModifier, Node, NodeType, QuestState, Value, ports};

use super::{arg, entity_target};
use crate::accessor::{self, ChangeOutcome};
use crate::context::{ExecutionContext, NodeOutput, SideEffect};
use crate::host::HostEvent;
use crate::registry::HandlerRegistry;

pub(super) fn register(registry: &mut HandlerRegistry) {
    // Host callbacks
    registry.register_fn(NodeType::ActionShowMessage, show_message);
    registry.register_fn(NodeType::ActionPlaySound, play_sound);
    registry.register_fn(NodeType::ActionSetRoomMusic, set_room_music);
    registry.register_fn(NodeType::ActionTeleportPlayer, teleport_player);
    registry.register_fn(NodeType::ActionStartConversation, start_conversation);
    registry.register_fn(NodeType::ActionStartCombat, start_combat);
    registry.register_fn(NodeType::ActionEndCombat, end_combat);
    registry.register_fn(NodeType::ActionStartTrade, start_trade);
    registry.register_fn(NodeType::ActionCompleteAdventure, complete_adventure);

    // Inventory & objects
    registry.register_fn(NodeType::ActionGiveItem, give_item);
    registry.register_fn(NodeType::ActionRemoveItem, remove_item);
    registry.register_fn(NodeType::ActionConsumeItem, consume_item);
    registry.register_fn(NodeType::ActionMoveObject, move_object);
    registry.register_fn(NodeType::ActionSetObjectVisible, set_object_visible);
    registry.register_fn(NodeType::ActionSetObjectDescription, set_object_description);

    // Doors
    registry.register_fn(NodeType::ActionOpenDoor, |node, ctx| door(node, ctx, |d| d.is_open = true));
    registry.register_fn(NodeType::ActionCloseDoor, |node, ctx| door(node, ctx, |d| d.is_open = false));
    registry.register_fn(NodeType::ActionLockDoor, |node, ctx| {
        door(node, ctx, |d| {
            d.is_open = false;
            d.is_locked = true;
        })
    });
    registry.register_fn(NodeType::ActionUnlockDoor, |node, ctx| door(node, ctx, |d| d.is_locked = false));
    registry.register_fn(NodeType::ActionSetDoorVisible, |node, ctx| {
        let visible = node.properties.get_bool("Visible", true);
        door(node, ctx, |d| d.is_visible = visible)
    });

    // NPCs
    registry.register_fn(NodeType::ActionMoveNpc, move_npc);
    registry.register_fn(NodeType::ActionSetNpcHostile, set_npc_hostile);
    registry.register_fn(NodeType::ActionDamageNpc, damage_npc);
    registry.register_fn(NodeType::ActionHealNpc, heal_npc);
    registry.register_fn(NodeType::ActionKillNpc, kill_npc);

    // Player
    registry.register_fn(NodeType::ActionDamagePlayer, damage_player);
    registry.register_fn(NodeType::ActionHealPlayer, heal_player);
    registry.register_fn(NodeType::ActionAddGold, add_gold);
    registry.register_fn(NodeType::ActionRemoveGold, remove_gold);
    registry.register_fn(NodeType::ActionAddExperience, add_experience);

    // Quests
    registry.register_fn(NodeType::ActionStartQuest, start_quest);
    registry.register_fn(NodeType::ActionAdvanceQuest, advance_quest);
    registry.register_fn(NodeType::ActionSetQuestStage, set_quest_stage);
    registry.register_fn(NodeType::ActionCompleteQuest, |node, ctx| {
        finish_quest(node, ctx, QuestState::Completed)
    });
    registry.register_fn(NodeType::ActionFailQuest, |node, ctx| finish_quest(node, ctx, QuestState::Failed));

    // Flags, variables & generic properties
    registry.register_fn(NodeType::ActionSetFlag, set_flag);
    registry.register_fn(NodeType::ActionClearFlag, clear_flag);
    registry.register_fn(NodeType::ActionSetVariable, set_variable);
    registry.register_fn(NodeType::ActionIncrementVariable, increment_variable);
    registry.register_fn(NodeType::ActionSetProperty, set_property);

    // Rooms
    registry.register_fn(NodeType::ActionSetRoomDark, set_room_dark);
    registry.register_fn(NodeType::ActionSetRoomDescription, set_room_description);

    // Modifiers, time & scoring
    registry.register_fn(NodeType::ActionAddModifier, add_modifier);
    registry.register_fn(NodeType::ActionRemoveModifier, remove_modifier);
    registry.register_fn(NodeType::ActionAdvanceTime, advance_time);
    registry.register_fn(NodeType::ActionSetWeather, set_weather);
    registry.register_fn(NodeType::ActionAddScore, add_score);

    // Diagnostics & nesting
    registry.register_fn(NodeType::ActionLog, log);
    registry.register_fn(NodeType::ActionTriggerEvent, trigger_event);
}

fn amount(node: &Node, key: &str) -> Option<i64> {
    node.properties.get(key).and_then(Value::coerce_int)
}

// ─────────────────────────────────────────────────────────────────────────────
// Host Callbacks
// ─────────────────────────────────────────────────────────────────────────────

fn show_message(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(text) = arg(node, "Text") {
        ctx.notify(HostEvent::ShowMessage { text });
    }
    NodeOutput::exec()
}

fn play_sound(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(sound_id) = arg(node, "SoundId") {
        ctx.notify(HostEvent::PlaySound { sound_id });
    }
    NodeOutput::exec()
}

fn set_room_music(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(room_id), Some(music_id)) = (arg(node, "RoomId"), arg(node, "MusicId")) else {
        return NodeOutput::exec();
    };
    if let Some(room) = ctx.world.room_mut(&room_id) {
        room.music_id = music_id.clone();
        let room_id = room.id.clone();
        ctx.notify(HostEvent::RoomMusicChanged { room_id, music_id });
    }
    NodeOutput::exec()
}

fn teleport_player(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some(room_id) = arg(node, "RoomId") else {
        return NodeOutput::exec();
    };
    if let Some(room) = ctx.world.room_mut(&room_id) {
        room.is_visited = true;
        let room_id = room.id.clone();
        ctx.world.player.room_id = room_id.clone();
        ctx.notify(HostEvent::PlayerTeleported { room_id });
    }
    NodeOutput::exec()
}

fn start_conversation(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(npc_id) = known_npc(node, ctx) {
        ctx.notify(HostEvent::StartConversation { npc_id });
    }
    NodeOutput::exec()
}

fn start_combat(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some(npc_id) = known_npc(node, ctx) else {
        return NodeOutput::exec();
    };
    if ctx.world.npc(&npc_id).is_some_and(|n| n.is_alive()) {
        ctx.world.combat = Some(ActiveCombat {
            npc_id: npc_id.clone(),
            round: 1,
        });
        ctx.notify(HostEvent::StartCombat { npc_id });
    }
    NodeOutput::exec()
}

fn end_combat(_node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    ctx.world.combat = None;
    NodeOutput::exec()
}

fn start_trade(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(npc_id) = known_npc(node, ctx) {
        ctx.notify(HostEvent::StartTrade { npc_id });
    }
    NodeOutput::exec()
}

fn complete_adventure(_node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    ctx.world.game.is_adventure_completed = true;
    ctx.notify(HostEvent::AdventureCompleted);
    NodeOutput::exec()
}

/// Canonical id of the NPC named by `NpcId`, if it exists
fn known_npc(node: &Node, ctx: &ExecutionContext<'_>) -> Option<String> {
    let id = arg(node, "NpcId")?;
    ctx.world.npc(&id).map(|n| n.id.clone())
}

// ─────────────────────────────────────────────────────────────────────────────
// Inventory & Objects
// ─────────────────────────────────────────────────────────────────────────────

fn give_item(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(id) = arg(node, "ObjectId") {
        if ctx.world.object(&id).is_some() {
            ctx.world.give_item(&id);
        }
    }
    NodeOutput::exec()
}

fn remove_item(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(id) = arg(node, "ObjectId") {
        ctx.world.take_item(&id);
    }
    NodeOutput::exec()
}

fn consume_item(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    match arg(node, "ObjectId") {
        Some(id) if ctx.world.take_item(&id) => NodeOutput::exec(),
        _ => NodeOutput::continue_to(ports::ON_INSUFFICIENT),
    }
}

fn move_object(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(object_id), Some(room_id)) = (arg(node, "ObjectId"), arg(node, "RoomId")) else {
        return NodeOutput::exec();
    };
    let Some(room_id) = ctx.world.room(&room_id).map(|r| r.id.clone()) else {
        return NodeOutput::exec();
    };
    if let Some(obj) = ctx.world.object_mut(&object_id) {
        obj.room_id = room_id;
        let id = obj.id.clone();
        ctx.world.player.remove_item(&id);
    }
    NodeOutput::exec()
}

fn set_object_visible(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let visible = node.properties.get_bool("Visible", true);
    if let Some(obj) = arg(node, "ObjectId").and_then(|id| ctx.world.object_mut(&id)) {
        obj.is_visible = visible;
    }
    NodeOutput::exec()
}

fn set_object_description(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let text = node.properties.get_string("Text", "");
    if let Some(obj) = arg(node, "ObjectId").and_then(|id| ctx.world.object_mut(&id)) {
        obj.description = text;
    }
    NodeOutput::exec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Doors
// ─────────────────────────────────────────────────────────────────────────────

fn door(node: &Node, ctx: &mut ExecutionContext<'_>, apply: impl FnOnce(&mut script_types::Door)) -> NodeOutput {
    if let Some(door) = arg(node, "DoorId").and_then(|id| ctx.world.door_mut(&id)) {
        apply(door);
    }
    NodeOutput::exec()
}

// ─────────────────────────────────────────────────────────────────────────────
// NPCs
// ─────────────────────────────────────────────────────────────────────────────

fn move_npc(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(npc_id), Some(room_id)) = (arg(node, "NpcId"), arg(node, "RoomId")) else {
        return NodeOutput::exec();
    };
    let Some(room_id) = ctx.world.room(&room_id).map(|r| r.id.clone()) else {
        return NodeOutput::exec();
    };
    if let Some(npc) = ctx.world.npc_mut(&npc_id) {
        npc.room_id = room_id;
    }
    NodeOutput::exec()
}

fn set_npc_hostile(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let hostile = node.properties.get_bool("Hostile", true);
    if let Some(npc) = arg(node, "NpcId").and_then(|id| ctx.world.npc_mut(&id)) {
        npc.is_hostile = hostile;
    }
    NodeOutput::exec()
}

fn damage_npc(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(id), Some(amount)) = (arg(node, "NpcId"), amount(node, "Amount")) else {
        return NodeOutput::exec();
    };
    let Some(npc) = ctx.world.npc_mut(&id) else {
        return NodeOutput::exec();
    };
    npc.health = npc.health.saturating_sub(amount.max(0)).max(0);
    if npc.health > 0 {
        return NodeOutput::exec();
    }

    npc.is_corpse = true;
    npc.is_hostile = false;
    let npc_id = npc.id.clone();
    end_combat_with(ctx, &npc_id);
    NodeOutput::continue_to(ports::ON_DEATH)
}

fn heal_npc(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(id), Some(amount)) = (arg(node, "NpcId"), amount(node, "Amount")) else {
        return NodeOutput::exec();
    };
    if let Some(npc) = ctx.world.npc_mut(&id) {
        if !npc.is_corpse {
            npc.health = npc.health.saturating_add(amount.max(0)).min(npc.max_health);
        }
    }
    NodeOutput::exec()
}

fn kill_npc(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some(npc) = arg(node, "NpcId").and_then(|id| ctx.world.npc_mut(&id)) else {
        return NodeOutput::exec();
    };
    npc.health = 0;
    npc.is_corpse = true;
    npc.is_hostile = false;
    let npc_id = npc.id.clone();
    end_combat_with(ctx, &npc_id);
    NodeOutput::exec()
}

/// Combat against a dead NPC is over
fn end_combat_with(ctx: &mut ExecutionContext<'_>, npc_id: &str) {
    if ctx
        .world
        .combat
        .as_ref()
        .is_some_and(|c| c.npc_id.eq_ignore_ascii_case(npc_id))
    {
        ctx.world.combat = None;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Player
// ─────────────────────────────────────────────────────────────────────────────

fn damage_player(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some(amount) = amount(node, "Amount") else {
        return NodeOutput::exec();
    };
    let player = &mut ctx.world.player;
    player.health = player.health.saturating_sub(amount.max(0)).max(0);
    if player.health == 0 {
        NodeOutput::continue_to(ports::PLAYER_DIED)
    } else {
        NodeOutput::exec()
    }
}

fn heal_player(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(amount) = amount(node, "Amount") {
        let player = &mut ctx.world.player;
        player.health = player.health.saturating_add(amount.max(0)).min(player.max_health);
    }
    NodeOutput::exec()
}

fn add_gold(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(amount) = amount(node, "Amount") {
        let player = &mut ctx.world.player;
        player.gold = player.gold.saturating_add(amount).max(0);
    }
    NodeOutput::exec()
}

fn remove_gold(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some(amount) = amount(node, "Amount") else {
        return NodeOutput::exec();
    };
    let player = &mut ctx.world.player;
    if player.gold < amount {
        return NodeOutput::continue_to(ports::NOT_ENOUGH);
    }
    player.gold = player.gold.saturating_sub(amount.max(0));
    NodeOutput::exec()
}

fn add_experience(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(amount) = amount(node, "Amount") {
        let player = &mut ctx.world.player;
        player.experience = player.experience.saturating_add(amount).max(0);
    }
    NodeOutput::exec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Quests
// ─────────────────────────────────────────────────────────────────────────────

fn start_quest(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(id) = arg(node, "QuestId") {
        let quest = ctx.world.quest_entry(&id);
        if quest.state == QuestState::NotStarted {
            quest.state = QuestState::Active;
        }
    }
    NodeOutput::exec()
}

fn advance_quest(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(quest) = arg(node, "QuestId").and_then(|id| ctx.world.quest_mut(&id)) {
        if quest.state == QuestState::Active {
            quest.stage = quest.stage.saturating_add(1);
        }
    }
    NodeOutput::exec()
}

fn set_quest_stage(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(id), Some(stage)) = (arg(node, "QuestId"), amount(node, "Stage")) else {
        return NodeOutput::exec();
    };
    let quest = ctx.world.quest_entry(&id);
    quest.stage = stage;
    if quest.state == QuestState::NotStarted {
        quest.state = QuestState::Active;
    }
    NodeOutput::exec()
}

fn finish_quest(node: &Node, ctx: &mut ExecutionContext<'_>, state: QuestState) -> NodeOutput {
    if let Some(id) = arg(node, "QuestId") {
        ctx.world.quest_entry(&id).state = state;
    }
    NodeOutput::exec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Flags, Variables & Properties
// ─────────────────────────────────────────────────────────────────────────────

fn set_flag(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(flag) = arg(node, "Flag") {
        ctx.world.set_flag(&flag);
    }
    NodeOutput::exec()
}

fn clear_flag(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(flag) = arg(node, "Flag") {
        ctx.world.clear_flag(&flag);
    }
    NodeOutput::exec()
}

fn set_variable(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(name) = arg(node, "Name") {
        ctx.world.set_variable(&name, node.properties.get_value("Value"));
    }
    NodeOutput::exec()
}

/// Integer arithmetic while both sides are integers, float otherwise
fn increment_variable(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some(name) = arg(node, "Name") else {
        return NodeOutput::exec();
    };
    let step = node.properties.get("Amount").cloned().unwrap_or(Value::Int(1));
    let current = ctx.world.variable(&name).cloned().unwrap_or(Value::Int(0));

    let next = match (&current, &step) {
        (Value::Int(a), Value::Int(b)) => Value::Int(a.saturating_add(*b)),
        _ => Value::Float(current.to_float() + step.to_float()),
    };
    ctx.world.set_variable(&name, next);
    NodeOutput::exec()
}

/// Generic write through the property accessor; a real change fans out to
/// Event_OnPropertyChanged listeners
fn set_property(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let Some((entity_type, entity_id, property)) = entity_target(node) else {
        return NodeOutput::exec();
    };
    let value = node.properties.get_value("Value");
    match accessor::apply_change(ctx.world, entity_type, &entity_id, &property, &value) {
        ChangeOutcome::Changed(change) => NodeOutput::exec().with_effect(SideEffect::PropertyChanged(change)),
        ChangeOutcome::Unchanged => NodeOutput::exec(),
        ChangeOutcome::Unmatched => {
            tracing::debug!(
                node_id = %node.id,
                entity_type = %entity_type,
                entity_id = %entity_id,
                property = %property,
                "SetProperty matched nothing"
            );
            NodeOutput::exec()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rooms
// ─────────────────────────────────────────────────────────────────────────────

fn set_room_dark(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let dark = node.properties.get_bool("Dark", true);
    if let Some(room) = arg(node, "RoomId").and_then(|id| ctx.world.room_mut(&id)) {
        room.is_dark = dark;
    }
    NodeOutput::exec()
}

fn set_room_description(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let text = node.properties.get_string("Text", "");
    if let Some(room) = arg(node, "RoomId").and_then(|id| ctx.world.room_mut(&id)) {
        room.description = text;
    }
    NodeOutput::exec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Modifiers, Time & Score
// ─────────────────────────────────────────────────────────────────────────────

/// Re-adding an existing modifier id replaces it
fn add_modifier(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(id), Some(stat)) = (arg(node, "ModifierId"), arg(node, "Stat")) else {
        return NodeOutput::exec();
    };
    let modifier = ActiveModifier {
        id: id.clone(),
        stat,
        amount: node.properties.get_int("Amount", 0),
        remaining_turns: node.properties.get_int("Turns", 1).max(1),
    };
    match ctx.world.modifier_mut(&id) {
        Some(existing) => *existing = modifier,
        None => ctx.world.modifiers.push(modifier),
    }
    NodeOutput::exec()
}

fn remove_modifier(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(id) = arg(node, "ModifierId") {
        ctx.world.modifiers.retain(|m| !m.id.eq_ignore_ascii_case(&id));
    }
    NodeOutput::exec()
}

fn advance_time(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(hours) = amount(node, "Hours") {
        let game = &mut ctx.world.game;
        game.hour = (game.hour.rem_euclid(24) + hours.rem_euclid(24)).rem_euclid(24);
    }
    NodeOutput::exec()
}

fn set_weather(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(weather) = arg(node, "Weather") {
        ctx.world.game.weather = weather;
    }
    NodeOutput::exec()
}

fn add_score(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    if let Some(amount) = amount(node, "Amount") {
        ctx.world.game.score = ctx.world.game.score.saturating_add(amount);
    }
    NodeOutput::exec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Diagnostics & Nesting
// ─────────────────────────────────────────────────────────────────────────────

fn log(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let message = node.properties.get_string("Message", "");
    let level = node.properties.get_string("Level", "info").to_ascii_lowercase();
    let graph_id = ctx.graph.id.as_str();

    match level.as_str() {
        "error" => tracing::error!(target: "script", graph_id, node_id = %node.id, "{}", message),
        "warn" | "warning" => tracing::warn!(target: "script", graph_id, node_id = %node.id, "{}", message),
        "debug" => tracing::debug!(target: "script", graph_id, node_id = %node.id, "{}", message),
        "trace" => tracing::trace!(target: "script", graph_id, node_id = %node.id, "{}", message),
        _ => tracing::info!(target: "script", graph_id, node_id = %node.id, "{}", message),
    }
    NodeOutput::exec()
}

fn trigger_event(node: &Node, _ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let (Some(owner_type), Some(owner_id), Some(event_tag)) =
        (arg(node, "OwnerType"), arg(node, "OwnerId"), arg(node, "EventTag"))
    else {
        return NodeOutput::exec();
    };
    NodeOutput::exec().with_effect(SideEffect::TriggerEvent {
        owner_type,
        owner_id,
        event_tag,
    })
}
