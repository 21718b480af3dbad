// Property Accessor - Generic get/set over world entities
//
// Resolves (entity type, entity id) to a world entity and reads or writes one
// named property. Player and Game are singletons; their id is ignored.
// Writes coerce with the total `Value::to_*` conversions and clamp where the
// property table says so. Nothing here triggers fan-out.

use std::fmt;

use serde::{Deserialize, Serialize};

use script_types::{Value, ValueKind, World};

// ─────────────────────────────────────────────────────────────────────────────
// Entity Type
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Room,
    Door,
    Npc,
    Object,
    Player,
    Game,
}

impl EntityType {
    pub const ALL: [EntityType; 6] = [
        EntityType::Room,
        EntityType::Door,
        EntityType::Npc,
        EntityType::Object,
        EntityType::Player,
        EntityType::Game,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityType::Room => "Room",
            EntityType::Door => "Door",
            EntityType::Npc => "Npc",
            EntityType::Object => "Object",
            EntityType::Player => "Player",
            EntityType::Game => "Game",
        }
    }

    /// Case-insensitive; `Item` is accepted for `Object`
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.eq_ignore_ascii_case("item") {
            return Some(EntityType::Object);
        }
        Self::ALL.into_iter().find(|t| t.name().eq_ignore_ascii_case(name))
    }

    pub fn is_singleton(self) -> bool {
        matches!(self, EntityType::Player | EntityType::Game)
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Advisory Property List
// ─────────────────────────────────────────────────────────────────────────────

/// A property authoring tools may offer for an entity type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub kind: ValueKind,
}

const fn prop(name: &'static str, kind: ValueKind) -> PropertyDescriptor {
    PropertyDescriptor { name, kind }
}

use ValueKind::{Bool as B, Float as F, Int as I, String as S};

const ROOM_PROPERTIES: &[PropertyDescriptor] = &[
    prop("Name", S),
    prop("Description", S),
    prop("IsDark", B),
    prop("IsVisited", B),
    prop("MusicId", S),
];

const DOOR_PROPERTIES: &[PropertyDescriptor] = &[
    prop("Name", S),
    prop("IsOpen", B),
    prop("IsLocked", B),
    prop("IsVisible", B),
    prop("KeyObjectId", S),
];

const NPC_PROPERTIES: &[PropertyDescriptor] = &[
    prop("Name", S),
    prop("Description", S),
    prop("RoomId", S),
    prop("Health", I),
    prop("MaxHealth", I),
    prop("IsHostile", B),
    prop("IsCorpse", B),
    prop("IsVisible", B),
    prop("Gold", I),
    prop("Greeting", S),
];

const OBJECT_PROPERTIES: &[PropertyDescriptor] = &[
    prop("Name", S),
    prop("Description", S),
    prop("RoomId", S),
    prop("IsVisible", B),
    prop("IsTakeable", B),
    prop("IsOpen", B),
    prop("IsLocked", B),
    prop("Value", I),
    prop("Weight", F),
];

const PLAYER_PROPERTIES: &[PropertyDescriptor] = &[
    prop("Name", S),
    prop("Health", I),
    prop("MaxHealth", I),
    prop("Gold", I),
    prop("Experience", I),
    prop("RoomId", S),
];

const GAME_PROPERTIES: &[PropertyDescriptor] = &[
    prop("Turn", I),
    prop("Hour", I),
    prop("Weather", S),
    prop("IsAdventureCompleted", B),
    prop("Score", I),
];

/// Advisory list of properties for an entity type
///
/// This is a hint for editors. `get`/`set` below are the source of truth.
pub fn accessible_properties(entity_type: EntityType) -> &'static [PropertyDescriptor] {
    match entity_type {
        EntityType::Room => ROOM_PROPERTIES,
        EntityType::Door => DOOR_PROPERTIES,
        EntityType::Npc => NPC_PROPERTIES,
        EntityType::Object => OBJECT_PROPERTIES,
        EntityType::Player => PLAYER_PROPERTIES,
        EntityType::Game => GAME_PROPERTIES,
    }
}

/// Canonical spelling of a listed property
pub fn canonical_property(entity_type: EntityType, property: &str) -> Option<&'static str> {
    accessible_properties(entity_type)
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(property.trim()))
        .map(|p| p.name)
}

// ─────────────────────────────────────────────────────────────────────────────
// Get
// ─────────────────────────────────────────────────────────────────────────────

/// Read a property; `None` when the entity or the property is unknown
pub fn get(world: &World, entity_type: EntityType, entity_id: &str, property: &str) -> Option<Value> {
    let property = property.trim().to_ascii_lowercase();
    let value = match entity_type {
        EntityType::Room => {
            let room = world.room(entity_id)?;
            match property.as_str() {
                "name" => Value::from(room.name.as_str()),
                "description" => Value::from(room.description.as_str()),
                "isdark" => Value::from(room.is_dark),
                "isvisited" => Value::from(room.is_visited),
                "musicid" => Value::from(room.music_id.as_str()),
                _ => return None,
            }
        }
        EntityType::Door => {
            let door = world.door(entity_id)?;
            match property.as_str() {
                "name" => Value::from(door.name.as_str()),
                "isopen" => Value::from(door.is_open),
                "islocked" => Value::from(door.is_locked),
                "isvisible" => Value::from(door.is_visible),
                "keyobjectid" => Value::from(door.key_object_id.as_str()),
                _ => return None,
            }
        }
        EntityType::Npc => {
            let npc = world.npc(entity_id)?;
            match property.as_str() {
                "name" => Value::from(npc.name.as_str()),
                "description" => Value::from(npc.description.as_str()),
                "roomid" => Value::from(npc.room_id.as_str()),
                "health" => Value::from(npc.health),
                "maxhealth" => Value::from(npc.max_health),
                "ishostile" => Value::from(npc.is_hostile),
                "iscorpse" => Value::from(npc.is_corpse),
                "isvisible" => Value::from(npc.is_visible),
                "gold" => Value::from(npc.gold),
                "greeting" => Value::from(npc.greeting.as_str()),
                _ => return None,
            }
        }
        EntityType::Object => {
            let obj = world.object(entity_id)?;
            match property.as_str() {
                "name" => Value::from(obj.name.as_str()),
                "description" => Value::from(obj.description.as_str()),
                "roomid" => Value::from(obj.room_id.as_str()),
                "isvisible" => Value::from(obj.is_visible),
                "istakeable" => Value::from(obj.is_takeable),
                "isopen" => Value::from(obj.is_open),
                "islocked" => Value::from(obj.is_locked),
                "value" => Value::from(obj.value),
                "weight" => Value::from(obj.weight),
                _ => return None,
            }
        }
        EntityType::Player => {
            let player = &world.player;
            match property.as_str() {
                "name" => Value::from(player.name.as_str()),
                "health" => Value::from(player.health),
                "maxhealth" => Value::from(player.max_health),
                "gold" => Value::from(player.gold),
                "experience" => Value::from(player.experience),
                "roomid" => Value::from(player.room_id.as_str()),
                _ => return None,
            }
        }
        EntityType::Game => {
            let game = &world.game;
            match property.as_str() {
                "turn" => Value::from(game.turn),
                "hour" => Value::from(game.hour),
                "weather" => Value::from(game.weather.as_str()),
                "isadventurecompleted" => Value::from(game.is_adventure_completed),
                "score" => Value::from(game.score),
                _ => return None,
            }
        }
    };
    Some(value)
}

// ─────────────────────────────────────────────────────────────────────────────
// Set
// ─────────────────────────────────────────────────────────────────────────────

/// Write a property; returns whether a known property on an existing entity
/// was matched (not whether the value changed)
pub fn set(world: &mut World, entity_type: EntityType, entity_id: &str, property: &str, value: &Value) -> bool {
    let property = property.trim().to_ascii_lowercase();
    match entity_type {
        EntityType::Room => {
            let Some(room) = world.room_mut(entity_id) else {
                return false;
            };
            match property.as_str() {
                "name" => room.name = value.to_text(),
                "description" => room.description = value.to_text(),
                "isdark" => room.is_dark = value.to_bool(),
                "isvisited" => room.is_visited = value.to_bool(),
                "musicid" => room.music_id = value.to_text(),
                _ => return false,
            }
        }
        EntityType::Door => {
            let Some(door) = world.door_mut(entity_id) else {
                return false;
            };
            match property.as_str() {
                "name" => door.name = value.to_text(),
                "isopen" => door.is_open = value.to_bool(),
                "islocked" => door.is_locked = value.to_bool(),
                "isvisible" => door.is_visible = value.to_bool(),
                "keyobjectid" => door.key_object_id = value.to_text(),
                _ => return false,
            }
        }
        EntityType::Npc => {
            let Some(npc) = world.npc_mut(entity_id) else {
                return false;
            };
            match property.as_str() {
                "name" => npc.name = value.to_text(),
                "description" => npc.description = value.to_text(),
                "roomid" => npc.room_id = value.to_text(),
                "health" => npc.health = value.to_int().clamp(0, npc.max_health.max(0)),
                "maxhealth" => {
                    npc.max_health = value.to_int().max(1);
                    npc.health = npc.health.min(npc.max_health);
                }
                "ishostile" => npc.is_hostile = value.to_bool(),
                "iscorpse" => npc.is_corpse = value.to_bool(),
                "isvisible" => npc.is_visible = value.to_bool(),
                "gold" => npc.gold = value.to_int().max(0),
                "greeting" => npc.greeting = value.to_text(),
                _ => return false,
            }
        }
        EntityType::Object => {
            let Some(obj) = world.object_mut(entity_id) else {
                return false;
            };
            match property.as_str() {
                "name" => obj.name = value.to_text(),
                "description" => obj.description = value.to_text(),
                "roomid" => obj.room_id = value.to_text(),
                "isvisible" => obj.is_visible = value.to_bool(),
                "istakeable" => obj.is_takeable = value.to_bool(),
                "isopen" => obj.is_open = value.to_bool(),
                "islocked" => obj.is_locked = value.to_bool(),
                "value" => obj.value = value.to_int().max(0),
                "weight" => obj.weight = value.to_float().max(0.0),
                _ => return false,
            }
        }
        EntityType::Player => {
            let player = &mut world.player;
            match property.as_str() {
                "name" => player.name = value.to_text(),
                "health" => player.health = value.to_int().clamp(0, player.max_health.max(0)),
                "maxhealth" => {
                    player.max_health = value.to_int().max(1);
                    player.health = player.health.min(player.max_health);
                }
                "gold" => player.gold = value.to_int().max(0),
                "experience" => player.experience = value.to_int().max(0),
                "roomid" => player.room_id = value.to_text(),
                _ => return false,
            }
        }
        EntityType::Game => {
            let game = &mut world.game;
            match property.as_str() {
                "turn" => game.turn = value.to_int().max(0),
                "hour" => game.hour = value.to_int().rem_euclid(24),
                "weather" => game.weather = value.to_text(),
                "isadventurecompleted" => game.is_adventure_completed = value.to_bool(),
                "score" => game.score = value.to_int(),
                _ => return false,
            }
        }
    }
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Change Tracking
// ─────────────────────────────────────────────────────────────────────────────

/// A property write that actually changed the stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub property: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// Outcome of `apply_change`
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    /// Entity or property unknown; nothing written
    Unmatched,
    /// Written, but the stored value is the same as before
    Unchanged,
    Changed(PropertyChange),
}

/// get → set → get; reports a change only when the stored value differs
pub fn apply_change(
    world: &mut World,
    entity_type: EntityType,
    entity_id: &str,
    property: &str,
    value: &Value,
) -> ChangeOutcome {
    let Some(old_value) = get(world, entity_type, entity_id, property) else {
        return ChangeOutcome::Unmatched;
    };
    if !set(world, entity_type, entity_id, property, value) {
        return ChangeOutcome::Unmatched;
    }
    let new_value = get(world, entity_type, entity_id, property).unwrap_or_default();
    if old_value == new_value {
        return ChangeOutcome::Unchanged;
    }

    ChangeOutcome::Changed(PropertyChange {
        entity_type,
        entity_id: canonical_entity_id(world, entity_type, entity_id),
        property: canonical_property(entity_type, property)
            .map(str::to_string)
            .unwrap_or_else(|| property.trim().to_string()),
        old_value,
        new_value,
    })
}

fn canonical_entity_id(world: &World, entity_type: EntityType, entity_id: &str) -> String {
    let found = match entity_type {
        EntityType::Room => world.room(entity_id).map(|e| e.id.clone()),
        EntityType::Door => world.door(entity_id).map(|e| e.id.clone()),
        EntityType::Npc => world.npc(entity_id).map(|e| e.id.clone()),
        EntityType::Object => world.object(entity_id).map(|e| e.id.clone()),
        EntityType::Player | EntityType::Game => None,
    };
    found.unwrap_or_else(|| entity_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use script_types::{Door, GameObject, Npc, Room};

    fn world() -> World {
        World {
            rooms: vec![Room { id: "hall".into(), ..Room::default() }],
            doors: vec![Door { id: "gate".into(), ..Door::default() }],
            npcs: vec![Npc { id: "npc_guard".into(), health: 10, max_health: 20, ..Npc::default() }],
            objects: vec![GameObject { id: "sword_01".into(), ..GameObject::default() }],
            ..World::default()
        }
    }

    fn entity_id(entity_type: EntityType) -> &'static str {
        match entity_type {
            EntityType::Room => "hall",
            EntityType::Door => "gate",
            EntityType::Npc => "npc_guard",
            EntityType::Object => "sword_01",
            EntityType::Player | EntityType::Game => "",
        }
    }

    fn sample_value(name: &str, kind: ValueKind) -> Value {
        match kind {
            ValueKind::Bool => Value::Bool(true),
            ValueKind::Int if name == "Hour" => Value::Int(13),
            ValueKind::Int => Value::Int(5),
            ValueKind::Float => Value::Float(2.5),
            ValueKind::String => Value::from(format!("new {}", name)),
        }
    }

    #[test]
    fn test_round_trip_every_listed_property() {
        for entity_type in EntityType::ALL {
            for descriptor in accessible_properties(entity_type) {
                let mut world = world();
                let id = entity_id(entity_type);
                let value = sample_value(descriptor.name, descriptor.kind);

                assert!(
                    set(&mut world, entity_type, id, descriptor.name, &value),
                    "{}.{} not settable",
                    entity_type,
                    descriptor.name
                );
                let read = get(&world, entity_type, id, descriptor.name).unwrap();
                assert_eq!(read, value, "{}.{} round trip", entity_type, descriptor.name);
                assert_eq!(read.kind(), Some(descriptor.kind));
            }
        }
    }

    #[test]
    fn test_advisory_list_agrees_with_accessor() {
        for entity_type in EntityType::ALL {
            let world = world();
            let id = entity_id(entity_type);
            for descriptor in accessible_properties(entity_type) {
                assert!(get(&world, entity_type, id, descriptor.name).is_some());
            }
            // Nothing outside the list is readable
            assert!(get(&world, entity_type, id, "NotAProperty").is_none());
        }
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let mut world = world();
        assert_eq!(EntityType::parse("item"), Some(EntityType::Object));
        assert_eq!(EntityType::parse("NPC"), Some(EntityType::Npc));
        assert_eq!(EntityType::parse("Ghost"), None);
        assert!(set(&mut world, EntityType::Room, "HALL", "isdark", &Value::from("true")));
        assert_eq!(get(&world, EntityType::Room, "hall", "IsDark"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_unknown_entity_or_property() {
        let mut world = world();
        assert!(get(&world, EntityType::Npc, "nobody", "Health").is_none());
        assert!(!set(&mut world, EntityType::Npc, "nobody", "Health", &Value::Int(1)));
        assert!(!set(&mut world, EntityType::Npc, "npc_guard", "Mood", &Value::Int(1)));
    }

    #[test]
    fn test_clamping() {
        let mut world = world();
        set(&mut world, EntityType::Npc, "npc_guard", "Health", &Value::Int(99));
        assert_eq!(world.npcs[0].health, 20);
        set(&mut world, EntityType::Npc, "npc_guard", "MaxHealth", &Value::Int(4));
        assert_eq!(world.npcs[0].health, 4);
        set(&mut world, EntityType::Npc, "npc_guard", "MaxHealth", &Value::Int(-3));
        assert_eq!(world.npcs[0].max_health, 1);
        set(&mut world, EntityType::Player, "", "Gold", &Value::Int(-5));
        assert_eq!(world.player.gold, 0);
        set(&mut world, EntityType::Game, "", "Hour", &Value::Int(26));
        assert_eq!(world.game.hour, 2);
        // Unparseable coerces to zero
        set(&mut world, EntityType::Player, "", "Experience", &Value::from("lots"));
        assert_eq!(world.player.experience, 0);
    }

    #[test]
    fn test_apply_change_detects_changes() {
        let mut world = world();
        let outcome = apply_change(&mut world, EntityType::Door, "GATE", "isopen", &Value::from("yes"));
        let ChangeOutcome::Changed(change) = outcome else {
            panic!("expected a change");
        };
        assert_eq!(change.entity_id, "gate");
        assert_eq!(change.property, "IsOpen");
        assert_eq!(change.old_value, Value::Bool(false));
        assert_eq!(change.new_value, Value::Bool(true));

        let again = apply_change(&mut world, EntityType::Door, "gate", "IsOpen", &Value::Bool(true));
        assert_eq!(again, ChangeOutcome::Unchanged);

        let missing = apply_change(&mut world, EntityType::Door, "gate", "Colour", &Value::Bool(true));
        assert_eq!(missing, ChangeOutcome::Unmatched);
    }
}
