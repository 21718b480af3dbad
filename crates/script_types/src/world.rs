// World Model - Long-lived game state mutated by action nodes
//
// Entity lookups by id are case-insensitive. The world is plain data; the
// runtime owns the only mutable reference while a walk is in progress.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::value::Value;

// ─────────────────────────────────────────────────────────────────────────────
// Entities
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub description: String,
    pub is_dark: bool,
    pub is_visited: bool,
    pub music_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Door {
    pub id: String,
    pub name: String,
    pub from_room_id: String,
    pub to_room_id: String,
    pub is_open: bool,
    pub is_locked: bool,
    pub is_visible: bool,
    pub key_object_id: String,
}

impl Default for Door {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            from_room_id: String::new(),
            to_room_id: String::new(),
            is_open: false,
            is_locked: false,
            is_visible: true,
            key_object_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub description: String,
    pub room_id: String,
    pub health: i64,
    pub max_health: i64,
    pub is_hostile: bool,
    pub is_corpse: bool,
    pub is_visible: bool,
    pub gold: i64,
    pub greeting: String,
}

impl Default for Npc {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            room_id: String::new(),
            health: 10,
            max_health: 10,
            is_hostile: false,
            is_corpse: false,
            is_visible: true,
            gold: 0,
            greeting: String::new(),
        }
    }
}

impl Npc {
    pub fn is_alive(&self) -> bool {
        !self.is_corpse && self.health > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameObject {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Room the object lies in; empty while carried by the player
    pub room_id: String,
    pub is_visible: bool,
    pub is_takeable: bool,
    pub is_open: bool,
    pub is_locked: bool,
    pub value: i64,
    pub weight: f64,
}

impl Default for GameObject {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            room_id: String::new(),
            is_visible: true,
            is_takeable: true,
            is_open: false,
            is_locked: false,
            value: 0,
            weight: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Player {
    pub name: String,
    pub health: i64,
    pub max_health: i64,
    pub gold: i64,
    pub experience: i64,
    pub room_id: String,
    /// Carried object ids
    pub inventory: Vec<String>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            health: 100,
            max_health: 100,
            gold: 0,
            experience: 0,
            room_id: String::new(),
            inventory: Vec::new(),
        }
    }
}

impl Player {
    pub fn has_item(&self, object_id: &str) -> bool {
        self.inventory.iter().any(|i| i.eq_ignore_ascii_case(object_id))
    }

    /// Returns false if the item was already carried
    pub fn add_item(&mut self, object_id: &str) -> bool {
        if self.has_item(object_id) {
            return false;
        }
        self.inventory.push(object_id.to_string());
        true
    }

    /// Returns false if the item was not carried
    pub fn remove_item(&mut self, object_id: &str) -> bool {
        let before = self.inventory.len();
        self.inventory.retain(|i| !i.eq_ignore_ascii_case(object_id));
        self.inventory.len() != before
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestState {
    #[default]
    NotStarted,
    Active,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Quest {
    pub id: String,
    pub name: String,
    pub state: QuestState,
    pub stage: i64,
}

/// Temporary stat modifier counted down by turn advance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveModifier {
    pub id: String,
    pub stat: String,
    pub amount: i64,
    pub remaining_turns: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActiveCombat {
    pub npc_id: String,
    pub round: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GameState {
    pub turn: i64,
    /// Hour of day, 0..24
    pub hour: i64,
    pub weather: String,
    pub is_adventure_completed: bool,
    pub score: i64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            turn: 0,
            hour: 8,
            weather: "Clear".to_string(),
            is_adventure_completed: false,
            score: 0,
        }
    }
}

impl GameState {
    pub fn is_night(&self) -> bool {
        self.hour >= 20 || self.hour < 6
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// World
// ─────────────────────────────────────────────────────────────────────────────

/// Complete mutable game state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct World {
    pub rooms: Vec<Room>,
    pub doors: Vec<Door>,
    pub npcs: Vec<Npc>,
    pub objects: Vec<GameObject>,
    pub player: Player,
    pub quests: Vec<Quest>,
    pub modifiers: Vec<ActiveModifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combat: Option<ActiveCombat>,
    pub game: GameState,
    pub flags: BTreeSet<String>,
    pub variables: BTreeMap<String, Value>,
}

macro_rules! lookup {
    ($get:ident, $get_mut:ident, $field:ident, $ty:ty) => {
        pub fn $get(&self, id: &str) -> Option<&$ty> {
            self.$field.iter().find(|e| e.id.eq_ignore_ascii_case(id))
        }

        pub fn $get_mut(&mut self, id: &str) -> Option<&mut $ty> {
            self.$field.iter_mut().find(|e| e.id.eq_ignore_ascii_case(id))
        }
    };
}

impl World {
    lookup!(room, room_mut, rooms, Room);
    lookup!(door, door_mut, doors, Door);
    lookup!(npc, npc_mut, npcs, Npc);
    lookup!(object, object_mut, objects, GameObject);
    lookup!(quest, quest_mut, quests, Quest);
    lookup!(modifier, modifier_mut, modifiers, ActiveModifier);

    /// Quest, created in the `NotStarted` state on first touch
    pub fn quest_entry(&mut self, id: &str) -> &mut Quest {
        let pos = match self.quests.iter().position(|q| q.id.eq_ignore_ascii_case(id)) {
            Some(pos) => pos,
            None => {
                self.quests.push(Quest {
                    id: id.to_string(),
                    name: id.to_string(),
                    ..Quest::default()
                });
                self.quests.len() - 1
            }
        };
        &mut self.quests[pos]
    }

    pub fn quest_state(&self, id: &str) -> QuestState {
        self.quest(id).map(|q| q.state).unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Flags & Variables
    // ─────────────────────────────────────────────────────────────────────

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    pub fn set_flag(&mut self, flag: &str) {
        if !self.has_flag(flag) {
            self.flags.insert(flag.to_string());
        }
    }

    pub fn clear_flag(&mut self, flag: &str) {
        self.flags.retain(|f| !f.eq_ignore_ascii_case(flag));
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name).or_else(|| {
            self.variables
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Overwrites an existing variable under its original spelling
    pub fn set_variable(&mut self, name: &str, value: Value) {
        let key = self
            .variables
            .keys()
            .find(|k| k.eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or_else(|| name.to_string());
        self.variables.insert(key, value);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inventory
    // ─────────────────────────────────────────────────────────────────────

    /// Canonical spelling of an object id, or the id as given
    pub fn canonical_object_id(&self, id: &str) -> String {
        self.object(id).map(|o| o.id.clone()).unwrap_or_else(|| id.to_string())
    }

    /// Moves an object into the inventory; it leaves whatever room held it
    pub fn give_item(&mut self, object_id: &str) {
        let id = self.canonical_object_id(object_id);
        if let Some(obj) = self.object_mut(&id) {
            obj.room_id.clear();
        }
        self.player.add_item(&id);
    }

    /// Returns whether the item was carried
    pub fn take_item(&mut self, object_id: &str) -> bool {
        self.player.remove_item(object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> World {
        serde_json::from_str(
            r#"{
                "rooms": [{"id": "hall", "name": "Hall", "isDark": true}],
                "npcs": [{"id": "npc_guard", "name": "Guard", "roomId": "hall", "health": 5, "maxHealth": 5}],
                "objects": [{"id": "sword_01", "name": "Sword", "roomId": "hall"}],
                "player": {"name": "Ada", "roomId": "hall", "gold": 12},
                "variables": {"Mood": "calm"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_world_defaults_fill_missing_fields() {
        let world = sample();
        let room = world.room("HALL").unwrap();
        assert!(room.is_dark);
        assert!(!room.is_visited);
        assert_eq!(world.player.health, 100);
        assert_eq!(world.game.hour, 8);
        assert!(world.object("sword_01").unwrap().is_visible);
        assert!(world.combat.is_none());
    }

    #[test]
    fn test_inventory_moves() {
        let mut world = sample();
        world.give_item("SWORD_01");
        assert!(world.player.has_item("sword_01"));
        assert_eq!(world.player.inventory, vec!["sword_01".to_string()]);
        assert_eq!(world.object("sword_01").unwrap().room_id, "");
        // Idempotent
        world.give_item("sword_01");
        assert_eq!(world.player.inventory.len(), 1);
        assert!(world.take_item("sword_01"));
        assert!(!world.take_item("sword_01"));
    }

    #[test]
    fn test_flags_and_variables_are_case_insensitive() {
        let mut world = sample();
        world.set_flag("GateOpen");
        world.set_flag("gateopen");
        assert_eq!(world.flags.len(), 1);
        assert!(world.has_flag("GATEOPEN"));
        world.clear_flag("gateOpen");
        assert!(!world.has_flag("GateOpen"));

        world.set_variable("mood", Value::from("angry"));
        assert_eq!(world.variables.len(), 1);
        assert_eq!(world.variable("MOOD"), Some(&Value::from("angry")));
    }

    #[test]
    fn test_quest_entry_creates_on_first_touch() {
        let mut world = sample();
        assert_eq!(world.quest_state("q_main"), QuestState::NotStarted);
        world.quest_entry("q_main").state = QuestState::Active;
        assert_eq!(world.quest_state("Q_MAIN"), QuestState::Active);
        assert_eq!(world.quests.len(), 1);
    }

    #[test]
    fn test_night_hours() {
        let mut game = GameState::default();
        assert!(!game.is_night());
        game.hour = 22;
        assert!(game.is_night());
        game.hour = 5;
        assert!(game.is_night());
    }
}
