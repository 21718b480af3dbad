// Node Type Catalog - The closed set of node types authoring tools may emit
//
// Each variant has a wire tag (e.g. "Action_ShowMessage"), a category, and a
// static list of output ports it can select. The table below is the single
// source for all three.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Well-known Ports
// ─────────────────────────────────────────────────────────────────────────────

/// Port names shared by handlers, the walker, and validation
pub mod ports {
    pub const EXEC: &str = "Exec";
    pub const TRUE: &str = "True";
    pub const FALSE: &str = "False";
    pub const THEN: [&str; 3] = ["Then0", "Then1", "Then2"];
    pub const OUT: [&str; 3] = ["Out0", "Out1", "Out2"];
    pub const ON_DEATH: &str = "OnDeath";
    pub const PLAYER_DIED: &str = "PlayerDied";
    pub const NOT_ENOUGH: &str = "NotEnough";
    pub const ON_INSUFFICIENT: &str = "OnInsufficient";

    // Output cache slots
    pub const VALUE: &str = "Value";
    pub const ENTITY_ID: &str = "EntityId";
    pub const OLD_VALUE: &str = "OldValue";
    pub const NEW_VALUE: &str = "NewValue";
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Category
// ─────────────────────────────────────────────────────────────────────────────

/// Handler family a node type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    Event,
    Condition,
    Action,
    Flow,
    Variable,
    Dialogue,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 6] = [
        NodeCategory::Event,
        NodeCategory::Condition,
        NodeCategory::Action,
        NodeCategory::Flow,
        NodeCategory::Variable,
        NodeCategory::Dialogue,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeCategory::Event => "Event",
            NodeCategory::Condition => "Condition",
            NodeCategory::Action => "Action",
            NodeCategory::Flow => "Flow",
            NodeCategory::Variable => "Variable",
            NodeCategory::Dialogue => "Dialogue",
        }
    }

    /// Case-insensitive parse
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Type
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! node_types {
    ($( $category:ident { $( $variant:ident => $tag:literal ),* $(,)? } )*) => {
        /// Closed enumeration of every node type the engine understands
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeType {
            $( $( $variant, )* )*
        }

        impl NodeType {
            /// Every node type, in catalog order
            pub const ALL: &'static [NodeType] = &[ $( $( NodeType::$variant, )* )* ];

            /// Wire tag used by authored graphs
            pub fn tag(self) -> &'static str {
                match self {
                    $( $( NodeType::$variant => $tag, )* )*
                }
            }

            /// Handler family
            pub fn category(self) -> NodeCategory {
                match self {
                    $( $( NodeType::$variant => NodeCategory::$category, )* )*
                }
            }
        }
    };
}

node_types! {
    Event {
        EventOnGameStart => "Event_OnGameStart",
        EventOnEnter => "Event_OnEnter",
        EventOnExit => "Event_OnExit",
        EventOnLook => "Event_OnLook",
        EventOnExamine => "Event_OnExamine",
        EventOnTalk => "Event_OnTalk",
        EventOnTake => "Event_OnTake",
        EventOnDrop => "Event_OnDrop",
        EventOnUse => "Event_OnUse",
        EventOnGive => "Event_OnGive",
        EventOnOpen => "Event_OnOpen",
        EventOnClose => "Event_OnClose",
        EventOnLock => "Event_OnLock",
        EventOnUnlock => "Event_OnUnlock",
        EventOnAttack => "Event_OnAttack",
        EventOnDeath => "Event_OnDeath",
        EventOnCommand => "Event_OnCommand",
        EventOnTurnStart => "Event_OnTurnStart",
        EventOnTurnEnd => "Event_OnTurnEnd",
        EventOnTimeOfDay => "Event_OnTimeOfDay",
        EventOnDoorOpened => "Event_OnDoorOpened",
        EventOnDoorClosed => "Event_OnDoorClosed",
        EventOnQuestStarted => "Event_OnQuestStarted",
        EventOnQuestCompleted => "Event_OnQuestCompleted",
        EventOnCombatStart => "Event_OnCombatStart",
        EventOnCombatEnd => "Event_OnCombatEnd",
        EventOnPropertyChanged => "Event_OnPropertyChanged",
        EventOnCustom => "Event_OnCustom",
    }
    Condition {
        ConditionHasItem => "Condition_HasItem",
        ConditionPlayerInRoom => "Condition_PlayerInRoom",
        ConditionRoomVisited => "Condition_RoomVisited",
        ConditionRoomIsDark => "Condition_RoomIsDark",
        ConditionDoorIsOpen => "Condition_DoorIsOpen",
        ConditionDoorIsLocked => "Condition_DoorIsLocked",
        ConditionNpcIsAlive => "Condition_NpcIsAlive",
        ConditionNpcIsHostile => "Condition_NpcIsHostile",
        ConditionNpcInRoom => "Condition_NpcInRoom",
        ConditionObjectInRoom => "Condition_ObjectInRoom",
        ConditionObjectIsVisible => "Condition_ObjectIsVisible",
        ConditionObjectIsOpen => "Condition_ObjectIsOpen",
        ConditionObjectIsLocked => "Condition_ObjectIsLocked",
        ConditionPlayerHealthAbove => "Condition_PlayerHealthAbove",
        ConditionPlayerHealthBelow => "Condition_PlayerHealthBelow",
        ConditionPlayerGoldAtLeast => "Condition_PlayerGoldAtLeast",
        ConditionQuestNotStarted => "Condition_QuestNotStarted",
        ConditionQuestActive => "Condition_QuestActive",
        ConditionQuestCompleted => "Condition_QuestCompleted",
        ConditionQuestStageIs => "Condition_QuestStageIs",
        ConditionFlagIsSet => "Condition_FlagIsSet",
        ConditionVariableEquals => "Condition_VariableEquals",
        ConditionVariableGreaterThan => "Condition_VariableGreaterThan",
        ConditionVariableLessThan => "Condition_VariableLessThan",
        ConditionTimeOfDayBetween => "Condition_TimeOfDayBetween",
        ConditionIsNight => "Condition_IsNight",
        ConditionInCombat => "Condition_InCombat",
        ConditionHasModifier => "Condition_HasModifier",
        ConditionRandomChance => "Condition_RandomChance",
        ConditionPropertyEquals => "Condition_PropertyEquals",
        ConditionCompareValues => "Condition_CompareValues",
    }
    Action {
        ActionShowMessage => "Action_ShowMessage",
        ActionPlaySound => "Action_PlaySound",
        ActionSetRoomMusic => "Action_SetRoomMusic",
        ActionTeleportPlayer => "Action_TeleportPlayer",
        ActionStartConversation => "Action_StartConversation",
        ActionStartCombat => "Action_StartCombat",
        ActionEndCombat => "Action_EndCombat",
        ActionStartTrade => "Action_StartTrade",
        ActionCompleteAdventure => "Action_CompleteAdventure",
        ActionGiveItem => "Action_GiveItem",
        ActionRemoveItem => "Action_RemoveItem",
        ActionConsumeItem => "Action_ConsumeItem",
        ActionMoveObject => "Action_MoveObject",
        ActionSetObjectVisible => "Action_SetObjectVisible",
        ActionOpenDoor => "Action_OpenDoor",
        ActionCloseDoor => "Action_CloseDoor",
        ActionLockDoor => "Action_LockDoor",
        ActionUnlockDoor => "Action_UnlockDoor",
        ActionSetDoorVisible => "Action_SetDoorVisible",
        ActionMoveNpc => "Action_MoveNpc",
        ActionSetNpcHostile => "Action_SetNpcHostile",
        ActionDamageNpc => "Action_DamageNpc",
        ActionHealNpc => "Action_HealNpc",
        ActionKillNpc => "Action_KillNpc",
        ActionDamagePlayer => "Action_DamagePlayer",
        ActionHealPlayer => "Action_HealPlayer",
        ActionAddGold => "Action_AddGold",
        ActionRemoveGold => "Action_RemoveGold",
        ActionAddExperience => "Action_AddExperience",
        ActionStartQuest => "Action_StartQuest",
        ActionAdvanceQuest => "Action_AdvanceQuest",
        ActionSetQuestStage => "Action_SetQuestStage",
        ActionCompleteQuest => "Action_CompleteQuest",
        ActionFailQuest => "Action_FailQuest",
        ActionSetFlag => "Action_SetFlag",
        ActionClearFlag => "Action_ClearFlag",
        ActionSetVariable => "Action_SetVariable",
        ActionIncrementVariable => "Action_IncrementVariable",
        ActionSetProperty => "Action_SetProperty",
        ActionSetRoomDark => "Action_SetRoomDark",
        ActionSetRoomDescription => "Action_SetRoomDescription",
        ActionSetObjectDescription => "Action_SetObjectDescription",
        ActionAddModifier => "Action_AddModifier",
        ActionRemoveModifier => "Action_RemoveModifier",
        ActionAdvanceTime => "Action_AdvanceTime",
        ActionSetWeather => "Action_SetWeather",
        ActionAddScore => "Action_AddScore",
        ActionLog => "Action_Log",
        ActionTriggerEvent => "Action_TriggerEvent",
    }
    Flow {
        FlowBranch => "Flow_Branch",
        FlowSequence => "Flow_Sequence",
        FlowDelay => "Flow_Delay",
        FlowRandomBranch => "Flow_RandomBranch",
    }
    Variable {
        VariableConstant => "Variable_Constant",
        VariableGetVariable => "Variable_GetVariable",
        VariableGetFlag => "Variable_GetFlag",
        VariableGetProperty => "Variable_GetProperty",
        VariablePlayerHealth => "Variable_PlayerHealth",
        VariablePlayerGold => "Variable_PlayerGold",
        VariablePlayerRoom => "Variable_PlayerRoom",
        VariableNpcHealth => "Variable_NpcHealth",
        VariableQuestStage => "Variable_QuestStage",
        VariableTimeOfDay => "Variable_TimeOfDay",
        VariableTurnCount => "Variable_TurnCount",
        VariableInventoryCount => "Variable_InventoryCount",
        VariableRandomNumber => "Variable_RandomNumber",
    }
    Dialogue {
        DialogueSay => "Dialogue_Say",
        DialogueNarrate => "Dialogue_Narrate",
        DialoguePlayVoice => "Dialogue_PlayVoice",
        DialogueSetGreeting => "Dialogue_SetGreeting",
    }
}

impl NodeType {
    /// Case-insensitive lookup by wire tag; unknown tags yield `None`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.tag().eq_ignore_ascii_case(tag))
    }

    /// Output ports this node type can select
    pub fn output_ports(self) -> &'static [&'static str] {
        use ports::*;
        match self {
            NodeType::FlowBranch => &[TRUE, FALSE],
            NodeType::FlowSequence => &THEN,
            NodeType::FlowRandomBranch => &OUT,
            NodeType::ActionDamageNpc => &[EXEC, ON_DEATH],
            NodeType::ActionDamagePlayer => &[EXEC, PLAYER_DIED],
            NodeType::ActionRemoveGold => &[EXEC, NOT_ENOUGH],
            NodeType::ActionConsumeItem => &[EXEC, ON_INSUFFICIENT],
            other if other.category() == NodeCategory::Condition => &[TRUE, FALSE],
            _ => &[EXEC],
        }
    }

    /// Whether this type is a graph entry point
    pub fn is_event(self) -> bool {
        self.category() == NodeCategory::Event
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_tags_are_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for node_type in NodeType::ALL {
            let tag = node_type.tag();
            assert!(seen.insert(tag.to_ascii_lowercase()), "duplicate tag {}", tag);
            let prefix = tag.split('_').next().unwrap();
            assert_eq!(prefix, node_type.category().name(), "{} in wrong category", tag);
        }
        assert!(NodeType::ALL.len() >= 120);
    }

    #[test]
    fn test_from_tag_is_case_insensitive() {
        assert_eq!(
            NodeType::from_tag("action_showmessage"),
            Some(NodeType::ActionShowMessage)
        );
        assert_eq!(NodeType::from_tag(" Flow_Delay "), Some(NodeType::FlowDelay));
        assert_eq!(NodeType::from_tag("Action_DoesNotExist"), None);
    }

    #[test]
    fn test_output_ports() {
        assert_eq!(NodeType::ConditionHasItem.output_ports(), &["True", "False"]);
        assert_eq!(NodeType::FlowSequence.output_ports().len(), 3);
        assert!(NodeType::ActionDamageNpc.output_ports().contains(&"OnDeath"));
        assert_eq!(NodeType::VariableConstant.output_ports(), &["Exec"]);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(NodeCategory::parse("dialogue"), Some(NodeCategory::Dialogue));
        assert_eq!(NodeCategory::parse("Loop"), None);
    }
}
