// Graph Library - The immutable set of loaded script graphs
//
// Declaration order is significant: triggers run matching graphs in the
// order they were added.

use std::sync::Arc;

use script_types::{Node, NodeType, ScriptGraph};

use crate::accessor::{EntityType, PropertyChange};

#[derive(Debug, Default, Clone)]
pub struct GraphLibrary {
    graphs: Vec<Arc<ScriptGraph>>,
}

impl GraphLibrary {
    pub fn new(graphs: impl IntoIterator<Item = ScriptGraph>) -> Self {
        Self {
            graphs: graphs.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Graphs bound to an owner that have an entry node for `event_tag`,
    /// paired with that entry node's id
    pub fn entries_for(&self, owner_type: &str, owner_id: &str, event_tag: &str) -> Vec<(Arc<ScriptGraph>, String)> {
        self.graphs
            .iter()
            .filter(|g| g.is_owned_by(owner_type, owner_id))
            .filter_map(|g| g.entry_node(event_tag).map(|n| (Arc::clone(g), n.id.clone())))
            .collect()
    }

    /// Graphs with an entry node for `event_tag`, whoever owns them
    pub fn entries_for_any_owner(&self, event_tag: &str) -> Vec<(Arc<ScriptGraph>, String)> {
        self.graphs
            .iter()
            .filter_map(|g| g.entry_node(event_tag).map(|n| (Arc::clone(g), n.id.clone())))
            .collect()
    }

    /// Per graph, the first `Event_OnPropertyChanged` node listening to this change
    pub fn property_listeners(&self, change: &PropertyChange) -> Vec<(Arc<ScriptGraph>, String)> {
        let tag = NodeType::EventOnPropertyChanged.tag();
        self.graphs
            .iter()
            .filter_map(|g| {
                g.entry_nodes(tag)
                    .find(|n| listens_to(n, change))
                    .map(|n| (Arc::clone(g), n.id.clone()))
            })
            .collect()
    }
}

/// `EntityType` and `PropertyName` must match; a non-blank `EntityId` narrows
/// the listener to one entity
fn listens_to(node: &Node, change: &PropertyChange) -> bool {
    let props = &node.properties;
    let entity_type = props.get_str_opt("EntityType").and_then(|t| EntityType::parse(&t));
    if entity_type != Some(change.entity_type) {
        return false;
    }
    let property_matches = props
        .get_str_opt("PropertyName")
        .is_some_and(|p| p.eq_ignore_ascii_case(&change.property));
    if !property_matches {
        return false;
    }
    props
        .get_str_opt("EntityId")
        .is_none_or(|id| id.eq_ignore_ascii_case(&change.entity_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use script_types::Value;

    fn listener(graph_id: &str, entity_id: Option<&str>) -> ScriptGraph {
        let mut node = Node::new("changed", NodeType::EventOnPropertyChanged)
            .prop("EntityType", "door")
            .prop("PropertyName", "isopen");
        if let Some(id) = entity_id {
            node = node.prop("EntityId", id);
        }
        ScriptGraph::new(graph_id, "Door", "gate", "", vec![node], Vec::new())
    }

    fn change(entity_id: &str, property: &str) -> PropertyChange {
        PropertyChange {
            entity_type: EntityType::Door,
            entity_id: entity_id.into(),
            property: property.into(),
            old_value: Value::Bool(false),
            new_value: Value::Bool(true),
        }
    }

    #[test]
    fn test_entries_for_owner_in_order() {
        let talk = |id: &str, owner: &str| {
            ScriptGraph::new(id, "Npc", owner, "", vec![Node::new("start", NodeType::EventOnTalk)], Vec::new())
        };
        let library = GraphLibrary::new([talk("a", "npc_guard"), talk("b", "npc_cook"), talk("c", "*")]);

        let ids: Vec<_> = library
            .entries_for("npc", "NPC_GUARD", "event_ontalk")
            .into_iter()
            .map(|(g, entry)| (g.id.clone(), entry))
            .collect();
        assert_eq!(ids, vec![("a".to_string(), "start".to_string()), ("c".to_string(), "start".to_string())]);
        assert!(library.entries_for("Npc", "npc_guard", "Event_OnLook").is_empty());
        assert_eq!(library.entries_for_any_owner("Event_OnTalk").len(), 3);
    }

    #[test]
    fn test_property_listener_filters() {
        let library = GraphLibrary::new([listener("any", None), listener("gate_only", Some("GATE")), listener("other", Some("door_2"))]);

        let matched: Vec<_> = library
            .property_listeners(&change("gate", "IsOpen"))
            .into_iter()
            .map(|(g, _)| g.id.clone())
            .collect();
        assert_eq!(matched, vec!["any", "gate_only"]);
        assert!(library.property_listeners(&change("gate", "IsLocked")).is_empty());
    }
}
