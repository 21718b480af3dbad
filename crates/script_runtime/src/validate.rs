// Graph Validation - Static checks run at load time
//
// Errors make a graph structurally wrong; warnings flag things the walker
// tolerates at runtime (it stops quietly or aborts the walk).

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use script_types::ScriptGraph;

use crate::registry::HandlerRegistry;

/// Validation result for a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Whether the graph is valid
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Create a successful validation result
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.valid = false;
        self.errors.push(error.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}

/// Validate a graph's structure against a handler registry
pub fn validate_graph(graph: &ScriptGraph, registry: &HandlerRegistry) -> ValidationResult {
    let mut result = ValidationResult::ok();

    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.to_ascii_lowercase()) {
            result.add_error(format!("Duplicate node id '{}'", node.id));
        }
        match node.kind() {
            None => result.add_warning(format!("Unknown node type '{}' in node '{}'", node.type_tag, node.id)),
            Some(kind) if !registry.contains(kind) => {
                result.add_warning(format!("No handler for '{}' in node '{}'", kind, node.id))
            }
            Some(_) => {}
        }
        let clashing = node.properties.clashing_keys();
        if !clashing.is_empty() {
            result.add_warning(format!(
                "Node '{}' has property keys differing only in case: {}",
                node.id,
                clashing.join(", ")
            ));
        }
    }

    let mut wired = HashSet::new();
    for conn in &graph.connections {
        let from = graph.node(&conn.from_node_id);
        if from.is_none() {
            result.add_error(format!(
                "Connection references unknown source node '{}'",
                conn.from_node_id
            ));
        }
        if graph.node(&conn.to_node_id).is_none() {
            result.add_error(format!(
                "Connection references unknown target node '{}'",
                conn.to_node_id
            ));
        }

        let key = (conn.from_node_id.to_ascii_lowercase(), conn.from_port.to_ascii_lowercase());
        if !wired.insert(key) {
            result.add_warning(format!(
                "Port '{}' of node '{}' has more than one connection; only the first is followed",
                conn.from_port, conn.from_node_id
            ));
        }

        if let Some(kind) = from.and_then(|n| n.kind()) {
            let known = kind.output_ports().iter().any(|p| p.eq_ignore_ascii_case(&conn.from_port));
            if !known {
                result.add_warning(format!(
                    "Node '{}' ({}) never selects port '{}'",
                    conn.from_node_id, kind, conn.from_port
                ));
            }
        }
    }

    for node_id in find_cycles(graph) {
        result.add_warning(format!("Exec cycle through node '{}'; walks reaching it will abort", node_id));
    }

    result
}

/// Nodes where a depth-first search closes a cycle
fn find_cycles(graph: &ScriptGraph) -> Vec<String> {
    let mut edges: HashMap<String, Vec<String>> = HashMap::new();
    for conn in &graph.connections {
        if graph.node(&conn.to_node_id).is_some() {
            edges
                .entry(conn.from_node_id.to_ascii_lowercase())
                .or_default()
                .push(conn.to_node_id.to_ascii_lowercase());
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Active,
        Done,
    }

    let mut marks: HashMap<String, Mark> = HashMap::new();
    let mut closing = Vec::new();

    for root in &graph.nodes {
        let root = root.id.to_ascii_lowercase();
        if marks.contains_key(&root) {
            continue;
        }
        // Explicit stack of (node, next edge index)
        let mut stack = vec![(root.clone(), 0usize)];
        marks.insert(root, Mark::Active);

        while let Some((node, next)) = stack.last().cloned() {
            let targets = edges.get(&node).map(Vec::as_slice).unwrap_or(&[]);
            if next >= targets.len() {
                marks.insert(node, Mark::Done);
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            let target = &targets[next];
            match marks.get(target) {
                Some(Mark::Active) => {
                    if !closing.contains(target) {
                        closing.push(target.clone());
                    }
                }
                Some(Mark::Done) => {}
                None => {
                    marks.insert(target.clone(), Mark::Active);
                    stack.push((target.clone(), 0));
                }
            }
        }
    }

    closing
        .into_iter()
        .filter_map(|id| graph.node(&id).map(|n| n.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NodeOutput;
    use script_types::{Connection, Node, NodeType};

    fn graph(nodes: Vec<Node>, connections: Vec<Connection>) -> ScriptGraph {
        ScriptGraph::new("g", "Room", "hall", "", nodes, connections)
    }

    #[test]
    fn test_validation_result() {
        let mut result = ValidationResult::ok();
        assert!(result.valid);
        result.add_warning("meh");
        assert!(result.valid);
        result.add_error("bad");
        assert!(!result.valid);
    }

    #[test]
    fn test_clean_graph() {
        let g = graph(
            vec![Node::new("start", NodeType::EventOnEnter), Node::new("end", NodeType::ActionEndCombat)],
            vec![Connection::new("start", "Exec", "end", "Exec")],
        );
        let result = validate_graph(&g, &HandlerRegistry::with_builtins());
        assert_eq!(result, ValidationResult::ok());
    }

    #[test]
    fn test_errors() {
        let g = graph(
            vec![Node::new("a", NodeType::EventOnEnter), Node::new("A", NodeType::ActionEndCombat)],
            vec![Connection::new("a", "Exec", "ghost", "Exec")],
        );
        let result = validate_graph(&g, &HandlerRegistry::with_builtins());
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_warnings() {
        let g = graph(
            vec![
                Node::new("start", NodeType::EventOnEnter),
                Node::new("check", NodeType::ConditionIsNight),
                Node::with_tag("odd", "Action_Dance"),
                Node::new("log", NodeType::ActionLog),
            ],
            vec![
                Connection::new("start", "Exec", "check", "Exec"),
                Connection::new("check", "Exec", "log", "Exec"),
                Connection::new("check", "True", "odd", "Exec"),
                Connection::new("check", "True", "log", "Exec"),
            ],
        );
        let mut registry = HandlerRegistry::new();
        registry.register_fn(NodeType::EventOnEnter, |_, _| NodeOutput::exec());
        registry.register_fn(NodeType::ConditionIsNight, |_, _| NodeOutput::branch(true));

        let result = validate_graph(&g, &registry);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 4, "{:?}", result.warnings);
    }

    #[test]
    fn test_case_clashing_properties_warn() {
        let g = graph(
            vec![Node::new("say", NodeType::ActionShowMessage).prop("Text", "hi").prop("text", "ho")],
            vec![],
        );
        let result = validate_graph(&g, &HandlerRegistry::with_builtins());
        assert!(result.valid);
        assert_eq!(result.warnings, vec!["Node 'say' has property keys differing only in case: Text, text"]);
    }

    #[test]
    fn test_cycle_warning() {
        let g = graph(
            vec![
                Node::new("start", NodeType::EventOnEnter),
                Node::new("a", NodeType::ActionEndCombat),
                Node::new("b", NodeType::ActionEndCombat),
            ],
            vec![
                Connection::new("start", "Exec", "a", "Exec"),
                Connection::new("a", "Exec", "b", "Exec"),
                Connection::new("b", "Exec", "a", "Exec"),
            ],
        );
        let result = validate_graph(&g, &HandlerRegistry::with_builtins());
        assert!(result.valid);
        assert_eq!(result.warnings, vec!["Exec cycle through node 'a'; walks reaching it will abort"]);
    }
}
