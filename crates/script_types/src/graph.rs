// Script Graph - Nodes, connections, and the authored graph document
//
// Graphs are authored as JSON and are immutable once loaded. Node ids and
// port names are matched case-insensitively everywhere.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::bag::PropertyBag;
use crate::node_type::{NodeCategory, NodeType};

// ─────────────────────────────────────────────────────────────────────────────
// Node
// ─────────────────────────────────────────────────────────────────────────────

/// A node instance within a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance ID within this graph
    pub id: String,
    /// Node type tag (e.g. "Action_ShowMessage")
    #[serde(rename = "type")]
    pub type_tag: String,
    /// Declared category; derived from the type tag when omitted
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_category"
    )]
    pub category: Option<NodeCategory>,
    /// Node-specific configuration
    #[serde(default)]
    pub properties: PropertyBag,
}

impl Node {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            type_tag: node_type.tag().to_string(),
            category: Some(node_type.category()),
            properties: PropertyBag::new(),
        }
    }

    /// Node with an arbitrary (possibly unknown) type tag
    pub fn with_tag(id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: tag.into(),
            category: None,
            properties: PropertyBag::new(),
        }
    }

    /// Builder-style property insert
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<crate::Value>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Parsed node type, `None` for tags outside the catalog
    pub fn kind(&self) -> Option<NodeType> {
        NodeType::from_tag(&self.type_tag)
    }

    /// Category from the catalog, falling back to the declared one
    pub fn category(&self) -> Option<NodeCategory> {
        self.kind().map(NodeType::category).or(self.category)
    }

    pub fn is_event(&self) -> bool {
        self.category() == Some(NodeCategory::Event)
    }
}

fn lenient_category<'de, D>(deserializer: D) -> Result<Option<NodeCategory>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(serde_json::Value::as_str).and_then(NodeCategory::parse))
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────────────────

/// A directed edge from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub from_node_id: String,
    pub from_port: String,
    pub to_node_id: String,
    #[serde(default = "default_to_port")]
    pub to_port: String,
}

fn default_to_port() -> String {
    crate::node_type::ports::EXEC.to_string()
}

impl Connection {
    pub fn new(from_node: &str, from_port: &str, to_node: &str, to_port: &str) -> Self {
        Self {
            from_node_id: from_node.to_string(),
            from_port: from_port.to_string(),
            to_node_id: to_node.to_string(),
            to_port: to_port.to_string(),
        }
    }

    /// Whether this connection leaves `(node_id, port)`
    pub fn leaves(&self, node_id: &str, port: &str) -> bool {
        self.from_node_id.eq_ignore_ascii_case(node_id) && self.from_port.eq_ignore_ascii_case(port)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Script Graph
// ─────────────────────────────────────────────────────────────────────────────

/// Authored graph bound to one `(owner_type, owner_id)` pair
///
/// The node index is rebuilt on construction and deserialization, so lookups
/// by id are O(1) and case-insensitive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "GraphDocument", into = "GraphDocument")]
pub struct ScriptGraph {
    pub id: String,
    pub owner_type: String,
    pub owner_id: String,
    pub name: String,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    index: HashMap<String, usize>,
}

/// On-disk shape of a graph
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDocument {
    id: String,
    #[serde(default)]
    owner_type: String,
    #[serde(default)]
    owner_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl From<GraphDocument> for ScriptGraph {
    fn from(doc: GraphDocument) -> Self {
        ScriptGraph::new(doc.id, doc.owner_type, doc.owner_id, doc.name, doc.nodes, doc.connections)
    }
}

impl From<ScriptGraph> for GraphDocument {
    fn from(graph: ScriptGraph) -> Self {
        GraphDocument {
            id: graph.id,
            owner_type: graph.owner_type,
            owner_id: graph.owner_id,
            name: graph.name,
            nodes: graph.nodes,
            connections: graph.connections,
        }
    }
}

impl ScriptGraph {
    pub fn new(
        id: impl Into<String>,
        owner_type: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        nodes: Vec<Node>,
        connections: Vec<Connection>,
    ) -> Self {
        // First declaration wins on duplicate ids; validation reports the rest
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            index.entry(node.id.to_ascii_lowercase()).or_insert(i);
        }
        Self {
            id: id.into(),
            owner_type: owner_type.into(),
            owner_id: owner_id.into(),
            name: name.into(),
            nodes,
            connections,
            index,
        }
    }

    /// One-node graph with no owner, used for ad-hoc execution
    pub fn single(node: Node) -> Self {
        Self::new(format!("adhoc:{}", node.id), "", "", "", vec![node], Vec::new())
    }

    /// Get a node by ID
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index
            .get(&id.to_ascii_lowercase())
            .and_then(|&i| self.nodes.get(i))
    }

    /// First declared connection leaving `(node_id, port)`
    pub fn connection_from(&self, node_id: &str, port: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.leaves(node_id, port))
    }

    /// Whether this graph is bound to the given owner; `"*"` as the graph's
    /// owner id matches any owner of that type
    pub fn is_owned_by(&self, owner_type: &str, owner_id: &str) -> bool {
        self.owner_type.eq_ignore_ascii_case(owner_type)
            && (self.owner_id == "*" || self.owner_id.eq_ignore_ascii_case(owner_id))
    }

    /// First Event node whose tag equals `event_tag` (case-insensitive)
    pub fn entry_node(&self, event_tag: &str) -> Option<&Node> {
        self.entry_nodes(event_tag).next()
    }

    /// Every Event node whose tag equals `event_tag`, in declaration order
    pub fn entry_nodes<'a, 't>(&'a self, event_tag: &'t str) -> impl Iterator<Item = &'a Node> + use<'a, 't> {
        let event_tag = event_tag.trim();
        self.nodes
            .iter()
            .filter(move |n| n.is_event() && n.type_tag.eq_ignore_ascii_case(event_tag))
    }
}
