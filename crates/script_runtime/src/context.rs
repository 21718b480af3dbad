// Execution Context - Per-walk scratch state and the handler output contract
//
// A context lives for exactly one top-level walk. It borrows the world and
// the RNG from the engine, and owns the output cache that Variable nodes
// write and Branch/CompareValues read.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use uuid::Uuid;

use script_types::{ports, ScriptGraph, Value, World};

use crate::accessor::PropertyChange;
use crate::host::{Host, HostEvent};

// ─────────────────────────────────────────────────────────────────────────────
// Output Cache Key
// ─────────────────────────────────────────────────────────────────────────────

/// `(node id, port)` pair, compared case-insensitively
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OutputKey {
    node_id: String,
    port: String,
}

impl OutputKey {
    pub fn new(node_id: &str, port: &str) -> Self {
        Self {
            node_id: node_id.trim().to_ascii_lowercase(),
            port: port.trim().to_ascii_lowercase(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution Context
// ─────────────────────────────────────────────────────────────────────────────

/// State shared by every node in one walk
pub struct ExecutionContext<'a> {
    /// Identifies this walk in logs and reports
    pub walk_id: Uuid,
    /// The graph being walked
    pub graph: Arc<ScriptGraph>,
    /// Game state; handlers mutate it in place
    pub world: &'a mut World,
    pub rng: &'a mut StdRng,
    /// Port the current node was entered through
    pub input_port: String,
    host: Arc<dyn Host>,
    outputs: HashMap<OutputKey, Value>,
    depth: usize,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        graph: Arc<ScriptGraph>,
        world: &'a mut World,
        rng: &'a mut StdRng,
        host: Arc<dyn Host>,
    ) -> Self {
        Self {
            walk_id: Uuid::new_v4(),
            graph,
            world,
            rng,
            input_port: ports::EXEC.to_string(),
            host,
            outputs: HashMap::new(),
            depth: 0,
        }
    }

    /// Nesting depth; 0 for walks started by the host
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Cached output of an earlier node in this walk
    pub fn output(&self, node_id: &str, port: &str) -> Option<&Value> {
        self.outputs.get(&OutputKey::new(node_id, port))
    }

    pub fn set_output(&mut self, node_id: &str, port: &str, value: Value) {
        self.outputs.insert(OutputKey::new(node_id, port), value);
    }

    pub fn outputs_len(&self) -> usize {
        self.outputs.len()
    }

    /// Send a callback to the host
    pub fn notify(&self, event: HostEvent) {
        self.host.notify(event);
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Node Output
// ─────────────────────────────────────────────────────────────────────────────

/// Suspension request from a latent node
#[derive(Debug, Clone, PartialEq)]
pub struct LatentState {
    /// Node that is suspended
    pub node_id: String,
    /// Port to continue from once the wait is over
    pub resume_port: String,
    pub duration: Duration,
}

/// What the walker should do after a node ran
#[derive(Debug, Clone, PartialEq)]
pub enum NodeResult {
    /// Follow the connection leaving this port
    Continue(String),
    /// Stop this chain
    End,
    /// Run one sub-walk per wired port, in order, then stop
    Fork(Vec<String>),
    /// Wait, then continue from the resume port
    Latent(LatentState),
    /// Fail the walk
    Error(String),
}

/// Nested work a handler asks for; run by the walker before it moves on
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// A property changed through the accessor
    PropertyChanged(PropertyChange),
    /// Fire another event trigger
    TriggerEvent {
        owner_type: String,
        owner_id: String,
        event_tag: String,
    },
}

/// Output from a node handler
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput {
    /// Values to cache under `(node id, port)`
    pub values: HashMap<String, Value>,
    pub result: NodeResult,
    pub side_effects: Vec<SideEffect>,
}

impl NodeOutput {
    fn with_result(result: NodeResult) -> Self {
        Self {
            values: HashMap::new(),
            result,
            side_effects: Vec::new(),
        }
    }

    /// Continue on the default "Exec" port
    pub fn exec() -> Self {
        Self::continue_to(ports::EXEC)
    }

    pub fn continue_to(port: &str) -> Self {
        Self::with_result(NodeResult::Continue(port.to_string()))
    }

    /// "True" or "False"
    pub fn branch(condition: bool) -> Self {
        Self::continue_to(if condition { ports::TRUE } else { ports::FALSE })
    }

    pub fn end() -> Self {
        Self::with_result(NodeResult::End)
    }

    pub fn fork<I, S>(ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_result(NodeResult::Fork(ports.into_iter().map(Into::into).collect()))
    }

    pub fn latent(state: LatentState) -> Self {
        Self::with_result(NodeResult::Latent(state))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_result(NodeResult::Error(message.into()))
    }

    /// Write `(node id, "Value")` and continue on "Exec"
    pub fn value(value: impl Into<Value>) -> Self {
        Self::exec().with_value(ports::VALUE, value)
    }

    pub fn with_value(mut self, port: &str, value: impl Into<Value>) -> Self {
        self.values.insert(port.to_string(), value.into());
        self
    }

    pub fn with_effect(mut self, effect: SideEffect) -> Self {
        self.side_effects.push(effect);
        self
    }

    /// Port selected by a `Continue` result
    pub fn selected_port(&self) -> Option<&str> {
        match &self.result {
            NodeResult::Continue(port) => Some(port),
            _ => None,
        }
    }
}
