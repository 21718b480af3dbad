// Handler Registry - Maps node types to their handlers
//
// Built once at startup. A node whose type has no handler is skipped by the
// walker (the walk simply stops there).

use std::collections::HashMap;
use std::sync::Arc;

use script_types::{Node, NodeType};

use crate::context::{ExecutionContext, NodeOutput};
use crate::handlers;

// ─────────────────────────────────────────────────────────────────────────────
// Node Handler Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Behavior of one node type
pub trait NodeHandler: Send + Sync {
    fn handle(&self, node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput;
}

/// Function-based node handler
pub struct FnNodeHandler<F>
where
    F: Fn(&Node, &mut ExecutionContext<'_>) -> NodeOutput + Send + Sync,
{
    func: F,
}

impl<F> FnNodeHandler<F>
where
    F: Fn(&Node, &mut ExecutionContext<'_>) -> NodeOutput + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> NodeHandler for FnNodeHandler<F>
where
    F: Fn(&Node, &mut ExecutionContext<'_>) -> NodeOutput + Send + Sync,
{
    fn handle(&self, node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
        (self.func)(node, ctx)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handler Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Dispatch table from node type to handler
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<NodeType, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in handler
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        handlers::register_builtin_handlers(&mut registry);
        registry
    }

    /// Register (or replace) the handler for a node type
    pub fn register(&mut self, node_type: NodeType, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(node_type, handler);
    }

    /// Register a plain function as a handler
    pub fn register_fn<F>(&mut self, node_type: NodeType, func: F)
    where
        F: Fn(&Node, &mut ExecutionContext<'_>) -> NodeOutput + Send + Sync + 'static,
    {
        self.register(node_type, Arc::new(FnNodeHandler::new(func)));
    }

    pub fn get(&self, node_type: NodeType) -> Option<Arc<dyn NodeHandler>> {
        self.handlers.get(&node_type).map(Arc::clone)
    }

    /// Handler for a node, resolving its tag through the catalog
    pub fn handler_for(&self, node: &Node) -> Option<Arc<dyn NodeHandler>> {
        node.kind().and_then(|kind| self.get(kind))
    }

    pub fn contains(&self, node_type: NodeType) -> bool {
        self.handlers.contains_key(&node_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
