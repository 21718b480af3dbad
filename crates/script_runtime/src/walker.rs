// Walker - Dispatch-and-walk over a script graph
//
// A walk starts at an entry node, runs its handler, follows the connection
// leaving the selected port, and repeats until no connection remains.
// Missing data ends a walk quietly; cycles, the step budget, handler errors
// and handler panics end it with a diagnostic.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use script_types::{Node, ports};

use crate::config::EngineConfig;
use crate::context::{ExecutionContext, LatentState, NodeOutput, NodeResult, SideEffect};
use crate::host::{Host, HostEvent};
use crate::library::GraphLibrary;
use crate::registry::{HandlerRegistry, NodeHandler};

// ─────────────────────────────────────────────────────────────────────────────
// Walk Errors & Reports
// ─────────────────────────────────────────────────────────────────────────────

/// Reasons a walk ends before running out of connections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkError {
    #[error("cycle detected at node '{node_id}'")]
    Cycle { node_id: String },

    #[error("step budget of {limit} exceeded")]
    StepLimit { limit: usize },

    #[error("node '{node_id}' failed: {message}")]
    Failed { node_id: String, message: String },

    #[error("node '{node_id}' panicked: {message}")]
    Panicked { node_id: String, message: String },

    #[error("walk cancelled by engine shutdown")]
    Cancelled,
}

impl WalkError {
    /// Runaway graphs are aborted; broken handlers fail
    pub fn is_abort(&self) -> bool {
        matches!(self, WalkError::Cycle { .. } | WalkError::StepLimit { .. })
    }
}

/// How a walk terminated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum WalkStatus {
    Completed,
    Aborted(String),
    Failed(String),
    Cancelled,
}

impl WalkStatus {
    fn from_result(result: &Result<(), WalkError>) -> Self {
        match result {
            Ok(()) => WalkStatus::Completed,
            Err(WalkError::Cancelled) => WalkStatus::Cancelled,
            Err(e) if e.is_abort() => WalkStatus::Aborted(e.to_string()),
            Err(e) => WalkStatus::Failed(e.to_string()),
        }
    }
}

/// Outcome of one walk, including the walks it triggered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkReport {
    pub walk_id: Uuid,
    pub graph_id: String,
    pub entry_node_id: String,
    pub status: WalkStatus,
    /// Nodes executed, across all Sequence branches
    pub steps: usize,
    /// Walks started by property changes and TriggerEvent nodes
    pub nested: Vec<WalkReport>,
}

impl WalkReport {
    pub fn is_completed(&self) -> bool {
        self.status == WalkStatus::Completed
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a WalkReport>) {
        out.push(self);
        for nested in &self.nested {
            nested.collect(out);
        }
    }
}

/// Outcome of one trigger: one walk per matching graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerReport {
    pub event_tag: String,
    pub walks: Vec<WalkReport>,
}

impl TriggerReport {
    /// Every walk, nested ones included, depth-first
    pub fn all_walks(&self) -> Vec<&WalkReport> {
        let mut out = Vec::new();
        for walk in &self.walks {
            walk.collect(&mut out);
        }
        out
    }

    pub fn all_completed(&self) -> bool {
        self.all_walks().iter().all(|w| w.is_completed())
    }

    /// True when no graph listened to the trigger
    pub fn is_empty(&self) -> bool {
        self.walks.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Walker
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct WalkState {
    steps: usize,
    nested: Vec<WalkReport>,
}

/// Runs walks against a fixed registry and graph library
pub struct Walker {
    pub(crate) registry: Arc<HandlerRegistry>,
    pub(crate) library: Arc<GraphLibrary>,
    pub(crate) config: Arc<EngineConfig>,
    pub(crate) host: Arc<dyn Host>,
    shutdown: watch::Receiver<bool>,
}

impl Walker {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        library: Arc<GraphLibrary>,
        config: Arc<EngineConfig>,
        host: Arc<dyn Host>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            registry,
            library,
            config,
            host,
            shutdown,
        }
    }

    pub fn library(&self) -> &GraphLibrary {
        &self.library
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Walk from `entry_node_id` to completion and report how it ended
    pub async fn run_walk(&self, ctx: &mut ExecutionContext<'_>, entry_node_id: &str) -> WalkReport {
        let mut state = WalkState::default();
        let result = self
            .run_chain(
                ctx,
                &mut state,
                entry_node_id.to_string(),
                ports::EXEC.to_string(),
                HashSet::new(),
            )
            .await;

        match &result {
            Ok(()) => debug!(
                walk_id = %ctx.walk_id,
                graph_id = %ctx.graph.id,
                steps = state.steps,
                "Walk completed"
            ),
            Err(WalkError::Cancelled) => info!(
                walk_id = %ctx.walk_id,
                graph_id = %ctx.graph.id,
                "Walk cancelled"
            ),
            Err(e) => {
                warn!(
                    walk_id = %ctx.walk_id,
                    graph_id = %ctx.graph.id,
                    error = %e,
                    "Walk terminated early"
                );
                self.diagnose(format!("graph '{}': {}", ctx.graph.id, e));
            }
        }

        WalkReport {
            walk_id: ctx.walk_id,
            graph_id: ctx.graph.id.clone(),
            entry_node_id: entry_node_id.to_string(),
            status: WalkStatus::from_result(&result),
            steps: state.steps,
            nested: state.nested,
        }
    }

    /// One chain of the walk; Sequence branches recurse with a copy of the trail
    fn run_chain<'a, 'w>(
        &'a self,
        ctx: &'a mut ExecutionContext<'w>,
        state: &'a mut WalkState,
        node_id: String,
        input_port: String,
        mut trail: HashSet<String>,
    ) -> BoxFuture<'a, Result<(), WalkError>>
    where
        'w: 'a,
    {
        Box::pin(async move {
            let graph = Arc::clone(&ctx.graph);
            let mut node_id = node_id;
            let mut input_port = input_port;

            loop {
                let Some(node) = graph.node(&node_id) else {
                    debug!(graph_id = %graph.id, node_id = %node_id, "Target node missing");
                    return Ok(());
                };
                if !trail.insert(node.id.to_ascii_lowercase()) {
                    return Err(WalkError::Cycle {
                        node_id: node.id.clone(),
                    });
                }
                state.steps += 1;
                if state.steps > self.config.max_walk_steps {
                    return Err(WalkError::StepLimit {
                        limit: self.config.max_walk_steps,
                    });
                }
                let Some(handler) = self.registry.handler_for(node) else {
                    debug!(
                        graph_id = %graph.id,
                        node_id = %node.id,
                        node_type = %node.type_tag,
                        "No handler for node type"
                    );
                    return Ok(());
                };

                debug!(
                    walk_id = %ctx.walk_id,
                    graph_id = %graph.id,
                    node_id = %node.id,
                    node_type = %node.type_tag,
                    input_port = %input_port,
                    "Executing node"
                );
                ctx.input_port = input_port;
                let output = invoke(handler.as_ref(), node, ctx).map_err(|message| WalkError::Panicked {
                    node_id: node.id.clone(),
                    message,
                })?;

                for (port, value) in output.values {
                    ctx.set_output(&node.id, &port, value);
                }
                for effect in output.side_effects {
                    let reports = self.apply_effect(ctx, effect).await;
                    state.nested.extend(reports);
                }

                let port = match output.result {
                    NodeResult::Continue(port) => port,
                    NodeResult::End => return Ok(()),
                    NodeResult::Fork(ports) => {
                        for port in ports {
                            if let Some(conn) = graph.connection_from(&node.id, &port) {
                                self.run_chain(
                                    ctx,
                                    state,
                                    conn.to_node_id.clone(),
                                    conn.to_port.clone(),
                                    trail.clone(),
                                )
                                .await?;
                            }
                        }
                        return Ok(());
                    }
                    NodeResult::Latent(latent) => {
                        self.suspend(&latent).await?;
                        latent.resume_port
                    }
                    NodeResult::Error(message) => {
                        return Err(WalkError::Failed {
                            node_id: node.id.clone(),
                            message,
                        });
                    }
                };

                let Some(conn) = graph.connection_from(&node.id, &port) else {
                    return Ok(());
                };
                node_id = conn.to_node_id.clone();
                input_port = conn.to_port.clone();
            }
        })
    }

    /// Run a nested trigger requested by a handler, one level deeper
    async fn apply_effect(&self, ctx: &mut ExecutionContext<'_>, effect: SideEffect) -> Vec<WalkReport> {
        let depth = ctx.depth() + 1;
        if depth > self.config.max_fanout_depth {
            warn!(
                graph_id = %ctx.graph.id,
                depth,
                limit = self.config.max_fanout_depth,
                "Nested trigger dropped"
            );
            self.diagnose(format!(
                "graph '{}': nested trigger dropped at depth {} (limit {})",
                ctx.graph.id, depth, self.config.max_fanout_depth
            ));
            return Vec::new();
        }

        match effect {
            SideEffect::PropertyChanged(change) => self.property_changed(ctx.world, ctx.rng, &change, depth).await,
            SideEffect::TriggerEvent {
                owner_type,
                owner_id,
                event_tag,
            } => {
                self.trigger_by_name(ctx.world, ctx.rng, &owner_type, &owner_id, &event_tag, depth)
                    .await
                    .walks
            }
        }
    }

    /// Wait out a Delay unless the engine shuts down first
    async fn suspend(&self, latent: &LatentState) -> Result<(), WalkError> {
        debug!(node_id = %latent.node_id, duration = ?latent.duration, "Walk suspended");
        tokio::select! {
            biased;
            _ = wait_for_shutdown(self.shutdown.clone()) => Err(WalkError::Cancelled),
            _ = tokio::time::sleep(latent.duration) => Ok(()),
        }
    }

    pub(crate) fn diagnose(&self, text: String) {
        if self.config.report_diagnostics {
            self.host.notify(HostEvent::Diagnostic { text });
        }
    }
}

/// Run a handler, turning a panic into an error message
fn invoke(handler: &dyn NodeHandler, node: &Node, ctx: &mut ExecutionContext<'_>) -> Result<NodeOutput, String> {
    panic::catch_unwind(AssertUnwindSafe(|| handler.handle(node, ctx))).map_err(|payload| {
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "handler panicked".to_string())
    })
}

/// Resolves once the shutdown flag is set
pub(crate) async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: shutdown can no longer be requested
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use script_types::{Connection, NodeType, ScriptGraph, World};

    use super::*;
    use crate::handlers::test_support::world;
    use crate::host::RecordingHost;

    pub(crate) fn walker(
        graphs: Vec<ScriptGraph>,
        config: EngineConfig,
    ) -> (Walker, Arc<RecordingHost>, watch::Sender<bool>) {
        let host = RecordingHost::new_shared();
        let (tx, rx) = watch::channel(false);
        let walker = Walker::new(
            Arc::new(HandlerRegistry::with_builtins()),
            Arc::new(GraphLibrary::new(graphs)),
            Arc::new(config),
            host.clone(),
            rx,
        );
        (walker, host, tx)
    }

    pub(crate) fn message(id: &str, text: &str) -> Node {
        Node::new(id, NodeType::ActionShowMessage).prop("Text", text)
    }

    pub(crate) fn wire(from: &str, port: &str, to: &str) -> Connection {
        Connection::new(from, port, to, "Exec")
    }

    fn room_graph(id: &str, event: NodeType, nodes: Vec<Node>, connections: Vec<Connection>) -> ScriptGraph {
        let mut all = vec![Node::new("start", event)];
        all.extend(nodes);
        ScriptGraph::new(id, "Room", "hall", id, all, connections)
    }

    async fn fire(walker: &Walker, world: &mut World, event_tag: &str) -> TriggerReport {
        let mut rng = StdRng::seed_from_u64(7);
        walker.trigger_by_name(world, &mut rng, "Room", "hall", event_tag, 0).await
    }

    #[tokio::test]
    async fn test_unknown_node_type_is_silent() {
        let graph = ScriptGraph::single(Node::with_tag("x", "Action_Teleport_Elsewhere"));
        let (walker, host, _tx) = walker(vec![], EngineConfig::default());
        let mut world = world();
        let before = world.clone();
        let mut rng = StdRng::seed_from_u64(1);
        let mut ctx = ExecutionContext::new(Arc::new(graph), &mut world, &mut rng, host.clone());

        let report = walker.run_walk(&mut ctx, "x").await;
        assert_eq!(report.status, WalkStatus::Completed);
        assert_eq!(ctx.outputs_len(), 0);
        drop(ctx);
        assert_eq!(world, before);
        assert!(host.events().is_empty());
    }

    #[tokio::test]
    async fn test_message_fires_exactly_once() {
        let graph = room_graph(
            "hello",
            NodeType::EventOnEnter,
            vec![message("say", "hi")],
            vec![wire("start", "Exec", "say")],
        );
        let (walker, host, _tx) = walker(vec![graph], EngineConfig::default());
        let mut world = world();

        let report = fire(&walker, &mut world, "Event_OnEnter").await;
        assert_eq!(report.walks.len(), 1);
        assert!(report.all_completed());
        assert_eq!(host.events(), vec![HostEvent::message("hi")]);
    }

    #[tokio::test]
    async fn test_sequence_runs_wired_branches_in_order() {
        let graph = room_graph(
            "seq",
            NodeType::EventOnLook,
            vec![
                Node::new("seq", NodeType::FlowSequence),
                message("first", "first"),
                message("third", "third"),
                message("after", "never"),
            ],
            vec![
                wire("start", "Exec", "seq"),
                wire("seq", "Then2", "third"),
                wire("seq", "Then0", "first"),
                wire("seq", "Exec", "after"),
            ],
        );
        let (walker, host, _tx) = walker(vec![graph], EngineConfig::default());
        let mut world = world();

        fire(&walker, &mut world, "Event_OnLook").await;
        assert_eq!(host.messages(), vec!["first", "third"]);
    }

    #[tokio::test]
    async fn test_branch_reads_variable_output() {
        let graph = room_graph(
            "gold_check",
            NodeType::EventOnLook,
            vec![
                Node::new("gold", NodeType::VariablePlayerGold),
                Node::new("rich", NodeType::ConditionCompareValues)
                    .prop("SourceNodeId", "gold")
                    .prop("Operator", ">=")
                    .prop("Value", 10),
                message("yes", "rich"),
                message("no", "poor"),
            ],
            vec![
                wire("start", "Exec", "gold"),
                wire("gold", "Exec", "rich"),
                wire("rich", "True", "yes"),
                wire("rich", "False", "no"),
            ],
        );
        let (walker, host, _tx) = walker(vec![graph], EngineConfig::default());
        let mut world = world();

        fire(&walker, &mut world, "Event_OnLook").await;
        assert_eq!(host.messages(), vec!["rich"]);
    }

    #[tokio::test]
    async fn test_cycle_aborts_with_diagnostic() {
        let graph = room_graph(
            "loop",
            NodeType::EventOnEnter,
            vec![message("a", "tick"), message("b", "tock")],
            vec![wire("start", "Exec", "a"), wire("a", "Exec", "b"), wire("b", "Exec", "A")],
        );
        let (walker, host, _tx) = walker(vec![graph], EngineConfig::default());
        let mut world = world();

        let report = fire(&walker, &mut world, "Event_OnEnter").await;
        assert!(matches!(report.walks[0].status, WalkStatus::Aborted(ref r) if r.contains("cycle")));
        assert_eq!(host.messages(), vec!["tick", "tock"]);
        assert_eq!(host.diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn test_step_budget() {
        let nodes: Vec<_> = (0..10).map(|i| message(&format!("m{}", i), "step")).collect();
        let mut connections = vec![wire("start", "Exec", "m0")];
        connections.extend((0..9).map(|i| wire(&format!("m{}", i), "Exec", &format!("m{}", i + 1))));
        let graph = room_graph("long", NodeType::EventOnEnter, nodes, connections);
        let config = EngineConfig {
            max_walk_steps: 5,
            ..EngineConfig::default()
        };
        let (walker, host, _tx) = walker(vec![graph], config);
        let mut world = world();

        let report = fire(&walker, &mut world, "Event_OnEnter").await;
        assert_eq!(report.walks[0].status, WalkStatus::Aborted("step budget of 5 exceeded".into()));
        assert_eq!(report.walks[0].steps, 6);
        assert_eq!(host.messages().len(), 4);
    }

    #[tokio::test]
    async fn test_handler_panic_and_error_fail_the_walk() {
        let graph = room_graph(
            "broken",
            NodeType::EventOnEnter,
            vec![Node::new("boom", NodeType::ActionLog), message("after", "unreachable")],
            vec![wire("start", "Exec", "boom"), wire("boom", "Exec", "after")],
        );
        let (mut walker, host, _tx) = walker(vec![graph], EngineConfig::default());
        let mut registry = HandlerRegistry::with_builtins();
        registry.register_fn(NodeType::ActionLog, |_node, _ctx| panic!("bad handler"));
        walker.registry = Arc::new(registry);
        let mut world = world();

        let report = fire(&walker, &mut world, "Event_OnEnter").await;
        assert_eq!(
            report.walks[0].status,
            WalkStatus::Failed("node 'boom' panicked: bad handler".into())
        );
        assert!(host.messages().is_empty());
        assert_eq!(host.diagnostics().len(), 1);

        let mut registry = HandlerRegistry::with_builtins();
        registry.register_fn(NodeType::ActionLog, |_node, _ctx| NodeOutput::error("no disk"));
        walker.registry = Arc::new(registry);
        let report = fire(&walker, &mut world, "Event_OnEnter").await;
        assert_eq!(report.walks[0].status, WalkStatus::Failed("node 'boom' failed: no disk".into()));
    }

    #[tokio::test]
    async fn test_nested_triggers_stop_at_depth_limit() {
        let graph = room_graph(
            "echo",
            NodeType::EventOnCustom,
            vec![Node::new("again", NodeType::ActionTriggerEvent)
                .prop("OwnerType", "Room")
                .prop("OwnerId", "hall")
                .prop("EventTag", "Event_OnCustom")],
            vec![wire("start", "Exec", "again")],
        );
        let config = EngineConfig {
            max_fanout_depth: 3,
            ..EngineConfig::default()
        };
        let (walker, host, _tx) = walker(vec![graph], config);
        let mut world = world();

        let report = fire(&walker, &mut world, "Event_OnCustom").await;
        assert_eq!(report.all_walks().len(), 4);
        assert!(report.all_completed());
        assert_eq!(host.diagnostics().len(), 1);
    }

    #[tokio::test]
    async fn test_property_change_fans_out_once_per_graph() {
        let open_gate = Node::new("open", NodeType::ActionSetProperty)
            .prop("EntityType", "Door")
            .prop("EntityId", "gate")
            .prop("PropertyName", "IsOpen")
            .prop("Value", true);
        let writer = room_graph("writer", NodeType::EventOnUse, vec![open_gate], vec![wire("start", "Exec", "open")]);

        let listener = |id: &str| {
            ScriptGraph::new(
                id,
                "Door",
                "gate",
                id,
                vec![
                    Node::new("changed", NodeType::EventOnPropertyChanged)
                        .prop("EntityType", "Door")
                        .prop("PropertyName", "isOpen"),
                    Node::new("which", NodeType::ConditionCompareValues)
                        .prop("SourceNodeId", "changed")
                        .prop("SourcePort", "EntityId")
                        .prop("Operator", "==")
                        .prop("Value", "gate"),
                    Node::new("was", NodeType::FlowBranch)
                        .prop("SourceNodeId", "changed")
                        .prop("SourcePort", "OldValue"),
                    Node::new("now", NodeType::FlowBranch)
                        .prop("SourceNodeId", "changed")
                        .prop("SourcePort", "NewValue"),
                    message("say", "gate opened"),
                ],
                vec![
                    wire("changed", "Exec", "which"),
                    wire("which", "True", "was"),
                    wire("was", "False", "now"),
                    wire("now", "True", "say"),
                ],
            )
        };
        let (walker, host, _tx) = walker(vec![writer, listener("l1"), listener("l2")], EngineConfig::default());
        let mut world = world();

        let report = fire(&walker, &mut world, "Event_OnUse").await;
        assert_eq!(report.walks[0].nested.len(), 2);
        assert_eq!(host.messages(), vec!["gate opened", "gate opened"]);

        host.clear();
        let report = fire(&walker, &mut world, "Event_OnUse").await;
        assert!(report.walks[0].nested.is_empty());
        assert!(host.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_suspends_the_walk() {
        let graph = room_graph(
            "later",
            NodeType::EventOnEnter,
            vec![Node::new("wait", NodeType::FlowDelay).prop("Seconds", 2), message("say", "later")],
            vec![wire("start", "Exec", "wait"), wire("wait", "Exec", "say")],
        );
        let (walker, host, _tx) = walker(vec![graph], EngineConfig::default());
        let mut world = world();
        let started = tokio::time::Instant::now();

        let report = fire(&walker, &mut world, "Event_OnEnter").await;
        assert!(report.all_completed());
        let events = host.timed_events();
        assert_eq!(events.len(), 1);
        assert!(events[0].0.duration_since(started) >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_delay() {
        let graph = room_graph(
            "later",
            NodeType::EventOnEnter,
            vec![Node::new("wait", NodeType::FlowDelay).prop("Seconds", 60), message("say", "later")],
            vec![wire("start", "Exec", "wait"), wire("wait", "Exec", "say")],
        );
        let (walker, host, tx) = walker(vec![graph], EngineConfig::default());
        let mut world = world();

        let (report, _) = tokio::join!(fire(&walker, &mut world, "Event_OnEnter"), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.send_replace(true);
        });
        assert_eq!(report.walks[0].status, WalkStatus::Cancelled);
        assert!(host.messages().is_empty());
        assert!(host.diagnostics().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_delay_waits_until_shutdown() {
        let graph = room_graph(
            "never",
            NodeType::EventOnEnter,
            vec![Node::new("wait", NodeType::FlowDelay).prop("Seconds", "inf"), message("say", "later")],
            vec![wire("start", "Exec", "wait"), wire("wait", "Exec", "say")],
        );
        let (walker, host, tx) = walker(vec![graph], EngineConfig::default());
        let mut world = world();

        let (report, _) = tokio::join!(fire(&walker, &mut world, "Event_OnEnter"), async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            tx.send_replace(true);
        });
        assert_eq!(report.walks[0].status, WalkStatus::Cancelled);
        assert!(host.messages().is_empty());
    }

    #[test]
    fn test_walk_status_mapping() {
        let cycle = Err(WalkError::Cycle { node_id: "a".into() });
        assert!(matches!(WalkStatus::from_result(&cycle), WalkStatus::Aborted(_)));
        assert_eq!(WalkStatus::from_result(&Err(WalkError::Cancelled)), WalkStatus::Cancelled);
        assert_eq!(WalkStatus::from_result(&Ok(())), WalkStatus::Completed);
    }
}
