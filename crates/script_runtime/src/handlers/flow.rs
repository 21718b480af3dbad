// Flow control handlers - Branch, Sequence, Delay, RandomBranch

use std::time::Duration;

use rand::Rng;
use script_types::{Node, NodeType, ports};

use super::arg;
use crate::context::{ExecutionContext, LatentState, NodeOutput};
use crate::registry::HandlerRegistry;

pub(super) fn register(registry: &mut HandlerRegistry) {
    registry.register_fn(NodeType::FlowBranch, branch);
    registry.register_fn(NodeType::FlowSequence, |_node, _ctx| NodeOutput::fork(ports::THEN));
    registry.register_fn(NodeType::FlowDelay, delay);
    registry.register_fn(NodeType::FlowRandomBranch, |_node, ctx| {
        let pick = ctx.rng.gen_range(0..ports::OUT.len());
        NodeOutput::continue_to(ports::OUT[pick])
    });
}

/// Routes on a cached output when `SourceNodeId` is set, else on `Condition`
fn branch(node: &Node, ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let condition = match arg(node, "SourceNodeId") {
        Some(source) => {
            let port = arg(node, "SourcePort").unwrap_or_else(|| ports::VALUE.to_string());
            ctx.output(&source, &port).is_some_and(|v| v.to_bool())
        }
        None => node.properties.get_bool("Condition", false),
    };
    NodeOutput::branch(condition)
}

/// Negative and NaN waits clamp to zero; waits past `Duration::MAX` never elapse
fn delay(node: &Node, _ctx: &mut ExecutionContext<'_>) -> NodeOutput {
    let seconds = node.properties.get_float("Seconds", 1.0).max(0.0);
    NodeOutput::latent(LatentState {
        node_id: node.id.clone(),
        resume_port: ports::EXEC.to_string(),
        duration: Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX),
    })
}
