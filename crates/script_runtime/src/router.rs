// Event Router - Decides which graphs run for a trigger
//
// Every matching graph gets its own walk with a fresh context, in library
// order. Walks share the world, so later graphs observe earlier mutations.

use std::sync::Arc;

use futures::future::BoxFuture;
use rand::rngs::StdRng;
use tracing::{debug, info};

use script_types::{Node, ScriptGraph, Value, World};

use crate::accessor::PropertyChange;
use crate::context::ExecutionContext;
use crate::walker::{TriggerReport, WalkReport, Walker};

impl Walker {
    /// Run every graph owned by `(owner_type, owner_id)` with an entry node
    /// for `event_tag`
    pub fn trigger_by_name<'a>(
        &'a self,
        world: &'a mut World,
        rng: &'a mut StdRng,
        owner_type: &'a str,
        owner_id: &'a str,
        event_tag: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, TriggerReport> {
        Box::pin(async move {
            let entries = self.library.entries_for(owner_type, owner_id, event_tag);
            info!(
                owner_type,
                owner_id,
                event_tag,
                depth,
                graphs = entries.len(),
                "Trigger fired"
            );
            self.run_entries(world, rng, event_tag, entries, depth).await
        })
    }

    /// Run every graph with an entry node for `event_tag`, whoever owns it
    pub fn trigger_for_all_owners<'a>(
        &'a self,
        world: &'a mut World,
        rng: &'a mut StdRng,
        event_tag: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, TriggerReport> {
        Box::pin(async move {
            let entries = self.library.entries_for_any_owner(event_tag);
            info!(event_tag, depth, graphs = entries.len(), "Broadcast trigger fired");
            self.run_entries(world, rng, event_tag, entries, depth).await
        })
    }

    /// Fan a property change out to its `Event_OnPropertyChanged` listeners
    pub fn property_changed<'a>(
        &'a self,
        world: &'a mut World,
        rng: &'a mut StdRng,
        change: &'a PropertyChange,
        depth: usize,
    ) -> BoxFuture<'a, Vec<WalkReport>> {
        Box::pin(async move {
            let listeners = self.library.property_listeners(change);
            debug!(
                entity_type = %change.entity_type,
                entity_id = %change.entity_id,
                property = %change.property,
                listeners = listeners.len(),
                "Property changed"
            );

            let mut walks = Vec::with_capacity(listeners.len());
            for (graph, entry) in listeners {
                let mut ctx = ExecutionContext::new(graph, &mut *world, &mut *rng, Arc::clone(&self.host)).with_depth(depth);
                ctx.set_output(&entry, "EntityId", Value::String(change.entity_id.clone()));
                ctx.set_output(&entry, "OldValue", change.old_value.clone());
                ctx.set_output(&entry, "NewValue", change.new_value.clone());
                walks.push(self.run_walk(&mut ctx, &entry).await);
            }
            walks
        })
    }

    /// Run one node on its own, outside any authored graph
    pub async fn execute_single_node(&self, world: &mut World, rng: &mut StdRng, node: Node) -> WalkReport {
        let entry = node.id.clone();
        let graph = Arc::new(ScriptGraph::single(node));
        let mut ctx = ExecutionContext::new(graph, world, rng, Arc::clone(&self.host));
        self.run_walk(&mut ctx, &entry).await
    }

    async fn run_entries(
        &self,
        world: &mut World,
        rng: &mut StdRng,
        event_tag: &str,
        entries: Vec<(Arc<ScriptGraph>, String)>,
        depth: usize,
    ) -> TriggerReport {
        let mut walks = Vec::with_capacity(entries.len());
        for (graph, entry) in entries {
            let mut ctx = ExecutionContext::new(graph, &mut *world, &mut *rng, Arc::clone(&self.host)).with_depth(depth);
            walks.push(self.run_walk(&mut ctx, &entry).await);
        }
        TriggerReport {
            event_tag: event_tag.to_string(),
            walks,
        }
    }
}
