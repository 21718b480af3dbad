// Event handlers are entry points and do nothing but continue on "Exec".
// Event-specific data (e.g. OnPropertyChanged's EntityId/OldValue/NewValue)
// is seeded into the output cache by the router before the walk starts.

use script_types::{NodeCategory, NodeType};

use crate::context::NodeOutput;
use crate::registry::HandlerRegistry;

pub(super) fn register(registry: &mut HandlerRegistry) {
    for node_type in NodeType::ALL.iter().copied() {
        if node_type.category() == NodeCategory::Event {
            registry.register_fn(node_type, |_node, _ctx| NodeOutput::exec());
        }
    }
}
