// Engine Configuration
//
// Every field has a default, so an empty table (or no file at all) yields a
// working engine.

use serde::{Deserialize, Serialize};

/// Tunables for the script engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Node steps a single walk may take, across all of its Sequence branches
    pub max_walk_steps: usize,
    /// How deep nested triggers (property fan-out, TriggerEvent) may go
    pub max_fanout_depth: usize,
    /// Fixed seed for reproducible RandomChance/RandomBranch/RandomNumber
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_seed: Option<u64>,
    /// Bounded capacity of the engine actor's command queue
    pub command_queue_capacity: usize,
    /// Forward aborted/failed walks to the host as diagnostics
    pub report_diagnostics: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_walk_steps: 10_000,
            max_fanout_depth: 8,
            rng_seed: None,
            command_queue_capacity: 256,
            report_diagnostics: true,
        }
    }
}
