//! Script Runtime - Execution engine for graph scripts
//!
//! This crate contains the handler registry and built-in handlers, the
//! walker and event router, the entity property accessor, and the engine
//! actor that serializes triggers against one world.

pub use script_types;

pub mod accessor;
mod config;
mod context;
mod engine;
mod handlers;
mod host;
mod library;
mod registry;
mod router;
mod validate;
mod walker;

pub use accessor::{ChangeOutcome, EntityType, PropertyChange};
pub use config::*;
pub use context::*;
pub use engine::*;
pub use host::*;
pub use library::*;
pub use registry::*;
pub use validate::*;
pub use walker::*;
