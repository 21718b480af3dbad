//! Script Types - Core data structures for the graph script engine
//!
//! This crate contains the pure data the engine operates on: loosely-typed
//! values and property bags, the closed node type catalog, authored graphs,
//! and the world model that action nodes mutate. It has no async or runtime
//! dependencies.

mod bag;
mod graph;
mod node_type;
mod value;
mod world;

pub use bag::*;
pub use graph::*;
pub use node_type::*;
pub use value::*;
pub use world::*;
