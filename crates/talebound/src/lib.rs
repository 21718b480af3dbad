//! Talebound - Command-line host for the graph script engine
//!
//! Loads a world and its script graphs from disk and drives them through the
//! script runtime.

pub mod config;
pub mod loader;

pub use config::{AppConfig, ConfigError};
pub use loader::{LoadError, load_graphs, load_world};
