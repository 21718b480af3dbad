//! Application Configuration
//!
//! Layered with figment: built-in defaults, then `talebound.toml`, then
//! `TALEBOUND_` environment variables (`__` separates nested keys, e.g.
//! `TALEBOUND_ENGINE__MAX_WALK_STEPS`). Command-line flags are applied on top
//! by the binary.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use script_runtime::EngineConfig;

pub const DEFAULT_CONFIG_FILE: &str = "talebound.toml";
pub const ENV_PREFIX: &str = "TALEBOUND_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] figment::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// World document (JSON)
    pub world: PathBuf,
    /// Directory of `*.graph.json` files, or a single graph file
    pub graphs: PathBuf,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: String,
    pub engine: EngineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            world: PathBuf::from("demos/world.json"),
            graphs: PathBuf::from("demos/graphs"),
            log_filter: "talebound=info,script_runtime=info".to_string(),
            engine: EngineConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load the layered configuration
    ///
    /// A missing file is fine for the default path; an explicitly requested
    /// file must exist.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        if explicit && !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Ok(Self::figment(path).extract()?)
    }

    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
