//! World and Graph Loader
//!
//! Reads the world document and `*.graph.json` files from disk.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};

use script_types::{ScriptGraph, World};

pub const GRAPH_SUFFIX: &str = ".graph.json";

/// Error type for world and graph loading
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the world document
pub async fn load_world(path: impl AsRef<Path>) -> Result<World, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::PathNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).await?;
    let world: World = parse(path, &content)?;
    info!(
        rooms = world.rooms.len(),
        npcs = world.npcs.len(),
        objects = world.objects.len(),
        "Loaded world from {}",
        path.display()
    );
    Ok(world)
}

/// Load graphs from a directory (every `*.graph.json`, in file-name order)
/// or from a single file
///
/// Each file holds one graph or an array of graphs.
pub async fn load_graphs(path: impl AsRef<Path>) -> Result<Vec<ScriptGraph>, LoadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LoadError::PathNotFound(path.to_path_buf()));
    }

    if !path.is_dir() {
        return load_graph_file(path).await;
    }

    let mut files = Vec::new();
    let mut entries = fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file = entry.path();
        if file
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(GRAPH_SUFFIX))
        {
            files.push(file);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut graphs = Vec::new();
    for file in files {
        let loaded = load_graph_file(&file).await?;
        debug!(count = loaded.len(), "Loaded graphs from {}", file.display());
        graphs.extend(loaded);
    }
    info!("Loaded {} graphs from {}", graphs.len(), path.display());
    Ok(graphs)
}

async fn load_graph_file(path: &Path) -> Result<Vec<ScriptGraph>, LoadError> {
    let content = fs::read_to_string(path).await?;
    let document: serde_json::Value = parse(path, &content)?;
    let graphs = match document {
        serde_json::Value::Array(_) => serde_json::from_value(document),
        _ => serde_json::from_value(document).map(|graph: ScriptGraph| vec![graph]),
    };
    graphs.map_err(|source| LoadError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Result<T, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}
