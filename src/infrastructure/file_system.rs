use crate::core::{graph::GraphManifest, graph::ModuleGraph, interfaces::GraphSource};
use crate::utils::{Logger, Result, SokuError};
use std::path::Path;
use tokio::fs;

/// Loads `graph.json` manifests from disk
pub struct TokioGraphSource;

#[async_trait::async_trait]
impl GraphSource for TokioGraphSource {
    async fn load_graph(&self, path: &Path) -> Result<ModuleGraph> {
        let content = fs::read_to_string(path).await
            .map_err(SokuError::Io)?;

        let manifest: GraphManifest = serde_json::from_str(&content)
            .map_err(|e| SokuError::from_json(e, path.to_path_buf()))?;

        Logger::debug(&format!(
            "Loaded {} modules from {}",
            manifest.modules.len(),
            path.display()
        ));

        Ok(manifest.into_graph()?)
    }
}
