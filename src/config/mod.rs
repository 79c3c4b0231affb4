//! JSON configuration for the demo binaries.

pub mod scene;

use crate::assign::{AssignParams, AssignStrategy};
use crate::io::read_json_file;
use crate::types::ObjectId;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OutputConfig {
    pub result_json: Option<PathBuf>,
    pub clusters_json: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DemoConfig {
    pub scene_path: PathBuf,
    #[serde(default)]
    pub params: AssignParams,
    #[serde(default)]
    pub strategy: AssignStrategy,
    /// Objects to process, in order. Empty means every object in the scene's
    /// observation map.
    #[serde(default)]
    pub objects: Vec<ObjectId>,
    /// Fresh objects appended after `objects`.
    #[serde(default)]
    pub new_objects: usize,
    #[serde(default)]
    pub output: OutputConfig,
}

pub fn load_config(path: &Path) -> Result<DemoConfig, String> {
    let config: DemoConfig = read_json_file(path, "config")?;
    config
        .params
        .validate()
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: DemoConfig = serde_json::from_str(
            r#"{"scene_path": "scene.json", "params": {"rmsMax": 4.0}, "strategy": "greedy"}"#,
        )
        .expect("parse");
        assert_eq!(config.params.rms_max, 4.0);
        assert_eq!(config.params.max_obs_per_object, 6);
        assert_eq!(config.strategy, AssignStrategy::Greedy);
        assert!(config.objects.is_empty());
        assert!(config.output.result_json.is_none());
    }
}
