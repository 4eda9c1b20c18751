//! Named, persisted analysis configurations — the config-layer analog of the
//! reference repo's `presets.rs`: a `BTreeMap<String, AnalysisConfig>`
//! round-tripped through YAML, synthesizing a `"default"` entry on first use.

use crate::error::{ConstantQError, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The tunable parameters of one orchestrated analysis run: the five kernel
/// parameters plus the sharding knobs the orchestrator needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub fs: u32,
    pub fmin: f64,
    pub fmax: f64,
    pub bins_per_octave: u32,
    pub threshold: f64,
    pub frame_interval: usize,
    pub worker_count: usize,
}

impl Default for AnalysisConfig {
    /// The C-major-chord reference parameters from the spec's test vectors.
    fn default() -> Self {
        Self {
            fs: 44100,
            fmin: 523.25,
            fmax: 1046.5,
            bins_per_octave: 24,
            threshold: 0.0054,
            frame_interval: 2048,
            worker_count: 4,
        }
    }
}

/// Loads, saves, and holds named [`AnalysisConfig`] presets backed by a YAML
/// file on disk.
pub struct PresetStore {
    pub presets: BTreeMap<String, AnalysisConfig>,
    file_path: PathBuf,
}

const DEFAULT_PRESET_NAME: &str = "default";

impl PresetStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Result<Self> {
        let file_path = file_path.into();
        let mut presets = if file_path.exists() {
            info!("loading presets from {}", file_path.display());
            let yaml = fs::read_to_string(&file_path).map_err(|e| {
                ConstantQError::TransportError(format!("failed reading {}: {e}", file_path.display()))
            })?;
            serde_yaml::from_str(&yaml)
                .map_err(|e| ConstantQError::TransportError(format!("failed parsing presets: {e}")))?
        } else {
            info!(
                "no presets file found at {}, creating with default preset",
                file_path.display()
            );
            BTreeMap::new()
        };

        if !presets.contains_key(DEFAULT_PRESET_NAME) {
            warn!("'default' preset not found, creating it");
            presets.insert(DEFAULT_PRESET_NAME.to_string(), AnalysisConfig::default());
        }

        let store = Self { presets, file_path };
        store.save()?;
        Ok(store)
    }

    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&self.presets)
            .map_err(|e| ConstantQError::TransportError(format!("failed serializing presets: {e}")))?;
        fs::write(&self.file_path, yaml)
            .map_err(|e| ConstantQError::TransportError(format!("failed writing {}: {e}", self.file_path.display())))?;
        info!("presets saved to {}", self.file_path.display());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&AnalysisConfig> {
        self.presets.get(name)
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}
