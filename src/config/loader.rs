//! Configuration loading and discovery for `smaa.toml`
//!
//! Provides functions to find and load settings, and to merge CLI overrides.

use super::schema::{
    DebugVisualization, EdgeDetector, PredicationSource, Preset, RawSettings, SmaaToml,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for when no explicit config path is given.
pub const CONFIG_FILE_NAME: &str = "smaa.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse smaa.toml: {0}")]
    Parse(#[from] toml::de::Error),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Master enable flag
    pub enabled: Option<bool>,
    /// Quality preset
    pub preset: Option<Preset>,
    /// Edge detector source
    pub edge_detector: Option<EdgeDetector>,
    /// Predication source
    pub predication: Option<PredicationSource>,
    pub max_search_steps: Option<i64>,
    pub max_diagonal_search_steps: Option<i64>,
    /// Corner rounding percent
    pub corner_rounding: Option<i64>,
    pub reprojection_weight: Option<f32>,
    pub temporal_history_bias: Option<f32>,
    /// Debug visualization mode
    pub visualize: Option<DebugVisualization>,
}

/// Find smaa.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find smaa.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load settings from a smaa.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses
/// [`find_config`] to locate one. If no file is found, returns the default
/// settings.
///
/// # Example
/// ```ignore
/// let settings = load_config(Some(Path::new("scene/smaa.toml")))?;
/// let config = settings.resolve();
/// ```
pub fn load_config(path: Option<&Path>) -> Result<RawSettings, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => {
            log::debug!("loading settings from {}", p.display());
            load_config_file(&p)
        }
        None => Ok(RawSettings::default()),
    }
}

fn load_config_file(path: &Path) -> Result<RawSettings, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let parsed: SmaaToml = toml::from_str(&contents)?;
    Ok(parsed.smaa)
}

/// Merge CLI overrides into raw settings.
///
/// CLI arguments take precedence over config file values. Values are merged
/// unclamped; [`RawSettings::resolve`] clamps them afterwards.
pub fn merge_cli_overrides(settings: &mut RawSettings, overrides: &CliOverrides) {
    if let Some(enabled) = overrides.enabled {
        settings.enabled = enabled;
    }
    if let Some(preset) = overrides.preset {
        settings.preset = preset.into();
    }
    if let Some(edge_detector) = overrides.edge_detector {
        settings.edge_detector = edge_detector.into();
    }
    if let Some(predication) = overrides.predication {
        settings.predication = predication.into();
    }
    if let Some(steps) = overrides.max_search_steps {
        settings.max_search_steps = steps;
    }
    if let Some(steps) = overrides.max_diagonal_search_steps {
        settings.max_diagonal_search_steps = steps;
    }
    if let Some(rounding) = overrides.corner_rounding {
        settings.corner_rounding = rounding;
    }
    if let Some(weight) = overrides.reprojection_weight {
        settings.reprojection_weight = weight;
    }
    if let Some(bias) = overrides.temporal_history_bias {
        settings.temporal_history_bias = bias;
    }
    if let Some(visualize) = overrides.visualize {
        settings.visualize = visualize;
    }
}
