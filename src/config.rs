use crate::error::InferenceError;
use ort::session::builder::GraphOptimizationLevel;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Comma-separated feature names forcing the frame's column set and order.
pub const FEATURE_ORDER_ENV: &str = "EXOPLANET_FEATURE_ORDER";

/// Model location relative to the repository root.
pub const DEFAULT_MODEL_PATH: &str = "public/models/exoplanet_xgb_pipeline.onnx";

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub model_path: Option<PathBuf>,
    pub feature_order: Option<Vec<String>>,
    pub session: SessionConfig,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub optimization_level: OptimizationLevel,
    pub intra_threads: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            optimization_level: OptimizationLevel::Level3,
            intra_threads: 1,
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    Disable,
    Level1,
    Level2,
    Level3,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        }
    }
}

impl AppConfig {
    /// Reads a YAML config file. Relative `model_path` entries are resolved
    /// against the file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            InferenceError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_yaml(&content)
            .map_err(|e| InferenceError::Config(format!("{}: {}", path.display(), e)))?;

        if let (Some(model_path), Some(dir)) = (config.model_path.as_ref(), path.parent()) {
            if model_path.is_relative() {
                config.model_path = Some(dir.join(model_path));
            }
        }
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}

/// Splits a comma-separated feature list, trimming names and dropping empty
/// entries. Returns `None` when nothing is left.
pub fn parse_feature_order(raw: &str) -> Option<Vec<String>> {
    let order: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if order.is_empty() {
        None
    } else {
        Some(order)
    }
}

/// Repository root for the executable at `exe`: the nearest ancestor that
/// holds the default model, else the executable's grandparent (the layout of
/// `<root>/bin/predict`).
pub fn repo_root_for(exe: &Path) -> PathBuf {
    exe.ancestors()
        .skip(1)
        .find(|dir| dir.join(DEFAULT_MODEL_PATH).is_file())
        .or_else(|| exe.parent().and_then(Path::parent))
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Fully resolved settings for one invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub model_path: PathBuf,
    pub feature_order: Option<Vec<String>>,
    pub session: SessionConfig,
}

impl Settings {
    /// Merges the command line, the feature-order environment value and the
    /// config file. The command line and environment win over the file.
    pub fn resolve(
        cli_model_path: Option<PathBuf>,
        env_feature_order: Option<&str>,
        config: AppConfig,
        repo_root: &Path,
    ) -> Self {
        let model_path = cli_model_path
            .or(config.model_path)
            .unwrap_or_else(|| repo_root.join(DEFAULT_MODEL_PATH));

        let feature_order = env_feature_order
            .and_then(parse_feature_order)
            .or_else(|| {
                config
                    .feature_order
                    .and_then(|names| parse_feature_order(&names.join(",")))
            });

        Self {
            model_path,
            feature_order,
            session: config.session,
        }
    }
}
