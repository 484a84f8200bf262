//! spotmix.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{DEFAULT_CAPACITY_KEY, DEFAULT_GUARANTEE_KEY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SpotmixConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    pub state: Option<StateConfig>,
}

/// Knobs of the capacity-mix policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// Node label declaring the capacity class. The same key is used for
    /// the task annotation written after binding.
    pub capacity_label: String,
    /// Task label carrying the availability guarantee.
    pub guarantee_label: String,
    /// Maximum raw score a node can earn.
    pub weight: u64,
    pub min_score: i64,
    pub max_score: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            capacity_label: DEFAULT_CAPACITY_KEY.to_string(),
            guarantee_label: DEFAULT_GUARANTEE_KEY.to_string(),
            weight: 100,
            min_score: 0,
            max_score: 100,
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity_label.is_empty() {
            return Err(ConfigError::Invalid("policy.capacity_label is empty".into()));
        }
        if self.guarantee_label.is_empty() {
            return Err(ConfigError::Invalid("policy.guarantee_label is empty".into()));
        }
        if self.weight == 0 {
            return Err(ConfigError::Invalid("policy.weight must be positive".into()));
        }
        if self.min_score >= self.max_score {
            return Err(ConfigError::Invalid(format!(
                "policy.min_score ({}) must be below policy.max_score ({})",
                self.min_score, self.max_score
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateConfig {
    pub data_dir: PathBuf,
}

impl SpotmixConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SpotmixConfig = toml::from_str(content)?;
        config.policy.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a spotmix.toml with every default spelled out.
    pub fn scaffold(data_dir: &Path) -> Self {
        SpotmixConfig {
            policy: PolicyConfig::default(),
            state: Some(StateConfig {
                data_dir: data_dir.to_path_buf(),
            }),
        }
    }
}
