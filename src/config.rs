//! Agent configuration.
//!
//! Loaded once from a JSON file at startup; individual fields can be
//! overridden afterwards with `setoption`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::piece::Color;
use crate::eval::defense::DefenseConfig;
use crate::eval::neural::InferenceConfig;
use crate::search::selector::SelectorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the session needs to start. Every field is optional in the
/// file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub inference: InferenceConfig,
    pub defense: DefenseConfig,
    pub selector: SelectorConfig,
    /// The side the agent plays and defends.
    pub side: Color,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            inference: InferenceConfig::default(),
            defense: DefenseConfig::default(),
            selector: SelectorConfig::default(),
            side: Color::Black,
        }
    }
}

impl AgentConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }
}
