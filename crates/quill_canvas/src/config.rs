//! Surface configuration (quill.toml)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Buffer sizing and reset tuning for a [`Surface`](crate::Surface)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SurfaceConfig {
    /// Minimum scalar-stream capacity of a fresh buffer, in bytes
    #[serde(default = "default_value_capacity")]
    pub initial_value_capacity: usize,
    /// Minimum object-stream capacity of a fresh buffer
    #[serde(default = "default_object_capacity")]
    pub initial_object_capacity: usize,
    /// How many handed-off buffer sizes to remember
    #[serde(default = "default_size_history")]
    pub size_history: usize,
    /// Scalar bytes a frame must hold before a coverage fill resets it.
    /// Defaults to `initial_value_capacity`.
    #[serde(default)]
    pub reset_threshold: Option<usize>,
}

fn default_value_capacity() -> usize {
    1024
}

fn default_object_capacity() -> usize {
    32
}

fn default_size_history() -> usize {
    5
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            initial_value_capacity: default_value_capacity(),
            initial_object_capacity: default_object_capacity(),
            size_history: default_size_history(),
            reset_threshold: None,
        }
    }
}

impl SurfaceConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn with_initial_capacity(mut self, values: usize, objects: usize) -> Self {
        self.initial_value_capacity = values;
        self.initial_object_capacity = objects;
        self
    }

    pub fn with_size_history(mut self, entries: usize) -> Self {
        self.size_history = entries;
        self
    }

    pub fn with_reset_threshold(mut self, bytes: usize) -> Self {
        self.reset_threshold = Some(bytes);
        self
    }

    /// Effective reset threshold in scalar bytes
    pub fn reset_threshold(&self) -> usize {
        self.reset_threshold.unwrap_or(self.initial_value_capacity)
    }
}
