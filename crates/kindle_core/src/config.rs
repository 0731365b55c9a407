//! Engine configuration
//!
//! Every section has defaults, so a config file only needs the values it
//! changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub entities: EntityConfig,
    pub types: TypeConfig,
    pub collision: CollisionConfig,
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    /// Entity slots reserved up front.
    pub initial_capacity: usize,
    /// Maximum number of component kinds.
    pub component_capacity: usize,
    /// Entity ids at or above this are rejected.
    pub max_entities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeConfig {
    /// Capacity of type spaces defined without an explicit one
    /// (contact categories, materials).
    pub default_space_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Spatial hash cell edge in world units.
    pub cell_size: i32,
    /// Brute-force pair scan when false.
    pub use_spatial_hash: bool,
    /// Contacts reserved per constraint.
    pub max_contacts_hint: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_rate_hz: u32,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            component_capacity: 64,
            max_entities: 1 << 20,
        }
    }
}

impl Default for TypeConfig {
    fn default() -> Self {
        Self {
            default_space_capacity: 64,
        }
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            cell_size: 64,
            use_spatial_hash: true,
            max_contacts_hint: 20,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { tick_rate_hz: 60 }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
