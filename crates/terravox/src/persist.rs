//! Saved terrain: an optional identity plus the generation parameters.
//!
//! No voxel data is stored. Generation is deterministic, so replaying the
//! parameters rebuilds the same grid.

use std::path::Path;

use serde::{Deserialize, Serialize};
use terravox_procedural::{GenerationError, GenerationParams, GenerationResult};

/// A terrain as stored in a scene file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedTerrain {
    /// Scene object identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Everything needed to regenerate.
    #[serde(default)]
    pub params: GenerationParams,
}

impl PersistedTerrain {
    /// Parses a saved terrain.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] on malformed TOML.
    pub fn from_toml_str(text: &str) -> GenerationResult<Self> {
        toml::from_str(text).map_err(|e| GenerationError::Config(e.to_string()))
    }

    /// Parses either a saved terrain or a bare parameter file.
    ///
    /// Text with a top-level `params` key (a `[params]` table or an inline
    /// table) is a saved terrain; anything else is read as parameters with
    /// no identity.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] on malformed TOML.
    pub fn from_saved_or_params(text: &str) -> GenerationResult<Self> {
        let table: toml::Table = text
            .parse()
            .map_err(|e: toml::de::Error| GenerationError::Config(e.to_string()))?;
        if table.contains_key("params") {
            Self::from_toml_str(text)
        } else {
            Ok(Self {
                id: None,
                params: GenerationParams::from_toml_str(text)?,
            })
        }
    }

    /// Serializes to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> GenerationResult<String> {
        toml::to_string_pretty(self).map_err(|e| GenerationError::Config(e.to_string()))
    }

    /// Reads a saved terrain file.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] on I/O or parse failure.
    pub fn load(path: impl AsRef<Path>) -> GenerationResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GenerationError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Writes a saved terrain file.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] on serialization or I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> GenerationResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?)
            .map_err(|e| GenerationError::Config(format!("{}: {e}", path.display())))
    }
}
