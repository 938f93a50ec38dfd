//! # Generation Parameters
//!
//! The complete, serializable description of a terrain. Together with its
//! seed this struct alone reproduces an identical grid: it is the only state
//! persisted to scene files.
//!
//! Parameter files are TOML:
//!
//! ```toml
//! scale = 0.05
//! amplitude = 15.0
//! seed = 42
//! threshold = 0.2
//! octaves = 4
//! chunk_size = 32
//! world_size = 2
//! biome = 0          # 0 Plains, 1 Mountains, 2 Desert, 3 Islands, 4 Caves
//! tree_density = 0.02
//!
//! [palette]
//! grass = [0.34, 0.62, 0.24]
//! ```
//!
//! Missing keys take their default values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::biome::Biome;
use crate::chunk::GridDimensions;
use crate::error::{GenerationError, GenerationResult};
use crate::fractal::MAX_OCTAVES;
use crate::palette::MaterialPalette;

/// Largest accepted chunk edge, in cells.
pub const MAX_CHUNK_SIZE: i32 = 256;
/// Largest accepted world edge, in chunks.
pub const MAX_WORLD_SIZE: i32 = 64;
/// Largest accepted column height, in cells.
pub const MAX_COLUMN_HEIGHT: i32 = 1024;
/// Largest accepted total cell count for one grid.
pub const MAX_TOTAL_CELLS: u64 = 1 << 30;

/// Terrain generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Horizontal noise frequency (world cells -> noise space).
    pub scale: f64,
    /// Height amplitude in cells.
    pub amplitude: f64,
    /// Seed for every noise channel.
    pub seed: u32,
    /// Cave threshold; density strictly above it carves a cell.
    pub threshold: f64,
    /// Turbulence octave count.
    pub octaves: i32,
    /// Chunk edge in cells.
    pub chunk_size: i32,
    /// World edge in chunks (square world).
    pub world_size: i32,
    /// Generation rule.
    pub biome: Biome,
    /// Tree density; 0 disables vegetation.
    pub tree_density: f64,
    /// Column height in cells.
    pub max_height: i32,
    /// World units per cell edge.
    pub voxel_size: f32,
    /// Material colors.
    pub palette: MaterialPalette,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            scale: 0.05,
            amplitude: 15.0,
            seed: 42,
            threshold: 0.2,
            octaves: 4,
            chunk_size: 32,
            world_size: 2,
            biome: Biome::Plains,
            tree_density: 0.02,
            max_height: 64,
            voxel_size: 1.0,
            palette: MaterialPalette::default(),
        }
    }
}

impl GenerationParams {
    /// Default parameters with a different biome.
    #[must_use]
    pub fn for_biome(biome: Biome) -> Self {
        Self {
            biome,
            ..Self::default()
        }
    }

    /// Checks every parameter.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidParams`] naming the first bad field.
    pub fn validate(&self) -> GenerationResult<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(GenerationError::invalid(
                "scale",
                format!("must be a positive number, got {}", self.scale),
            ));
        }
        if !(self.amplitude.is_finite() && self.amplitude >= 0.0) {
            return Err(GenerationError::invalid(
                "amplitude",
                format!("must be a non-negative number, got {}", self.amplitude),
            ));
        }
        if self.amplitude > f64::from(MAX_COLUMN_HEIGHT) {
            return Err(GenerationError::invalid(
                "amplitude",
                format!("must be at most {MAX_COLUMN_HEIGHT}, got {}", self.amplitude),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(GenerationError::invalid("threshold", "must be finite"));
        }
        if self.octaves < 1 || self.octaves as u32 > MAX_OCTAVES {
            return Err(GenerationError::invalid(
                "octaves",
                format!("must be in 1..={MAX_OCTAVES}, got {}", self.octaves),
            ));
        }
        check_range("chunk_size", self.chunk_size, MAX_CHUNK_SIZE)?;
        check_range("world_size", self.world_size, MAX_WORLD_SIZE)?;
        check_range("max_height", self.max_height, MAX_COLUMN_HEIGHT)?;
        if !(self.tree_density.is_finite() && self.tree_density >= 0.0) {
            return Err(GenerationError::invalid(
                "tree_density",
                format!("must be a non-negative number, got {}", self.tree_density),
            ));
        }
        if !(self.voxel_size.is_finite() && self.voxel_size > 0.0) {
            return Err(GenerationError::invalid(
                "voxel_size",
                format!("must be a positive number, got {}", self.voxel_size),
            ));
        }

        let chunk = self.chunk_size as u64;
        let world = self.world_size as u64;
        let total = chunk * chunk * world * world * self.max_height as u64;
        if total > MAX_TOTAL_CELLS {
            return Err(GenerationError::invalid(
                "world_size",
                format!("grid of {total} cells exceeds the {MAX_TOTAL_CELLS} cell limit"),
            ));
        }
        Ok(())
    }

    /// Validates and returns the grid shape these parameters describe.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidParams`] if validation fails.
    pub fn dimensions(&self) -> GenerationResult<GridDimensions> {
        self.validate()?;
        GridDimensions::new(
            self.chunk_size as usize,
            self.max_height as usize,
            self.world_size as usize,
            self.world_size as usize,
            self.voxel_size,
        )
    }

    /// Parses parameters from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] if the text is not valid TOML for
    /// this struct. Values are not validated here.
    pub fn from_toml_str(text: &str) -> GenerationResult<Self> {
        toml::from_str(text).map_err(|e| GenerationError::Config(e.to_string()))
    }

    /// Serializes parameters to TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> GenerationResult<String> {
        toml::to_string_pretty(self).map_err(|e| GenerationError::Config(e.to_string()))
    }

    /// Loads parameters from a TOML file.
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

    /// Writes parameters to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] on serialization or I/O failure.
    pub fn save(&self, path: impl AsRef<Path>) -> GenerationResult<()> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        std::fs::write(path, text)
            .map_err(|e| GenerationError::Config(format!("{}: {e}", path.display())))
    }
}

fn check_range(field: &'static str, value: i32, max: i32) -> GenerationResult<()> {
    if value < 1 || value > max {
        return Err(GenerationError::invalid(
            field,
            format!("must be in 1..={max}, got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected_field(params: &GenerationParams) -> &'static str {
        match params.validate() {
            Err(GenerationError::InvalidParams { field, .. }) => field,
            other => panic!("expected InvalidParams, got {other:?}"),
        }
    }

    #[test]
    fn test_default_is_valid() {
        let params = GenerationParams::default();
        assert!(params.validate().is_ok());
        let dims = params.dimensions().unwrap();
        assert_eq!(dims.chunk_size, 32);
        assert_eq!(dims.world_size_x, 2);
        assert_eq!(dims.world_size_z, 2);
        assert_eq!(dims.max_height, 64);
    }

    #[test]
    fn test_rejects_bad_values() {
        let base = GenerationParams::default();

        let cases: Vec<(GenerationParams, &str)> = vec![
            (GenerationParams { chunk_size: 0, ..base.clone() }, "chunk_size"),
            (GenerationParams { chunk_size: -8, ..base.clone() }, "chunk_size"),
            (GenerationParams { world_size: 0, ..base.clone() }, "world_size"),
            (GenerationParams { world_size: -1, ..base.clone() }, "world_size"),
            (GenerationParams { octaves: 0, ..base.clone() }, "octaves"),
            (GenerationParams { octaves: -3, ..base.clone() }, "octaves"),
            (GenerationParams { octaves: 99, ..base.clone() }, "octaves"),
            (GenerationParams { scale: 0.0, ..base.clone() }, "scale"),
            (GenerationParams { scale: f64::NAN, ..base.clone() }, "scale"),
            (GenerationParams { amplitude: -1.0, ..base.clone() }, "amplitude"),
            (GenerationParams { threshold: f64::INFINITY, ..base.clone() }, "threshold"),
            (GenerationParams { tree_density: -0.1, ..base.clone() }, "tree_density"),
            (GenerationParams { max_height: 0, ..base.clone() }, "max_height"),
            (GenerationParams { voxel_size: 0.0, ..base.clone() }, "voxel_size"),
        ];

        for (params, field) in cases {
            assert_eq!(rejected_field(&params), field);
        }
    }

    #[test]
    fn test_rejects_amplitude_beyond_column_limit() {
        let huge = GenerationParams {
            amplitude: 1.0e10,
            ..GenerationParams::default()
        };
        assert_eq!(rejected_field(&huge), "amplitude");

        let at_limit = GenerationParams {
            amplitude: f64::from(MAX_COLUMN_HEIGHT),
            ..GenerationParams::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_rejects_oversized_world() {
        let params = GenerationParams {
            chunk_size: 256,
            world_size: 64,
            max_height: 1024,
            ..GenerationParams::default()
        };
        assert_eq!(rejected_field(&params), "world_size");
    }

    #[test]
    fn test_toml_round_trip_preserves_everything() {
        let params = GenerationParams {
            seed: 7,
            biome: Biome::Islands,
            tree_density: 0.1,
            voxel_size: 0.5,
            ..GenerationParams::default()
        };
        let text = params.to_toml_string().unwrap();
        let back = GenerationParams::from_toml_str(&text).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let params = GenerationParams::from_toml_str("seed = 9\nbiome = 2\n").unwrap();
        assert_eq!(params.seed, 9);
        assert_eq!(params.biome, Biome::Desert);
        assert_eq!(params.chunk_size, GenerationParams::default().chunk_size);
        assert_eq!(params.max_height, 64);
    }

    #[test]
    fn test_unknown_biome_in_file_loads_as_plains() {
        for text in ["biome = 17", "biome = 300", "biome = -1"] {
            let params = GenerationParams::from_toml_str(text).unwrap();
            assert_eq!(params.biome, Biome::Plains, "{text}");
        }
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = GenerationParams::from_toml_str("octaves = \"many\"").unwrap_err();
        assert!(matches!(err, GenerationError::Config(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let path = std::env::temp_dir().join("terravox_params_test.toml");
        let params = GenerationParams::for_biome(Biome::Caves);
        params.save(&path).unwrap();
        let loaded = GenerationParams::load(&path).unwrap();
        assert_eq!(params, loaded);
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            GenerationParams::load(std::env::temp_dir().join("terravox_missing.toml")),
            Err(GenerationError::Config(_))
        ));
    }
}
