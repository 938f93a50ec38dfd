//! # Biome Rules
//!
//! A biome is a pure function from a global cell to a voxel. Selection is a
//! parameter, fixed for the whole run: there are no transitions between
//! biomes inside one grid.
//!
//! Every rule works in two steps:
//! 1. `column` computes the surface height of an (x, z) column once
//! 2. `cell` decides material and solidity for each y in that column
//!
//! Heights follow one numeric contract for all biomes:
//! `height = (noise as f32 * amplitude as f32) as i32 + offset`, and a cell is
//! solid when `y <= height`. Caves carve where density is strictly greater
//! than the threshold.

use serde::{Deserialize, Serialize};

use crate::chunk::{Material, Voxel};
use crate::fractal::FractalSynthesizer;
use crate::noise::WorldSeed;
use crate::params::GenerationParams;

/// Persistence for ordinary height maps and cave noise.
const BASE_PERSISTENCE: f64 = 0.5;

/// Persistence for mountain height maps (rougher, steeper).
const MOUNTAIN_PERSISTENCE: f64 = 0.65;

/// Plains surface offset.
pub const PLAINS_OFFSET: i32 = 15;
/// Mountains surface offset.
pub const MOUNTAINS_OFFSET: i32 = 20;
/// Desert surface offset.
pub const DESERT_OFFSET: i32 = 12;
/// Islands surface offset.
pub const ISLANDS_OFFSET: i32 = 10;
/// Caves surface offset.
pub const CAVES_OFFSET: i32 = 15;

/// Depth of the dirt layer under a grass surface.
pub const DIRT_DEPTH: i32 = 3;

/// Mountain peak noise must exceed this to raise a column.
pub const PEAK_THRESHOLD: f64 = 0.3;
/// Mountain columns at or above this height get bare stone surfaces.
pub const ROCK_LINE: i32 = 35;
/// Mountains only carve caves this far below the surface.
pub const MOUNTAIN_CAVE_MARGIN: i32 = 5;

/// Sea level for the Islands biome.
pub const WATER_LEVEL: i32 = 12;

/// Seed channels for the independent noise fields.
const HEIGHT_CHANNEL: u64 = 0x4845_4947;
const CAVE_CHANNEL: u64 = 0x4341_5645;
const PEAK_CHANNEL: u64 = 0x5045_414b;
const ISLAND_CHANNEL: u64 = 0x4953_4c45;
const ROUGHNESS_CHANNEL: u64 = 0x524f_5547;

/// Biome selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
#[repr(u8)]
pub enum Biome {
    /// Rolling grassland with caves.
    #[default]
    Plains = 0,
    /// Steep terrain with rocky peaks.
    Mountains = 1,
    /// Sand dunes, no caves.
    Desert = 2,
    /// Land masses rising out of a fixed sea level.
    Islands = 3,
    /// Plains surface over a dense multi-scale cave network.
    Caves = 4,
}

impl Biome {
    /// All biomes in id order.
    pub const ALL: [Self; 5] = [
        Self::Plains,
        Self::Mountains,
        Self::Desert,
        Self::Islands,
        Self::Caves,
    ];

    /// Returns the biome id.
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Converts from an id, returning `None` for unknown ids.
    #[must_use]
    pub const fn try_from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Plains),
            1 => Some(Self::Mountains),
            2 => Some(Self::Desert),
            3 => Some(Self::Islands),
            4 => Some(Self::Caves),
            _ => None,
        }
    }

    /// Converts from an id. Unknown ids fall back to Plains.
    #[must_use]
    pub fn from_id(id: u8) -> Self {
        Self::try_from_id(id).unwrap_or_else(|| {
            tracing::warn!(biome_id = id, "unknown biome id, falling back to Plains");
            Self::Plains
        })
    }

    /// Surface height offset for this biome.
    #[must_use]
    pub const fn base_offset(self) -> i32 {
        match self {
            Self::Plains => PLAINS_OFFSET,
            Self::Mountains => MOUNTAINS_OFFSET,
            Self::Desert => DESERT_OFFSET,
            Self::Islands => ISLANDS_OFFSET,
            Self::Caves => CAVES_OFFSET,
        }
    }

    /// Returns whether this biome carves caves at all.
    #[must_use]
    pub const fn has_caves(self) -> bool {
        !matches!(self, Self::Desert)
    }
}

impl From<u8> for Biome {
    fn from(id: u8) -> Self {
        Self::from_id(id)
    }
}

impl From<i64> for Biome {
    fn from(id: i64) -> Self {
        match u8::try_from(id) {
            Ok(id) => Self::from_id(id),
            Err(_) => {
                tracing::warn!(biome_id = id, "unknown biome id, falling back to Plains");
                Self::Plains
            }
        }
    }
}

impl From<Biome> for u8 {
    fn from(biome: Biome) -> Self {
        biome.id()
    }
}

/// Per-column result of a biome rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnSample {
    /// Y of the surface cell (inclusive). May lie outside the grid.
    pub height: i32,
}

/// The noise channels every biome draws from.
///
/// Each channel is derived from the seed with its own purpose, so the
/// fields are independent.
#[derive(Clone)]
struct TerrainNoise {
    height: FractalSynthesizer,
    cave: FractalSynthesizer,
    peak: FractalSynthesizer,
    island: FractalSynthesizer,
    roughness: FractalSynthesizer,
}

impl TerrainNoise {
    fn new(seed: WorldSeed) -> Self {
        Self {
            height: FractalSynthesizer::new(seed.derive(HEIGHT_CHANNEL)),
            cave: FractalSynthesizer::new(seed.derive(CAVE_CHANNEL)),
            peak: FractalSynthesizer::new(seed.derive(PEAK_CHANNEL)),
            island: FractalSynthesizer::new(seed.derive(ISLAND_CHANNEL)),
            roughness: FractalSynthesizer::new(seed.derive(ROUGHNESS_CHANNEL)),
        }
    }
}

/// A biome bound to the numeric parameters of one run.
///
/// Immutable once built and shared read-only by every generation worker.
#[derive(Clone)]
pub struct BiomeRule {
    biome: Biome,
    scale: f64,
    amplitude: f32,
    threshold: f64,
    octaves: u32,
    noise: TerrainNoise,
}

impl BiomeRule {
    /// Builds the rule described by `params`.
    #[must_use]
    pub fn new(params: &GenerationParams) -> Self {
        Self {
            biome: params.biome,
            scale: params.scale,
            amplitude: params.amplitude as f32,
            threshold: params.threshold,
            octaves: params.octaves.max(1) as u32,
            noise: TerrainNoise::new(WorldSeed::from(params.seed)),
        }
    }

    /// The selected biome.
    #[must_use]
    pub const fn biome(&self) -> Biome {
        self.biome
    }

    /// Cave threshold in effect.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Computes the surface height of a column.
    #[must_use]
    pub fn column(&self, gx: i64, gz: i64) -> ColumnSample {
        let fx = gx as f64 * self.scale;
        let fz = gz as f64 * self.scale;

        let height = match self.biome {
            Biome::Plains | Biome::Caves => {
                let n = self
                    .noise
                    .height
                    .turbulence_2d(fx, fz, self.octaves, BASE_PERSISTENCE);
                self.scaled(n).saturating_add(self.biome.base_offset())
            }
            Biome::Mountains => {
                let n = self
                    .noise
                    .height
                    .turbulence_2d(fx, fz, self.octaves, MOUNTAIN_PERSISTENCE);
                let base = self.scaled(n).saturating_add(MOUNTAINS_OFFSET);
                // Peak noise reads 3D turbulence at a quarter of the vertical scale.
                let peak = self.noise.peak.turbulence_3d(
                    fx,
                    f64::from(base) * self.scale * 0.25,
                    fz,
                    self.octaves,
                    BASE_PERSISTENCE,
                );
                if peak > PEAK_THRESHOLD {
                    base.saturating_add(self.scaled((peak - PEAK_THRESHOLD) * 2.0))
                } else {
                    base
                }
            }
            Biome::Desert => {
                let octaves = (self.octaves / 2).max(1);
                let n = self.noise.height.turbulence_2d(
                    fx * 2.0,
                    fz * 2.0,
                    octaves,
                    BASE_PERSISTENCE,
                );
                self.scaled(n).saturating_add(DESERT_OFFSET)
            }
            Biome::Islands => {
                let regional = self.noise.island.turbulence_2d(
                    fx * 0.25,
                    fz * 0.25,
                    self.octaves,
                    BASE_PERSISTENCE,
                );
                let local = self
                    .noise
                    .roughness
                    .turbulence_2d(fx, fz, self.octaves, BASE_PERSISTENCE);
                let combined = (regional * 0.7 + local * 0.3) * 2.0;
                self.scaled(combined).saturating_add(ISLANDS_OFFSET)
            }
        };

        ColumnSample { height }
    }

    /// Cave density at a cell, or `None` if this biome never carves.
    ///
    /// A cell below the surface is carved when this is strictly greater
    /// than the threshold.
    #[must_use]
    pub fn cave_density(&self, gx: i64, gy: i64, gz: i64) -> Option<f64> {
        let fx = gx as f64 * self.scale;
        let fy = gy as f64 * self.scale;
        let fz = gz as f64 * self.scale;
        let cave = &self.noise.cave;

        match self.biome {
            Biome::Desert => None,
            Biome::Plains | Biome::Mountains | Biome::Islands => {
                Some(cave.turbulence_3d(fx, fy, fz, self.octaves, BASE_PERSISTENCE))
            }
            Biome::Caves => {
                let full = cave.turbulence_3d(fx, fy, fz, self.octaves, BASE_PERSISTENCE);
                let doubled = cave.turbulence_3d(
                    fx * 2.0,
                    fy * 2.0,
                    fz * 2.0,
                    self.octaves,
                    BASE_PERSISTENCE,
                );
                let halved = cave.turbulence_3d(
                    fx * 0.5,
                    fy * 0.5,
                    fz * 0.5,
                    self.octaves,
                    BASE_PERSISTENCE,
                );
                Some((full * 1.0 + doubled * 0.5 + halved * 0.3) / 1.8)
            }
        }
    }

    /// Decides the voxel at `gy` in a column whose height is already known.
    #[must_use]
    pub fn cell(&self, column: ColumnSample, gx: i64, gy: i64, gz: i64) -> Voxel {
        let height = column.height;
        let y = gy as i32;
        if y > height {
            return Voxel::AIR;
        }

        match self.biome {
            Biome::Plains | Biome::Caves => {
                self.carve(stratum(height, y), gx, gy, gz)
            }
            Biome::Mountains => {
                let material = if height < ROCK_LINE {
                    stratum(height, y)
                } else {
                    Material::Stone
                };
                if y < height.saturating_sub(MOUNTAIN_CAVE_MARGIN) {
                    self.carve(material, gx, gy, gz)
                } else {
                    Voxel::solid(material)
                }
            }
            Biome::Desert => Voxel::solid(Material::Sand),
            Biome::Islands => {
                if y <= WATER_LEVEL {
                    Voxel::solid(Material::Stone)
                } else {
                    self.carve(stratum(height, y), gx, gy, gz)
                }
            }
        }
    }

    /// Evaluates one cell from scratch.
    ///
    /// Equivalent to `cell(column(gx, gz), gx, gy, gz)`; the generator uses
    /// the split form to compute each column height once.
    #[must_use]
    pub fn evaluate(&self, gx: i64, gy: i64, gz: i64) -> Voxel {
        self.cell(self.column(gx, gz), gx, gy, gz)
    }

    #[inline]
    fn scaled(&self, noise: f64) -> i32 {
        (noise as f32 * self.amplitude) as i32
    }

    #[inline]
    fn carve(&self, material: Material, gx: i64, gy: i64, gz: i64) -> Voxel {
        match self.cave_density(gx, gy, gz) {
            Some(density) if density > self.threshold => Voxel::carved(material),
            _ => Voxel::solid(material),
        }
    }
}

/// Grass on the surface row, dirt just below it, stone underneath.
#[inline]
const fn stratum(height: i32, y: i32) -> Material {
    if y == height {
        Material::Grass
    } else if y >= height.saturating_sub(DIRT_DEPTH) {
        Material::Dirt
    } else {
        Material::Stone
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(biome: Biome) -> GenerationParams {
        GenerationParams {
            biome,
            ..GenerationParams::default()
        }
    }

    #[test]
    fn test_unknown_biome_falls_back_to_plains() {
        assert_eq!(Biome::from_id(2), Biome::Desert);
        assert_eq!(Biome::from_id(5), Biome::Plains);
        assert_eq!(Biome::from_id(255), Biome::Plains);
        assert_eq!(Biome::try_from_id(9), None);
        for biome in Biome::ALL {
            assert_eq!(Biome::from_id(biome.id()), biome);
        }
    }

    #[test]
    fn test_stratum_layers() {
        assert_eq!(stratum(20, 20), Material::Grass);
        assert_eq!(stratum(20, 19), Material::Dirt);
        assert_eq!(stratum(20, 17), Material::Dirt);
        assert_eq!(stratum(20, 16), Material::Stone);
        assert_eq!(stratum(20, 0), Material::Stone);
    }

    #[test]
    fn test_rule_determinism() {
        for biome in Biome::ALL {
            let a = BiomeRule::new(&params(biome));
            let b = BiomeRule::new(&params(biome));
            for i in 0..200i64 {
                let (x, y, z) = (i * 7 - 300, i % 40, i * 3 + 11);
                assert_eq!(a.evaluate(x, y, z), b.evaluate(x, y, z), "{biome:?} not deterministic");
            }
        }
    }

    #[test]
    fn test_above_surface_is_air() {
        for biome in Biome::ALL {
            let rule = BiomeRule::new(&params(biome));
            for x in 0..20 {
                let column = rule.column(x, x * 2);
                let above = i64::from(column.height) + 1;
                assert_eq!(rule.cell(column, x, above, x * 2), Voxel::AIR);
            }
        }
    }

    #[test]
    fn test_split_matches_evaluate() {
        let rule = BiomeRule::new(&params(Biome::Mountains));
        for x in 0..16 {
            let column = rule.column(x, 5);
            for y in 0..48 {
                assert_eq!(rule.cell(column, x, y, 5), rule.evaluate(x, y, 5));
            }
        }
    }

    #[test]
    fn test_desert_is_all_sand() {
        let rule = BiomeRule::new(&params(Biome::Desert));
        assert!(rule.cave_density(0, 0, 0).is_none());
        for x in 0..32 {
            for z in 0..32 {
                let column = rule.column(x, z);
                for y in 0..=i64::from(column.height) {
                    let voxel = rule.cell(column, x, y, z);
                    assert!(voxel.is(Material::Sand), "Desert cell at ({x},{y},{z}) is {voxel:?}");
                }
            }
        }
    }

    #[test]
    fn test_islands_stone_below_water() {
        let rule = BiomeRule::new(&params(Biome::Islands));
        for x in 0..32 {
            let column = rule.column(x, 0);
            for y in 0..=i64::from(WATER_LEVEL.min(column.height)) {
                assert!(rule.cell(column, x, y, 0).is(Material::Stone));
            }
        }
    }

    #[test]
    fn test_mountain_surface_material_by_height() {
        let rule = BiomeRule::new(&GenerationParams {
            biome: Biome::Mountains,
            amplitude: 80.0,
            ..GenerationParams::default()
        });
        let mut saw_rock = false;
        for x in 0..200 {
            let column = rule.column(x * 3, 0);
            let surface = rule.cell(column, x * 3, i64::from(column.height), 0);
            if column.height >= ROCK_LINE {
                saw_rock = true;
                assert!(surface.is(Material::Stone), "High surface must be stone");
            } else {
                assert!(surface.is(Material::Grass), "Low surface must be grass");
            }
        }
        assert!(saw_rock, "Amplitude 80 should produce peaks above the rock line");
    }

    #[test]
    fn test_heights_stay_finite_at_amplitude_limit() {
        for biome in Biome::ALL {
            let params = GenerationParams {
                biome,
                amplitude: f64::from(crate::params::MAX_COLUMN_HEIGHT),
                ..GenerationParams::default()
            };
            assert!(params.validate().is_ok());
            let rule = BiomeRule::new(&params);
            for x in 0..64 {
                let column = rule.column(x * 5, -x * 3);
                let limit = 4 * crate::params::MAX_COLUMN_HEIGHT;
                assert!(column.height.abs() < limit, "{biome:?} height {} runs away", column.height);
                let _ = rule.cell(column, x * 5, 0, -x * 3);
            }
        }
    }

    #[test]
    fn test_scaled_height_saturates() {
        let rule = BiomeRule {
            amplitude: f32::MAX,
            ..BiomeRule::new(&params(Biome::Mountains))
        };
        for x in 0..32 {
            let column = rule.column(x * 11, x * 7);
            let _ = rule.cell(column, x * 11, 0, x * 7);
            let _ = rule.cell(column, x * 11, 40, x * 7);
        }
    }

    #[test]
    fn test_caves_blend_is_bounded() {
        let rule = BiomeRule::new(&params(Biome::Caves));
        for i in 0..500 {
            let d = rule.cave_density(i, i % 30, -i).unwrap();
            assert!((-1.0..=1.0).contains(&d), "Blended density {d} out of range");
        }
    }

    #[test]
    fn test_biome_serializes_as_id() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            biome: Biome,
        }
        let text = toml::to_string(&Wrapper { biome: Biome::Islands }).unwrap();
        assert_eq!(text.trim(), "biome = 3");
        for text in ["biome = 42", "biome = 300", "biome = -1"] {
            let back: Wrapper = toml::from_str(text).unwrap();
            assert_eq!(back.biome, Biome::Plains, "{text}");
        }
        let back: Wrapper = toml::from_str("biome = 4").unwrap();
        assert_eq!(back.biome, Biome::Caves);
    }
}
