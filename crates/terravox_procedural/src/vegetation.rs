//! # Vegetation
//!
//! Tree stamping, run once after every chunk has been generated.
//!
//! Trees are written straight into the grid, so a canopy may spill into a
//! neighbor chunk. That is why placement is a single-threaded post-pass:
//! it must only start when chunk generation has fully finished.

use crate::chunk::{ChunkGrid, Material, Voxel};
use crate::noise::{NoiseField, WorldSeed};

/// Smallest distance between sample points, in cells.
pub const MIN_SPACING: usize = 3;
/// Shortest trunk.
pub const TREE_MIN_HEIGHT: usize = 4;
/// Tallest trunk.
pub const TREE_MAX_HEIGHT: usize = 6;
/// Canopy sphere radius.
pub const CANOPY_RADIUS: usize = 2;
/// Free cells required above the canopy.
const CEILING_MARGIN: usize = 2;

/// A tree that was stamped into the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlacedTree {
    /// Global X of the trunk.
    pub x: i64,
    /// Y of the grass cell the tree stands on.
    pub surface_y: usize,
    /// Global Z of the trunk.
    pub z: i64,
    /// Trunk height in cells.
    pub trunk_height: usize,
    /// Canopy radius in cells.
    pub canopy_radius: usize,
}

/// What a placement pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VegetationReport {
    /// Trees placed, in scan order.
    pub trees: Vec<PlacedTree>,
    /// Sample points that fell inside the selection band.
    pub candidates: u64,
    /// Wood/leaf writes dropped because the cell was outside the grid.
    pub skipped_writes: u64,
}

impl VegetationReport {
    /// Number of trees placed.
    #[must_use]
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

/// Places trees on grass surfaces.
pub struct VegetationPlacer {
    noise: NoiseField,
    seed: i64,
    density: f64,
}

impl VegetationPlacer {
    /// Creates a placer for a seed and tree density.
    #[must_use]
    pub fn new(seed: u32, density: f64) -> Self {
        Self {
            noise: NoiseField::new(WorldSeed::from(seed)),
            seed: i64::from(seed),
            density,
        }
    }

    /// Returns true if this density places any trees at all.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.density.is_finite() && self.density > 0.0
    }

    /// Distance between sample points: `max(3, round(1 / density))`.
    #[must_use]
    pub fn spacing(&self) -> usize {
        if !self.is_enabled() {
            return usize::MAX;
        }
        let raw = (1.0 / self.density).round();
        if raw >= usize::MAX as f64 {
            usize::MAX
        } else {
            (raw as usize).max(MIN_SPACING)
        }
    }

    /// Open interval a selection value must fall in: `(0.8 - 5d, 0.85 + 5d)`.
    #[must_use]
    pub fn band(&self) -> (f64, f64) {
        (0.8 - 5.0 * self.density, 0.85 + 5.0 * self.density)
    }

    /// Stamps trees into a fully generated grid.
    pub fn place(&self, grid: &mut ChunkGrid) -> VegetationReport {
        let mut report = VegetationReport::default();
        if !self.is_enabled() {
            tracing::debug!(density = self.density, "vegetation disabled");
            return report;
        }

        let spacing = self.spacing();
        let (low, high) = self.band();
        let dims = *grid.dims();
        let size = dims.chunk_size;

        for cz in 0..dims.world_size_z {
            for cx in 0..dims.world_size_x {
                for lz in (0..size).step_by(spacing) {
                    for lx in (0..size).step_by(spacing) {
                        let gx = (cx * size + lx) as i64;
                        let gz = (cz * size + lz) as i64;

                        let value = self
                            .noise
                            .lattice_hash(gx + self.seed, gz + self.seed, self.seed);
                        if value <= low || value >= high {
                            continue;
                        }
                        report.candidates += 1;

                        if let Some(tree) = self.try_place(grid, gx, gz, &mut report.skipped_writes) {
                            report.trees.push(tree);
                        }
                    }
                }
            }
        }

        tracing::debug!(
            trees = report.trees.len(),
            candidates = report.candidates,
            skipped_writes = report.skipped_writes,
            "vegetation placed"
        );
        report
    }

    fn try_place(
        &self,
        grid: &mut ChunkGrid,
        gx: i64,
        gz: i64,
        skipped: &mut u64,
    ) -> Option<PlacedTree> {
        let surface = grid.top_active(gx, gz)?;
        if !grid.get(gx, surface as i64, gz).is(Material::Grass) {
            return None;
        }

        let trunk_height = self.trunk_height(gx, gz);
        let canopy_radius = CANOPY_RADIUS;
        if surface + trunk_height + canopy_radius + CEILING_MARGIN >= grid.max_height() {
            return None;
        }

        let base = surface as i64;
        for dy in 1..=trunk_height as i64 {
            if !grid.set(gx, base + dy, gz, Voxel::solid(Material::Wood)) {
                *skipped += 1;
            }
        }

        let center_y = base + trunk_height as i64;
        let r = canopy_radius as i64;
        for dy in -r..=r {
            for dz in -r..=r {
                for dx in -r..=r {
                    if dx * dx + dy * dy + dz * dz > r * r {
                        continue;
                    }
                    // Trunk column at or below the canopy center stays wood.
                    if dx == 0 && dz == 0 && dy <= 0 {
                        continue;
                    }
                    let (x, y, z) = (gx + dx, center_y + dy, gz + dz);
                    if !grid.contains(x, y, z) {
                        *skipped += 1;
                        continue;
                    }
                    if grid.get(x, y, z).is(Material::Wood) {
                        continue;
                    }
                    grid.set(x, y, z, Voxel::solid(Material::Leaves));
                }
            }
        }

        Some(PlacedTree {
            x: gx,
            surface_y: surface,
            z: gz,
            trunk_height,
            canopy_radius,
        })
    }

    /// Trunk height for a column, `TREE_MIN_HEIGHT..=TREE_MAX_HEIGHT`.
    fn trunk_height(&self, gx: i64, gz: i64) -> usize {
        let span = TREE_MAX_HEIGHT - TREE_MIN_HEIGHT + 1;
        let pick = self.noise.lattice_hash(gz, self.seed, gx);
        TREE_MIN_HEIGHT + ((pick * span as f64) as usize).min(span - 1)
    }
}
