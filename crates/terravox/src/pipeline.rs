//! # Generation Pipeline
//!
//! One terrain build, start to finish:
//!
//! ```text
//! params ──► validate ──► ParallelGenerator ──► barrier ──► VegetationPlacer ──► InstancedMesher
//!                         (worker pool)                     (single thread)
//! ```
//!
//! The barrier is structural: `ParallelGenerator::generate` only returns
//! after every worker has joined, and vegetation needs `&mut ChunkGrid`.

use std::time::{Duration, Instant};

use terravox_meshing::{InstancedMesh, InstancedMesher};
use terravox_procedural::{
    BiomeRule, CancelToken, ChunkGrid, GenerationParams, GenerationResult, GenerationStats,
    GeneratorConfig, MaterialPalette, ParallelGenerator, VegetationPlacer, VegetationReport,
};

/// Everything one successful build produced.
#[derive(Debug, Clone)]
pub struct BuiltTerrain {
    /// Parameters used, with `palette` set to the palette actually applied.
    pub params: GenerationParams,
    /// The generated grid.
    pub grid: ChunkGrid,
    /// Mesh built from the final grid.
    pub mesh: InstancedMesh,
    /// Chunk generation statistics.
    pub generation: GenerationStats,
    /// Trees placed.
    pub vegetation: VegetationReport,
    /// Wall-clock time for the whole build.
    pub elapsed: Duration,
}

/// Runs generation, vegetation and meshing in order.
#[derive(Debug, Clone, Default)]
pub struct TerrainPipeline {
    generator: ParallelGenerator,
    mesher: InstancedMesher,
}

impl TerrainPipeline {
    /// Creates a pipeline with the given worker pool configuration.
    #[must_use]
    pub const fn new(config: GeneratorConfig) -> Self {
        Self {
            generator: ParallelGenerator::new(config),
            mesher: InstancedMesher::new(),
        }
    }

    /// Builds a terrain.
    ///
    /// # Errors
    ///
    /// - `InvalidParams` before any allocation if `params` is rejected
    /// - `Superseded` if `cancel` fires between phases or chunks
    /// - `EmptyResult` if the final grid has no active voxels
    pub fn build(
        &self,
        params: &GenerationParams,
        palette: &MaterialPalette,
        cancel: &CancelToken,
    ) -> GenerationResult<BuiltTerrain> {
        let start = Instant::now();
        let dims = params.dimensions()?;

        let mut grid = ChunkGrid::new(dims);
        let rule = BiomeRule::new(params);
        let generation = self.generator.generate(&mut grid, &rule, cancel)?;

        cancel.check()?;
        let vegetation = VegetationPlacer::new(params.seed, params.tree_density).place(&mut grid);

        cancel.check()?;
        let mesh = self.mesher.build_mesh(&grid, palette)?;

        let mut params = params.clone();
        params.palette = *palette;

        let elapsed = start.elapsed();
        tracing::info!(
            biome = ?params.biome,
            active_voxels = mesh.active_voxel_count,
            trees = vegetation.tree_count(),
            elapsed_ms = elapsed.as_millis() as u64,
            "terrain built"
        );

        Ok(BuiltTerrain {
            params,
            grid,
            mesh,
            generation,
            vegetation,
            elapsed,
        })
    }
}
