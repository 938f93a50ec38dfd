//! # TERRAVOX Procedural Generation
//!
//! Deterministic voxel terrain from a handful of parameters.
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: Same parameters always produce the same grid
//! 2. **Chunked**: The world is a fixed rectangle of dense chunks
//! 3. **Parallel**: Chunks generate independently on a worker pool
//! 4. **Explicit**: No global state; every input is passed in
//!
//! ## Core Components
//!
//! - `NoiseField`: Seeded 2D/3D gradient noise
//! - `FractalSynthesizer`: Multi-octave turbulence
//! - `BiomeRule`: Plains, Mountains, Desert, Islands and Caves
//! - `ParallelGenerator`: Fills a `ChunkGrid` from a rule
//! - `VegetationPlacer`: Stamps trees after generation
//!
//! ## Example
//!
//! ```rust,ignore
//! use terravox_procedural::{
//!     BiomeRule, CancelToken, ChunkGrid, GenerationParams, ParallelGenerator, VegetationPlacer,
//! };
//!
//! let params = GenerationParams::default();
//! let mut grid = ChunkGrid::new(params.dimensions()?);
//!
//! ParallelGenerator::default().generate(&mut grid, &BiomeRule::new(&params), &CancelToken::new())?;
//! VegetationPlacer::new(params.seed, params.tree_density).place(&mut grid);
//!
//! assert!(grid.active_voxel_count() > 0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod biome;
pub mod chunk;
pub mod error;
pub mod fractal;
pub mod generator;
pub mod noise;
pub mod palette;
pub mod params;
pub mod vegetation;

pub use biome::{Biome, BiomeRule, ColumnSample, WATER_LEVEL};
pub use chunk::{Chunk, ChunkCoord, ChunkGrid, GridDimensions, Material, Voxel};
pub use error::{GenerationError, GenerationResult};
pub use fractal::{FractalSynthesizer, MAX_OCTAVES};
pub use generator::{CancelToken, GenerationStats, GeneratorConfig, ParallelGenerator};
pub use noise::{NoiseField, WorldSeed};
pub use palette::{MaterialPalette, Rgb, MISSING_COLOR};
pub use params::GenerationParams;
pub use vegetation::{PlacedTree, VegetationPlacer, VegetationReport};
