//! # TERRAVOX
//!
//! Procedural voxel terrain objects.
//!
//! ## Layers
//!
//! - `terravox_procedural`: noise, biomes, chunk grid, generation, vegetation
//! - `terravox_meshing`: grid -> instanced cube mesh
//! - this crate: the terrain object, its lifecycle, and background builds
//!
//! ## Example
//!
//! ```rust,ignore
//! use terravox::{GenerationParams, GeneratorConfig, MaterialPalette, MeshRegistry, Terrain};
//!
//! let mut terrain = Terrain::new(MeshRegistry::new(), GeneratorConfig::default());
//! let handle = terrain.generate(GenerationParams::default(), MaterialPalette::default())?;
//! assert_eq!(handle.active_voxels, terrain.active_voxel_count());
//!
//! terrain.destroy();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod persist;
pub mod pipeline;
pub mod service;
pub mod terrain;

pub use persist::PersistedTerrain;
pub use pipeline::{BuiltTerrain, TerrainPipeline};
pub use service::{GenerationOutcome, GenerationService, JobTicket, ServiceConfig};
pub use terrain::{MeshKey, MeshRegistry, RenderSink, Terrain, TerrainHandle, TerrainState};

pub use terravox_meshing::{InstanceRecord, InstancedMesh, MeshStats};
pub use terravox_procedural::{
    Biome, GenerationError, GenerationParams, GenerationResult, GeneratorConfig, MaterialPalette,
};
