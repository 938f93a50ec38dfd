//! # TERRAVOX Meshing
//!
//! Turns a generated `ChunkGrid` into an instanced mesh: one shared cube
//! geometry plus one `InstanceRecord` per active voxel.
//!
//! ## Ownership
//!
//! The mesh is built only from a fully generated grid and is handed to
//! the renderer as a whole. Material ids resolve to colors here, at
//! build time, so palettes can change without regenerating terrain.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod instance;
pub mod mesher;

pub use instance::{CubeGeometry, CubeVertex, InstanceRecord, CUBE_INDEX_COUNT, CUBE_VERTEX_COUNT};
pub use mesher::{InstancedMesh, InstancedMesher, MeshStats};
