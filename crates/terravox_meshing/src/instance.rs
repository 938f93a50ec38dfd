//! Instance and geometry data structures for GPU upload.

use bytemuck::{Pod, Zeroable};

/// Per-instance data sent to the GPU.
///
/// One record per active voxel. 24 bytes, tightly packed.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct InstanceRecord {
    /// World-space center of the voxel.
    pub translation: [f32; 3],
    /// Linear RGB color.
    pub color: [f32; 3],
}

impl InstanceRecord {
    /// Size in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates an instance for the cell at global `(gx, gy, gz)`.
    #[inline]
    #[must_use]
    pub fn for_cell(gx: usize, gy: usize, gz: usize, voxel_size: f32, color: [f32; 3]) -> Self {
        Self {
            translation: [
                (gx as f32 + 0.5) * voxel_size,
                (gy as f32 + 0.5) * voxel_size,
                (gz as f32 + 0.5) * voxel_size,
            ],
            color,
        }
    }
}

/// Vertex of the shared cube.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CubeVertex {
    /// Position relative to the cube center.
    pub position: [f32; 3],
    /// Face normal.
    pub normal: [f32; 3],
}

/// Vertices in the shared cube (4 per face, so each face keeps its own normal).
pub const CUBE_VERTEX_COUNT: usize = 24;
/// Indices in the shared cube (2 triangles per face).
pub const CUBE_INDEX_COUNT: usize = 36;

/// Face normals with their two in-plane axes, ordered so that
/// `u x v == normal` (counter-clockwise winding seen from outside).
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
];

/// The cube every instance draws, centered on the origin.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeGeometry {
    /// Edge length.
    pub size: f32,
    /// Vertex buffer data.
    pub vertices: Vec<CubeVertex>,
    /// Index buffer data.
    pub indices: Vec<u32>,
}

impl CubeGeometry {
    /// Builds a cube with the given edge length.
    #[must_use]
    pub fn new(size: f32) -> Self {
        let half = size * 0.5;
        let mut vertices = Vec::with_capacity(CUBE_VERTEX_COUNT);
        let mut indices = Vec::with_capacity(CUBE_INDEX_COUNT);

        for (normal, u, v) in FACES {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let position = [0, 1, 2].map(|axis| {
                    (normal[axis] + su * u[axis] + sv * v[axis]) * half
                });
                vertices.push(CubeVertex { position, normal });
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }

        Self {
            size,
            vertices,
            indices,
        }
    }

    /// Vertex buffer as bytes.
    #[must_use]
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer as bytes.
    #[must_use]
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}
