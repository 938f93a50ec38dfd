//! Grid -> instanced mesh conversion.

use std::time::Instant;

use terravox_procedural::{
    ChunkGrid, GenerationError, GenerationResult, Material, MaterialPalette, MISSING_COLOR,
};

use crate::instance::{CubeGeometry, InstanceRecord};

/// Mesh statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Instance count.
    pub instances: u64,
    /// Instance buffer size in bytes.
    pub instance_bytes: u64,
    /// Instances per material id (index 0 is unused).
    pub per_material: [u64; 7],
}

impl MeshStats {
    /// Instances of one material.
    #[must_use]
    pub const fn count(&self, material: Material) -> u64 {
        self.per_material[material.id() as usize]
    }
}

/// A finished terrain mesh: one shared cube, one instance per active voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct InstancedMesh {
    /// Shared cube, scaled to the voxel size.
    pub geometry: CubeGeometry,
    /// Instance buffer data.
    pub instances: Vec<InstanceRecord>,
    /// Active voxels in the grid this mesh was built from.
    pub active_voxel_count: u64,
    /// Build statistics.
    pub stats: MeshStats,
}

impl InstancedMesh {
    /// Number of instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Instance buffer as bytes, ready for upload.
    #[must_use]
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }
}

/// Builds instanced meshes from generated grids.
#[derive(Clone, Copy, Debug, Default)]
pub struct InstancedMesher;

impl InstancedMesher {
    /// Creates a mesher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Emits one instance per active cell, colored through `palette`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::EmptyResult`] if the grid has no active cells.
    pub fn build_mesh(
        &self,
        grid: &ChunkGrid,
        palette: &MaterialPalette,
    ) -> GenerationResult<InstancedMesh> {
        let start = Instant::now();
        let active = grid.active_voxel_count();
        if active == 0 {
            tracing::warn!("grid has no active voxels, nothing to mesh");
            return Err(GenerationError::EmptyResult);
        }

        let colors = palette.to_table();
        let voxel_size = grid.voxel_size();
        let size = grid.chunk_size();

        let mut instances = Vec::with_capacity(active as usize);
        let mut per_material = [0u64; 7];

        for chunk in grid.chunks() {
            let origin_x = chunk.coord.origin_x(size);
            let origin_z = chunk.coord.origin_z(size);
            for (x, y, z, voxel) in chunk.iter_active() {
                let id = voxel.material_id() as usize;
                let color = colors.get(id).copied().unwrap_or(MISSING_COLOR);
                if let Some(count) = per_material.get_mut(id) {
                    *count += 1;
                }
                instances.push(InstanceRecord::for_cell(
                    origin_x + x,
                    y,
                    origin_z + z,
                    voxel_size,
                    color,
                ));
            }
        }

        let stats = MeshStats {
            instances: instances.len() as u64,
            instance_bytes: (instances.len() * InstanceRecord::SIZE) as u64,
            per_material,
        };
        tracing::info!(
            instances = stats.instances,
            bytes = stats.instance_bytes,
            elapsed_us = start.elapsed().as_micros() as u64,
            "instanced mesh built"
        );

        Ok(InstancedMesh {
            geometry: CubeGeometry::new(voxel_size),
            instances,
            active_voxel_count: active,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terravox_procedural::{GridDimensions, Voxel};

    fn grid(voxel_size: f32) -> ChunkGrid {
        ChunkGrid::new(GridDimensions::new(4, 8, 2, 2, voxel_size).unwrap())
    }

    #[test]
    fn test_empty_grid_is_empty_result() {
        let result = InstancedMesher::new().build_mesh(&grid(1.0), &MaterialPalette::default());
        assert_eq!(result, Err(GenerationError::EmptyResult));
    }

    #[test]
    fn test_one_instance_per_active_cell() {
        let mut grid = grid(2.0);
        grid.set(0, 0, 0, Voxel::solid(Material::Stone));
        grid.set(5, 3, 6, Voxel::solid(Material::Grass));
        grid.set(1, 1, 1, Voxel::carved(Material::Dirt));

        let palette = MaterialPalette::default();
        let mesh = InstancedMesher::new().build_mesh(&grid, &palette).unwrap();

        assert_eq!(mesh.instance_count(), 2);
        assert_eq!(mesh.active_voxel_count, 2);
        assert_eq!(mesh.stats.count(Material::Stone), 1);
        assert_eq!(mesh.stats.count(Material::Grass), 1);
        assert_eq!(mesh.stats.count(Material::Dirt), 0, "Carved cells are not meshed");
        assert_eq!(mesh.instance_bytes().len(), 2 * InstanceRecord::SIZE);
        assert!((mesh.geometry.size - 2.0).abs() < f32::EPSILON);

        let grass = mesh
            .instances
            .iter()
            .find(|i| i.color == palette.grass)
            .expect("grass instance");
        assert_eq!(grass.translation, [11.0, 7.0, 13.0]);
    }

    #[test]
    fn test_palette_resolves_at_build_time() {
        let mut grid = grid(1.0);
        grid.set(2, 2, 2, Voxel::solid(Material::Sand));

        let mut palette = MaterialPalette::default();
        palette.set(Material::Sand, [0.1, 0.2, 0.3]);
        let mesh = InstancedMesher::new().build_mesh(&grid, &palette).unwrap();
        assert_eq!(mesh.instances[0].color, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_unknown_material_meshes_as_missing_color() {
        let mut grid = grid(1.0);
        let unknown: Voxel = bytemuck::cast([9u8, 1u8]);
        grid.set(1, 1, 1, unknown);

        let mesh = InstancedMesher::new().build_mesh(&grid, &MaterialPalette::default()).unwrap();
        assert_eq!(mesh.instance_count(), 1);
        assert_eq!(mesh.instances[0].color, MISSING_COLOR);
        assert_eq!(mesh.stats.per_material.iter().sum::<u64>(), 0);
    }
}
