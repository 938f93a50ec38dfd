//! # Chunk Grid
//!
//! The voxel world is a fixed rectangle of chunks:
//! - Each chunk is a dense `size x height x size` array of voxels
//! - Chunks are the unit of parallel generation
//! - The grid owns every chunk for the lifetime of one generation run
//!
//! ## Indexing
//!
//! Voxels inside a chunk are stored `[y][z][x]`. A global cell
//! `(gx, gy, gz)` lives in chunk `(gx / size, gz / size)` at local
//! `(gx % size, gy, gz % size)`.

use bytemuck::{Pod, Zeroable};

use crate::error::{GenerationError, GenerationResult};

/// Terrain materials. Ids 1-6 are reserved; 0 is air.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Material {
    /// Grass surface.
    Grass = 1,
    /// Dirt, just below the surface.
    Dirt = 2,
    /// Stone, deep ground and rocky peaks.
    Stone = 3,
    /// Sand, desert ground.
    Sand = 4,
    /// Wood, tree trunks.
    Wood = 5,
    /// Leaves, tree canopies.
    Leaves = 6,
}

impl Material {
    /// All materials in id order.
    pub const ALL: [Self; 6] = [
        Self::Grass,
        Self::Dirt,
        Self::Stone,
        Self::Sand,
        Self::Wood,
        Self::Leaves,
    ];

    /// Returns the material id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u8 {
        self as u8
    }

    /// Converts from an id. Returns `None` for air and unknown ids.
    #[must_use]
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Grass),
            2 => Some(Self::Dirt),
            3 => Some(Self::Stone),
            4 => Some(Self::Sand),
            5 => Some(Self::Wood),
            6 => Some(Self::Leaves),
            _ => None,
        }
    }
}

/// A single voxel cell.
///
/// The material id may be stale on an inactive cell: cave carving keeps the
/// material of the stratum it removed. Only active cells are ever meshed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Voxel {
    /// Material id (0 = air).
    material: u8,
    /// 1 if the cell is solid.
    active: u8,
}

impl Voxel {
    /// Empty cell.
    pub const AIR: Self = Self {
        material: 0,
        active: 0,
    };

    /// Creates an active cell of the given material.
    #[inline]
    #[must_use]
    pub const fn solid(material: Material) -> Self {
        Self {
            material: material as u8,
            active: 1,
        }
    }

    /// Creates an inactive cell that remembers the material carved out of it.
    #[inline]
    #[must_use]
    pub const fn carved(material: Material) -> Self {
        Self {
            material: material as u8,
            active: 0,
        }
    }

    /// Returns the raw material id.
    #[inline]
    #[must_use]
    pub const fn material_id(self) -> u8 {
        self.material
    }

    /// Returns the material, if the id is a known one.
    #[inline]
    #[must_use]
    pub const fn material(self) -> Option<Material> {
        Material::from_id(self.material)
    }

    /// Returns true if the cell is solid.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.active != 0
    }

    /// Returns true if the cell is active and made of `material`.
    #[inline]
    #[must_use]
    pub const fn is(self, material: Material) -> bool {
        self.active != 0 && self.material == material as u8
    }
}

/// Chunk coordinate (identifies a chunk in the grid).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkCoord {
    /// X index (in chunks, not cells).
    pub x: usize,
    /// Z index (in chunks, not cells).
    pub z: usize,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: usize, z: usize) -> Self {
        Self { x, z }
    }

    /// Global X of the chunk's first cell.
    #[inline]
    #[must_use]
    pub const fn origin_x(self, chunk_size: usize) -> usize {
        self.x * chunk_size
    }

    /// Global Z of the chunk's first cell.
    #[inline]
    #[must_use]
    pub const fn origin_z(self, chunk_size: usize) -> usize {
        self.z * chunk_size
    }
}

/// Validated grid shape.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridDimensions {
    /// Chunk width/depth in cells.
    pub chunk_size: usize,
    /// Column height in cells.
    pub max_height: usize,
    /// Chunks along X.
    pub world_size_x: usize,
    /// Chunks along Z.
    pub world_size_z: usize,
    /// World units per cell edge.
    pub voxel_size: f32,
}

impl GridDimensions {
    /// Creates grid dimensions, rejecting empty or degenerate shapes.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidParams`] if any extent is zero or the
    /// voxel size is not a positive finite number.
    pub fn new(
        chunk_size: usize,
        max_height: usize,
        world_size_x: usize,
        world_size_z: usize,
        voxel_size: f32,
    ) -> GenerationResult<Self> {
        if chunk_size == 0 {
            return Err(GenerationError::invalid("chunk_size", "must be positive"));
        }
        if max_height == 0 {
            return Err(GenerationError::invalid("max_height", "must be positive"));
        }
        if world_size_x == 0 || world_size_z == 0 {
            return Err(GenerationError::invalid("world_size", "must be positive"));
        }
        if !(voxel_size.is_finite() && voxel_size > 0.0) {
            return Err(GenerationError::invalid(
                "voxel_size",
                format!("must be a positive number, got {voxel_size}"),
            ));
        }
        Ok(Self {
            chunk_size,
            max_height,
            world_size_x,
            world_size_z,
            voxel_size,
        })
    }

    /// Cells per chunk.
    #[must_use]
    pub const fn cells_per_chunk(&self) -> usize {
        self.chunk_size * self.chunk_size * self.max_height
    }

    /// Number of chunks in the grid.
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.world_size_x * self.world_size_z
    }

    /// World width in cells along X.
    #[must_use]
    pub const fn cells_x(&self) -> usize {
        self.world_size_x * self.chunk_size
    }

    /// World depth in cells along Z.
    #[must_use]
    pub const fn cells_z(&self) -> usize {
        self.world_size_z * self.chunk_size
    }
}

/// A chunk of voxel data.
#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    /// Chunk position in the grid.
    pub coord: ChunkCoord,
    /// Width/depth in cells.
    size: usize,
    /// Height in cells.
    height: usize,
    /// Voxel data (indexed as [y][z][x]).
    voxels: Box<[Voxel]>,
    /// Running count of active cells.
    active: u64,
}

impl Chunk {
    /// Creates an all-air chunk.
    #[must_use]
    pub fn new(coord: ChunkCoord, size: usize, height: usize) -> Self {
        Self {
            coord,
            size,
            height,
            voxels: vec![Voxel::AIR; size * size * height].into_boxed_slice(),
            active: 0,
        }
    }

    /// Width/depth in cells.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Height in cells.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        (x < self.size && y < self.height && z < self.size)
            .then(|| (y * self.size + z) * self.size + x)
    }

    /// Gets a voxel at local coordinates. Out of range reads are air.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, y: usize, z: usize) -> Voxel {
        self.index(x, y, z).map_or(Voxel::AIR, |i| self.voxels[i])
    }

    /// Sets a voxel at local coordinates.
    ///
    /// Returns false (and writes nothing) if the coordinates are out of range.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, voxel: Voxel) -> bool {
        let Some(i) = self.index(x, y, z) else {
            return false;
        };
        let previous = self.voxels[i];
        match (previous.is_active(), voxel.is_active()) {
            (false, true) => self.active += 1,
            (true, false) => self.active -= 1,
            _ => {}
        }
        self.voxels[i] = voxel;
        true
    }

    /// Resets every cell to air.
    pub fn clear(&mut self) {
        self.voxels.fill(Voxel::AIR);
        self.active = 0;
    }

    /// Number of active cells.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> u64 {
        self.active
    }

    /// Height of the topmost active cell in a column, scanning down from the top.
    #[must_use]
    pub fn top_active(&self, x: usize, z: usize) -> Option<usize> {
        if x >= self.size || z >= self.size {
            return None;
        }
        (0..self.height).rev().find(|&y| self.get(x, y, z).is_active())
    }

    /// Iterates active cells as `(x, y, z, voxel)` in storage order.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, usize, usize, Voxel)> + '_ {
        let size = self.size;
        self.voxels
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_active())
            .map(move |(i, v)| {
                let x = i % size;
                let z = (i / size) % size;
                let y = i / (size * size);
                (x, y, z, *v)
            })
    }

    /// Raw voxel bytes, for byte-level comparison and hashing.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.voxels)
    }
}

/// The chunked voxel world.
///
/// Owns every chunk exclusively; nothing outside the generation pipeline
/// holds a reference into it.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkGrid {
    dims: GridDimensions,
    /// Chunks in row-major order (`z * world_size_x + x`).
    chunks: Vec<Chunk>,
}

impl ChunkGrid {
    /// Allocates an all-air grid.
    #[must_use]
    pub fn new(dims: GridDimensions) -> Self {
        let mut chunks = Vec::with_capacity(dims.chunk_count());
        for z in 0..dims.world_size_z {
            for x in 0..dims.world_size_x {
                chunks.push(Chunk::new(
                    ChunkCoord::new(x, z),
                    dims.chunk_size,
                    dims.max_height,
                ));
            }
        }
        Self { dims, chunks }
    }

    /// Grid shape.
    #[inline]
    #[must_use]
    pub const fn dims(&self) -> &GridDimensions {
        &self.dims
    }

    /// Chunk width/depth in cells.
    #[inline]
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.dims.chunk_size
    }

    /// Column height in cells.
    #[inline]
    #[must_use]
    pub const fn max_height(&self) -> usize {
        self.dims.max_height
    }

    /// World units per cell edge.
    #[inline]
    #[must_use]
    pub const fn voxel_size(&self) -> f32 {
        self.dims.voxel_size
    }

    /// Number of chunks.
    #[inline]
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// All chunks in row-major order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Mutable access to every chunk, for per-chunk generation jobs.
    pub fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    /// Gets a chunk by coordinate.
    #[must_use]
    pub fn chunk(&self, coord: ChunkCoord) -> Option<&Chunk> {
        if coord.x < self.dims.world_size_x && coord.z < self.dims.world_size_z {
            self.chunks.get(coord.z * self.dims.world_size_x + coord.x)
        } else {
            None
        }
    }

    /// Maps a global cell to `(chunk index, local x, y, local z)`.
    #[inline]
    fn locate(&self, gx: i64, gy: i64, gz: i64) -> Option<(usize, usize, usize, usize)> {
        if gx < 0 || gy < 0 || gz < 0 {
            return None;
        }
        let (gx, gy, gz) = (gx as usize, gy as usize, gz as usize);
        if gx >= self.dims.cells_x() || gz >= self.dims.cells_z() || gy >= self.dims.max_height {
            return None;
        }
        let size = self.dims.chunk_size;
        let chunk = (gz / size) * self.dims.world_size_x + gx / size;
        Some((chunk, gx % size, gy, gz % size))
    }

    /// Returns true if the global cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, gx: i64, gy: i64, gz: i64) -> bool {
        self.locate(gx, gy, gz).is_some()
    }

    /// Gets a voxel by global coordinates. Out of range reads are air.
    #[must_use]
    pub fn get(&self, gx: i64, gy: i64, gz: i64) -> Voxel {
        self.locate(gx, gy, gz)
            .map_or(Voxel::AIR, |(c, x, y, z)| self.chunks[c].get(x, y, z))
    }

    /// Sets a voxel by global coordinates.
    ///
    /// Returns false (and writes nothing) if the cell is outside the grid.
    pub fn set(&mut self, gx: i64, gy: i64, gz: i64, voxel: Voxel) -> bool {
        match self.locate(gx, gy, gz) {
            Some((c, x, y, z)) => self.chunks[c].set(x, y, z, voxel),
            None => false,
        }
    }

    /// Height of the topmost active cell in a global column.
    #[must_use]
    pub fn top_active(&self, gx: i64, gz: i64) -> Option<usize> {
        let (c, x, _, z) = self.locate(gx, 0, gz)?;
        self.chunks[c].top_active(x, z)
    }

    /// Total active cells, summed from the per-chunk counters.
    #[must_use]
    pub fn active_voxel_count(&self) -> u64 {
        self.chunks.iter().map(Chunk::active_count).sum()
    }

    /// Resets every chunk to air.
    pub fn clear(&mut self) {
        for chunk in &mut self.chunks {
            chunk.clear();
        }
    }

    /// FNV-1a hash over every voxel byte, in chunk order.
    ///
    /// Two grids with equal fingerprints are, for all practical purposes,
    /// byte-identical; used for determinism diagnostics.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for chunk in &self.chunks {
            for &byte in chunk.as_bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
        }
        hash
    }
}
