//! # Terrain Objects
//!
//! A terrain owns its grid and the key of the mesh it installed into a
//! renderer. The renderer is reached only through [`RenderSink`].
//!
//! ## Lifecycle
//!
//! ```text
//! Unconfigured ──generate──► Generating ──► Generated ──regenerate──► Regenerating ──► Generated
//!                                               │                                          │
//!                                               └──────────────── destroy ─────────────────┴──► Destroyed
//! ```
//!
//! A failed run leaves the previous mesh installed. A successful run
//! installs the new mesh first and releases the old one right after.
//!
//! ## Epochs
//!
//! Every run, synchronous or background, takes its epoch from one counter.
//! A terrain fed by a [`GenerationService`](crate::GenerationService) must
//! share the service's counter (see [`Terrain::with_epoch_source`]) so that
//! both kinds of run are ordered against each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use terravox_meshing::InstancedMesh;
use terravox_procedural::{
    CancelToken, ChunkGrid, GenerationError, GenerationParams, GenerationResult, GeneratorConfig,
    MaterialPalette,
};

use crate::persist::PersistedTerrain;
use crate::pipeline::{BuiltTerrain, TerrainPipeline};
use crate::service::GenerationOutcome;

/// Handle to a mesh installed in a [`RenderSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshKey(pub u64);

/// Renderer seam.
///
/// The renderer takes ownership of every installed mesh and frees it on
/// release.
pub trait RenderSink {
    /// Takes ownership of a mesh and returns its key.
    fn install(&mut self, mesh: InstancedMesh) -> MeshKey;

    /// Frees the mesh behind `key`. Unknown keys are ignored.
    fn release(&mut self, key: MeshKey);
}

/// In-process [`RenderSink`] that keeps meshes in a map.
///
/// Used by the CLI and tests to account for every instance buffer.
#[derive(Debug, Default)]
pub struct MeshRegistry {
    next_key: u64,
    live: HashMap<MeshKey, InstancedMesh>,
    installs: u64,
    releases: u64,
}

impl MeshRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Meshes currently installed.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Looks up a live mesh.
    #[must_use]
    pub fn get(&self, key: MeshKey) -> Option<&InstancedMesh> {
        self.live.get(&key)
    }

    /// Instances across every live mesh.
    #[must_use]
    pub fn live_instances(&self) -> usize {
        self.live.values().map(InstancedMesh::instance_count).sum()
    }

    /// Total installs so far.
    #[must_use]
    pub const fn installs(&self) -> u64 {
        self.installs
    }

    /// Total releases of live meshes so far.
    #[must_use]
    pub const fn releases(&self) -> u64 {
        self.releases
    }
}

impl RenderSink for MeshRegistry {
    fn install(&mut self, mesh: InstancedMesh) -> MeshKey {
        self.next_key += 1;
        let key = MeshKey(self.next_key);
        self.live.insert(key, mesh);
        self.installs += 1;
        key
    }

    fn release(&mut self, key: MeshKey) {
        if self.live.remove(&key).is_some() {
            self.releases += 1;
        }
    }
}

impl<S: RenderSink + ?Sized> RenderSink for &mut S {
    fn install(&mut self, mesh: InstancedMesh) -> MeshKey {
        (**self).install(mesh)
    }

    fn release(&mut self, key: MeshKey) {
        (**self).release(key);
    }
}

/// Terrain lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerrainState {
    /// Nothing generated yet.
    Unconfigured,
    /// First generation running.
    Generating,
    /// A mesh is installed.
    Generated,
    /// Replacing an installed mesh.
    Regenerating,
    /// Released; every operation fails with `Destroyed`.
    Destroyed,
}

/// Summary of the installed terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerrainHandle {
    /// Renderer key of the installed mesh.
    pub key: MeshKey,
    /// Epoch of the run that produced it.
    pub epoch: u64,
    /// Instances in the mesh.
    pub instance_count: usize,
    /// Active voxels in the grid.
    pub active_voxels: u64,
    /// Trees placed.
    pub trees: usize,
}

/// A procedural terrain bound to a renderer.
pub struct Terrain<S: RenderSink> {
    sink: S,
    pipeline: TerrainPipeline,
    epochs: Arc<AtomicU64>,
    state: TerrainState,
    palette: MaterialPalette,
    params: Option<GenerationParams>,
    grid: Option<ChunkGrid>,
    handle: Option<TerrainHandle>,
}

impl<S: RenderSink> Terrain<S> {
    /// Creates an unconfigured terrain with its own epoch counter.
    #[must_use]
    pub fn new(sink: S, config: GeneratorConfig) -> Self {
        Self::with_epoch_source(sink, config, Arc::new(AtomicU64::new(0)))
    }

    /// Creates an unconfigured terrain that numbers its runs from `epochs`.
    ///
    /// Pass [`GenerationService::epoch_source`](crate::GenerationService::epoch_source)
    /// when outcomes from that service will be installed here.
    #[must_use]
    pub fn with_epoch_source(sink: S, config: GeneratorConfig, epochs: Arc<AtomicU64>) -> Self {
        Self {
            sink,
            pipeline: TerrainPipeline::new(config),
            epochs,
            state: TerrainState::Unconfigured,
            palette: MaterialPalette::default(),
            params: None,
            grid: None,
            handle: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> TerrainState {
        self.state
    }

    /// The renderer.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// The installed terrain, if any.
    #[must_use]
    pub const fn handle(&self) -> Option<&TerrainHandle> {
        self.handle.as_ref()
    }

    /// Parameters of the installed terrain.
    #[must_use]
    pub const fn params(&self) -> Option<&GenerationParams> {
        self.params.as_ref()
    }

    /// Palette used for the next build.
    #[must_use]
    pub const fn palette(&self) -> &MaterialPalette {
        &self.palette
    }

    /// The installed grid.
    #[must_use]
    pub const fn grid(&self) -> Option<&ChunkGrid> {
        self.grid.as_ref()
    }

    /// Active voxels in the installed grid; 0 before the first generation.
    #[must_use]
    pub fn active_voxel_count(&self) -> u64 {
        self.grid.as_ref().map_or(0, ChunkGrid::active_voxel_count)
    }

    /// Installs `palette` and generates from `params`.
    ///
    /// # Errors
    ///
    /// Any pipeline error. On error the previously installed mesh (if any)
    /// stays installed.
    pub fn generate(
        &mut self,
        params: GenerationParams,
        palette: MaterialPalette,
    ) -> GenerationResult<TerrainHandle> {
        self.ensure_alive()?;
        self.palette = palette;
        self.run(&params)
    }

    /// Generates again from `params` with the installed palette, replacing
    /// the current mesh.
    ///
    /// # Errors
    ///
    /// Any pipeline error. On error the previous mesh stays installed.
    pub fn regenerate(&mut self, params: GenerationParams) -> GenerationResult<TerrainHandle> {
        self.ensure_alive()?;
        self.run(&params)
    }

    /// Installs a result built in the background.
    ///
    /// # Errors
    ///
    /// - `Destroyed` if the terrain was destroyed
    /// - `Superseded` if the outcome is not newer than the installed one
    /// - The outcome's own error if its build failed
    pub fn install(&mut self, outcome: GenerationOutcome) -> GenerationResult<TerrainHandle> {
        self.ensure_alive()?;
        let installed = self.installed_epoch();
        if outcome.epoch <= installed {
            tracing::warn!(
                outcome_epoch = outcome.epoch,
                installed_epoch = installed,
                "discarding stale generation outcome"
            );
            return Err(GenerationError::Superseded { epoch: installed });
        }
        let built = outcome.result?;
        self.palette = built.params.palette;
        Ok(self.install_built(built, outcome.epoch))
    }

    /// Releases the mesh and grid. Further calls fail with `Destroyed`.
    ///
    /// Calling this twice is harmless.
    pub fn destroy(&mut self) {
        if self.state == TerrainState::Destroyed {
            return;
        }
        if let Some(handle) = self.handle.take() {
            self.sink.release(handle.key);
        }
        self.grid = None;
        self.state = TerrainState::Destroyed;
        tracing::info!("terrain destroyed");
    }

    /// Snapshot of the installed parameters for saving.
    #[must_use]
    pub fn persist(&self, id: Option<String>) -> Option<PersistedTerrain> {
        self.params.clone().map(|params| PersistedTerrain { id, params })
    }

    fn ensure_alive(&self) -> GenerationResult<()> {
        if self.state == TerrainState::Destroyed {
            Err(GenerationError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn installed_epoch(&self) -> u64 {
        self.handle.map_or(0, |h| h.epoch)
    }

    fn run(&mut self, params: &GenerationParams) -> GenerationResult<TerrainHandle> {
        let previous = self.state;
        self.state = if self.handle.is_some() {
            TerrainState::Regenerating
        } else {
            TerrainState::Generating
        };

        let epoch = self.epochs.fetch_add(1, Ordering::AcqRel) + 1;
        let cancel = CancelToken::for_epoch(epoch, Arc::clone(&self.epochs));
        match self.pipeline.build(params, &self.palette, &cancel) {
            Ok(built) => Ok(self.install_built(built, epoch)),
            Err(err) => {
                tracing::warn!(error = %err, "generation failed, keeping previous terrain");
                self.state = previous;
                Err(err)
            }
        }
    }

    fn install_built(&mut self, built: BuiltTerrain, epoch: u64) -> TerrainHandle {
        let BuiltTerrain {
            params,
            grid,
            mesh,
            vegetation,
            ..
        } = built;

        let instance_count = mesh.instance_count();
        let key = self.sink.install(mesh);
        if let Some(old) = self.handle.take() {
            self.sink.release(old.key);
            tracing::debug!(old = old.key.0, new = key.0, "replaced terrain mesh");
        }

        let handle = TerrainHandle {
            key,
            epoch,
            instance_count,
            active_voxels: grid.active_voxel_count(),
            trees: vegetation.tree_count(),
        };
        self.grid = Some(grid);
        self.params = Some(params);
        self.handle = Some(handle);
        self.state = TerrainState::Generated;

        tracing::info!(
            epoch,
            instances = instance_count,
            trees = handle.trees,
            "terrain installed"
        );
        handle
    }
}

impl<S: RenderSink> Drop for Terrain<S> {
    fn drop(&mut self) {
        self.destroy();
    }
}
