//! # Parallel Chunk Generation
//!
//! Fills every chunk of a grid from a [`BiomeRule`].
//!
//! ## Execution Model
//!
//! - One chunk is one unit of work
//! - Workers are scoped threads pulling `&mut Chunk` from a bounded queue
//! - Inside a chunk, generation is single-threaded
//! - Workers share only the immutable rule; no locks on the hot path
//!
//! The output does not depend on the worker count or on scheduling order:
//! every cell is a pure function of its global coordinates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::bounded;

use crate::biome::BiomeRule;
use crate::chunk::{Chunk, ChunkGrid};
use crate::error::{GenerationError, GenerationResult};

/// Worker pool configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Worker thread count. 0 uses the available parallelism.
    ///
    /// Always clamped to the number of chunks.
    pub worker_threads: usize,
    /// Capacity of the chunk job queue.
    pub queue_depth: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            queue_depth: 8,
        }
    }
}

impl GeneratorConfig {
    /// Single worker on the calling thread. Useful for tests and profiling.
    #[must_use]
    pub const fn single_threaded() -> Self {
        Self {
            worker_threads: 1,
            queue_depth: 1,
        }
    }

    /// Production config: every core, deeper queue so workers never starve
    /// while the feeder hands out small chunks.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            worker_threads: 0,
            queue_depth: 64,
        }
    }
}

/// Cooperative cancellation for one generation run.
///
/// A token belongs to a request epoch and shares a "latest epoch" counter
/// with every other request from the same source. It reads as cancelled
/// once a newer epoch has been published.
#[derive(Clone, Debug)]
pub struct CancelToken {
    epoch: u64,
    latest: Arc<AtomicU64>,
}

impl CancelToken {
    /// A token that is never cancelled unless [`cancel`](Self::cancel) is called.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: 0,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A token for request `epoch`, watching a shared latest-epoch counter.
    #[must_use]
    pub const fn for_epoch(epoch: u64, latest: Arc<AtomicU64>) -> Self {
        Self { epoch, latest }
    }

    /// Epoch this token belongs to.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Marks the run as superseded.
    pub fn cancel(&self) {
        self.latest.fetch_max(self.epoch + 1, Ordering::AcqRel);
    }

    /// Epoch of the newer request, if one has replaced this run.
    #[inline]
    #[must_use]
    pub fn superseded_by(&self) -> Option<u64> {
        let latest = self.latest.load(Ordering::Acquire);
        (latest > self.epoch).then_some(latest)
    }

    /// Returns true if a newer request has replaced this run.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.superseded_by().is_some()
    }

    /// Fails with [`GenerationError::Superseded`] if cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Superseded`] carrying the newer epoch.
    #[inline]
    pub fn check(&self) -> GenerationResult<()> {
        match self.superseded_by() {
            Some(epoch) => Err(GenerationError::Superseded { epoch }),
            None => Ok(()),
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary of one generation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationStats {
    /// Chunks generated.
    pub chunks: usize,
    /// Columns evaluated.
    pub columns: u64,
    /// Active voxels in the grid after the run.
    pub active_voxels: u64,
    /// Worker threads used.
    pub workers: usize,
    /// Wall-clock time.
    pub elapsed: Duration,
}

/// Generates chunk contents on a bounded worker pool.
#[derive(Clone, Debug, Default)]
pub struct ParallelGenerator {
    config: GeneratorConfig,
}

impl ParallelGenerator {
    /// Creates a generator.
    #[must_use]
    pub const fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    /// Pool configuration.
    #[must_use]
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Number of workers a grid of `chunk_count` chunks will get.
    #[must_use]
    pub fn worker_count(&self, chunk_count: usize) -> usize {
        let requested = if self.config.worker_threads == 0 {
            thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        } else {
            self.config.worker_threads
        };
        requested.min(chunk_count).max(1)
    }

    /// Overwrites every cell of `grid` with the rule's result.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Superseded`] if `cancel` fires. The grid
    /// is then partially written and must be discarded.
    pub fn generate(
        &self,
        grid: &mut ChunkGrid,
        rule: &BiomeRule,
        cancel: &CancelToken,
    ) -> GenerationResult<GenerationStats> {
        let start = Instant::now();
        let chunks = grid.chunk_count();
        let workers = self.worker_count(chunks);

        tracing::info!(
            biome = ?rule.biome(),
            chunks,
            workers,
            epoch = cancel.epoch(),
            "chunk generation started"
        );
        cancel.check()?;

        if workers == 1 {
            for chunk in grid.chunks_mut() {
                cancel.check()?;
                fill_chunk(chunk, rule);
            }
        } else {
            let (job_tx, job_rx) = bounded::<&mut Chunk>(self.config.queue_depth.max(1));

            thread::scope(|scope| {
                for _ in 0..workers {
                    let job_rx = job_rx.clone();
                    scope.spawn(move || {
                        // Keep draining after cancellation so the feeder never blocks.
                        for chunk in &job_rx {
                            if !cancel.is_cancelled() {
                                fill_chunk(chunk, rule);
                            }
                        }
                    });
                }
                drop(job_rx);

                for chunk in grid.chunks_mut() {
                    if cancel.is_cancelled() || job_tx.send(chunk).is_err() {
                        break;
                    }
                }
                drop(job_tx);
            });

            cancel.check()?;
        }

        let stats = GenerationStats {
            chunks,
            columns: (grid.dims().cells_x() * grid.dims().cells_z()) as u64,
            active_voxels: grid.active_voxel_count(),
            workers,
            elapsed: start.elapsed(),
        };
        tracing::info!(
            active_voxels = stats.active_voxels,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "chunk generation finished"
        );
        Ok(stats)
    }
}

/// Generates one chunk: one column sample per (x, z), then every cell up to
/// the surface. Cells above the surface stay air.
fn fill_chunk(chunk: &mut Chunk, rule: &BiomeRule) {
    let size = chunk.size();
    let height = chunk.height();
    let origin_x = chunk.coord.origin_x(size) as i64;
    let origin_z = chunk.coord.origin_z(size) as i64;

    chunk.clear();

    for lz in 0..size {
        let gz = origin_z + lz as i64;
        for lx in 0..size {
            let gx = origin_x + lx as i64;
            let column = rule.column(gx, gz);
            if column.height < 0 {
                continue;
            }
            let top = (column.height as usize).min(height - 1);
            for y in 0..=top {
                chunk.set(lx, y, lz, rule.cell(column, gx, y as i64, gz));
            }
        }
    }

    tracing::trace!(x = chunk.coord.x, z = chunk.coord.z, active = chunk.active_count(), "chunk filled");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::Biome;
    use crate::params::GenerationParams;

    fn small_params(biome: Biome) -> GenerationParams {
        GenerationParams {
            biome,
            chunk_size: 8,
            world_size: 3,
            max_height: 48,
            ..GenerationParams::default()
        }
    }

    fn run(params: &GenerationParams, config: GeneratorConfig) -> (ChunkGrid, GenerationStats) {
        let mut grid = ChunkGrid::new(params.dimensions().unwrap());
        let rule = BiomeRule::new(params);
        let stats = ParallelGenerator::new(config)
            .generate(&mut grid, &rule, &CancelToken::new())
            .unwrap();
        (grid, stats)
    }

    #[test]
    fn test_every_cell_matches_rule() {
        let params = small_params(Biome::Plains);
        let (grid, stats) = run(&params, GeneratorConfig::default());
        let rule = BiomeRule::new(&params);

        let dims = *grid.dims();
        for gz in 0..dims.cells_z() as i64 {
            for gx in 0..dims.cells_x() as i64 {
                for gy in 0..dims.max_height as i64 {
                    assert_eq!(grid.get(gx, gy, gz), rule.evaluate(gx, gy, gz));
                }
            }
        }
        assert_eq!(stats.chunks, 9);
        assert_eq!(stats.columns, 24 * 24);
        assert_eq!(stats.active_voxels, grid.active_voxel_count());
        assert!(stats.active_voxels > 0);
    }

    #[test]
    fn test_worker_count_does_not_change_output() {
        let params = small_params(Biome::Caves);
        let (single, _) = run(&params, GeneratorConfig::single_threaded());
        let (pooled, stats) = run(
            &params,
            GeneratorConfig {
                worker_threads: 4,
                queue_depth: 2,
            },
        );

        println!("Pooled run: {stats:?}");
        assert_eq!(stats.workers, 4);
        assert_eq!(single.fingerprint(), pooled.fingerprint());
        assert_eq!(single, pooled);
    }

    #[test]
    fn test_regenerating_dirty_grid_matches_fresh() {
        let params = small_params(Biome::Mountains);
        let rule = BiomeRule::new(&params);
        let generator = ParallelGenerator::default();

        let mut grid = ChunkGrid::new(params.dimensions().unwrap());
        // Fill with junk from another biome first.
        generator
            .generate(&mut grid, &BiomeRule::new(&small_params(Biome::Desert)), &CancelToken::new())
            .unwrap();
        generator.generate(&mut grid, &rule, &CancelToken::new()).unwrap();

        let (fresh, _) = run(&params, GeneratorConfig::default());
        assert_eq!(grid, fresh);
    }

    #[test]
    fn test_worker_count_clamped_to_chunks() {
        let generator = ParallelGenerator::new(GeneratorConfig {
            worker_threads: 32,
            queue_depth: 4,
        });
        assert_eq!(generator.worker_count(3), 3);
        assert_eq!(generator.worker_count(0), 1);
        assert!(ParallelGenerator::default().worker_count(1000) >= 1);
    }

    #[test]
    fn test_cancelled_run_is_superseded() {
        let params = small_params(Biome::Plains);
        let mut grid = ChunkGrid::new(params.dimensions().unwrap());
        let rule = BiomeRule::new(&params);

        let latest = Arc::new(AtomicU64::new(1));
        let token = CancelToken::for_epoch(1, Arc::clone(&latest));
        assert!(!token.is_cancelled());

        latest.store(3, Ordering::Release);
        let result = ParallelGenerator::default().generate(&mut grid, &rule, &token);
        assert_eq!(result, Err(GenerationError::Superseded { epoch: 3 }));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled(), "Clones share cancellation");
        assert_eq!(clone.superseded_by(), Some(1));
    }
}
