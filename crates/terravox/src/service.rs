//! # Background Generation Service
//!
//! Runs terrain builds off the caller's thread.
//!
//! ## Coalescing
//!
//! Requests go into a single-slot mailbox: a new request overwrites any
//! job that has not started yet, and bumps the shared epoch counter,
//! which cancels the job that is running. Only the newest request ever
//! produces an outcome the caller needs to look at.
//!
//! ```text
//! request(1) request(2) request(3)
//!     │          │          │
//!     ▼          ▼          ▼
//!   slot ──► worker: build(1) ✗ cancelled
//!                    build(3) ──► outcomes channel ──► Terrain::install
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};
use terravox_procedural::{
    CancelToken, GenerationError, GenerationParams, GenerationResult, GeneratorConfig,
    MaterialPalette,
};

use crate::pipeline::{BuiltTerrain, TerrainPipeline};

/// Service configuration.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Worker pool used for each build.
    pub generator: GeneratorConfig,
    /// Finished outcomes buffered before the worker waits for the caller.
    pub completion_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            completion_capacity: 4,
        }
    }
}

impl ServiceConfig {
    /// Production config: full worker pool with a deep chunk queue.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            generator: GeneratorConfig::production(),
            completion_capacity: 4,
        }
    }
}

/// A finished background build.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// Request epoch this outcome answers.
    pub epoch: u64,
    /// The build result.
    pub result: GenerationResult<BuiltTerrain>,
}

/// Receipt for a queued request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobTicket {
    /// Epoch assigned to the request.
    pub epoch: u64,
}

struct Job {
    epoch: u64,
    params: GenerationParams,
    palette: MaterialPalette,
}

/// State shared between the service handle and its worker.
struct Shared {
    slot: Mutex<Option<Job>>,
    wake: Condvar,
    /// Newest requested epoch; running jobs with a lower epoch are cancelled.
    latest: Arc<AtomicU64>,
    shutdown: AtomicBool,
}

/// Owns one background worker thread and its pipeline.
pub struct GenerationService {
    shared: Arc<Shared>,
    outcomes: Receiver<GenerationOutcome>,
    worker: Option<JoinHandle<()>>,
}

impl GenerationService {
    /// Starts the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::WorkerStopped`] if the thread cannot be spawned.
    pub fn start(config: ServiceConfig) -> GenerationResult<Self> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(None),
            wake: Condvar::new(),
            latest: Arc::new(AtomicU64::new(0)),
            shutdown: AtomicBool::new(false),
        });
        let (outcome_tx, outcomes) = bounded(config.completion_capacity.max(1));

        let worker_shared = Arc::clone(&shared);
        let pipeline = TerrainPipeline::new(config.generator);
        let worker = thread::Builder::new()
            .name("terravox-generation".to_string())
            .spawn(move || Self::worker_loop(&worker_shared, &pipeline, &outcome_tx))
            .map_err(|e| {
                tracing::error!(error = %e, "failed to spawn generation worker");
                GenerationError::WorkerStopped
            })?;

        Ok(Self {
            shared,
            outcomes,
            worker: Some(worker),
        })
    }

    /// Worker thread main loop.
    fn worker_loop(shared: &Shared, pipeline: &TerrainPipeline, outcome_tx: &Sender<GenerationOutcome>) {
        loop {
            let job = {
                let mut slot = shared.slot.lock();
                loop {
                    if shared.shutdown.load(Ordering::Acquire) {
                        return;
                    }
                    if let Some(job) = slot.take() {
                        break job;
                    }
                    shared.wake.wait(&mut slot);
                }
            };

            let cancel = CancelToken::for_epoch(job.epoch, Arc::clone(&shared.latest));
            let result = pipeline.build(&job.params, &job.palette, &cancel);

            if let Some(newer) = cancel.superseded_by() {
                tracing::debug!(epoch = job.epoch, newer, "dropping superseded build");
                continue;
            }
            if outcome_tx
                .send(GenerationOutcome {
                    epoch: job.epoch,
                    result,
                })
                .is_err()
            {
                return;
            }
        }
    }

    /// Queues a build, replacing any request that has not started.
    ///
    /// # Errors
    ///
    /// - `WorkerStopped` after shutdown
    /// - `InvalidParams` if `params` is rejected; nothing is queued
    pub fn request(
        &self,
        params: GenerationParams,
        palette: MaterialPalette,
    ) -> GenerationResult<JobTicket> {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(GenerationError::WorkerStopped);
        }
        params.validate()?;

        let mut slot = self.shared.slot.lock();
        let epoch = self.shared.latest.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(replaced) = slot.replace(Job {
            epoch,
            params,
            palette,
        }) {
            tracing::debug!(replaced = replaced.epoch, epoch, "coalesced pending request");
        }
        drop(slot);
        self.shared.wake.notify_one();

        Ok(JobTicket { epoch })
    }

    /// Newest epoch handed out.
    #[must_use]
    pub fn latest_epoch(&self) -> u64 {
        self.shared.latest.load(Ordering::Acquire)
    }

    /// The counter request epochs are drawn from.
    ///
    /// A [`Terrain`](crate::Terrain) that installs this service's outcomes
    /// must number its own runs from the same counter.
    #[must_use]
    pub fn epoch_source(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.shared.latest)
    }

    /// Returns a finished outcome if one is ready.
    #[must_use]
    pub fn try_recv(&self) -> Option<GenerationOutcome> {
        self.outcomes.try_recv().ok()
    }

    /// Waits up to `timeout` for a finished outcome.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::WorkerStopped`] if the worker has exited.
    pub fn recv_timeout(&self, timeout: Duration) -> GenerationResult<Option<GenerationOutcome>> {
        match self.outcomes.recv_timeout(timeout) {
            Ok(outcome) => Ok(Some(outcome)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(GenerationError::WorkerStopped),
        }
    }

    /// Waits until the outcome for `ticket` (or a newer one) arrives.
    ///
    /// Older outcomes received on the way are returned too, oldest first.
    ///
    /// # Errors
    ///
    /// - `Timeout` if `timeout` elapses between outcomes
    /// - `WorkerStopped` if the worker has exited
    pub fn wait_for(
        &self,
        ticket: JobTicket,
        timeout: Duration,
    ) -> GenerationResult<Vec<GenerationOutcome>> {
        let mut received = Vec::new();
        loop {
            let Some(outcome) = self.recv_timeout(timeout)? else {
                return Err(GenerationError::Timeout(timeout));
            };
            let done = outcome.epoch >= ticket.epoch;
            received.push(outcome);
            if done {
                return Ok(received);
            }
        }
    }

    /// Stops the worker and waits for it. A running build is cancelled.
    pub fn shutdown(&mut self) {
        if self.worker.is_none() {
            return;
        }
        self.shared.shutdown.store(true, Ordering::Release);
        // Cancel whatever is running.
        self.shared.latest.fetch_add(1, Ordering::AcqRel);
        {
            let _slot = self.shared.slot.lock();
            self.shared.wake.notify_all();
        }
        // Unblock a worker waiting on a full completion channel.
        self.outcomes = crossbeam_channel::never();

        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("generation worker panicked");
            }
        }
        tracing::info!("generation service stopped");
    }
}

impl Drop for GenerationService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terravox_procedural::Biome;

    const WAIT: Duration = Duration::from_secs(60);

    fn small(seed: u32) -> GenerationParams {
        GenerationParams {
            seed,
            chunk_size: 16,
            ..GenerationParams::default()
        }
    }

    #[test]
    fn test_single_request_completes() {
        let service = GenerationService::start(ServiceConfig::default()).unwrap();
        let ticket = service.request(small(1), MaterialPalette::default()).unwrap();
        assert_eq!(ticket.epoch, 1);

        let outcomes = service.wait_for(ticket, WAIT).unwrap();
        let last = outcomes.last().unwrap();
        assert_eq!(last.epoch, 1);
        let built = last.result.as_ref().unwrap();
        assert!(built.grid.active_voxel_count() > 0);
    }

    #[test]
    fn test_rapid_requests_coalesce_to_latest() {
        let service = GenerationService::start(ServiceConfig::default()).unwrap();
        let palette = MaterialPalette::default();
        service.request(small(1), palette).unwrap();
        service.request(small(2), palette).unwrap();
        let last = service.request(small(3), palette).unwrap();
        assert_eq!(last.epoch, 3);

        let outcomes = service.wait_for(last, WAIT).unwrap();
        println!("Received epochs: {:?}", outcomes.iter().map(|o| o.epoch).collect::<Vec<_>>());
        assert_eq!(outcomes.last().map(|o| o.epoch), Some(3));
        assert!(outcomes.windows(2).all(|w| w[0].epoch < w[1].epoch));
        assert!(outcomes.len() <= 3);
    }

    #[test]
    fn test_invalid_request_rejected_up_front() {
        let service = GenerationService::start(ServiceConfig::default()).unwrap();
        let bad = GenerationParams {
            chunk_size: 0,
            ..GenerationParams::for_biome(Biome::Desert)
        };
        assert!(matches!(
            service.request(bad, MaterialPalette::default()),
            Err(GenerationError::InvalidParams { .. })
        ));
        assert_eq!(service.latest_epoch(), 0);
    }

    #[test]
    fn test_wait_without_outcome_times_out() {
        let service = GenerationService::start(ServiceConfig::default()).unwrap();
        let never_requested = JobTicket { epoch: 1 };
        let wait = Duration::from_millis(50);
        assert_eq!(
            service.wait_for(never_requested, wait).unwrap_err(),
            GenerationError::Timeout(wait)
        );
    }

    #[test]
    fn test_request_after_shutdown_fails() {
        let mut service = GenerationService::start(ServiceConfig::default()).unwrap();
        service.shutdown();
        service.shutdown();
        assert_eq!(
            service.request(small(1), MaterialPalette::default()).unwrap_err(),
            GenerationError::WorkerStopped
        );
    }
}
