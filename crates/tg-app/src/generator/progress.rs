//! Cosmetic progress for jobs waiting on the remote call.
//!
//! The service reports nothing until it answers, so running jobs are nudged
//! forward a little on every tick and parked below [`PROGRESS_CEILING`]. The
//! store and job status are never touched.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tg_core::{Job, JobStatus};
use crate::generator::list::JobList;

pub const DEFAULT_TICK: Duration = Duration::from_millis(200);

/// Estimated progress never passes this until the job really finishes.
pub const PROGRESS_CEILING: f32 = 90.0;

/// Upper bound (exclusive) of the random step added per tick.
pub const MAX_STEP: f32 = 2.0;

/// Advance every running job below the ceiling. Returns how many moved.
pub fn advance(jobs: &mut [Job], rng: &mut impl Rng) -> usize {
    let mut moved = 0;
    for job in jobs.iter_mut() {
        if job.status() == JobStatus::Generating && job.progress() < PROGRESS_CEILING {
            job.set_progress(job.progress() + rng.gen_range(0.0..MAX_STEP));
            moved += 1;
        }
    }
    moved
}

/// Periodic task owned by the job manager. Started once, stopped once.
#[derive(Debug)]
pub struct ProgressTicker {
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressTicker {
    /// Spawn the ticking task. Must be called from within a Tokio runtime.
    pub fn start(jobs: Arc<JobList>, tick: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("Progress ticker stopping");
                        break;
                    }
                    _ = interval.tick() => {
                        let mut rng = rand::thread_rng();
                        jobs.update_each(|job| {
                            advance(std::slice::from_mut(job), &mut rng);
                        });
                    }
                }
            }
        });

        Self {
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Cancel the task and wait for it to exit. Later calls return at once.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
