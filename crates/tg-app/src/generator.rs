pub mod backend;
pub mod db;
mod list;
pub mod progress;
pub mod retry;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use tg_core::{CoreError, GenerationSettings, ImageArtifact, Job, JobId};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::events::JobEvent;
use crate::generator::backend::ImageBackend;
use crate::generator::db::JobStore;
use crate::generator::list::JobList;
use crate::generator::progress::{DEFAULT_TICK, ProgressTicker};
use crate::generator::retry::RetryPolicy;
use crate::session::{ActiveJobGuard, ApiKey, CREDENTIAL_INVALID_SIGNAL, SessionContext};

pub const MIN_REPLICATES: u32 = 1;
pub const MAX_REPLICATES: u32 = 4;

const EVENT_CAPACITY: usize = 256;

/// Clamp a requested replicate count into `[MIN_REPLICATES, MAX_REPLICATES]`.
pub fn clamp_replicates(requested: u32) -> u32 {
    requested.clamp(MIN_REPLICATES, MAX_REPLICATES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerOptions {
    pub retry: RetryPolicy,
    pub progress_tick: Duration,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            progress_tick: DEFAULT_TICK,
        }
    }
}

impl From<&AppConfig> for ManagerOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            retry: config.retry,
            progress_tick: config.progress_tick,
        }
    }
}

/// State shared between the manager and its job tasks.
struct Shared {
    store: Arc<dyn JobStore>,
    backend: Arc<dyn ImageBackend>,
    retry: RetryPolicy,
    jobs: Arc<JobList>,
    session: Arc<SessionContext>,
    events: broadcast::Sender<JobEvent>,
    /// Held by every list-membership check that is followed by a store
    /// write, and by removals, so a removed job is never written back.
    writes: AsyncMutex<()>,
}

impl Shared {
    /// Store failures never interrupt the caller; memory stays authoritative.
    async fn persist(&self, job: &Job) {
        if let Err(e) = self.store.put(job).await {
            warn!(job_id = %job.id(), error = %e, "Failed to save job to database");
        }
    }

    fn notify(&self, event: JobEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Owns the in-memory gallery and drives each job from submission to a
/// terminal state.
pub struct JobManager {
    shared: Arc<Shared>,
    tasks: Mutex<JoinSet<()>>,
    ticker: ProgressTicker,
    history_loaded: AtomicBool,
}

impl JobManager {
    /// Must be called from within a Tokio runtime; starts the progress ticker.
    pub fn new(
        store: Arc<dyn JobStore>,
        backend: Arc<dyn ImageBackend>,
        session: Arc<SessionContext>,
        options: ManagerOptions,
    ) -> Self {
        let jobs = Arc::new(JobList::default());
        let ticker = ProgressTicker::start(Arc::clone(&jobs), options.progress_tick);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                store,
                backend,
                retry: options.retry,
                jobs,
                session,
                events,
                writes: AsyncMutex::new(()),
            }),
            tasks: Mutex::new(JoinSet::new()),
            ticker,
            history_loaded: AtomicBool::new(false),
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.shared.session
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.shared.events.subscribe()
    }

    /// Current gallery, newest first.
    pub fn jobs(&self) -> Vec<Job> {
        self.shared.jobs.snapshot()
    }

    pub fn job(&self, id: JobId) -> Option<Job> {
        self.shared.jobs.get(id)
    }

    pub fn active_jobs(&self) -> usize {
        self.shared.session.active_jobs()
    }

    pub fn set_api_key(&self, key: ApiKey) {
        self.shared.session.set_api_key(key);
        info!("API key updated");
    }

    /// Read the stored gallery once at startup. Jobs that were queued or
    /// generating belonged to a process that no longer exists; they are
    /// marked as interrupted and saved back. Returns how many were repaired.
    pub async fn load_history(&self) -> usize {
        if self.history_loaded.swap(true, Ordering::SeqCst) {
            warn!("Job history already loaded, ignoring");
            return 0;
        }

        let mut jobs = match self.shared.store.get_all().await {
            Ok(jobs) => jobs,
            Err(e) => {
                error!(error = %e, "Failed to fetch jobs from database");
                Vec::new()
            }
        };
        info!(count = jobs.len(), "Loaded jobs from database");

        let _writes = self.shared.writes.lock().await;
        let mut repaired = 0;
        for job in jobs.iter_mut() {
            // Jobs submitted by this process are live, not stale.
            if self.shared.jobs.contains(job.id()) {
                continue;
            }
            let was = job.status();
            if job.interrupt() {
                info!(job_id = %job.id(), status = %was, "Cleaning up stale job");
                self.shared.persist(job).await;
                repaired += 1;
            }
        }

        let count = jobs.len();
        self.shared.jobs.merge_history(jobs);
        self.shared.notify(JobEvent::HistoryLoaded { count, repaired });

        repaired
    }

    /// Create `replicate_count` jobs (clamped to 1..=4) from one settings
    /// snapshot, save them, then run each one concurrently. Returns the new
    /// ids, newest-first order as shown in the gallery.
    pub async fn submit(
        &self,
        settings: &GenerationSettings,
        replicate_count: u32,
    ) -> Result<Vec<JobId>, CoreError> {
        settings.validate()?;

        let count = clamp_replicates(replicate_count);
        let jobs: Vec<Job> = (0..count).map(|_| Job::new(settings.clone())).collect();
        let guards: Vec<ActiveJobGuard> = jobs
            .iter()
            .map(|_| ActiveJobGuard::acquire(&self.shared.session))
            .collect();

        {
            let _writes = self.shared.writes.lock().await;
            self.shared.jobs.prepend(&jobs);
            for job in &jobs {
                self.shared.notify(JobEvent::Queued(job.clone()));
            }
            info!(count, active = self.active_jobs(), "Jobs queued");

            // Queued records land in the store before anything runs, so a
            // crash from here on leaves something to recover.
            join_all(jobs.iter().map(|job| self.shared.persist(job))).await;
        }

        let ids = jobs.iter().map(Job::id).collect();

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        for (job, guard) in jobs.into_iter().zip(guards) {
            tasks.spawn(run_job(Arc::clone(&self.shared), job, guard));
        }

        Ok(ids)
    }

    /// Delete a job from the store and the gallery. Unknown ids are ignored.
    pub async fn remove(&self, id: JobId) -> bool {
        let _writes = self.shared.writes.lock().await;
        if let Err(e) = self.shared.store.delete(id).await {
            warn!(job_id = %id, error = %e, "Failed to delete job from database");
        }

        let removed = self.shared.jobs.remove(id);
        if removed {
            self.shared.notify(JobEvent::Removed(id));
        }
        removed
    }

    /// Wipe every record, stored and in memory. Callers confirm first.
    pub async fn clear_all(&self) {
        let _writes = self.shared.writes.lock().await;
        if let Err(e) = self.shared.store.clear().await {
            error!(error = %e, "Failed to clear database");
        }

        self.shared.jobs.clear();
        self.shared.notify(JobEvent::Cleared);
        info!("Gallery cleared");
    }

    /// Write a finished job's image into `dir` and return the file path.
    pub async fn export(&self, id: JobId, dir: &Path) -> Result<PathBuf, AppError> {
        let job = self.job(id).ok_or(AppError::JobNotFound(id))?;
        let image_url = job.image_url().ok_or(AppError::NoImage {
            id,
            status: job.status(),
        })?;
        let artifact = ImageArtifact::from_data_url(image_url)?;

        tokio::fs::create_dir_all(dir).await?;
        let short_id: String = id.to_string().chars().take(8).collect();
        let path = dir.join(format!(
            "UnReDO-{}-{}.{}",
            Utc::now().timestamp_millis(),
            short_id,
            artifact.extension()
        ));
        tokio::fs::write(&path, &artifact.data).await?;

        info!(job_id = %id, path = %path.display(), "Image exported");
        Ok(path)
    }

    /// Wait until every job submitted so far has reached a terminal state.
    pub async fn wait_idle(&self) {
        loop {
            let mut batch = std::mem::take(
                &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if batch.is_empty() {
                return;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    error!(error = %e, "Job task ended abnormally");
                }
            }
        }
    }

    /// Stop the progress ticker. Running jobs are left to finish.
    pub async fn shutdown(&self) {
        self.ticker.stop().await;
        debug!("Job manager shut down");
    }
}

/// Drive one job to a terminal state. The guard releases its active-job slot
/// when this future completes or is dropped.
async fn run_job(shared: Arc<Shared>, mut job: Job, _guard: ActiveJobGuard) {
    let id = job.id();

    job.start();
    {
        let _writes = shared.writes.lock().await;
        if !shared.jobs.replace(&job) {
            debug!(job_id = %id, "Job removed before it started");
            return;
        }
        shared.persist(&job).await;
    }
    shared.notify(JobEvent::Updated(job.clone()));

    let api_key = shared.session.api_key();
    let outcome = shared
        .retry
        .run(|| shared.backend.generate(job.settings(), api_key.as_ref()))
        .await;

    let credential_invalid = match outcome {
        Ok(artifact) => {
            info!(job_id = %id, bytes = artifact.data.len(), "Job complete");
            job.succeed(artifact.to_data_url());
            false
        }
        Err(e) => {
            let message = e.to_string();
            error!(job_id = %id, error = %message, "Generation failed");
            let credential_invalid = message.contains(CREDENTIAL_INVALID_SIGNAL);
            job.fail(message);
            credential_invalid
        }
    };

    {
        // A job removed or cleared while in flight must not come back.
        let _writes = shared.writes.lock().await;
        if !shared.jobs.contains(id) {
            debug!(job_id = %id, "Job removed while running, dropping result");
            return;
        }
        shared.persist(&job).await;
        shared.jobs.replace(&job);
    }
    shared.notify(JobEvent::Updated(job));

    if credential_invalid {
        warn!(job_id = %id, "API key rejected, re-authentication required");
        shared.session.invalidate_credentials();
    }
}
