#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::{Semaphore, mpsc};
use tg_core::{GenerationSettings, ImageArtifact, Job, JobId, JobStatus};
use thumbgen_app::generator::backend::{BackendError, ImageBackend};
use thumbgen_app::generator::db::{JobDatabase, JobStore, StoreError};
use thumbgen_app::generator::retry::RetryPolicy;
use thumbgen_app::{ApiKey, JobManager, ManagerOptions, SessionContext};

pub fn fast_options() -> ManagerOptions {
    ManagerOptions {
        retry: RetryPolicy::new(3, Duration::from_millis(1)),
        progress_tick: Duration::from_millis(200),
    }
}

pub fn api_key() -> ApiKey {
    ApiKey::parse("AIzaSyExampleKey").unwrap()
}

pub fn settings(prompt: &str) -> GenerationSettings {
    GenerationSettings {
        main_prompt: prompt.into(),
        headline_text: "YOU WON'T BELIEVE IT".into(),
        ..Default::default()
    }
}

pub struct Harness {
    pub manager: JobManager,
    pub store: Arc<JobDatabase>,
    pub session: Arc<SessionContext>,
}

pub async fn harness(backend: Arc<dyn ImageBackend>) -> Harness {
    let store = Arc::new(JobDatabase::in_memory().await.unwrap());
    harness_with_store(backend, store).await
}

pub async fn harness_with_store(backend: Arc<dyn ImageBackend>, store: Arc<JobDatabase>) -> Harness {
    let session = Arc::new(SessionContext::new(Some(api_key())));
    let manager = JobManager::new(
        store.clone(),
        backend,
        Arc::clone(&session),
        fast_options(),
    );
    Harness { manager, store, session }
}

/// Hands out a fixed number of successes, then fails every call.
pub struct ScriptedBackend {
    successes_left: AtomicUsize,
    served: AtomicUsize,
    calls: AtomicUsize,
    failure: fn() -> BackendError,
}

impl ScriptedBackend {
    pub fn new(successes: usize) -> Self {
        Self::with_failure(successes, || BackendError::Http {
            status: 503,
            message: "The model is overloaded. Please try again later.".into(),
        })
    }

    pub fn with_failure(successes: usize, failure: fn() -> BackendError) -> Self {
        Self {
            successes_left: AtomicUsize::new(successes),
            served: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            failure,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageBackend for ScriptedBackend {
    async fn generate(
        &self,
        _settings: &GenerationSettings,
        api_key: Option<&ApiKey>,
    ) -> Result<ImageArtifact, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if api_key.is_none() {
            return Err(BackendError::MissingApiKey);
        }

        let granted = self.successes_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if granted {
            let n = self.served.fetch_add(1, Ordering::SeqCst);
            Ok(ImageArtifact::new("image/png", vec![0x89, b'P', b'N', b'G', n as u8]))
        } else {
            Err((self.failure)())
        }
    }
}

/// Blocks every call until the test releases it, announcing each arrival.
pub struct GatedBackend {
    gate: Semaphore,
    entered: mpsc::UnboundedSender<()>,
}

impl GatedBackend {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<()>) {
        let (entered, rx) = mpsc::unbounded_channel();
        (Self { gate: Semaphore::new(0), entered }, rx)
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }
}

#[async_trait]
impl ImageBackend for GatedBackend {
    async fn generate(
        &self,
        _settings: &GenerationSettings,
        _api_key: Option<&ApiKey>,
    ) -> Result<ImageArtifact, BackendError> {
        let _ = self.entered.send(());
        let permit = self.gate
            .acquire()
            .await
            .map_err(|e| BackendError::InvalidPayload(e.to_string()))?;
        permit.forget();
        Ok(ImageArtifact::new("image/png", vec![1, 2, 3]))
    }
}

/// A store whose every operation fails.
pub struct BrokenStore;

#[async_trait]
impl JobStore for BrokenStore {
    async fn put(&self, _job: &Job) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".into()))
    }

    async fn get_all(&self) -> Result<Vec<Job>, StoreError> {
        Err(StoreError::Unavailable("database failed to open".into()))
    }

    async fn delete(&self, _id: JobId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("transaction aborted".into()))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("transaction aborted".into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Put(JobId, JobStatus),
    Generate,
}

/// Ordered log of store writes and backend calls, shared by the fakes below.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Entry>>>);

impl Journal {
    fn push(&self, entry: Entry) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.0.lock().unwrap().clone()
    }
}

/// In-memory database that journals every put and can hold `generating`
/// writes open until the test releases them.
pub struct JournalStore {
    inner: JobDatabase,
    journal: Journal,
    hold_generating: bool,
    gate: Semaphore,
    held: mpsc::UnboundedSender<JobId>,
}

impl JournalStore {
    pub async fn new(journal: Journal) -> Self {
        Self::build(journal, false).await.0
    }

    pub async fn holding_generating(journal: Journal) -> (Self, mpsc::UnboundedReceiver<JobId>) {
        Self::build(journal, true).await
    }

    async fn build(journal: Journal, hold_generating: bool) -> (Self, mpsc::UnboundedReceiver<JobId>) {
        let (held, rx) = mpsc::unbounded_channel();
        let store = Self {
            inner: JobDatabase::in_memory().await.unwrap(),
            journal,
            hold_generating,
            gate: Semaphore::new(0),
            held,
        };
        (store, rx)
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl JobStore for JournalStore {
    async fn put(&self, job: &Job) -> Result<(), StoreError> {
        self.journal.push(Entry::Put(job.id(), job.status()));
        if self.hold_generating && job.status() == JobStatus::Generating {
            let _ = self.held.send(job.id());
            let permit = self.gate
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            permit.forget();
        }
        self.inner.put(job).await
    }

    async fn get_all(&self) -> Result<Vec<Job>, StoreError> {
        self.inner.get_all().await
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear().await
    }
}

/// Always succeeds, journaling each call.
pub struct JournalBackend {
    journal: Journal,
}

impl JournalBackend {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

#[async_trait]
impl ImageBackend for JournalBackend {
    async fn generate(
        &self,
        _settings: &GenerationSettings,
        _api_key: Option<&ApiKey>,
    ) -> Result<ImageArtifact, BackendError> {
        self.journal.push(Entry::Generate);
        Ok(ImageArtifact::new("image/png", vec![4, 5, 6]))
    }
}

pub fn journal_manager(store: Arc<JournalStore>, backend: Arc<dyn ImageBackend>) -> JobManager {
    JobManager::new(
        store,
        backend,
        Arc::new(SessionContext::new(Some(api_key()))),
        fast_options(),
    )
}
