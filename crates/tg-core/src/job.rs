use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::settings::GenerationSettings;

/// Reason recorded on jobs that were still running when the previous process died.
pub const SESSION_INTERRUPTED: &str = "Session Interrupted";

/// Fallback reason when a failure carries no message of its own.
pub const GENERATION_FAILED: &str = "Generation Failed";

pub const MAX_PROGRESS: f32 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Generating,
    Success,
    Error,
}

impl JobStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Generating)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Generating => "generating",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Queued => "⏳",
            Self::Generating => "⚡",
            Self::Success => "✅",
            Self::Error => "❌",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status together with the payload only that status may carry.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Queued,
    Generating,
    Success { image_url: String },
    Error { message: String },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Queued => JobStatus::Queued,
            Self::Generating => JobStatus::Generating,
            Self::Success { .. } => JobStatus::Success,
            Self::Error { .. } => JobStatus::Error,
        }
    }
}

/// One generation attempt, tracked `queued -> generating -> success | error`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: JobId,
    state: JobState,
    settings: Arc<GenerationSettings>,
    progress: f32,
    created_at: DateTime<Utc>,
}

impl Job {
    /// New queued job holding its own copy of `settings`.
    pub fn new(settings: GenerationSettings) -> Self {
        // Stored timestamps are millisecond precision; keep memory in step.
        let now = Utc::now();
        let created_at = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);

        Self {
            id: JobId::new(),
            state: JobState::Queued,
            settings: Arc::new(settings),
            progress: 0.0,
            created_at,
        }
    }

    /// Rebuild a job from persisted parts.
    pub fn from_parts(
        id: JobId,
        state: JobState,
        settings: GenerationSettings,
        progress: f32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            state,
            settings: Arc::new(settings),
            progress: clamp_progress(progress),
            created_at,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.state {
            JobState::Success { image_url } => Some(image_url),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            JobState::Error { message } => Some(message),
            _ => None,
        }
    }

    pub fn set_progress(&mut self, progress: f32) {
        self.progress = clamp_progress(progress);
    }

    pub fn start(&mut self) {
        self.state = JobState::Generating;
    }

    pub fn succeed(&mut self, image_url: String) {
        self.state = JobState::Success { image_url };
        self.progress = MAX_PROGRESS;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERATION_FAILED.to_string()
        } else {
            message
        };
        self.state = JobState::Error { message };
        self.progress = MAX_PROGRESS;
    }

    /// Mark a job left running by a dead process as failed.
    /// Returns `false` for jobs that had already finished.
    pub fn interrupt(&mut self) -> bool {
        if !self.status().is_active() {
            return false;
        }
        self.state = JobState::Error { message: SESSION_INTERRUPTED.to_string() };
        self.progress = 0.0;
        true
    }
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, MAX_PROGRESS)
    }
}
