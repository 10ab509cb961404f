use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tg_core::{CoreError, GenerationSettings, Job, JobId, JobState, JobStatus};

/// Flat stored form of a [`Job`]. The record key is the job id, so the id is
/// kept under its own field name here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub settings: GenerationSettings,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    pub progress: f32,
    pub timestamp: i64,
}

impl From<&Job> for JobRecord {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id().to_string(),
            status: job.status(),
            settings: job.settings().clone(),
            image_url: job.image_url().map(str::to_string),
            error: job.error().map(str::to_string),
            progress: job.progress(),
            timestamp: job.timestamp_millis(),
        }
    }
}

impl TryFrom<JobRecord> for Job {
    type Error = CoreError;

    fn try_from(record: JobRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: &str| CoreError::InvalidRecord {
            id: record.job_id.clone(),
            reason: reason.to_string(),
        };

        let id: JobId = record.job_id.parse().map_err(|_| invalid("id is not a uuid"))?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(record.timestamp)
            .ok_or_else(|| invalid("timestamp out of range"))?;

        let state = match (record.status, &record.image_url, &record.error) {
            (JobStatus::Queued, None, None) => JobState::Queued,
            (JobStatus::Generating, None, None) => JobState::Generating,
            (JobStatus::Success, Some(url), None) => JobState::Success { image_url: url.clone() },
            (JobStatus::Error, None, Some(message)) => JobState::Error { message: message.clone() },
            _ => return Err(invalid("status does not match image/error fields")),
        };

        Ok(Job::from_parts(id, state, record.settings, record.progress, created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_mirrors_job() {
        let mut job = Job::new(GenerationSettings::default());
        job.start();
        job.fail("quota exceeded");

        let record = JobRecord::from(&job);
        assert_eq!(record.job_id, job.id().to_string());
        assert_eq!(record.status, JobStatus::Error);
        assert_eq!(record.error.as_deref(), Some("quota exceeded"));
        assert!(record.image_url.is_none());
        assert_eq!(record.timestamp, job.timestamp_millis());

        assert_eq!(Job::try_from(record).unwrap(), job);
    }

    #[test]
    fn test_wire_field_names() {
        let job = Job::new(GenerationSettings::default());
        let json = serde_json::to_value(JobRecord::from(&job)).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["jobId"], job.id().to_string());
        assert!(json["imageUrl"].is_null());
        assert_eq!(json["settings"]["aspectRatio"], "16:9");
    }

    #[test]
    fn test_inconsistent_record_rejected() {
        let job = Job::new(GenerationSettings::default());
        let mut record = JobRecord::from(&job);
        record.status = JobStatus::Success;
        assert!(matches!(Job::try_from(record), Err(CoreError::InvalidRecord { .. })));

        let mut record = JobRecord::from(&job);
        record.error = Some("boom".into());
        assert!(Job::try_from(record).is_err());

        let mut record = JobRecord::from(&job);
        record.job_id = "42".into();
        assert!(Job::try_from(record).is_err());
    }
}
