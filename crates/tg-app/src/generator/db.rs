pub mod job;

use std::path::PathBuf;
use async_trait::async_trait;
use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use thiserror::Error;
use tracing::{info, warn};
use tg_core::{Job, JobId};
use crate::generator::db::job::JobRecord;

const NAMESPACE: &str = "thumbgen";
const DATABASE: &str = "gallery";
const JOBS: &str = "jobs";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] surrealdb::Error),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key-value persistence of job records, keyed by job id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace the record with this job's id.
    async fn put(&self, job: &Job) -> Result<(), StoreError>;

    /// Every stored record, in no particular order.
    async fn get_all(&self) -> Result<Vec<Job>, StoreError>;

    /// Remove one record. Missing ids are not an error.
    async fn delete(&self, id: JobId) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct JobDatabase {
    db: Surreal<Any>,
}

impl JobDatabase {
    /// Open (or create) the on-disk database under `db_path`.
    pub async fn open(db_path: PathBuf) -> Result<Self, StoreError> {
        info!("Setting up job database at {}", db_path.display());

        std::fs::create_dir_all(&db_path)?;
        let db_path = std::fs::canonicalize(&db_path)?;

        Self::connect(format!("rocksdb://{}", db_path.display())).await
    }

    /// Database that lives only as long as this handle.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("mem://".to_string()).await
    }

    async fn connect(address: String) -> Result<Self, StoreError> {
        let db = any::connect(address).await?;
        db.use_ns(NAMESPACE).use_db(DATABASE).await?;

        Ok(Self { db })
    }
}

#[async_trait]
impl JobStore for JobDatabase {
    async fn put(&self, job: &Job) -> Result<(), StoreError> {
        let _: Option<JobRecord> = self.db
            .upsert((JOBS, job.id().to_string()))
            .content(JobRecord::from(job))
            .await?;

        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Job>, StoreError> {
        let records: Vec<JobRecord> = self.db.select(JOBS).await?;

        let jobs = records
            .into_iter()
            .filter_map(|record| match Job::try_from(record) {
                Ok(job) => Some(job),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable job record");
                    None
                }
            })
            .collect();

        Ok(jobs)
    }

    async fn delete(&self, id: JobId) -> Result<(), StoreError> {
        let _: Option<JobRecord> = self.db
            .delete((JOBS, id.to_string()))
            .await?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _: Vec<JobRecord> = self.db.delete(JOBS).await?;

        Ok(())
    }
}
