use thiserror::Error;
use tg_core::{CoreError, JobId, JobStatus};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Job {id} has no image to export (status {status})")]
    NoImage { id: JobId, status: JobStatus },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
