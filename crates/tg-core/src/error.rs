use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid data url: {0}")]
    InvalidDataUrl(String),

    #[error("Invalid job record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
