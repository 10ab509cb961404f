mod artifact;
pub mod error;
pub mod job;
mod model_types;
pub mod settings;

pub use artifact::ImageArtifact;
pub use error::{CoreError, Result};
pub use job::{Job, JobId, JobState, JobStatus};
pub use model_types::{ImageModel, STYLE_PRESETS};
pub use settings::{Actor, AspectRatio, GenerationSettings, ImageResolution, InputImage};
