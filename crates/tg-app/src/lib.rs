pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod session;

pub use config::AppConfig;
pub use error::AppError;
pub use events::JobEvent;
pub use generator::{JobManager, ManagerOptions};
pub use session::{ApiKey, SessionContext};
