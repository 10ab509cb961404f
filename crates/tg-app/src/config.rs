use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use crate::error::AppError;
use crate::generator::backend::DEFAULT_API_BASE;
use crate::generator::progress::DEFAULT_TICK;
use crate::generator::retry::RetryPolicy;
use crate::session::ApiKey;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: Option<ApiKey>,
    pub api_base: String,
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub retry: RetryPolicy,
    pub progress_tick: Duration,
    pub replicate_count: u32,
}

impl AppConfig {
    /// Read settings from the environment, after loading `.env` if present.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let api_key = match lookup("GEMINI_API_KEY") {
            Some(raw) => Some(ApiKey::parse(&raw).ok_or_else(|| {
                AppError::Config("GEMINI_API_KEY is too short to be a valid key".into())
            })?),
            None => None,
        };

        let retry_defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_retries: parse_var(&lookup, "THUMBGEN_MAX_RETRIES", retry_defaults.max_retries)?,
            initial_delay: Duration::from_millis(parse_var(
                &lookup,
                "THUMBGEN_RETRY_DELAY_MS",
                retry_defaults.initial_delay.as_millis() as u64,
            )?),
        };

        let progress_tick = Duration::from_millis(parse_var(
            &lookup,
            "THUMBGEN_PROGRESS_TICK_MS",
            DEFAULT_TICK.as_millis() as u64,
        )?);
        if progress_tick.is_zero() {
            return Err(AppError::Config("THUMBGEN_PROGRESS_TICK_MS must be positive".into()));
        }

        Ok(Self {
            api_key,
            api_base: lookup("THUMBGEN_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            db_path: lookup("THUMBGEN_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("outputs/db")),
            export_dir: lookup("THUMBGEN_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("outputs/exports")),
            retry,
            progress_tick,
            replicate_count: parse_var(&lookup, "THUMBGEN_COUNT", 1)?,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}
