use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;

/// Substring the remote service uses when the caller's key is no longer valid.
pub const CREDENTIAL_INVALID_SIGNAL: &str = "Requested entity was not found";

const MIN_KEY_LEN: usize = 10;

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trims the input and rejects anything too short to be a real key.
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim();
        (key.len() > MIN_KEY_LEN).then(|| Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Process-wide flags the presentation layer watches. Only the job manager
/// writes to them.
#[derive(Debug)]
pub struct SessionContext {
    active_jobs: watch::Sender<usize>,
    needs_reauth: watch::Sender<bool>,
    api_key: RwLock<Option<ApiKey>>,
}

impl SessionContext {
    pub fn new(api_key: Option<ApiKey>) -> Self {
        let (active_jobs, _) = watch::channel(0);
        let (needs_reauth, _) = watch::channel(api_key.is_none());

        Self {
            active_jobs,
            needs_reauth,
            api_key: RwLock::new(api_key),
        }
    }

    pub fn active_jobs(&self) -> usize {
        *self.active_jobs.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.active_jobs() > 0
    }

    pub fn watch_active_jobs(&self) -> watch::Receiver<usize> {
        self.active_jobs.subscribe()
    }

    pub fn needs_reauth(&self) -> bool {
        *self.needs_reauth.borrow()
    }

    pub fn watch_reauth(&self) -> watch::Receiver<bool> {
        self.needs_reauth.subscribe()
    }

    pub fn api_key(&self) -> Option<ApiKey> {
        self.api_key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_api_key(&self, key: ApiKey) {
        *self.api_key.write().unwrap_or_else(PoisonError::into_inner) = Some(key);
        self.needs_reauth.send_replace(false);
    }

    pub(crate) fn invalidate_credentials(&self) {
        self.needs_reauth.send_replace(true);
    }

    fn job_started(&self) {
        self.active_jobs.send_modify(|n| *n += 1);
    }

    fn job_finished(&self) {
        self.active_jobs.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Holds one slot of the active-job counter and gives it back on drop, so
/// every job releases exactly once however its task ends.
#[derive(Debug)]
pub(crate) struct ActiveJobGuard {
    session: Arc<SessionContext>,
}

impl ActiveJobGuard {
    pub(crate) fn acquire(session: &Arc<SessionContext>) -> Self {
        session.job_started();
        Self { session: Arc::clone(session) }
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        self.session.job_finished();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_parse() {
        assert!(ApiKey::parse("short").is_none());
        assert!(ApiKey::parse("   0123456789   ").is_none());
        let key = ApiKey::parse("  AIzaSyExampleKey  ").unwrap();
        assert_eq!(key.expose(), "AIzaSyExampleKey");
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }

    #[test]
    fn test_missing_key_needs_auth() {
        assert!(SessionContext::new(None).needs_reauth());

        let session = SessionContext::new(ApiKey::parse("AIzaSyExampleKey"));
        assert!(!session.needs_reauth());
        session.invalidate_credentials();
        assert!(session.needs_reauth());
        session.set_api_key(ApiKey::parse("AIzaSyAnotherKey").unwrap());
        assert!(!session.needs_reauth());
        assert_eq!(session.api_key().unwrap().expose(), "AIzaSyAnotherKey");
    }

    #[test]
    fn test_guard_releases_once() {
        let session = Arc::new(SessionContext::new(None));
        let rx = session.watch_active_jobs();
        {
            let _a = ActiveJobGuard::acquire(&session);
            let _b = ActiveJobGuard::acquire(&session);
            assert_eq!(session.active_jobs(), 2);
            assert!(session.is_busy());
        }
        assert_eq!(session.active_jobs(), 0);
        assert_eq!(*rx.borrow(), 0);
    }

    #[test]
    fn test_counter_never_underflows() {
        let session = SessionContext::new(None);
        session.job_finished();
        assert_eq!(session.active_jobs(), 0);
    }
}
