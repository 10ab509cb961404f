use tg_core::{Job, JobId};

/// Notifications for whoever is rendering the gallery.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Queued(Job),
    Updated(Job),
    Removed(JobId),
    Cleared,
    HistoryLoaded {
        count: usize,
        repaired: usize,
    },
}
