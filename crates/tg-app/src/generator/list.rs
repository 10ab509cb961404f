use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tg_core::{Job, JobId};

/// The in-memory gallery, newest first. Every update replaces records by id,
/// so concurrent jobs never overwrite each other.
#[derive(Debug, Default)]
pub struct JobList {
    jobs: RwLock<Vec<Job>>,
}

impl JobList {
    pub fn snapshot(&self) -> Vec<Job> {
        self.read().clone()
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.read().iter().find(|j| j.id() == id).cloned()
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.read().iter().any(|j| j.id() == id)
    }

    pub fn prepend(&self, jobs: &[Job]) {
        let mut list = self.write();
        list.splice(0..0, jobs.iter().cloned());
    }

    /// Returns `false` when the job is no longer listed.
    pub fn replace(&self, job: &Job) -> bool {
        let mut list = self.write();
        match list.iter_mut().find(|j| j.id() == job.id()) {
            Some(slot) => {
                *slot = job.clone();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: JobId) -> bool {
        let mut list = self.write();
        let before = list.len();
        list.retain(|j| j.id() != id);
        list.len() != before
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Merge records loaded from the store. Jobs already in memory belong to
    /// this session and win over their stored copies.
    pub fn merge_history(&self, history: Vec<Job>) {
        let mut list = self.write();
        let fresh: Vec<Job> = history
            .into_iter()
            .filter(|h| !list.iter().any(|j| j.id() == h.id()))
            .collect();
        list.extend(fresh);
        list.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    }

    pub fn update_each(&self, mut f: impl FnMut(&mut Job)) {
        self.write().iter_mut().for_each(|job| f(job));
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}
