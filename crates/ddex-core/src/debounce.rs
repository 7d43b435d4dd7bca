//! Trailing-edge debounce keyed by document.
//!
//! Each key owns at most one pending task. Scheduling again aborts the
//! pending task and starts a fresh delay, so only the latest trigger within
//! the window runs.

use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default debounce delay.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

/// Per-key cancel-and-reschedule timer.
///
/// The delay is passed per call so a configuration change applies to the
/// next trigger. Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Debouncer<K>
where
    K: Eq + Hash,
{
    pending: DashMap<K, JoinHandle<()>>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
        }
    }

    /// Runs `job` after `delay` unless another job is scheduled for the
    /// same key first.
    pub fn schedule<F>(&self, key: K, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            job.await;
        });

        if let Some(previous) = self.pending.insert(key, task) {
            previous.abort();
        }
    }

    /// Aborts the pending job for `key`, if any.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, task)) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    /// Returns true if a job for `key` is scheduled and has not finished.
    pub fn is_pending(&self, key: &K) -> bool {
        self.pending
            .get(key)
            .is_some_and(|task| !task.is_finished())
    }

    /// Aborts every pending job.
    pub fn cancel_all(&self) {
        self.pending.retain(|_, task| {
            task.abort();
            false
        });
    }
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for Debouncer<K>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            entry.value().abort();
        }
    }
}
