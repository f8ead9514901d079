//! In-flight URL locks
//!
//! Prevents two overlapping runs in one process (a scheduled run and a manual
//! "crawl now") from fetching and writing the same URL at the same time.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Set of URLs currently being processed
#[derive(Debug, Clone, Default)]
pub struct UrlLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

/// Releases its URL when dropped
#[derive(Debug)]
pub struct UrlLockGuard {
    url: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl UrlLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tries to acquire a lock for a URL
    ///
    /// Returns None if another worker already holds it.
    pub fn try_acquire(&self, url: &str) -> Option<UrlLockGuard> {
        let mut held = lock_set(&self.held);
        if !held.insert(url.to_string()) {
            return None;
        }

        Some(UrlLockGuard {
            url: url.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    /// Returns true if the URL is currently locked
    pub fn is_locked(&self, url: &str) -> bool {
        lock_set(&self.held).contains(url)
    }
}

impl Drop for UrlLockGuard {
    fn drop(&mut self) {
        lock_set(&self.held).remove(&self.url);
    }
}

// A panic while holding the set cannot leave it inconsistent, so recover from poisoning
fn lock_set(set: &Mutex<HashSet<String>>) -> MutexGuard<'_, HashSet<String>> {
    set.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
