//! Busy-id tracking for per-item async operations
//!
//! A [`BusySet`] records which items (cart lines, typically) have an
//! operation in flight. Marking an id busy hands out a [`BusyGuard`]; the
//! marker is cleared when the guard is ended or dropped, so a failed,
//! panicking or cancelled operation can never leave a stale marker behind.
//!
//! Ids are independent: marking one busy never affects any other.

use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

/// Set of ids with an operation in flight
#[derive(Debug)]
pub struct BusySet<K> {
    inner: Arc<Mutex<HashSet<K>>>,
}

impl<K> Clone for BusySet<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Default for BusySet<K> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K> BusySet<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` busy
    ///
    /// Returns `None` when `id` is already busy; the existing operation keeps
    /// ownership of the marker.
    #[must_use = "the id is released as soon as the guard is dropped"]
    pub fn begin(&self, id: K) -> Option<BusyGuard<K>> {
        let inserted = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone());

        inserted.then(|| BusyGuard {
            set: self.clone(),
            id: Some(id),
        })
    }

    /// Whether `id` has an operation in flight
    pub fn is_busy(&self, id: &K) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    /// Snapshot of the busy ids
    pub fn busy_ids(&self) -> Vec<K> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of busy ids
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn end(&self, id: &K) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }
}

/// Busy marker for one id; released on [`BusyGuard::end`] or drop
#[derive(Debug)]
pub struct BusyGuard<K>
where
    K: Eq + Hash + Clone + Debug,
{
    set: BusySet<K>,
    id: Option<K>,
}

impl<K> BusyGuard<K>
where
    K: Eq + Hash + Clone + Debug,
{
    /// The id this guard holds
    pub fn id(&self) -> Option<&K> {
        self.id.as_ref()
    }

    /// Release the marker now
    pub fn end(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.set.end(&id);
        }
    }
}

impl<K> Drop for BusyGuard<K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn drop(&mut self) {
        self.release();
    }
}
