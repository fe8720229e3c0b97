//! Handle allocation and the registry of live indexes and sessions.
//!
//! Handles are monotonically increasing and never reused, so a stale handle
//! can never alias a later object; lookups on unknown handles simply miss.
//! The registry mutexes guard only map mutation and are never held across
//! entry scanning or result delivery.

use crate::index::EntryStore;
use crate::search::Session;
use parking_lot::{Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) struct HandleAllocator {
    next: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate the next handle. Never zero.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

pub(crate) struct SessionRecord {
    pub session: Arc<Session>,
    /// The store the session scans; kept to detect frees with live sessions.
    pub store: Arc<EntryStore>,
}

pub(crate) struct Registry {
    indexes: Mutex<FxHashMap<u64, Arc<EntryStore>>>,
    sessions: Mutex<FxHashMap<u64, SessionRecord>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            indexes: Mutex::new(FxHashMap::default()),
            sessions: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn insert_index(&self, handle: u64, store: Arc<EntryStore>) {
        self.indexes.lock().insert(handle, store);
    }

    pub fn get_index(&self, handle: u64) -> Option<Arc<EntryStore>> {
        self.indexes.lock().get(&handle).cloned()
    }

    pub fn remove_index(&self, handle: u64) -> Option<Arc<EntryStore>> {
        self.indexes.lock().remove(&handle)
    }

    /// Lock the session map directly, for callers that must pair an insert
    /// or drain with a lifecycle flag transition under one critical section.
    pub fn lock_sessions(&self) -> MutexGuard<'_, FxHashMap<u64, SessionRecord>> {
        self.sessions.lock()
    }

    pub fn get_session(&self, handle: u64) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .get(&handle)
            .map(|r| Arc::clone(&r.session))
    }

    pub fn remove_session(&self, handle: u64) {
        self.sessions.lock().remove(&handle);
    }

    /// Number of live sessions scanning the given store.
    pub fn sessions_using(&self, store: &Arc<EntryStore>) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|r| Arc::ptr_eq(&r.store, store))
            .count()
    }

    /// Drop records whose sessions have finished and have nothing left to
    /// drain. Queue sessions holding undrained hits stay for `poll`.
    pub fn sweep_sessions(&self) {
        self.sessions.lock().retain(|_, r| !r.session.reapable());
    }

    pub fn clear_indexes(&self) {
        self.indexes.lock().clear();
    }
}
