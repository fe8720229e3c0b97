//! The handle-based engine boundary.
//!
//! Everything a host process touches goes through here: opaque `u64`
//! handles in, result records out. Internal faults are absorbed at this
//! boundary and converted to the narrowest observable effect (empty list,
//! null handle, no-op); the engine never lets an internal error become a
//! crash or a dangling delivery.

use crate::config::EngineConfig;
use crate::handles::{HandleAllocator, Registry, SessionRecord};
use crate::index::{Crawler, EntryStore, FsCrawler};
use crate::query::parse_query;
use crate::search::{
    CompiledQuery, Delivery, SearchHit, Session, SessionManager, SessionState,
};
use anyhow::Result;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-search options. `max_results = 0` selects the configured default.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: u32,
    pub case_sensitive: bool,
    pub use_regex: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 0,
            case_sensitive: false,
            use_regex: false,
        }
    }
}

/// The search engine: index builds, search sessions, cancellation and
/// shutdown, all behind opaque handles.
pub struct Engine {
    config: EngineConfig,
    crawler: Box<dyn Crawler>,
    handles: HandleAllocator,
    registry: Registry,
    manager: SessionManager,
    /// Most recently built index; `start_search` targets this one.
    current: Mutex<Option<Arc<EntryStore>>>,
    initialized: AtomicBool,
    shut_down: AtomicBool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_crawler(config, Box::new(FsCrawler))
    }

    /// Build an engine with a custom crawler, e.g. a stub in tests.
    pub fn with_crawler(config: EngineConfig, crawler: Box<dyn Crawler>) -> Result<Self> {
        let manager = SessionManager::new(config.workers)?;
        Ok(Self {
            config,
            crawler,
            handles: HandleAllocator::new(),
            registry: Registry::new(),
            manager,
            current: Mutex::new(None),
            initialized: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        })
    }

    /// One-time setup. Idempotent. Returns false once the engine has been
    /// shut down; the lifecycle is one-shot per engine.
    pub fn init(&self) -> bool {
        if self.shut_down.load(Ordering::SeqCst) {
            return false;
        }
        self.initialized.store(true, Ordering::SeqCst);
        true
    }

    fn ready(&self) -> bool {
        self.initialized.load(Ordering::SeqCst) && !self.shut_down.load(Ordering::SeqCst)
    }

    /// Build an index over the given root paths. Returns `None` only on
    /// total failure: no accessible paths, or engine not ready.
    pub fn build_index(&self, paths: &[String]) -> Option<u64> {
        if !self.ready() {
            return None;
        }
        match EntryStore::build(paths, self.crawler.as_ref()) {
            Ok(store) => {
                let store = Arc::new(store);
                let handle = self.handles.next();
                self.registry.insert_index(handle, Arc::clone(&store));
                *self.current.lock() = Some(store);
                Some(handle)
            }
            Err(err) => {
                warn!(%err, "index build failed");
                None
            }
        }
    }

    /// Release an index. Valid once per handle; freeing with live sessions
    /// attached or freeing twice fails loudly in debug builds. Sessions
    /// already scanning keep the store alive through their own references,
    /// so a release-mode misuse degrades instead of corrupting.
    pub fn free_index(&self, handle: u64) {
        if self.shut_down.load(Ordering::SeqCst) {
            return;
        }
        let Some(store) = self.registry.get_index(handle) else {
            warn!(handle, "free_index on unknown or already-freed handle");
            debug_assert!(false, "double free or unknown index handle {handle}");
            return;
        };
        // Finished sessions still pin the store through their records;
        // reap them before counting what is genuinely live.
        self.registry.sweep_sessions();
        let live = self.registry.sessions_using(&store);
        if live > 0 {
            error!(handle, live, "free_index with live sessions attached");
            debug_assert!(live == 0, "free_index {handle} with {live} live sessions");
        }
        self.registry.remove_index(handle);
        let mut current = self.current.lock();
        if current
            .as_ref()
            .is_some_and(|c| Arc::ptr_eq(c, &store))
        {
            *current = None;
        }
    }

    /// Stream every entry of an index, in id order, with empty highlights.
    /// Unknown handles stream nothing.
    pub fn list_entries(&self, handle: u64, sink: &mut dyn FnMut(SearchHit)) {
        if self.shut_down.load(Ordering::SeqCst) {
            return;
        }
        let Some(store) = self.registry.get_index(handle) else {
            return;
        };
        for entry in store.iter() {
            sink(SearchHit {
                id: entry.id,
                name: entry.name.clone(),
                path: entry.path.clone(),
                size: entry.size,
                mtime: entry.mtime,
                highlights: Vec::new(),
            });
        }
    }

    /// Start a pollable search against the most recently built index with
    /// default options. Returns 0 on immediate failure.
    pub fn start_search(&self, query: &str) -> u64 {
        self.start_search_with_options(query, &SearchOptions::default(), Delivery::Queue)
    }

    /// Start a search with explicit options and delivery mode. Returns a
    /// non-zero session handle, or 0 when the engine is not initialized, is
    /// shutting down, or no index has been built.
    pub fn start_search_with_options(
        &self,
        query: &str,
        options: &SearchOptions,
        delivery: Delivery,
    ) -> u64 {
        if !self.ready() {
            return 0;
        }
        self.registry.sweep_sessions();
        let Some(store) = self.current.lock().clone() else {
            debug!("start_search with no index built");
            return 0;
        };

        let structured = parse_query(query, options.case_sensitive, options.use_regex);
        let compiled = CompiledQuery::compile(&structured);
        let max_results = self.config.effective_max_results(options.max_results);

        let handle = self.handles.next();
        let session = Arc::new(Session::new(handle, delivery, self.config.queue_capacity));
        {
            // Re-checked under the session-map lock: shutdown sets its flag
            // under this same lock before draining, so a session visible
            // here is guaranteed to be cancelled and joined by shutdown,
            // and a start that loses the race registers nothing.
            let mut sessions = self.registry.lock_sessions();
            if self.shut_down.load(Ordering::SeqCst) {
                return 0;
            }
            sessions.insert(
                handle,
                SessionRecord {
                    session: Arc::clone(&session),
                    store: Arc::clone(&store),
                },
            );
        }
        self.manager.spawn(session, store, compiled, max_results);
        debug!(handle, query, max_results, "search started");
        handle
    }

    /// Drain everything queued since the previous poll. Empty for unknown
    /// handles, callback-mode sessions, and after shutdown.
    pub fn poll(&self, handle: u64) -> Vec<SearchHit> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Vec::new();
        }
        let Some(session) = self.registry.get_session(handle) else {
            return Vec::new();
        };
        let hits = session.drain();
        if session.reapable() {
            self.registry.remove_session(handle);
        }
        hits
    }

    /// Cancel a session. When this returns, no delivery call for the handle
    /// will begin, so the caller may immediately free its receiving context.
    /// Unknown or already-terminal handles are a no-op.
    pub fn cancel(&self, handle: u64) {
        let Some(session) = self.registry.get_session(handle) else {
            return;
        };
        session.cancel();
        if session.reapable() {
            self.registry.remove_session(handle);
        }
    }

    /// Block until a session's worker reaches a terminal state. Returns
    /// immediately for unknown handles.
    pub fn wait(&self, handle: u64) {
        if let Some(session) = self.registry.get_session(handle) {
            session.wait_done();
        }
    }

    /// Observe a session's state; `None` once the handle has been reclaimed.
    pub fn session_state(&self, handle: u64) -> Option<SessionState> {
        self.registry.get_session(handle).map(|s| s.state())
    }

    /// Cancel every live session, wait for all workers to reach a terminal
    /// state, and turn every later operation into a safe no-op. Idempotent.
    pub fn shutdown(&self) {
        let sessions: Vec<_> = {
            // Flag and drain under one lock so no concurrent start can
            // slip a session in between them; see start_search_with_options.
            let mut map = self.registry.lock_sessions();
            if self.shut_down.swap(true, Ordering::SeqCst) {
                return;
            }
            map.drain().map(|(_, record)| record.session).collect()
        };
        for session in &sessions {
            session.cancel();
        }
        for session in &sessions {
            session.wait_done();
        }
        self.registry.clear_indexes();
        *self.current.lock() = None;
        info!(sessions = sessions.len(), "engine shut down");
    }
}

static GLOBAL: Lazy<Engine> = Lazy::new(|| {
    Engine::new(EngineConfig::default().with_env_overrides())
        .expect("failed to construct global search engine")
});

/// Process-wide engine instance, for hosts that want the original
/// one-global-index workflow.
pub fn global() -> &'static Engine {
    &GLOBAL
}
