//! Search sessions and the worker pool that runs them.
//!
//! A session is one in-flight query execution. Its worker scans the entry
//! store in id order and pushes matches through a delivery sink: either a
//! caller-supplied callback, invoked on the worker thread, or a bounded
//! queue drained by `poll`.
//!
//! Cancellation is synchronizing, not advisory. Every delivery happens under
//! the session's sink lock, and `cancel` closes the sink under that same
//! lock, so once `cancel` returns no delivery call can begin and the caller
//! may free its receiving context immediately. The sink lock is per-session;
//! a slow callback on one session never blocks delivery, cancellation or
//! shutdown of another.

use crate::index::EntryStore;
use crate::search::highlight::FieldHighlights;
use crate::search::matcher::CompiledQuery;
use anyhow::{Context, Result};
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One delivered match. Field-exact shape of the record that crosses the
/// engine boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub mtime: u64,
    pub highlights: Vec<FieldHighlights>,
}

impl SearchHit {
    /// Serialized form of the highlight set; `[]` when there are no ranges.
    pub fn highlights_json(&self) -> String {
        serde_json::to_string(&self.highlights).unwrap_or_else(|_| String::from("[]"))
    }
}

/// Callback invoked on a session worker thread, once per delivered match.
pub type ResultCallback = Arc<dyn Fn(&SearchHit) + Send + Sync>;

/// How a session hands results back to the caller.
pub enum Delivery {
    /// Invoke the callback synchronously on the worker thread.
    Callback(ResultCallback),
    /// Enqueue matches into a bounded queue drained by `poll`.
    Queue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Pending,
    Running,
    Cancelled,
    Completed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Cancelled | SessionState::Completed)
    }
}

enum SinkMode {
    Callback(ResultCallback),
    Queue(VecDeque<SearchHit>),
}

struct Sink {
    mode: SinkMode,
    capacity: usize,
    closed: bool,
}

struct Lifecycle {
    state: SessionState,
    worker_done: bool,
}

/// One in-flight or completed query execution.
pub struct Session {
    handle: u64,
    cancelled: AtomicBool,
    delivered: AtomicU64,
    sink: Mutex<Sink>,
    space: Condvar,
    lifecycle: Mutex<Lifecycle>,
    done: Condvar,
}

impl Session {
    pub(crate) fn new(handle: u64, delivery: Delivery, queue_capacity: usize) -> Self {
        let mode = match delivery {
            Delivery::Callback(cb) => SinkMode::Callback(cb),
            Delivery::Queue => SinkMode::Queue(VecDeque::new()),
        };
        Self {
            handle,
            cancelled: AtomicBool::new(false),
            delivered: AtomicU64::new(0),
            sink: Mutex::new(Sink {
                mode,
                capacity: queue_capacity.max(1),
                closed: false,
            }),
            space: Condvar::new(),
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Pending,
                worker_done: false,
            }),
            done: Condvar::new(),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn set_running(&self) {
        let mut lc = self.lifecycle.lock();
        if lc.state == SessionState::Pending {
            lc.state = SessionState::Running;
        }
    }

    /// Deliver one hit. Returns false once the sink is closed. Blocks while
    /// a bounded queue is full (producer backpressure) until the caller
    /// polls or the session is cancelled.
    fn deliver(&self, hit: SearchHit) -> bool {
        let mut sink = self.sink.lock();
        loop {
            if sink.closed {
                return false;
            }
            let capacity = sink.capacity;
            match &mut sink.mode {
                SinkMode::Callback(cb) => {
                    let cb = Arc::clone(cb);
                    // Invoked under the sink lock: this is what makes cancel
                    // a barrier against in-flight deliveries.
                    cb(&hit);
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                    return true;
                }
                SinkMode::Queue(buf) => {
                    if buf.len() < capacity {
                        buf.push_back(hit);
                        self.delivered.fetch_add(1, Ordering::Relaxed);
                        return true;
                    }
                }
            }
            self.space.wait(&mut sink);
        }
    }

    /// Mark the session cancelled and close its sink.
    ///
    /// Acquiring the sink lock waits out any delivery already in progress,
    /// so when this returns no delivery call for this session will begin.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        {
            let mut sink = self.sink.lock();
            sink.closed = true;
            if let SinkMode::Queue(buf) = &mut sink.mode {
                buf.clear();
            }
        }
        self.space.notify_all();

        let mut lc = self.lifecycle.lock();
        if !lc.state.is_terminal() {
            lc.state = SessionState::Cancelled;
        }
    }

    /// Drain everything queued since the previous poll. Empty for
    /// callback-mode or cancelled sessions.
    pub fn drain(&self) -> Vec<SearchHit> {
        let hits = {
            let mut sink = self.sink.lock();
            match &mut sink.mode {
                SinkMode::Queue(buf) => buf.drain(..).collect(),
                SinkMode::Callback(_) => Vec::new(),
            }
        };
        self.space.notify_all();
        hits
    }

    fn finish(&self) {
        let mut lc = self.lifecycle.lock();
        if !lc.state.is_terminal() {
            lc.state = if self.is_cancelled() {
                SessionState::Cancelled
            } else {
                SessionState::Completed
            };
        }
        lc.worker_done = true;
        self.done.notify_all();
    }

    /// Block until the session's worker has reached a terminal state.
    pub fn wait_done(&self) {
        let mut lc = self.lifecycle.lock();
        while !lc.worker_done {
            self.done.wait(&mut lc);
        }
    }

    /// True once the worker is done and nothing is left to drain; the
    /// registry record can then be reclaimed.
    pub(crate) fn reapable(&self) -> bool {
        if !self.lifecycle.lock().worker_done {
            return false;
        }
        let sink = self.sink.lock();
        match &sink.mode {
            SinkMode::Queue(buf) => buf.is_empty() || sink.closed,
            SinkMode::Callback(_) => true,
        }
    }
}

/// Runs session scans on a bounded worker pool. One session occupies at
/// most one worker at a time, which keeps per-session delivery in entry-id
/// order.
pub struct SessionManager {
    pool: rayon::ThreadPool,
}

impl SessionManager {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("ffs-session-{i}"))
            .build()
            .context("Failed to build session worker pool")?;
        Ok(Self { pool })
    }

    /// Transition the session to Running and schedule its scan.
    pub fn spawn(
        &self,
        session: Arc<Session>,
        store: Arc<EntryStore>,
        query: CompiledQuery,
        max_results: u32,
    ) {
        session.set_running();
        self.pool
            .spawn(move || run_session(session, store, query, max_results));
    }
}

fn run_session(
    session: Arc<Session>,
    store: Arc<EntryStore>,
    query: CompiledQuery,
    max_results: u32,
) {
    let mut delivered = 0u32;
    if !query.is_poisoned() && max_results > 0 {
        for entry in store.iter() {
            // Cooperative cancellation, checked once per entry
            if session.is_cancelled() {
                break;
            }
            let Some(highlights) = query.matches(entry) else {
                continue;
            };
            let hit = SearchHit {
                id: entry.id,
                name: entry.name.clone(),
                path: entry.path.clone(),
                size: entry.size,
                mtime: entry.mtime,
                highlights,
            };
            if !session.deliver(hit) {
                break;
            }
            delivered += 1;
            if delivered >= max_results {
                // Cap reached: no further scanning, session completes
                break;
            }
        }
    }
    session.finish();
    debug!(
        handle = session.handle(),
        delivered,
        state = ?session.state(),
        "session finished"
    );
}
