//! Fast File Search - in-memory file/name search engine
//!
//! The crate is organised around four layers:
//! - [`index`] builds and owns the immutable entry store
//! - [`query`] turns raw query strings into structured queries
//! - [`search`] compiles queries, matches entries and runs sessions
//! - [`engine`] is the handle-based boundary a host process talks to

pub mod config;
pub mod engine;
mod handles;
pub mod index;
pub mod query;
pub mod search;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::{global, Engine, SearchOptions};
pub use index::{BuildError, Crawler, Entry, EntryStore, FsCrawler, RawEntry};
pub use query::{parse_query, Field, QueryMode, ScopedTerm, StructuredQuery};
pub use search::{
    CompiledQuery, Delivery, FieldHighlights, ResultCallback, SearchHit, SessionState,
};
