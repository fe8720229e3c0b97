pub mod crawler;
pub mod entry;
pub mod store;

pub use crawler::{Crawler, FsCrawler, RawEntry};
pub use entry::Entry;
pub use store::{BuildError, EntryStore};
