//! The entry store: an immutable-after-build table of indexed entries.

use crate::index::crawler::Crawler;
use crate::index::entry::Entry;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BuildError {
    /// Every supplied root path was unreadable. No partial index is produced
    /// in this case; if at least one root is readable the build degrades
    /// gracefully and indexes what it can reach.
    #[error("none of the {0} supplied paths were accessible")]
    NoAccessiblePaths(usize),
}

/// Immutable table of indexed entries, ordered by id.
///
/// Built once, then shared read-only across concurrent sessions; no locking
/// is needed for reads.
#[derive(Debug)]
pub struct EntryStore {
    entries: Vec<Entry>,
}

impl EntryStore {
    /// Build a store over the given root paths, delegating enumeration to
    /// `crawler`. Ids are assigned in scan order starting at 1, so repeated
    /// builds over an unmodified tree produce the same ids.
    pub fn build(paths: &[String], crawler: &dyn Crawler) -> Result<Self, BuildError> {
        let mut entries = Vec::new();
        let mut accessible = 0usize;
        let mut next_id = 1u64;

        for path in paths {
            match crawler.crawl(Path::new(path)) {
                Ok(raw_entries) => {
                    accessible += 1;
                    for raw in raw_entries {
                        entries.push(Entry::new(next_id, raw));
                        next_id += 1;
                    }
                }
                Err(err) => {
                    warn!(path = %path, %err, "skipping unreadable root");
                }
            }
        }

        if accessible == 0 {
            return Err(BuildError::NoAccessiblePaths(paths.len()));
        }

        info!(
            roots = accessible,
            entries = entries.len(),
            "entry store built"
        );
        Ok(Self { entries })
    }

    /// Enumerate all entries in id order. Each call yields a fresh,
    /// side-effect-free sequence.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::crawler::{FsCrawler, RawEntry};
    use anyhow::bail;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Crawler stub yielding fixed entries for one root and failing others.
    struct FixedCrawler {
        good_root: &'static str,
        names: Vec<&'static str>,
    }

    impl Crawler for FixedCrawler {
        fn crawl(&self, root: &Path) -> anyhow::Result<Vec<RawEntry>> {
            if root != Path::new(self.good_root) {
                bail!("unreadable root");
            }
            Ok(self
                .names
                .iter()
                .map(|n| RawEntry {
                    path: PathBuf::from(format!("{}/{}", self.good_root, n)),
                    size: 1,
                    mtime: 0,
                })
                .collect())
        }
    }

    #[test]
    fn ids_are_assigned_in_scan_order() {
        let crawler = FixedCrawler {
            good_root: "/idx",
            names: vec!["a", "b", "c"],
        };
        let store = EntryStore::build(&["/idx".into()], &crawler).unwrap();
        let ids: Vec<u64> = store.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn iteration_is_restartable() {
        let crawler = FixedCrawler {
            good_root: "/idx",
            names: vec!["a", "b"],
        };
        let store = EntryStore::build(&["/idx".into()], &crawler).unwrap();
        let first: Vec<u64> = store.iter().map(|e| e.id).collect();
        let second: Vec<u64> = store.iter().map(|e| e.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn all_roots_unreadable_is_an_error() {
        let crawler = FixedCrawler {
            good_root: "/idx",
            names: vec![],
        };
        let err = EntryStore::build(&["/bad1".into(), "/bad2".into()], &crawler).unwrap_err();
        assert!(matches!(err, BuildError::NoAccessiblePaths(2)));
    }

    #[test]
    fn empty_path_list_is_an_error() {
        let err = EntryStore::build(&[], &FsCrawler).unwrap_err();
        assert!(matches!(err, BuildError::NoAccessiblePaths(0)));
    }

    #[test]
    fn partial_failure_degrades_gracefully() {
        let crawler = FixedCrawler {
            good_root: "/idx",
            names: vec!["a"],
        };
        let store = EntryStore::build(&["/bad".into(), "/idx".into()], &crawler).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn build_from_real_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.txt"), "x").unwrap();
        std::fs::write(dir.path().join("y.txt"), "yy").unwrap();

        let store = EntryStore::build(
            &[dir.path().to_string_lossy().into_owned()],
            &FsCrawler,
        )
        .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_size(), 3);
    }
}
