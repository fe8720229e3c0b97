//! Filesystem enumeration seam.
//!
//! The engine never walks the filesystem itself; it asks a [`Crawler`] for
//! the raw entries under each root. [`FsCrawler`] is the default, walking
//! directories with `walkdir`. Tests substitute their own implementations to
//! exercise the store without touching disk.

use anyhow::{Context, Result};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One filesystem object as enumerated by a crawler, before it is assigned
/// an id and indexed.
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: u64,
}

impl RawEntry {
    pub fn from_metadata(path: PathBuf, metadata: &Metadata) -> Self {
        Self {
            path,
            size: metadata.len(),
            mtime: mtime_secs(metadata),
        }
    }
}

/// Enumerates filesystem entries under a root path.
pub trait Crawler: Send + Sync {
    /// Enumerate all regular files under `root`, in a deterministic order.
    ///
    /// # Errors
    /// Fails if the root itself is not accessible. Unreadable children are
    /// skipped, not reported.
    fn crawl(&self, root: &Path) -> Result<Vec<RawEntry>>;
}

/// Default crawler backed by `walkdir`.
pub struct FsCrawler;

impl Crawler for FsCrawler {
    fn crawl(&self, root: &Path) -> Result<Vec<RawEntry>> {
        let metadata = std::fs::metadata(root)
            .with_context(|| format!("Failed to read path: {}", root.display()))?;

        if metadata.is_file() {
            return Ok(vec![RawEntry::from_metadata(root.to_path_buf(), &metadata)]);
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.metadata() {
                Ok(md) => entries.push(RawEntry::from_metadata(entry.into_path(), &md)),
                Err(err) => {
                    tracing::debug!(path = %entry.path().display(), %err, "skipping unreadable file");
                }
            }
        }
        Ok(entries)
    }
}

fn mtime_secs(metadata: &Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn crawl_collects_files_recursively() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), "bb").unwrap();

        let entries = FsCrawler.crawl(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().any(|e| e.path.ends_with("a.txt")));
        assert!(entries.iter().any(|e| e.path.ends_with("b.txt") && e.size == 2));
    }

    #[test]
    fn crawl_single_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("only.md");
        std::fs::write(&file, "hello").unwrap();

        let entries = FsCrawler.crawl(&file).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].size, 5);
    }

    #[test]
    fn crawl_missing_root_fails() {
        assert!(FsCrawler.crawl(Path::new("/nonexistent/ffs-root")).is_err());
    }
}
