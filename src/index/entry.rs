//! One indexed filesystem entry.

use crate::index::crawler::RawEntry;
use crate::query::Field;
use unicode_normalization::UnicodeNormalization;

/// An indexed filesystem object. Immutable once the index is built; handed
/// to callers only by value through the result-delivery interface.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Stable id, unique within one index instance, assigned in scan order
    /// starting at 1.
    pub id: u64,
    pub name: String,
    pub path: String,
    pub size: u64,
    pub mtime: u64,
    /// NFKC + lowercase form of `name`, used by the case-insensitive
    /// literal fast path.
    name_folded: String,
    path_folded: String,
}

impl Entry {
    pub fn new(id: u64, raw: RawEntry) -> Self {
        let path = raw.path.to_string_lossy().into_owned();
        let name = raw
            .path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        // NFKC folds compatibility forms (ligatures, fullwidth digits) so a
        // plain-ASCII query still hits them. Both fields fold the same way
        // query needles do, so the comparison is symmetric.
        let name_folded = fold(&name);
        let path_folded = fold(&path);

        Entry {
            id,
            name,
            path,
            size: raw.size,
            mtime: raw.mtime,
            name_folded,
            path_folded,
        }
    }

    /// The text of one matchable field.
    pub fn text(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Path => &self.path,
        }
    }

    /// Case-folded text of one matchable field.
    pub fn folded(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name_folded,
            Field::Path => &self.path_folded,
        }
    }
}

/// Fold query text the same way entry names are folded, so case-insensitive
/// comparisons are consistent on both sides.
pub(crate) fn fold(text: &str) -> String {
    text.nfkc().collect::<String>().to_lowercase()
}
