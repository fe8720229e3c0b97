//! Highlight range computation.
//!
//! Matching happens on Rust strings in byte offsets, but the delivered
//! ranges are UTF-16 code-unit offsets snapped outward to grapheme-cluster
//! boundaries, so a UTF-16-oriented text widget can slice the field directly
//! without splitting a surrogate pair or a combining sequence.

use crate::index::Entry;
use crate::query::Field;
use serde::Serialize;
use unicode_segmentation::UnicodeSegmentation;

/// Highlight ranges for one field group of a delivered result.
///
/// `field` is set when the matching term was explicitly field-scoped;
/// otherwise it is null and the client applies the ranges to whichever field
/// the term matched against. Ranges are half-open `[start, end)` UTF-16
/// offsets, sorted and non-overlapping within one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldHighlights {
    pub field: Option<Field>,
    pub ranges: Vec<(u32, u32)>,
}

/// One term's contribution to an entry's highlights, still in byte offsets.
#[derive(Debug, Clone)]
pub(crate) struct TermHit {
    /// The term's explicit scope, reported to the client.
    pub label: Option<Field>,
    /// The field the range was actually computed against.
    pub computed_in: Field,
    /// Matched byte range; `None` for zero-length matches, which count as a
    /// match but carry no highlight.
    pub range: Option<(usize, usize)>,
}

/// Convert a byte range in `text` to grapheme-aligned UTF-16 offsets.
///
/// The start is snapped down and the end snapped up to the nearest grapheme
/// boundary, so the returned range always covers the matched bytes.
pub fn utf16_range(text: &str, start: usize, end: usize) -> (u32, u32) {
    let mut units = 0u32;
    let mut out_start = 0u32;
    let mut out_end = None;

    for (byte_off, grapheme) in text.grapheme_indices(true) {
        if byte_off <= start {
            out_start = units;
        }
        if byte_off >= end {
            out_end = Some(units);
            break;
        }
        units += grapheme.encode_utf16().count() as u32;
    }

    // End past the last boundary snaps to the full length
    (out_start, out_end.unwrap_or(units))
}

/// Sort ranges by start and merge any that overlap or touch.
pub fn normalize_ranges(ranges: &mut Vec<(u32, u32)>) {
    if ranges.len() < 2 {
        return;
    }
    ranges.sort_unstable_by_key(|r| r.0);
    let mut merged = Vec::with_capacity(ranges.len());
    let mut cur = ranges[0];
    for &(start, end) in ranges.iter().skip(1) {
        if start <= cur.1 {
            if end > cur.1 {
                cur.1 = end;
            }
        } else {
            merged.push(cur);
            cur = (start, end);
        }
    }
    merged.push(cur);
    *ranges = merged;
}

/// Assemble the delivered highlight set from per-term hits.
///
/// Grouping is by (reported scope, computed field): ranges are only merged
/// when they were computed against the same text, and scoped and unscoped
/// hits are never folded into one group.
pub(crate) fn collect(entry: &Entry, hits: Vec<TermHit>) -> Vec<FieldHighlights> {
    let mut groups: Vec<(Option<Field>, Field, Vec<(u32, u32)>)> = Vec::new();

    for hit in hits {
        let Some((start, end)) = hit.range else {
            continue;
        };
        let range = utf16_range(entry.text(hit.computed_in), start, end);
        match groups
            .iter_mut()
            .find(|(label, computed, _)| *label == hit.label && *computed == hit.computed_in)
        {
            Some((_, _, ranges)) => ranges.push(range),
            None => groups.push((hit.label, hit.computed_in, vec![range])),
        }
    }

    groups
        .into_iter()
        .map(|(label, _, mut ranges)| {
            normalize_ranges(&mut ranges);
            FieldHighlights {
                field: label,
                ranges,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::RawEntry;
    use std::path::PathBuf;

    #[test]
    fn ascii_offsets_pass_through() {
        assert_eq!(utf16_range("report.txt", 0, 6), (0, 6));
        assert_eq!(utf16_range("report.txt", 7, 10), (7, 10));
    }

    #[test]
    fn astral_chars_count_as_two_units() {
        // '🦀' is 4 bytes in UTF-8 and 2 code units in UTF-16
        let text = "🦀ab";
        assert_eq!(utf16_range(text, 4, 5), (2, 3));
        assert_eq!(utf16_range(text, 0, 4), (0, 2));
    }

    #[test]
    fn range_snaps_to_grapheme_boundaries() {
        // "e" + combining acute is one grapheme of two UTF-16 units
        let text = "ze\u{0301}d";
        // A byte range covering only the "e" must expand over the combiner
        assert_eq!(utf16_range(text, 1, 2), (1, 3));
        // End inside the combining mark snaps up as well
        assert_eq!(utf16_range(text, 1, 3), (1, 3));
    }

    #[test]
    fn end_at_text_end() {
        assert_eq!(utf16_range("abc", 1, 3), (1, 3));
    }

    #[test]
    fn merge_overlapping_and_touching() {
        let mut ranges = vec![(5, 8), (0, 3), (3, 5), (10, 12)];
        normalize_ranges(&mut ranges);
        assert_eq!(ranges, vec![(0, 8), (10, 12)]);
    }

    #[test]
    fn disjoint_ranges_untouched() {
        let mut ranges = vec![(4, 6), (0, 2)];
        normalize_ranges(&mut ranges);
        assert_eq!(ranges, vec![(0, 2), (4, 6)]);
    }

    fn entry() -> Entry {
        Entry::new(
            1,
            RawEntry {
                path: PathBuf::from("/docs/report.txt"),
                size: 0,
                mtime: 0,
            },
        )
    }

    #[test]
    fn collect_groups_by_scope_and_field() {
        let e = entry();
        let hits = vec![
            TermHit {
                label: Some(Field::Path),
                computed_in: Field::Path,
                range: Some((6, 12)),
            },
            TermHit {
                label: Some(Field::Path),
                computed_in: Field::Path,
                range: Some((10, 16)),
            },
            TermHit {
                label: None,
                computed_in: Field::Name,
                range: Some((0, 6)),
            },
        ];
        let highlights = collect(&e, hits);
        assert_eq!(highlights.len(), 2);
        assert_eq!(highlights[0].field, Some(Field::Path));
        assert_eq!(highlights[0].ranges, vec![(6, 16)]);
        assert_eq!(highlights[1].field, None);
        assert_eq!(highlights[1].ranges, vec![(0, 6)]);
    }

    #[test]
    fn zero_length_hits_are_dropped() {
        let e = entry();
        let hits = vec![TermHit {
            label: None,
            computed_in: Field::Name,
            range: None,
        }];
        assert!(collect(&e, hits).is_empty());
    }

    #[test]
    fn serializes_to_wire_shape() {
        let h = vec![FieldHighlights {
            field: Some(Field::Path),
            ranges: vec![(6, 12)],
        }];
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"[{"field":"path","ranges":[[6,12]]}]"#);

        let empty: Vec<FieldHighlights> = vec![];
        assert_eq!(serde_json::to_string(&empty).unwrap(), "[]");
    }
}
