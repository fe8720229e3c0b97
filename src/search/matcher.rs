//! Query compilation and per-entry matching.
//!
//! A structured query is compiled exactly once per session and the compiled
//! form is reused across all entries. A regex that fails to compile poisons
//! the whole query: the session then yields zero matches for every entry,
//! treating a bad pattern as "no results" rather than a hard failure, which
//! is what a search box wants while the user is mid-keystroke.

use crate::index::entry::fold;
use crate::index::Entry;
use crate::query::{Field, QueryMode, StructuredQuery};
use crate::search::highlight::{self, FieldHighlights, TermHit};
use memchr::memmem;
use regex::{Regex, RegexBuilder};
use tracing::debug;

enum TermPattern {
    /// Empty term text: matches every entry, contributes no range.
    MatchAll,
    /// Case-sensitive literal, searched with memmem.
    Substring(String),
    /// Case-insensitive literal. The match decision runs against the entry's
    /// folded text (so NFKC-compatible forms still hit); the highlight probe
    /// locates the substring in the original text for correct offsets.
    FoldedSubstring { needle: String, probe: Regex },
    /// Regex mode term, first leftmost match only.
    Pattern(Regex),
}

struct CompiledTerm {
    scope: Option<Field>,
    pattern: TermPattern,
}

impl CompiledTerm {
    /// Match against one field's text. Outer `None` means no match; inner
    /// `None` means matched with no highlightable range.
    fn find(&self, text: &str, folded: &str) -> Option<Option<(usize, usize)>> {
        match &self.pattern {
            TermPattern::MatchAll => Some(None),
            TermPattern::Substring(needle) => memmem::find(text.as_bytes(), needle.as_bytes())
                .map(|start| Some((start, start + needle.len()))),
            TermPattern::FoldedSubstring { needle, probe } => {
                if !folded.contains(needle.as_str()) {
                    return None;
                }
                // Folding can change lengths, so the range comes from a
                // probe over the original text; a fold-only hit (e.g. a
                // ligature) matches without a range.
                Some(probe.find(text).map(|m| (m.start(), m.end())))
            }
            TermPattern::Pattern(re) => {
                let m = re.find(text)?;
                if m.start() == m.end() {
                    Some(None)
                } else {
                    Some(Some((m.start(), m.end())))
                }
            }
        }
    }
}

/// A query compiled for one session.
pub struct CompiledQuery {
    terms: Vec<CompiledTerm>,
    poisoned: bool,
}

impl CompiledQuery {
    pub fn compile(query: &StructuredQuery) -> Self {
        let mut terms = Vec::with_capacity(query.terms.len());
        let mut poisoned = false;

        for term in &query.terms {
            let pattern = if term.text.is_empty() {
                TermPattern::MatchAll
            } else {
                match query.mode {
                    QueryMode::Regex => {
                        match RegexBuilder::new(&term.text)
                            .case_insensitive(!query.case_sensitive)
                            .build()
                        {
                            Ok(re) => TermPattern::Pattern(re),
                            Err(err) => {
                                debug!(term = %term.text, %err, "regex failed to compile, query yields no matches");
                                poisoned = true;
                                break;
                            }
                        }
                    }
                    QueryMode::Literal if query.case_sensitive => {
                        TermPattern::Substring(term.text.clone())
                    }
                    QueryMode::Literal => {
                        match RegexBuilder::new(&regex::escape(&term.text))
                            .case_insensitive(true)
                            .build()
                        {
                            Ok(probe) => TermPattern::FoldedSubstring {
                                needle: fold(&term.text),
                                probe,
                            },
                            Err(err) => {
                                // An escaped literal compiles unless it blows
                                // the size limit; treat that like a bad regex
                                debug!(term = %term.text, %err, "literal probe failed to compile");
                                poisoned = true;
                                break;
                            }
                        }
                    }
                }
            };
            terms.push(CompiledTerm {
                scope: term.field,
                pattern,
            });
        }

        Self { terms, poisoned }
    }

    /// Whether compilation failed; a poisoned query matches nothing.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Evaluate the query against one entry. `Some` carries the normalized
    /// highlight set; `None` means at least one term did not match.
    ///
    /// Each unscoped term tries the name first, then the path, and reports
    /// the field it actually matched in.
    pub fn matches(&self, entry: &Entry) -> Option<Vec<FieldHighlights>> {
        if self.poisoned {
            return None;
        }

        let mut hits = Vec::with_capacity(self.terms.len());
        for term in &self.terms {
            let hit = match term.scope {
                Some(field) => term
                    .find(entry.text(field), entry.folded(field))
                    .map(|range| TermHit {
                        label: Some(field),
                        computed_in: field,
                        range,
                    }),
                None => [Field::Name, Field::Path].into_iter().find_map(|field| {
                    term.find(entry.text(field), entry.folded(field))
                        .map(|range| TermHit {
                            label: None,
                            computed_in: field,
                            range,
                        })
                }),
            };
            // Conjunction: every term must match somewhere
            hits.push(hit?);
        }

        Some(highlight::collect(entry, hits))
    }
}
