//! Query string parsing.
//!
//! A search box must always produce *some* query, so parsing never fails:
//! anything that does not look like a recognised construct is kept as a
//! literal term. The grammar is deliberately small:
//!
//! - a leading `re:` prefix (or the caller's regex hint) selects regex mode
//!   and is stripped before tokenisation
//! - whitespace separates terms; all terms must match (conjunction)
//! - `name:value` / `path:value` scope a term to one entry field, with the
//!   field keyword matched case-insensitively

use serde::Serialize;

/// Entry field a term can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Path,
}

impl Field {
    /// Parse a field keyword from a `field:value` token. Case-insensitive.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("name") {
            Some(Field::Name)
        } else if keyword.eq_ignore_ascii_case("path") {
            Some(Field::Path)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Path => "path",
        }
    }
}

/// How term text is interpreted by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    Literal,
    Regex,
}

/// One term of a query, optionally scoped to a single entry field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedTerm {
    pub field: Option<Field>,
    pub text: String,
}

/// Parsed, mode-tagged representation of a raw query string.
/// Produced once per search start and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredQuery {
    pub mode: QueryMode,
    pub case_sensitive: bool,
    pub terms: Vec<ScopedTerm>,
}

impl StructuredQuery {
    /// An empty query matches every entry.
    pub fn is_match_all(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Parse a raw query string. Never fails.
pub fn parse_query(raw: &str, case_sensitive: bool, global_regex_hint: bool) -> StructuredQuery {
    let trimmed = raw.trim();

    let (mode, rest) = if let Some(stripped) = trimmed.strip_prefix("re:") {
        (QueryMode::Regex, stripped)
    } else if global_regex_hint {
        (QueryMode::Regex, trimmed)
    } else {
        (QueryMode::Literal, trimmed)
    };

    let terms = rest
        .split_whitespace()
        .map(|token| match token.split_once(':') {
            Some((keyword, value)) => match Field::from_keyword(keyword) {
                Some(field) => ScopedTerm {
                    field: Some(field),
                    text: value.to_string(),
                },
                // Unknown field keyword: keep the whole token as a literal
                None => ScopedTerm {
                    field: None,
                    text: token.to_string(),
                },
            },
            None => ScopedTerm {
                field: None,
                text: token.to_string(),
            },
        })
        .collect();

    StructuredQuery {
        mode,
        case_sensitive,
        terms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> StructuredQuery {
        parse_query(raw, false, false)
    }

    #[test]
    fn plain_token_is_unscoped_literal() {
        let q = parse("report");
        assert_eq!(q.mode, QueryMode::Literal);
        assert_eq!(
            q.terms,
            vec![ScopedTerm {
                field: None,
                text: "report".into()
            }]
        );
    }

    #[test]
    fn re_prefix_selects_regex_mode() {
        let q = parse("re:rep.*\\.txt");
        assert_eq!(q.mode, QueryMode::Regex);
        assert_eq!(q.terms.len(), 1);
        assert_eq!(q.terms[0].text, "rep.*\\.txt");
    }

    #[test]
    fn regex_hint_without_prefix() {
        let q = parse_query("rep.*", false, true);
        assert_eq!(q.mode, QueryMode::Regex);
        assert_eq!(q.terms[0].text, "rep.*");
    }

    #[test]
    fn field_scoped_terms() {
        let q = parse("name:foo PATH:bar");
        assert_eq!(q.terms.len(), 2);
        assert_eq!(q.terms[0].field, Some(Field::Name));
        assert_eq!(q.terms[0].text, "foo");
        assert_eq!(q.terms[1].field, Some(Field::Path));
        assert_eq!(q.terms[1].text, "bar");
    }

    #[test]
    fn unknown_field_keyword_stays_literal() {
        let q = parse("size:100");
        assert_eq!(q.terms.len(), 1);
        assert_eq!(q.terms[0].field, None);
        assert_eq!(q.terms[0].text, "size:100");
    }

    #[test]
    fn multiple_terms_are_conjunctive() {
        let q = parse("report path:txt");
        assert_eq!(q.terms.len(), 2);
    }

    #[test]
    fn empty_and_whitespace_queries_match_all() {
        assert!(parse("").is_match_all());
        assert!(parse("   ").is_match_all());
        // `re:` with nothing after it still parses, just with no terms
        assert!(parse("re:").is_match_all());
    }

    #[test]
    fn scoped_term_with_empty_value() {
        let q = parse("name:");
        assert_eq!(q.terms.len(), 1);
        assert_eq!(q.terms[0].field, Some(Field::Name));
        assert_eq!(q.terms[0].text, "");
    }

    #[test]
    fn case_sensitivity_flag_is_carried() {
        let q = parse_query("Foo", true, false);
        assert!(q.case_sensitive);
    }
}
