pub mod parser;

pub use parser::{parse_query, Field, QueryMode, ScopedTerm, StructuredQuery};
