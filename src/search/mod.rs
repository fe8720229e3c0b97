pub mod highlight;
pub mod matcher;
pub mod session;

pub use highlight::FieldHighlights;
pub use matcher::CompiledQuery;
pub use session::{
    Delivery, ResultCallback, SearchHit, Session, SessionManager, SessionState,
};
