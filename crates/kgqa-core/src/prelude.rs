//! kgqa Core Prelude: convenient imports for common usage.
//!
//! ```rust
//! use kgqa_core::prelude::*;
//! ```

pub use crate::error::{
    ConfigError, ExtractionError, KgError, ResolutionError, Result, StoreError, StoreResult,
};
pub use crate::sanitize::{sanitize_statement, SanitizePolicy};
pub use crate::statement::{
    Clause, Direction, MergeClause, NodePattern, Pattern, RelPattern, Statement,
};
pub use crate::store::GraphStore;
pub use crate::types::{
    AnswerAttempt, Corpus, EdgeRecord, ExpansionOutcome, Neighborhood, NodeRecord, Properties,
    PropertyValue, QuestionRecord,
};
