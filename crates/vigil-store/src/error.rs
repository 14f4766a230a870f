/// Errors raised by the rule store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store was closed; no further queries are possible.
    #[error("store: query on closed store")]
    Closed,

    /// No document exists under the requested id.
    #[error("store: rule not found (id={0})")]
    NotFound(i64),

    /// Collection names become table names and must be plain identifiers.
    #[error("store: invalid collection name '{0}'")]
    InvalidCollection(String),

    #[error("store: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store: sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored document failed to decode back into a rule.
    #[error("store: corrupt document: {0}")]
    Decode(#[from] vigil_common::RuleError),
}
