//! Persistent rule store.
//!
//! Rules live in a key-addressable document collection: the store assigns an
//! integer id on insert and that id is authoritative. It is never written
//! into the document itself and is re-attached on every read.

pub mod error;
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use error::StoreError;
pub use sqlite::SqliteRuleStore;

use vigil_common::Rule;

/// CRUD over the persistent rule collection.
///
/// Implementations serialize their own access; callers share one instance
/// behind an `Arc` without extra locking.
pub trait RuleStore: Send + Sync {
    /// Returns every stored rule with its id attached. Documents that no
    /// longer decode are skipped, not fatal.
    fn get_all(&self) -> Result<Vec<Rule>, StoreError>;

    /// Loads one rule; `None` when the id does not exist.
    fn get(&self, id: i64) -> Result<Option<Rule>, StoreError>;

    /// Stores a new document and returns the assigned id. Any id already on
    /// `rule` is ignored.
    fn insert(&self, rule: &Rule) -> Result<i64, StoreError>;

    /// Replaces the document under `id`.
    fn update(&self, id: i64, rule: &Rule) -> Result<(), StoreError>;

    fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// Releases the backend; later calls fail with [`StoreError::Closed`].
    fn close(&self);
}
