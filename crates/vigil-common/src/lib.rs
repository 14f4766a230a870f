//! Core data model shared by the scheduler and the executor.
//!
//! A [`Rule`](rule::Rule) describes what to check and how often. On every
//! tick the scheduler materializes it into a [`Task`](task::Task) that
//! crosses the broker boundary with explicit deadline and expiration
//! instants. Executing a task against a time-series backend yields
//! [`Event`](event::Event)s tagged with a [`Status`](event::Status) and a
//! rule-defined identifier.

pub mod check;
pub mod duration;
pub mod error;
pub mod event;
pub mod metadata;
pub mod regexp;
pub mod rule;
pub mod task;
pub mod template;
pub mod threshold;

#[cfg(test)]
mod tests;

pub use check::{Check, GraphiteCheck};
pub use duration::Duration;
pub use error::RuleError;
pub use event::{CheckOutcome, Event, GraphiteResult, Status};
pub use metadata::Metadata;
pub use rule::Rule;
pub use task::Task;
pub use template::IdentifierTemplate;
pub use threshold::ThresholdExpression;
