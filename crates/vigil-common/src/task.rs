use crate::check::Check;
use crate::metadata::Metadata;
use crate::rule::Rule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A materialized, scheduled instance of a rule.
///
/// Tasks cross the scheduler → executor boundary as JSON and exist only
/// between emission and consumption. `deadline` bounds execution time,
/// `expiration` is the instant beyond which the task must not start at all;
/// it protects against stale tasks surviving in the broker after the
/// scheduler reconfigured or removed the rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(flatten)]
    pub check: Check,
    pub metadata: Metadata,
    pub event_identifier_pattern: String,

    /// When the scheduler emitted the task.
    pub schedule: DateTime<Utc>,
    /// `schedule + rule.timeout`.
    pub deadline: DateTime<Utc>,
    /// `schedule + rule.interval`.
    pub expiration: DateTime<Utc>,

    pub rule_id: i64,
}

impl Task {
    /// Snapshots `rule` at the current instant.
    pub fn from_rule(rule: &Rule) -> Self {
        let now = Utc::now();
        Task {
            check: rule.check.clone(),
            metadata: rule.metadata.clone(),
            event_identifier_pattern: rule.event_identifier_pattern.clone(),
            schedule: now,
            deadline: now + rule.timeout.to_chrono(),
            expiration: now + rule.interval.to_chrono(),
            rule_id: rule.id,
        }
    }

    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn type_name(&self) -> &'static str {
        self.check.type_name()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration
    }
}
