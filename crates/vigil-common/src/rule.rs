use crate::check::Check;
use crate::duration::Duration;
use crate::error::RuleError;
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};

/// A persistent specification of what to check and how often.
///
/// The `id` is assigned by the rule store on insert and is never part of the
/// stored document; user-supplied ids are ignored by the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(flatten)]
    pub check: Check,

    /// Baseline labels attached to every event this rule emits.
    #[serde(default)]
    pub metadata: Metadata,

    /// `{key}` placeholders are resolved against the merged event metadata.
    #[serde(default)]
    pub event_identifier_pattern: String,

    /// Paused rules are persisted but not scheduled.
    #[serde(default)]
    pub paused: bool,

    /// Timer period of the rule's scheduling loop.
    pub interval: Duration,

    /// Per-task execution deadline; defaults to `interval` when omitted.
    #[serde(default)]
    pub timeout: Duration,

    #[serde(default, skip_serializing_if = "id_is_unset")]
    pub id: i64,
}

fn id_is_unset(id: &i64) -> bool {
    *id == 0
}

impl Rule {
    /// Decodes a rule document, filling omitted fields with their defaults.
    pub fn from_json(data: &[u8]) -> Result<Self, RuleError> {
        let mut rule: Rule = serde_json::from_slice(data)?;
        rule.apply_defaults();
        Ok(rule)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, RuleError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// An omitted timeout means "as long as the interval allows".
    pub fn apply_defaults(&mut self) {
        if self.timeout.is_zero() {
            self.timeout = self.interval;
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.check.type_name()
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        if self.interval.is_zero() {
            return Err(RuleError::InvalidInterval(self.interval));
        }

        if self.timeout.is_zero() || self.timeout > self.interval {
            return Err(RuleError::InvalidTimeout {
                timeout: self.timeout,
                interval: self.interval,
            });
        }

        self.check.validate()
    }
}
