use crate::error::RuleError;
use crate::regexp;
use crate::threshold::ThresholdExpression;
use serde::{Deserialize, Serialize};

/// Check payloads, dispatched by the sibling `type` discriminator on the
/// wire (`{"type": "graphite", "check": {...}}`).
///
/// Adding a check type is a closed-world change: a new variant here plus a
/// dispatch arm in the executor. Unknown discriminators fail decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "check", rename_all = "lowercase")]
pub enum Check {
    Graphite(GraphiteCheck),
}

impl Check {
    pub fn type_name(&self) -> &'static str {
        match self {
            Check::Graphite(_) => "graphite",
        }
    }

    pub fn validate(&self) -> Result<(), RuleError> {
        match self {
            Check::Graphite(check) => check.validate(),
        }
    }
}

/// Queries a Graphite render endpoint and compares the most recent sample
/// of every returned series against the configured thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphiteCheck {
    /// Base URL of the Graphite instance; the render query becomes
    /// `{graphite_url}/render/?target={query}&from={from}&until={until}`.
    pub graphite_url: String,
    pub query: String,
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_until")]
    pub until: String,

    /// Regular expression with named capture groups, matched against each
    /// series name to extract extra metadata. An empty pattern extracts
    /// nothing; the series is still processed.
    #[serde(default)]
    pub metadata_extract_pattern: String,

    /// Evaluation order: critical first, then warning, then OK.
    #[serde(default)]
    pub critical_expression: ThresholdExpression,
    #[serde(default)]
    pub warning_expression: ThresholdExpression,

    /// The last value of a series is often null (carbon cache, time drift).
    /// Up to this many trailing nulls are skipped when looking for the
    /// sample to compare; beyond that the value counts as absent.
    #[serde(default)]
    pub max_null_points: u32,
}

fn default_from() -> String {
    "-5min".to_string()
}

fn default_until() -> String {
    "now".to_string()
}

impl GraphiteCheck {
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.query.is_empty() {
            return Err(RuleError::MissingQuery);
        }

        if !self.metadata_extract_pattern.is_empty() {
            regexp::compile(&self.metadata_extract_pattern)?;
        }

        if !self.critical_expression.is_configured() && !self.warning_expression.is_configured() {
            return Err(RuleError::MissingExpression);
        }

        Ok(())
    }
}
