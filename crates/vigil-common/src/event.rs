use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome severity of a single check evaluation, serialized as its
/// integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Status {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl From<Status> for u8 {
    fn from(status: Status) -> u8 {
        status as u8
    }
}

impl TryFrom<u8> for Status {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Status::Ok),
            1 => Ok(Status::Warning),
            2 => Ok(Status::Critical),
            3 => Ok(Status::Unknown),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => write!(f, "ok"),
            Status::Warning => write!(f, "warning"),
            Status::Critical => write!(f, "critical"),
            Status::Unknown => write!(f, "unknown"),
        }
    }
}

/// The outcome of executing one check against one time-series result.
///
/// `metadata` is the rule's baseline merged with whatever the check
/// extracted from the result; extracted keys win. `identifier` is the
/// rule's identifier pattern resolved against that merged metadata, and is
/// what downstream consumers group and de-duplicate on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Origin of the event; always `"rule"` on this path.
    pub source: String,
    /// When the event was produced.
    pub timestamp: DateTime<Utc>,
    pub rule_id: i64,
    pub status: Status,
    pub identifier: String,
    pub metadata: Metadata,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

impl Event {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn type_name(&self) -> &'static str {
        match self.outcome {
            CheckOutcome::Graphite(_) => "graphite",
        }
    }
}

/// Type-specific result payload, mirroring the rule type on the wire
/// (`{"type": "graphite", "result": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "result", rename_all = "lowercase")]
pub enum CheckOutcome {
    Graphite(GraphiteResult),
}

/// Details of one evaluated Graphite series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphiteResult {
    pub metric_name: String,
    /// Timestamp of the sample that was compared.
    pub metric_timestamp: DateTime<Utc>,
    pub metric_value: f64,
    /// No comparable sample was found within `max_null_points` of the tail.
    pub metric_value_absent: bool,
    /// When the check started executing.
    pub check_timestamp: DateTime<Utc>,
    /// Keys extracted from the series name.
    pub metadata: Metadata,
}
