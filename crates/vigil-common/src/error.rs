use crate::duration::Duration;

/// Errors raised while decoding or validating rule material.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// A duration string did not match `<number><unit>` (units `h m s ms us ns`).
    #[error("invalid duration: '{0}'")]
    InvalidDuration(String),

    /// The schedule interval is zero.
    #[error("invalid interval: {0}")]
    InvalidInterval(Duration),

    /// The per-task timeout is zero or larger than the interval.
    #[error("timeout {timeout} must be positive and less-equal than interval {interval}")]
    InvalidTimeout {
        timeout: Duration,
        interval: Duration,
    },

    /// A threshold expression did not match the comparison grammar.
    #[error("invalid threshold expression: '{0}'")]
    InvalidExpression(String),

    /// `metadata_extract_pattern` is not a valid regular expression.
    #[error("invalid metadata extract pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A graphite check without a render query is meaningless.
    #[error("must provide `query` for graphite check")]
    MissingQuery,

    /// Both threshold expressions are unconfigured.
    #[error("at least one of `warning_expression` / `critical_expression` must be set")]
    MissingExpression,

    /// JSON decoding failed; unknown `type` discriminators surface here as
    /// serde unknown-variant errors.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}
