use crate::error::RuleError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

/// Grammar for threshold expressions: a numeric comparison
/// (`"> 90"`, `"<= 1.5"`, `"!= -1"`) or a null comparison (`"== nil"`,
/// `"!= nil"`).
static GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?P<num_op>>=|<=|==|!=|>|<) *(?P<num_val>-?[0-9]+(\.[0-9]+)?)|(?P<nil_op>==|!=) *nil)$")
        .expect("threshold grammar must compile")
});

static CACHE: LazyLock<RwLock<HashMap<String, Arc<ThresholdExpression>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparer {
    /// The source string was empty; evaluates to `(false, false)` and never
    /// contributes to a status.
    Unconfigured,
    Number(NumberOp, f64),
    Null(NullOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberOp {
    Gt,
    Ge,
    Eq,
    Le,
    Lt,
    Ne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NullOp {
    Eq,
    Ne,
}

/// A parsed threshold expression.
///
/// The last sample of a series is the left operand. A numeric comparison
/// against an absent value yields "unknown" instead of a hit; the null
/// comparisons test presence itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpression {
    source: String,
    comparer: Comparer,
}

impl ThresholdExpression {
    /// Parses `source` against the grammar. Parsed forms are cached by
    /// source string; the empty string is the unconfigured expression.
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        {
            let cache = CACHE.read().unwrap_or_else(|p| p.into_inner());
            if let Some(expr) = cache.get(source) {
                return Ok((**expr).clone());
            }
        }

        let comparer = Self::compile(source)?;
        let expr = Arc::new(ThresholdExpression {
            source: source.to_string(),
            comparer,
        });
        let mut cache = CACHE.write().unwrap_or_else(|p| p.into_inner());
        let expr = cache.entry(source.to_string()).or_insert(expr);
        Ok((**expr).clone())
    }

    fn compile(source: &str) -> Result<Comparer, RuleError> {
        if source.is_empty() {
            return Ok(Comparer::Unconfigured);
        }

        let captures = GRAMMAR
            .captures(source)
            .ok_or_else(|| RuleError::InvalidExpression(source.to_string()))?;

        if let Some(op) = captures.name("num_op") {
            let value: f64 = captures
                .name("num_val")
                .map(|m| m.as_str())
                .unwrap_or_default()
                .parse()
                .map_err(|_| RuleError::InvalidExpression(source.to_string()))?;
            let op = match op.as_str() {
                ">" => NumberOp::Gt,
                ">=" => NumberOp::Ge,
                "==" => NumberOp::Eq,
                "<=" => NumberOp::Le,
                "<" => NumberOp::Lt,
                "!=" => NumberOp::Ne,
                _ => return Err(RuleError::InvalidExpression(source.to_string())),
            };
            return Ok(Comparer::Number(op, value));
        }

        match captures.name("nil_op").map(|m| m.as_str()) {
            Some("==") => Ok(Comparer::Null(NullOp::Eq)),
            Some("!=") => Ok(Comparer::Null(NullOp::Ne)),
            _ => Err(RuleError::InvalidExpression(source.to_string())),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.comparer != Comparer::Unconfigured
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluates against the last sample, returning `(hit, unknown)`.
    ///
    /// | expression  | absent          | present            |
    /// |-------------|-----------------|--------------------|
    /// | numeric     | (false, true)   | (value op rhs, false) |
    /// | `== nil`    | (true, false)   | (false, false)     |
    /// | `!= nil`    | (false, false)  | (true, false)      |
    pub fn evaluate(&self, value: f64, absent: bool) -> (bool, bool) {
        match self.comparer {
            Comparer::Unconfigured => (false, false),
            Comparer::Null(NullOp::Eq) => (absent, false),
            Comparer::Null(NullOp::Ne) => (!absent, false),
            Comparer::Number(op, rhs) => {
                if absent {
                    return (false, true);
                }
                let hit = match op {
                    NumberOp::Gt => value > rhs,
                    NumberOp::Ge => value >= rhs,
                    NumberOp::Eq => value == rhs,
                    NumberOp::Le => value <= rhs,
                    NumberOp::Lt => value < rhs,
                    NumberOp::Ne => value != rhs,
                };
                (hit, false)
            }
        }
    }
}

impl Default for ThresholdExpression {
    fn default() -> Self {
        ThresholdExpression {
            source: String::new(),
            comparer: Comparer::Unconfigured,
        }
    }
}

impl Serialize for ThresholdExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for ThresholdExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ThresholdExpression::parse(&s).map_err(serde::de::Error::custom)
    }
}
