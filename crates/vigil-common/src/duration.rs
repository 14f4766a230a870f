use crate::error::RuleError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration as StdDuration;

/// A wall-clock duration that serializes as a compact string such as
/// `"10s"`, `"1m30s"` or `"250ms"`.
///
/// Formatting picks the largest unit that divides the value evenly, so any
/// value survives an encode/decode round trip unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(StdDuration);

/// `(suffix, length in nanoseconds)`, largest first.
const UNITS: &[(&str, u128)] = &[
    ("h", 3_600_000_000_000),
    ("m", 60_000_000_000),
    ("s", 1_000_000_000),
    ("ms", 1_000_000),
    ("us", 1_000),
    ("ns", 1),
];

impl Duration {
    pub const ZERO: Duration = Duration(StdDuration::ZERO);

    pub fn from_secs(secs: u64) -> Self {
        Duration(StdDuration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Duration(StdDuration::from_millis(millis))
    }

    pub fn from_std(d: StdDuration) -> Self {
        Duration(d)
    }

    pub fn as_std(self) -> StdDuration {
        self.0
    }

    pub fn as_nanos(self) -> u128 {
        self.0.as_nanos()
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn to_chrono(self) -> chrono::Duration {
        chrono::Duration::from_std(self.0).unwrap_or(chrono::TimeDelta::MAX)
    }

    /// Parses one or more `<number><unit>` groups, e.g. `"90s"`, `"1m30s"`,
    /// `"1.5s"`. Fractional numbers are allowed; the total is rounded to
    /// whole nanoseconds.
    pub fn parse(input: &str) -> Result<Self, RuleError> {
        let invalid = || RuleError::InvalidDuration(input.to_string());
        let s = input.trim();
        if s.is_empty() {
            return Err(invalid());
        }

        let mut rest = s;
        let mut total_ns = 0f64;
        while !rest.is_empty() {
            let num_len = rest
                .find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-')
                .ok_or_else(invalid)?;
            let number: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
            if number < 0.0 {
                return Err(invalid());
            }
            rest = &rest[num_len..];

            let (suffix, unit_ns) = UNITS
                .iter()
                .filter(|(suffix, _)| rest.starts_with(suffix))
                // "ms"/"us"/"ns" must win over a bare "s" / "m" prefix match
                .max_by_key(|(suffix, _)| suffix.len())
                .ok_or_else(invalid)?;
            rest = &rest[suffix.len()..];

            total_ns += number * *unit_ns as f64;
        }

        Ok(Duration(StdDuration::from_nanos(total_ns.round() as u64)))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.0.as_nanos();
        if ns == 0 {
            return write!(f, "0s");
        }
        for (suffix, unit_ns) in UNITS {
            if ns % unit_ns == 0 {
                return write!(f, "{}{}", ns / unit_ns, suffix);
            }
        }
        unreachable!("the ns unit divides everything")
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Duration::parse(&s).map_err(serde::de::Error::custom)
    }
}
