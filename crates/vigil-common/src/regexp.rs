//! Process-wide cache of compiled regular expressions.
//!
//! Extraction patterns come from rules, so the set of distinct patterns is
//! bounded by the rule set; entries are immutable once inserted and never
//! evicted.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

static CACHE: LazyLock<RwLock<HashMap<String, Arc<Regex>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Compiles `pattern`, returning the cached instance when one exists.
pub fn compile(pattern: &str) -> Result<Arc<Regex>, regex::Error> {
    {
        let cache = CACHE.read().unwrap_or_else(|p| p.into_inner());
        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }
    }

    let re = Arc::new(Regex::new(pattern)?);
    let mut cache = CACHE.write().unwrap_or_else(|p| p.into_inner());
    Ok(cache.entry(pattern.to_string()).or_insert(re).clone())
}
