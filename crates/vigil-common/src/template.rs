use crate::metadata::{value_to_string, Metadata};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("placeholder pattern must compile"));

static CACHE: LazyLock<RwLock<HashMap<String, Arc<IdentifierTemplate>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// A literal string with `{name}` placeholders, resolved against event
/// metadata to produce the event identifier.
///
/// Keys missing from the metadata stay in the output as the literal
/// `{name}` text.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierTemplate {
    pattern: String,
    keys: Vec<String>,
}

impl IdentifierTemplate {
    /// Compiles `pattern`, returning the cached instance when one exists.
    /// Compilation never fails; a pattern without placeholders resolves to
    /// itself.
    pub fn compile(pattern: &str) -> Arc<Self> {
        {
            let cache = CACHE.read().unwrap_or_else(|p| p.into_inner());
            if let Some(template) = cache.get(pattern) {
                return template.clone();
            }
        }

        let mut keys: Vec<String> = Vec::new();
        for captures in PLACEHOLDER.captures_iter(pattern) {
            let key = &captures[1];
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }

        let template = Arc::new(IdentifierTemplate {
            pattern: pattern.to_string(),
            keys,
        });
        let mut cache = CACHE.write().unwrap_or_else(|p| p.into_inner());
        cache.entry(pattern.to_string()).or_insert(template).clone()
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Substitutes every `{name}` whose key is present in `metadata`.
    pub fn resolve(&self, metadata: &Metadata) -> String {
        let mut out = self.pattern.clone();
        for key in &self.keys {
            if let Some(value) = metadata.get(key) {
                out = out.replace(&format!("{{{key}}}"), &value_to_string(value));
            }
        }
        out
    }
}
