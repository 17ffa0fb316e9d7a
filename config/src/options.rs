//! # Options and Resolved Configuration
//!
//! Option values are dynamically typed (`serde_json::Value`) because the
//! same keys carry strings, lists and mappings depending on the caller.
//! Typed views are extracted at the edges (`ConnectionParams`,
//! `AttributeSelection`), never re-inspected downstream.

use std::sync::Arc;

use errors::{LookupError, LookupResult};
use serde_json::{Map, Value};

/// One configuration layer: option name to value.
pub type Options = Map<String, Value>;

/// Key that names a context inside a layer and exposes the lineage to templates.
pub const CONTEXT_KEY: &str = "context";

/// Host variable holding the default configuration.
pub const DEFAULT_CONTEXT_NAME: &str = "ldap_lookup_config";

/// Option keys whose values never appear in logs.
const SENSITIVE_KEYS: &[&str] = &["bindpw"];

/// Immutable history of configuration snapshots.
///
/// Each snapshot is the accumulated configuration at the moment a layer
/// introduced a context, oldest first. Snapshots are shared, never mutated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lineage {
    snapshots: Vec<Arc<Options>>
}

impl Lineage {
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// The most recent snapshot, which is what templates see as `context`.
    pub fn latest(&self) -> Option<&Options> {
        self.snapshots.last().map(AsRef::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Options> {
        self.snapshots.iter().map(AsRef::as_ref)
    }

    fn extended(&self, snapshot: Options) -> Self {
        let mut snapshots = self.snapshots.clone();
        snapshots.push(Arc::new(snapshot));
        Self { snapshots }
    }

    /// Nested template view: the latest snapshot, whose own `context` key
    /// holds the snapshot before it, and so on.
    pub fn to_value(&self) -> Value {
        self.snapshots.iter().fold(Value::Null, |parent, snapshot| {
            let mut layer = (**snapshot).clone();
            if !parent.is_null() {
                layer.insert(CONTEXT_KEY.to_string(), parent);
            }
            Value::Object(layer)
        })
    }
}

/// Effective configuration produced by the `ContextResolver`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    options: Options,
    lineage: Lineage
}

impl Configuration {
    /// Any `context` key in `options` is dropped; lineage is tracked separately.
    pub fn new(mut options: Options) -> Self {
        options.remove(CONTEXT_KEY);
        Self {
            options,
            lineage: Lineage::default()
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    pub fn into_parts(self) -> (Options, Lineage) {
        (self.options, self.lineage)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.options.remove(key)
    }

    /// Later values win. The `context` key is never merged.
    ///
    /// Returns a description of every key that changed, secrets redacted.
    pub fn merge(&mut self, layer: &Options) -> Vec<String> {
        let mut changes = Vec::new();
        for (key, value) in layer {
            if key == CONTEXT_KEY || self.options.get(key) == Some(value) {
                continue;
            }
            if SENSITIVE_KEYS.contains(&key.as_str()) {
                changes.push(format!("{key} = ***"));
            } else {
                changes.push(format!("{key} = {value}"));
            }
            self.options.insert(key.clone(), value.clone());
        }
        changes
    }

    /// Records the current options as the newest lineage entry.
    pub fn snapshot(&mut self) {
        self.lineage = self.lineage.extended(self.options.clone());
    }

    /// Options with secrets masked, for logging.
    pub fn redacted(&self) -> Options {
        redact(&self.options)
    }
}

/// Copy of `options` with secrets masked.
pub fn redact(options: &Options) -> Options {
    options
        .iter()
        .map(|(key, value)| {
            if SENSITIVE_KEYS.contains(&key.as_str()) {
                (key.clone(), Value::String("***".to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Interprets a boolean option.
///
/// Accepts JSON booleans, `0`/`1`, and `true/false/yes/no/on/off`
/// (case-insensitive). `null` is false.
pub fn parse_flag(name: &str, value: &Value) -> LookupResult<bool> {
    match value {
        Value::Bool(flag) => Ok(*flag),
        Value::Null => Ok(false),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" | "" => Ok(false),
            _ => Err(LookupError::configuration(format!(
                "{name} expects a boolean, got {s:?}"
            )))
        },
        other => Err(LookupError::configuration(format!(
            "{name} expects a boolean, got {other}"
        )))
    }
}

/// Reads a scalar option as text. Lists and mappings are rejected.
pub fn scalar_string(name: &str, value: Option<&Value>) -> LookupResult<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(LookupError::configuration(format!(
            "{name} expects a scalar value, got {other}"
        )))
    }
}
