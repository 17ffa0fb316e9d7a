//! Named context lookup.

use serde_json::Value;

use crate::options::Options;

/// Source of named configuration contexts.
///
/// The resolver only looks names up; it never creates contexts.
pub trait NamedContextStore {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

/// Host variables double as a context store: any variable may be named as
/// a context, as long as it holds a mapping.
impl NamedContextStore for Options {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// An explicit set of named contexts.
#[derive(Debug, Clone, Default)]
pub struct NamedContexts {
    contexts: Options
}

impl NamedContexts {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_context(mut self, name: &str, options: Options) -> Self {
        self.insert(name, options);
        self
    }

    pub fn insert(&mut self, name: &str, options: Options) {
        self.contexts
            .insert(name.to_string(), Value::Object(options));
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

impl NamedContextStore for NamedContexts {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.contexts.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_named_contexts_lookup() {
        let store = NamedContexts::new().with_context(
            "corp",
            json!({"base": "dc=corp"}).as_object().cloned().unwrap()
        );

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("corp").unwrap()["base"], json!("dc=corp"));
        assert!(store.lookup("nope").is_none());
    }

    #[test]
    fn test_variables_as_store() {
        let vars = json!({"corp": {"base": "dc=corp"}, "answer": 42});
        let vars = vars.as_object().unwrap();

        assert!(vars.lookup("corp").unwrap().is_object());
        assert_eq!(vars.lookup("answer"), Some(&json!(42)));
    }
}
