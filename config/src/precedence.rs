//! # Configuration Precedence
//!
//! Merges the default context, named contexts and override layers into one
//! effective `Configuration`.
//!
//! # Precedence Order
//! 1. Override layers, in the order given (highest priority last)
//! 2. Named contexts, merged when a layer names one
//! 3. Default context (lowest priority)
//!
//! A layer's `context` key is consumed before the rest of the layer: the
//! named context is merged, the accumulated configuration is snapshotted
//! into the lineage, then the layer's remaining keys are applied on top.

use errors::{LookupError, LookupResult};
use serde_json::Value;
use tracing::debug;

use crate::options::{CONTEXT_KEY, Configuration, Options};
use crate::store::NamedContextStore;

/// Resolves the effective configuration for one lookup invocation.
///
/// # Example
///
/// ```rust
/// use config::{ContextResolver, NamedContexts, Options};
/// use serde_json::json;
///
/// let contexts = NamedContexts::new().with_context(
///     "corp",
///     json!({"url": "ldaps://ldap.corp"}).as_object().cloned().unwrap()
/// );
/// let defaults: Options = json!({"url": "ldap://localhost", "base": "dc=corp"})
///     .as_object()
///     .cloned()
///     .unwrap();
///
/// let resolved = ContextResolver::new(defaults, &contexts)
///     .with_layer(json!({"context": "corp"}).as_object().cloned().unwrap())
///     .resolve()
///     .unwrap();
///
/// assert_eq!(resolved.get_str("url"), Some("ldaps://ldap.corp"));
/// assert_eq!(resolved.lineage().len(), 2);
/// ```
pub struct ContextResolver<'a> {
    defaults: Options,
    contexts: &'a dyn NamedContextStore,
    layers: Vec<Options>
}

impl<'a> ContextResolver<'a> {
    pub fn new(defaults: Options, contexts: &'a dyn NamedContextStore) -> Self {
        Self {
            defaults,
            contexts,
            layers: Vec::new()
        }
    }

    /// Add an override layer. Layers apply in insertion order.
    #[must_use]
    pub fn with_layer(mut self, layer: Options) -> Self {
        self.layers.push(layer);
        self
    }

    #[must_use]
    pub fn with_layers(mut self, layers: impl IntoIterator<Item = Options>) -> Self {
        self.layers.extend(layers);
        self
    }

    /// Resolve the configuration from all layers.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Configuration` if a layer names a context that
    /// does not exist or is not a mapping.
    pub fn resolve(&self) -> LookupResult<Configuration> {
        let mut resolved = Configuration::new(self.defaults.clone());
        resolved.snapshot();
        debug!(
            keys = resolved.options().len(),
            layers = self.layers.len(),
            "Starting context resolution from defaults"
        );

        for (index, layer) in self.layers.iter().enumerate() {
            self.apply_layer(&mut resolved, layer, index)?;
        }

        Ok(resolved)
    }

    fn apply_layer(
        &self,
        resolved: &mut Configuration,
        layer: &Options,
        index: usize
    ) -> LookupResult<()> {
        if let Some(reference) = layer.get(CONTEXT_KEY) {
            let name = context_name(reference)?;
            let named = self
                .contexts
                .lookup(name)
                .ok_or_else(|| LookupError::configuration(format!("context {name} does not exist")))?
                .as_object()
                .ok_or_else(|| {
                    LookupError::configuration(format!("context {name} is not a mapping"))
                })?;

            if named.contains_key(CONTEXT_KEY) {
                debug!(context = %name, "Named contexts do not chain; nested context key ignored");
            }

            let changes = resolved.merge(named);
            if !changes.is_empty() {
                debug!("Configuration from context {}: {:?}", name, changes);
            }
            resolved.snapshot();
        }

        let changes = resolved.merge(layer);
        if !changes.is_empty() {
            debug!("Configuration from layer {}: {:?}", index, changes);
        }

        Ok(())
    }
}

/// Resolve `layers` over `defaults`, looking contexts up in `contexts`.
pub fn resolve(
    layers: &[Options],
    defaults: &Options,
    contexts: &dyn NamedContextStore
) -> LookupResult<Configuration> {
    ContextResolver::new(defaults.clone(), contexts)
        .with_layers(layers.iter().cloned())
        .resolve()
}

fn context_name(reference: &Value) -> LookupResult<&str> {
    reference.as_str().ok_or_else(|| {
        LookupError::configuration(format!("context name must be a string, got {reference}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::NamedContexts;
    use serde_json::json;

    fn options(value: Value) -> Options {
        value.as_object().cloned().unwrap()
    }

    fn store() -> NamedContexts {
        NamedContexts::new()
            .with_context(
                "corp",
                options(json!({"url": "ldaps://ldap.corp", "base": "dc=corp"}))
            )
            .with_context("people", options(json!({"base": "ou=people,dc=corp"})))
    }

    fn defaults() -> Options {
        options(json!({"url": "ldap://localhost", "scope": "subtree"}))
    }

    #[test]
    fn test_resolve_defaults_only() {
        let contexts = store();
        let resolved = resolve(&[], &defaults(), &contexts).unwrap();

        assert_eq!(resolved.get_str("url"), Some("ldap://localhost"));
        assert_eq!(resolved.lineage().len(), 1);
        assert_eq!(resolved.lineage().latest(), Some(&defaults()));
    }

    #[test]
    fn test_resolve_layer_overrides_named_context() {
        let contexts = store();
        let layer = options(json!({"context": "corp", "base": "ou=groups,dc=corp"}));
        let resolved = resolve(&[layer], &defaults(), &contexts).unwrap();

        assert_eq!(resolved.get_str("url"), Some("ldaps://ldap.corp"));
        assert_eq!(resolved.get_str("base"), Some("ou=groups,dc=corp"));
        assert!(resolved.get(CONTEXT_KEY).is_none());

        // Snapshot taken after the named context, before the layer's own keys
        let latest = resolved.lineage().latest().unwrap();
        assert_eq!(latest["base"], json!("dc=corp"));
        assert_eq!(latest["url"], json!("ldaps://ldap.corp"));
    }

    #[test]
    fn test_resolve_layers_apply_in_order() {
        let contexts = store();
        let first = options(json!({"filter": "(a=1)", "base": "dc=first"}));
        let second = options(json!({"filter": "(b=2)"}));
        let resolved = resolve(&[first, second], &defaults(), &contexts).unwrap();

        assert_eq!(resolved.get_str("filter"), Some("(b=2)"));
        assert_eq!(resolved.get_str("base"), Some("dc=first"));
        assert_eq!(resolved.lineage().len(), 1);
    }

    #[test]
    fn test_resolve_multiple_contexts_chain_lineage() {
        let contexts = store();
        let first = options(json!({"context": "corp"}));
        let second = options(json!({"context": "people", "value": "cn"}));
        let resolved = resolve(&[first, second], &defaults(), &contexts).unwrap();

        assert_eq!(resolved.get_str("base"), Some("ou=people,dc=corp"));
        assert_eq!(resolved.get_str("url"), Some("ldaps://ldap.corp"));
        assert_eq!(resolved.lineage().len(), 3);

        let view = resolved.lineage().to_value();
        assert_eq!(view["base"], json!("ou=people,dc=corp"));
        assert_eq!(view["context"]["base"], json!("dc=corp"));
        assert_eq!(view["context"]["context"]["url"], json!("ldap://localhost"));
        assert!(view.get("value").is_none());
    }

    #[test]
    fn test_resolve_matches_stepwise_application() {
        let contexts = store();
        let a = options(json!({"context": "corp", "filter": "(a=1)"}));
        let b = options(json!({"base": "dc=b"}));

        let both = resolve(&[a.clone(), b.clone()], &defaults(), &contexts).unwrap();

        let mut stepwise = resolve(&[a], &defaults(), &contexts).unwrap();
        stepwise.merge(&b);

        assert_eq!(both, stepwise);
    }

    #[test]
    fn test_resolve_unknown_context_fails() {
        let contexts = store();
        let layer = options(json!({"context": "nope"}));
        let err = resolve(&[layer], &defaults(), &contexts).unwrap_err();

        assert!(err.is_configuration());
        assert!(err.to_string().contains("context nope does not exist"));
    }

    #[test]
    fn test_resolve_context_must_be_mapping() {
        let vars = options(json!({"plain": "just a string"}));
        let layer = options(json!({"context": "plain"}));
        let err = resolve(&[layer], &defaults(), &vars).unwrap_err();

        assert!(err.to_string().contains("not a mapping"));
    }

    #[test]
    fn test_resolve_context_name_must_be_string() {
        let contexts = store();
        let layer = options(json!({"context": null}));
        assert!(resolve(&[layer], &defaults(), &contexts).is_err());
    }

    #[test]
    fn test_resolver_does_not_mutate_inputs() {
        let contexts = store();
        let layer = options(json!({"context": "corp"}));
        let resolver = ContextResolver::new(defaults(), &contexts).with_layer(layer.clone());

        let first = resolver.resolve().unwrap();
        let second = resolver.resolve().unwrap();

        assert_eq!(first, second);
        assert!(layer.contains_key(CONTEXT_KEY));
    }
}
