//! # Lookup Invocation
//!
//! Runs one lookup: resolves the configuration, renders the connection
//! options, parses the attribute selection, binds once and searches once
//! per term.
//!
//! Template substitution happens in two phases with distinct variable
//! scopes:
//! 1. Connection options (everything except `base`, `scope`, `filter`) are
//!    rendered once against the host variables.
//! 2. The search fields are rendered per term, with `term` and `context`
//!    added to the host variables.

use config::{
    ConnectionParams, ContextResolver, DEFAULT_CONTEXT_NAME, Options, redact, scalar_string
};
use errors::{LookupError, LookupResult};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::attrs::AttributeSelection;
use crate::directory::{DirectoryConnector, DirectorySession, Ldap3Connector};
use crate::projector::{OutputRecord, ResultProjector};
use crate::search::{SearchTemplate, SearchTemplateBinder};
use crate::template::{HandlebarsEvaluator, TemplateEvaluator};

/// Separate leading mapping terms from the search terms.
///
/// Leading mappings are folded into one override layer, later keys
/// winning. No terms at all means one `null` term.
///
/// # Errors
///
/// Returns `LookupError::Usage` when a mapping follows a search term.
pub fn split_terms(terms: Vec<Value>) -> LookupResult<(Options, Vec<Value>)> {
    let mut layer = Options::new();
    let mut terms = terms.into_iter().peekable();
    while let Some(Value::Object(_)) = terms.peek() {
        if let Some(Value::Object(mapping)) = terms.next() {
            layer.extend(mapping);
        }
    }

    let mut rest: Vec<Value> = terms.collect();
    if rest.iter().any(Value::is_object) {
        return Err(LookupError::usage(
            "context parameters must come before search terms"
        ));
    }
    if rest.is_empty() {
        rest.push(Value::Null);
    }

    Ok((layer, rest))
}

/// Configuration-driven LDAP lookup.
///
/// # Example
///
/// ```rust,no_run
/// use ldap_lookup::LdapLookup;
/// use serde_json::json;
///
/// # async fn example() -> errors::LookupResult<()> {
/// let variables = json!({
///     "ldap_lookup_config": {
///         "url": "ldap://ldap.example.com",
///         "base": "ou=people,dc=example,dc=com",
///         "filter": "(uid={{term}})",
///         "value": "mail"
///     }
/// });
///
/// let mails = LdapLookup::new()
///     .run(vec![json!("jdoe")], variables.as_object().unwrap(), Default::default())
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct LdapLookup<C = Ldap3Connector, E = HandlebarsEvaluator> {
    connector: C,
    evaluator: E
}

impl LdapLookup {
    pub fn new() -> Self {
        Self::with_components(Ldap3Connector::new(), HandlebarsEvaluator::new())
    }
}

impl Default for LdapLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: DirectoryConnector, E: TemplateEvaluator> LdapLookup<C, E> {
    pub fn with_components(connector: C, evaluator: E) -> Self {
        Self {
            connector,
            evaluator
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run a lookup.
    ///
    /// `variables` are the host variables: the default context lives under
    /// `ldap_lookup_config`, named contexts are looked up among them, and
    /// they are visible to every template. `overrides` is the call-site
    /// keyword layer and may name a `context` of its own.
    ///
    /// # Errors
    ///
    /// Any error aborts the whole run; records gathered for earlier terms
    /// are discarded.
    pub async fn run(
        &self,
        terms: Vec<Value>,
        variables: &Options,
        overrides: Options
    ) -> LookupResult<Vec<OutputRecord>> {
        let (term_layer, terms) = split_terms(terms)?;

        let defaults = match variables.get(DEFAULT_CONTEXT_NAME) {
            None | Some(Value::Null) => Options::new(),
            Some(Value::Object(defaults)) => defaults.clone(),
            Some(other) => {
                return Err(LookupError::configuration(format!(
                    "{DEFAULT_CONTEXT_NAME} must be a mapping, got {other}"
                )));
            }
        };

        let (mut options, lineage) = ContextResolver::new(defaults, variables)
            .with_layer(term_layer)
            .with_layer(overrides)
            .resolve()?
            .into_parts();

        let template = SearchTemplate::extract(&mut options);
        let rendered = self.render_connection_options(variables, options)?;
        debug!("LDAP config: {:?}", redact(&rendered));

        let key_attr = scalar_string("key", rendered.get("key"))?;
        let selection =
            AttributeSelection::parse(rendered.get("value"))?.with_key_attribute(key_attr.as_deref());
        debug!(
            attrlist = ?selection.attrlist(),
            single_attr = ?selection.single_attr(),
            "Attribute selection: {:?}",
            selection.specs()
        );

        let params = ConnectionParams::from_options(&rendered)?;
        let mut session = self.connector.connect(&params).await?;

        let binder = SearchTemplateBinder::new(&self.evaluator, variables, template, &lineage);
        let outcome = search_terms(
            session.as_mut(),
            &binder,
            &terms,
            &selection,
            key_attr.as_deref()
        )
        .await;

        if let Err(e) = session.unbind().await {
            warn!(error = %e, "Unbind failed");
        }

        let records = outcome?;
        info!(terms = terms.len(), records = records.len(), "LDAP lookup completed");
        Ok(records)
    }

    fn render_connection_options(&self, variables: &Options, options: Options) -> LookupResult<Options> {
        match self.evaluator.substitute(variables, &Value::Object(options)) {
            Ok(Value::Object(rendered)) => Ok(rendered),
            Ok(other) => Err(LookupError::configuration(format!(
                "LDAP parameters rendered to a non-mapping value: {other}"
            ))),
            Err(LookupError::Configuration { message }) => Err(LookupError::configuration(
                format!("while preparing LDAP parameters: {message}")
            )),
            Err(other) => Err(other)
        }
    }
}

async fn search_terms(
    session: &mut dyn DirectorySession,
    binder: &SearchTemplateBinder<'_>,
    terms: &[Value],
    selection: &AttributeSelection,
    key_attr: Option<&str>
) -> LookupResult<Vec<OutputRecord>> {
    let projector = ResultProjector::from_selection(selection, key_attr);
    let mut records = Vec::new();

    for term in terms {
        let description = binder.bind(term)?;
        debug!(term = %term, "LDAP search, expanded: {:?}", description);

        let entries = session.search(&description, selection.attrlist()).await?;
        records.extend(projector.project(term, &entries)?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_terms_folds_leading_mappings() {
        let (layer, terms) = split_terms(vec![
            json!({"base": "dc=a", "scope": "one"}),
            json!({"base": "dc=b"}),
            json!("t1"),
            json!("t2"),
        ])
        .unwrap();

        assert_eq!(layer.get("base"), Some(&json!("dc=b")));
        assert_eq!(layer.get("scope"), Some(&json!("one")));
        assert_eq!(terms, vec![json!("t1"), json!("t2")]);
    }

    #[test]
    fn test_split_terms_empty_is_single_null() {
        let (layer, terms) = split_terms(vec![]).unwrap();
        assert!(layer.is_empty());
        assert_eq!(terms, vec![Value::Null]);

        let (_, terms) = split_terms(vec![json!({"base": "dc=a"})]).unwrap();
        assert_eq!(terms, vec![Value::Null]);
    }

    #[test]
    fn test_split_terms_rejects_late_mapping() {
        let err = split_terms(vec![json!("t1"), json!({"base": "dc=a"})]).unwrap_err();
        assert!(matches!(err, LookupError::Usage { .. }));
    }
}
