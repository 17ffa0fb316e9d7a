//! Per-term search binding.
//!
//! `base`, `scope` and `filter` are pulled out of the resolved options
//! before connection-level rendering, because they usually reference the
//! current term. They are rendered once per term by `SearchTemplateBinder`.

use std::str::FromStr;

use config::{Lineage, Options, scalar_string};
use errors::{LookupError, LookupResult};
use serde_json::{Value, json};
use strum::{Display, EnumString};

use crate::template::TemplateEvaluator;

/// Search breadth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SearchScope {
    /// The base entry only.
    Base,
    /// Immediate children of the base.
    #[strum(to_string = "one", serialize = "onelevel")]
    One,
    #[default]
    Subtree
}

/// A concrete search, bound for one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDescription {
    pub base: String,
    pub scope: SearchScope,
    /// `None` matches every entry.
    pub filter: Option<String>
}

impl SearchDescription {
    pub fn new(base: impl Into<String>, scope: SearchScope, filter: Option<String>) -> Self {
        Self {
            base: base.into(),
            scope,
            filter
        }
    }
}

/// Unrendered `base`, `scope` and `filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchTemplate {
    base: Value,
    scope: Value,
    filter: Value
}

impl SearchTemplate {
    /// Remove the search fields from `options`, applying defaults.
    pub fn extract(options: &mut Options) -> Self {
        Self {
            base: options.remove("base").unwrap_or_else(|| json!("")),
            scope: options.remove("scope").unwrap_or_else(|| json!("subtree")),
            filter: options.remove("filter").unwrap_or(Value::Null)
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "base": self.base,
            "scope": self.scope,
            "filter": self.filter
        })
    }
}

/// Renders the search template once per term.
///
/// Run variables are the host variables; each term adds `term` and
/// `context` (the lineage of the resolved configuration) on top.
pub struct SearchTemplateBinder<'a> {
    evaluator: &'a dyn TemplateEvaluator,
    variables: &'a Options,
    template: SearchTemplate,
    context: Value
}

impl<'a> SearchTemplateBinder<'a> {
    pub fn new(
        evaluator: &'a dyn TemplateEvaluator,
        variables: &'a Options,
        template: SearchTemplate,
        lineage: &Lineage
    ) -> Self {
        Self {
            evaluator,
            variables,
            template,
            context: lineage.to_value()
        }
    }

    /// Variables visible while rendering the search fields for `term`.
    pub fn term_variables(&self, term: &Value) -> Options {
        let mut variables = self.variables.clone();
        variables.insert("term".to_string(), term.clone());
        variables.insert("context".to_string(), self.context.clone());
        variables
    }

    /// Render the search description for `term`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Configuration` when rendering fails, when a
    /// field renders to a list or mapping, or when the scope is unknown.
    pub fn bind(&self, term: &Value) -> LookupResult<SearchDescription> {
        let rendered = self
            .evaluator
            .substitute(&self.term_variables(term), &self.template.to_value())?;

        let base = scalar_string("base", rendered.get("base"))?.unwrap_or_default();
        let scope = match scalar_string("scope", rendered.get("scope"))? {
            None => SearchScope::default(),
            Some(name) => SearchScope::from_str(name.trim())
                .map_err(|_| LookupError::configuration(format!("unknown scope {name}")))?
        };
        let filter = scalar_string("filter", rendered.get("filter"))?.filter(|f| !f.is_empty());

        Ok(SearchDescription {
            base,
            scope,
            filter
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::HandlebarsEvaluator;
    use config::{ContextResolver, NamedContexts};

    fn options(value: Value) -> Options {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_scope_names() {
        assert_eq!(SearchScope::from_str("BASE").unwrap(), SearchScope::Base);
        assert_eq!(SearchScope::from_str("one").unwrap(), SearchScope::One);
        assert_eq!(SearchScope::from_str("OneLevel").unwrap(), SearchScope::One);
        assert_eq!(SearchScope::from_str("Subtree").unwrap(), SearchScope::Subtree);
        assert_eq!(SearchScope::One.to_string(), "one");
        assert!(SearchScope::from_str("children").is_err());
    }

    #[test]
    fn test_extract_removes_search_fields() {
        let mut opts = options(json!({
            "url": "ldap://localhost",
            "base": "dc=example,dc=com",
            "filter": "(cn={{term}})"
        }));

        let template = SearchTemplate::extract(&mut opts);

        assert_eq!(opts.len(), 1);
        assert_eq!(template.base, json!("dc=example,dc=com"));
        assert_eq!(template.scope, json!("subtree"));
        assert_eq!(template.filter, json!("(cn={{term}})"));
    }

    #[test]
    fn test_bind_substitutes_term() {
        let evaluator = HandlebarsEvaluator::new();
        let variables = options(json!({"ou": "people"}));
        let mut opts = options(json!({
            "base": "ou={{ou}},dc=example,dc=com",
            "scope": "ONE",
            "filter": "(uid={{term}})"
        }));
        let template = SearchTemplate::extract(&mut opts);
        let binder = SearchTemplateBinder::new(&evaluator, &variables, template, &Lineage::default());

        let description = binder.bind(&json!("jdoe")).unwrap();

        assert_eq!(
            description,
            SearchDescription::new(
                "ou=people,dc=example,dc=com",
                SearchScope::One,
                Some("(uid=jdoe)".to_string())
            )
        );
    }

    #[test]
    fn test_nil_term_uses_plain_fields() {
        let evaluator = HandlebarsEvaluator::new();
        let variables = Options::new();
        let mut opts = options(json!({"base": "dc=example,dc=com"}));
        let binder = SearchTemplateBinder::new(
            &evaluator,
            &variables,
            SearchTemplate::extract(&mut opts),
            &Lineage::default()
        );

        let description = binder.bind(&Value::Null).unwrap();

        assert_eq!(description.base, "dc=example,dc=com");
        assert_eq!(description.scope, SearchScope::Subtree);
        assert_eq!(description.filter, None);
    }

    #[test]
    fn test_context_lineage_is_visible() {
        let evaluator = HandlebarsEvaluator::new();
        let variables = Options::new();
        let contexts = NamedContexts::new().with_context("people", options(json!({"ou": "people"})));
        let configuration = ContextResolver::new(options(json!({"domain": "example"})), &contexts)
            .with_layer(options(json!({"context": "people", "base": "x"})))
            .resolve()
            .unwrap();
        let mut opts = options(json!({"base": "ou={{context.ou}},dc={{context.context.domain}}"}));
        let binder = SearchTemplateBinder::new(
            &evaluator,
            &variables,
            SearchTemplate::extract(&mut opts),
            configuration.lineage()
        );

        assert_eq!(binder.bind(&Value::Null).unwrap().base, "ou=people,dc=example");
    }

    #[test]
    fn test_unknown_scope_rejected() {
        let evaluator = HandlebarsEvaluator::new();
        let variables = Options::new();
        let mut opts = options(json!({"scope": "{{term}}"}));
        let binder = SearchTemplateBinder::new(
            &evaluator,
            &variables,
            SearchTemplate::extract(&mut opts),
            &Lineage::default()
        );

        assert_eq!(binder.bind(&json!("base")).unwrap().scope, SearchScope::Base);
        assert!(binder.bind(&json!("sideways")).unwrap_err().is_configuration());
    }
}
