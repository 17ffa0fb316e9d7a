//! Template expression substitution.
//!
//! Configuration values may embed `{{ ... }}` expressions that are
//! evaluated against the host variables. Connection-level options are
//! rendered once per run; search fields are rendered once per term, with
//! `term` and `context` bound on top of the run variables.

use config::Options;
use errors::{LookupError, LookupResult};
use handlebars::Handlebars;
use serde_json::Value;

/// Substitutes embedded expressions inside an arbitrary nested value.
///
/// Implementations must return a value of the same shape and report
/// evaluation failures as `LookupError::Configuration`.
pub trait TemplateEvaluator: Send + Sync {
    fn substitute(&self, variables: &Options, structure: &Value) -> LookupResult<Value>;
}

/// Handlebars-backed evaluator.
///
/// Strict mode is on, so referencing an undefined variable is an error
/// rather than an empty string. Output is not HTML-escaped.
pub struct HandlebarsEvaluator {
    registry: Handlebars<'static>
}

impl HandlebarsEvaluator {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        Self { registry }
    }

    fn walk(&self, data: &Value, structure: &Value) -> LookupResult<Value> {
        match structure {
            Value::String(text) if text.contains("{{") => self.render(data, text),
            Value::Array(items) => items
                .iter()
                .map(|item| self.walk(data, item))
                .collect::<LookupResult<Vec<_>>>()
                .map(Value::Array),
            Value::Object(map) => {
                let mut rendered = Options::new();
                for (key, value) in map {
                    rendered.insert(key.clone(), self.walk(data, value)?);
                }
                Ok(Value::Object(rendered))
            }
            other => Ok(other.clone())
        }
    }

    fn render(&self, data: &Value, text: &str) -> LookupResult<Value> {
        if let Some(native) = sole_variable(text).and_then(|path| lookup_path(data, path)) {
            return Ok(native.clone());
        }

        self.registry
            .render_template(text, data)
            .map(Value::String)
            .map_err(|e| LookupError::configuration(format!("failed to render {text:?}: {e}")))
    }
}

impl Default for HandlebarsEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEvaluator for HandlebarsEvaluator {
    fn substitute(&self, variables: &Options, structure: &Value) -> LookupResult<Value> {
        let data = Value::Object(variables.clone());
        self.walk(&data, structure)
    }
}

/// Path of a string that is exactly one `{{ path }}` expression.
fn sole_variable(text: &str) -> Option<&str> {
    let inner = text.trim().strip_prefix("{{")?.strip_suffix("}}")?.trim();
    let mut chars = inner.chars();
    let first = chars.next()?;
    let is_path = (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '[' | ']'));
    is_path.then_some(inner)
}

fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(data, |current, segment| {
        let segment = segment.trim_start_matches('[').trim_end_matches(']');
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None
        }
    })
}
