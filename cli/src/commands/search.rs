use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use config::{CONTEXT_KEY, DEFAULT_CONTEXT_NAME, Options, load_from_env, load_from_file};
use errors::{LookupError, LookupResult};
use ldap_lookup::LdapLookup;
use serde_json::Value;
use tracing::debug;

use crate::output;

#[derive(Args)]
pub struct SearchArgs {
    #[arg(help = "Search terms, bound to {{term}} one at a time")]
    pub terms: Vec<String>,

    #[arg(
        long,
        env = "LDAP_LOOKUP_VARS",
        help = "Host variables file (.yaml, .yml or .toml) holding ldap_lookup_config and named contexts"
    )]
    pub vars: Option<PathBuf>,

    #[arg(short, long, help = "Named context to apply for this lookup")]
    pub context: Option<String>,

    #[arg(
        short = 's',
        long = "set",
        value_name = "KEY=VALUE",
        value_parser = parse_assignment,
        help = "Override an option; VALUE is read as JSON when it parses, as text otherwise"
    )]
    pub set: Vec<(String, Value)>,

    #[arg(
        long,
        value_name = "JSON",
        value_parser = parse_layer,
        help = "Configuration mapping applied before --context/--set (repeatable)"
    )]
    pub layer: Vec<Options>,

    #[arg(long, help = "Print compact JSON")]
    pub compact: bool
}

pub async fn run(args: SearchArgs) -> Result<()> {
    let mut variables = match &args.vars {
        Some(path) => load_from_file(path).map_err(LookupError::from)?,
        None => Options::new()
    };
    merge_environment(&mut variables, load_from_env())?;

    let mut terms: Vec<Value> = args.layer.into_iter().map(Value::Object).collect();
    terms.extend(args.terms.into_iter().map(Value::String));

    let mut overrides = Options::new();
    if let Some(name) = args.context {
        overrides.insert(CONTEXT_KEY.to_string(), Value::String(name));
    }
    overrides.extend(args.set);

    let records = LdapLookup::new().run(terms, &variables, overrides).await?;
    output::records(&records, args.compact)
}

/// Layer `LDAP_LOOKUP_*` settings over the default context.
pub fn merge_environment(variables: &mut Options, environment: Options) -> LookupResult<()> {
    if environment.is_empty() {
        return Ok(());
    }
    debug!(keys = ?environment.keys().collect::<Vec<_>>(), "Applying environment settings");

    let defaults = variables
        .entry(DEFAULT_CONTEXT_NAME)
        .or_insert_with(|| Value::Object(Options::new()));
    if defaults.is_null() {
        *defaults = Value::Object(Options::new());
    }
    match defaults {
        Value::Object(defaults) => {
            defaults.extend(environment);
            Ok(())
        }
        other => Err(LookupError::configuration(format!(
            "{DEFAULT_CONTEXT_NAME} must be a mapping, got {other}"
        )))
    }
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn parse_layer(raw: &str) -> Result<Options, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(layer)) => Ok(layer),
        Ok(other) => Err(format!("layer must be a JSON object, got {other}")),
        Err(e) => Err(format!("invalid JSON: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: Value) -> Options {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("base=ou=people,dc=x").unwrap(),
            ("base".to_string(), json!("ou=people,dc=x"))
        );
        assert_eq!(parse_assignment("timeout=10").unwrap().1, json!(10));
        assert_eq!(
            parse_assignment(r#"value=["cn",{"member":"join=,"}]"#).unwrap().1,
            json!(["cn", {"member": "join=,"}])
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_parse_layer() {
        assert_eq!(
            parse_layer(r#"{"context": "corp"}"#).unwrap(),
            options(json!({"context": "corp"}))
        );
        assert!(parse_layer("[1]").is_err());
        assert!(parse_layer("{").is_err());
    }

    #[test]
    fn test_merge_environment_over_defaults() {
        let mut variables = options(json!({
            "ldap_lookup_config": {"url": "ldap://file", "base": "dc=x"}
        }));

        merge_environment(&mut variables, options(json!({"url": "ldap://env"}))).unwrap();

        assert_eq!(
            variables["ldap_lookup_config"],
            json!({"url": "ldap://env", "base": "dc=x"})
        );
    }

    #[test]
    fn test_merge_environment_creates_defaults() {
        let mut variables = Options::new();
        merge_environment(&mut variables, options(json!({"url": "ldap://env"}))).unwrap();
        assert_eq!(variables["ldap_lookup_config"], json!({"url": "ldap://env"}));

        let mut untouched = Options::new();
        merge_environment(&mut untouched, Options::new()).unwrap();
        assert!(untouched.is_empty());
    }

    #[test]
    fn test_merge_environment_rejects_non_mapping_defaults() {
        let mut variables = options(json!({"ldap_lookup_config": "oops"}));
        let err = merge_environment(&mut variables, options(json!({"url": "ldap://env"}))).unwrap_err();
        assert!(err.is_configuration());
    }
}
