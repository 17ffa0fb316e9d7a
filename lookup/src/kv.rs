//! Flat `key=value` parsing for attribute properties given as a string.

use config::Options;
use errors::{LookupError, LookupResult};
use serde_json::Value;

/// Parse `"join=', ' always_list=yes"` into a mapping of string values.
///
/// Tokens split on unquoted whitespace. Single quotes are literal, double
/// quotes and bare text honour backslash escapes.
pub fn parse_kv(input: &str) -> LookupResult<Options> {
    let mut options = Options::new();

    for token in split_tokens(input)? {
        let (key, value) = token.split_once('=').ok_or_else(|| {
            LookupError::configuration(format!("expected key=value, got {token:?}"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(LookupError::configuration(format!(
                "missing key before '=' in {token:?}"
            )));
        }
        options.insert(key.to_string(), Value::String(value.to_string()));
    }

    Ok(options)
}

fn split_tokens(input: &str) -> LookupResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('\''), _) => current.push(c),
            (_, '\\') => {
                let escaped = chars.next().ok_or_else(|| {
                    LookupError::configuration(format!("trailing backslash in {input:?}"))
                })?;
                current.push(escaped);
                in_token = true;
            }
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if quote.is_some() {
        return Err(LookupError::configuration(format!(
            "unterminated quote in {input:?}"
        )));
    }
    if in_token {
        tokens.push(current);
    }

    Ok(tokens)
}
