//! # Environment Variable Loader
//!
//! Reads connection and search defaults from `LDAP_LOOKUP_*` variables.
//!
//! The resulting layer is merged over the default context before
//! resolution, so named contexts and call-site overrides still win.
//!
//! ## Environment Variables
//! - `LDAP_LOOKUP_URL`, `LDAP_LOOKUP_BINDDN`, `LDAP_LOOKUP_BINDPW`
//! - `LDAP_LOOKUP_AUTH`, `LDAP_LOOKUP_TLS_REQCERT`, `LDAP_LOOKUP_STARTTLS`
//! - `LDAP_LOOKUP_BASE`, `LDAP_LOOKUP_SCOPE`, `LDAP_LOOKUP_FILTER`
//! - `LDAP_LOOKUP_TIMEOUT`

use std::env;

use serde_json::Value;
use tracing::trace;

use crate::options::Options;

/// Environment variable prefix for lookup defaults.
const ENV_PREFIX: &str = "LDAP_LOOKUP_";

const ENV_KEYS: &[&str] = &[
    "url",
    "binddn",
    "bindpw",
    "auth",
    "tls_reqcert",
    "starttls",
    "base",
    "scope",
    "filter",
    "timeout",
];

/// Load the environment layer. Unset variables are absent from the result.
pub fn load_from_env() -> Options {
    let mut layer = Options::new();
    for key in ENV_KEYS {
        let name = format!("{ENV_PREFIX}{}", key.to_uppercase());
        if let Ok(value) = env::var(&name) {
            trace!(variable = %name, "Loaded lookup option from environment");
            layer.insert((*key).to_string(), Value::String(value));
        }
    }
    layer
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;

    fn clear() {
        for key in ENV_KEYS {
            unsafe {
                env::remove_var(format!("{ENV_PREFIX}{}", key.to_uppercase()));
            }
        }
    }

    #[test]
    #[serial]
    fn test_load_from_env_empty() {
        clear();
        assert!(load_from_env().is_empty());
    }

    #[test]
    #[serial]
    fn test_load_from_env_overrides() {
        clear();
        unsafe {
            env::set_var("LDAP_LOOKUP_URL", "ldap://env.example.com");
            env::set_var("LDAP_LOOKUP_TLS_REQCERT", "never");
        }

        let layer = load_from_env();
        assert_eq!(layer.len(), 2);
        assert_eq!(layer["url"], json!("ldap://env.example.com"));
        assert_eq!(layer["tls_reqcert"], json!("never"));

        clear();
    }
}
