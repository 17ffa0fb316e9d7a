//! # Vars File Loading
//!
//! Loads host variables (default context, named contexts, template
//! variables) from TOML or YAML files.
//!
//! Supports automatic format detection based on file extension.

use std::path::Path;

use errors::LookupError;
use serde_json::Value;

use crate::options::Options;

/// Vars file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Vars file must contain a mapping at the top level: {0}")]
    NotAMapping(String),

    #[error("Vars file has no extension")]
    NoExtension,

    #[error("Unsupported vars file format: {0}")]
    UnsupportedFormat(String)
}

impl From<ConfigFileError> for LookupError {
    fn from(err: ConfigFileError) -> Self {
        LookupError::configuration(err.to_string())
    }
}

/// Load host variables from a TOML file.
///
/// ## Usage
/// ```rust,no_run
/// use config::load_from_toml;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let vars = load_from_toml(Path::new("lookup.toml"))?;
///     println!("{} variables", vars.len());
///     Ok(())
/// }
/// ```
pub fn load_from_toml(path: &Path) -> Result<Options, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;

    let value: Value =
        toml::from_str(&contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))?;

    into_mapping(value, path)
}

/// Load host variables from a YAML file.
pub fn load_from_yaml(path: &Path) -> Result<Options, ConfigFileError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|_e| ConfigFileError::FileNotFound(path.display().to_string()))?;

    if contents.trim().is_empty() {
        return Ok(Options::new());
    }

    let value: Value =
        serde_yaml::from_str(&contents).map_err(|e| ConfigFileError::YamlParse(e.to_string()))?;

    into_mapping(value, path)
}

/// Load host variables from file, detecting the format from its extension.
///
/// ## Supported Formats
/// - `.toml`: TOML format
/// - `.yaml`: YAML format
/// - `.yml`: YAML format
pub fn load_from_file(path: &Path) -> Result<Options, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    match extension.to_lowercase().as_str() {
        "toml" => load_from_toml(path),
        "yaml" | "yml" => load_from_yaml(path),
        other => Err(ConfigFileError::UnsupportedFormat(other.to_string()))
    }
}

fn into_mapping(value: Value, path: &Path) -> Result<Options, ConfigFileError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Options::new()),
        _ => Err(ConfigFileError::NotAMapping(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_yaml() {
        let file = write_temp(
            ".yaml",
            r#"
ldap_lookup_config:
  url: ldap://ldap.example.com
  base: dc=example,dc=com
groups:
  base: ou=groups,dc=example,dc=com
  value:
    - cn
    - member: "join=,"
"#
        );

        let vars = load_from_file(file.path()).unwrap();

        assert_eq!(vars["ldap_lookup_config"]["url"], json!("ldap://ldap.example.com"));
        assert_eq!(vars["groups"]["value"][1]["member"], json!("join=,"));
    }

    #[test]
    fn test_load_from_toml() {
        let file = write_temp(
            ".toml",
            r#"
[ldap_lookup_config]
url = "ldap://ldap.example.com"
timeout = 10
"#
        );

        let vars = load_from_file(file.path()).unwrap();

        assert_eq!(vars["ldap_lookup_config"]["timeout"], json!(10));
    }

    #[test]
    fn test_empty_yaml_is_empty_mapping() {
        let file = write_temp(".yml", "");
        assert!(load_from_file(file.path()).unwrap().is_empty());
    }

    #[test]
    fn test_top_level_list_rejected() {
        let file = write_temp(".yaml", "- a\n- b\n");
        assert!(matches!(
            load_from_file(file.path()),
            Err(ConfigFileError::NotAMapping(_))
        ));
    }

    #[test]
    fn test_unsupported_and_missing() {
        let file = write_temp(".ini", "a=b");
        assert!(matches!(
            load_from_file(file.path()),
            Err(ConfigFileError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            load_from_file(Path::new("/nonexistent/vars.yaml")),
            Err(ConfigFileError::FileNotFound(_))
        ));
        assert!(matches!(
            load_from_file(Path::new("vars")),
            Err(ConfigFileError::NoExtension)
        ));
    }

    #[test]
    fn test_converts_into_configuration_error() {
        let err: LookupError = ConfigFileError::NoExtension.into();
        assert!(err.is_configuration());
    }
}
