//! # Attribute Specifications
//!
//! Normalizes the `value` option into a typed table of per-attribute
//! projection properties. The option may be:
//!
//! - absent: no attribute filtering, every entry becomes a full record
//! - a bare attribute name
//! - a list whose items are attribute names or single-key mappings from a
//!   name to its properties (a mapping, or a `key=value` string)
//!
//! Raw shapes are inspected here once; downstream code only sees
//! `AttributeSelection`.

use std::str::FromStr;

use config::{Options, parse_flag, scalar_string};
use errors::{LookupError, LookupResult};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use crate::codec::ValueEncoding;
use crate::kv::parse_kv;
use crate::projector::TERM_KEY;

/// Pseudo-attribute naming the entry's distinguished name.
pub const DN_ATTRIBUTE: &str = "dn";

/// Projection properties of one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSpec {
    /// Leave the attribute out of the request and of full records.
    pub skip: bool,
    /// Concatenate all values with this separator.
    pub join: Option<String>,
    /// Keep a one-element value list as a list.
    pub always_list: bool,
    pub encoding: Option<ValueEncoding>
}

const DEFAULT_SPEC: AttributeSpec = AttributeSpec {
    skip: false,
    join: None,
    always_list: false,
    encoding: None
};

impl AttributeSpec {
    /// Build a spec from a properties mapping. Unknown properties are ignored.
    pub fn from_properties(attribute: &str, properties: &Options) -> LookupResult<Self> {
        let mut spec = Self::default();

        for (property, value) in properties {
            match property.as_str() {
                "skip" => spec.skip = parse_flag(property, value)?,
                "always_list" => spec.always_list = parse_flag(property, value)?,
                "join" => spec.join = scalar_string(property, Some(value))?,
                "encoding" => {
                    spec.encoding = match scalar_string(property, Some(value))? {
                        Some(name) if !name.is_empty() => {
                            Some(ValueEncoding::from_str(&name).map_err(|_| {
                                LookupError::configuration(format!(
                                    "unknown encoding {name} for attribute {attribute}"
                                ))
                            })?)
                        }
                        _ => None
                    }
                }
                other => {
                    warn!(attribute = %attribute, property = %other, "Ignoring unknown attribute property");
                }
            }
        }

        Ok(spec)
    }

    fn from_value(attribute: &str, value: &Value) -> LookupResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(properties) => Self::from_properties(attribute, properties),
            Value::String(flat) => Self::from_properties(attribute, &parse_kv(flat)?),
            other => Err(LookupError::configuration(format!(
                "properties of attribute {attribute} must be a mapping or key=value string, got {other}"
            )))
        }
    }
}

/// Attribute name to properties, in first-mention order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSpecTable {
    specs: IndexMap<String, AttributeSpec>
}

impl AttributeSpecTable {
    pub fn get(&self, attribute: &str) -> Option<&AttributeSpec> {
        self.specs.get(attribute)
    }

    /// Properties of `attribute`, defaults when the table does not name it.
    pub fn spec_for(&self, attribute: &str) -> &AttributeSpec {
        self.specs.get(attribute).unwrap_or(&DEFAULT_SPEC)
    }

    /// Later mentions replace the properties but keep the first position.
    pub fn insert(&mut self, attribute: impl Into<String>, spec: AttributeSpec) {
        self.specs.insert(attribute.into(), spec);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Parsed `value` option: the spec table plus the derived request list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSelection {
    specs: AttributeSpecTable,
    attrlist: Option<Vec<String>>,
    single_attr: Option<String>
}

impl AttributeSelection {
    /// Parse the `value` option.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Configuration` for list items that are neither
    /// names nor mappings, malformed property strings, non-boolean flags and
    /// unknown encodings.
    pub fn parse(value: Option<&Value>) -> LookupResult<Self> {
        let items: Vec<&Value> = match value {
            None | Some(Value::Null) => return Ok(Self::default()),
            Some(Value::Array(items)) => items.iter().collect(),
            Some(scalar @ Value::String(_)) => vec![scalar],
            Some(other) => {
                return Err(LookupError::configuration(format!(
                    "value must be an attribute name or a list, got {other}"
                )));
            }
        };

        let mut specs = AttributeSpecTable::default();
        for item in items {
            match item {
                Value::String(name) => specs.insert(name.clone(), AttributeSpec::default()),
                Value::Object(named) => {
                    for (name, properties) in named {
                        specs.insert(name.clone(), AttributeSpec::from_value(name, properties)?);
                    }
                }
                other => {
                    return Err(LookupError::configuration(format!(
                        "value items must be attribute names or mappings, got {other}"
                    )));
                }
            }
        }

        let attrlist: Vec<String> = specs
            .specs
            .iter()
            .filter(|(_, spec)| !spec.skip)
            .map(|(name, _)| name.clone())
            .collect();
        let single_attr = match attrlist.as_slice() {
            [only] => Some(only.clone()),
            _ => None
        };

        Ok(Self {
            specs,
            attrlist: Some(attrlist),
            single_attr
        })
    }

    /// Make sure the key attribute is requested from the directory.
    ///
    /// `dn` and `term` are never requested, and nothing is added when all attributes
    /// are requested anyway. Does not affect single-attribute mode.
    #[must_use]
    pub fn with_key_attribute(mut self, key: Option<&str>) -> Self {
        if let (Some(key), Some(attrlist)) = (key, self.attrlist.as_mut()) {
            let pseudo = key == DN_ATTRIBUTE || key == TERM_KEY;
            if !pseudo && !attrlist.iter().any(|name| name == key) {
                attrlist.push(key.to_string());
            }
        }
        self
    }

    pub fn specs(&self) -> &AttributeSpecTable {
        &self.specs
    }

    /// Attributes to request; `None` requests every attribute.
    pub fn attrlist(&self) -> Option<&[String]> {
        self.attrlist.as_deref()
    }

    /// Set when exactly one attribute survives `skip`.
    pub fn single_attr(&self) -> Option<&str> {
        self.single_attr.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_value_requests_everything() {
        let selection = AttributeSelection::parse(None).unwrap();
        assert!(selection.specs().is_empty());
        assert_eq!(selection.attrlist(), None);
        assert_eq!(selection.single_attr(), None);
        assert_eq!(AttributeSelection::parse(Some(&Value::Null)).unwrap(), selection);
    }

    #[test]
    fn test_bare_string_is_single_attribute() {
        let selection = AttributeSelection::parse(Some(&json!("mail"))).unwrap();
        assert_eq!(selection.attrlist(), Some(&["mail".to_string()][..]));
        assert_eq!(selection.single_attr(), Some("mail"));
    }

    #[test]
    fn test_skip_excluded_from_attrlist() {
        let selection = AttributeSelection::parse(Some(&json!(["cn", {"mail": "skip=true"}]))).unwrap();

        assert_eq!(selection.specs().spec_for("cn"), &AttributeSpec::default());
        assert!(selection.specs().spec_for("mail").skip);
        assert_eq!(selection.attrlist(), Some(&["cn".to_string()][..]));
        assert_eq!(selection.single_attr(), Some("cn"));
    }

    #[test]
    fn test_structured_properties() {
        let selection = AttributeSelection::parse(Some(&json!([
            {"member": {"join": ","}},
            {"title": {"always_list": true}},
            {"objectGUID": {"encoding": "binary"}}
        ])))
        .unwrap();

        assert_eq!(selection.specs().spec_for("member").join.as_deref(), Some(","));
        assert!(selection.specs().spec_for("title").always_list);
        assert_eq!(
            selection.specs().spec_for("objectGUID").encoding,
            Some(ValueEncoding::Binary)
        );
        assert_eq!(selection.attrlist().unwrap().len(), 3);
        assert_eq!(selection.single_attr(), None);
    }

    #[test]
    fn test_names_keep_first_position() {
        let selection =
            AttributeSelection::parse(Some(&json!(["cn", "mail", {"cn": "always_list=yes"}]))).unwrap();

        assert_eq!(selection.specs().names().collect::<Vec<_>>(), vec!["cn", "mail"]);
        assert!(selection.specs().spec_for("cn").always_list);
    }

    #[test]
    fn test_unlisted_attribute_uses_defaults() {
        let selection = AttributeSelection::parse(Some(&json!(["cn"]))).unwrap();
        assert!(selection.specs().get("sn").is_none());
        assert_eq!(selection.specs().spec_for("sn"), &AttributeSpec::default());
    }

    #[test]
    fn test_key_attribute_added_to_attrlist() {
        let selection = AttributeSelection::parse(Some(&json!(["mail"])))
            .unwrap()
            .with_key_attribute(Some("uid"));

        assert_eq!(
            selection.attrlist(),
            Some(&["mail".to_string(), "uid".to_string()][..])
        );
        // Single-attribute mode is decided before the key is added
        assert_eq!(selection.single_attr(), Some("mail"));
    }

    #[test]
    fn test_key_attribute_dn_and_unfiltered_untouched() {
        let selection = AttributeSelection::parse(Some(&json!(["mail"])))
            .unwrap()
            .with_key_attribute(Some("dn"));
        assert_eq!(selection.attrlist().unwrap().len(), 1);

        let by_term = AttributeSelection::parse(Some(&json!(["mail"])))
            .unwrap()
            .with_key_attribute(Some("term"));
        assert_eq!(by_term.attrlist(), Some(&["mail".to_string()][..]));

        let unfiltered = AttributeSelection::parse(None)
            .unwrap()
            .with_key_attribute(Some("uid"));
        assert_eq!(unfiltered.attrlist(), None);

        let present = AttributeSelection::parse(Some(&json!(["mail", "uid"])))
            .unwrap()
            .with_key_attribute(Some("uid"));
        assert_eq!(present.attrlist().unwrap().len(), 2);
    }

    #[test]
    fn test_all_skipped_is_empty_attrlist() {
        let selection = AttributeSelection::parse(Some(&json!([{"cn": {"skip": true}}]))).unwrap();
        assert_eq!(selection.attrlist(), Some(&[][..]));
        assert_eq!(selection.single_attr(), None);
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        assert!(AttributeSelection::parse(Some(&json!(42))).unwrap_err().is_configuration());
        assert!(AttributeSelection::parse(Some(&json!([1]))).is_err());
        assert!(AttributeSelection::parse(Some(&json!([{"cn": [1]}]))).is_err());
        assert!(AttributeSelection::parse(Some(&json!([{"cn": "skip"}]))).is_err());
        assert!(AttributeSelection::parse(Some(&json!([{"cn": "skip=perhaps"}]))).is_err());
        assert!(AttributeSelection::parse(Some(&json!([{"cn": "encoding=klingon"}]))).is_err());
    }
}
