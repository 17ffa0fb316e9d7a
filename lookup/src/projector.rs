//! # Result Projection
//!
//! Turns directory entries into output records.
//!
//! Two mutually exclusive modes, chosen once per run:
//! - **Single-attribute**: exactly one attribute is requested. Every value
//!   of it becomes one record, bare or keyed as `{key_attr: key, attr: value}`.
//! - **Full-record**: each entry becomes `{term, dn, ...attributes}`, with
//!   `join`, `always_list` and `skip` applied per attribute.

use errors::{LookupError, LookupResult};
use serde_json::{Map, Value};

use crate::attrs::{AttributeSelection, AttributeSpec, AttributeSpecTable, DN_ATTRIBUTE};
use crate::codec::encode;
use crate::directory::DirectoryEntry;

/// One element of a lookup result: a scalar, a keyed pair or a full record.
pub type OutputRecord = Value;

/// Key attribute naming the current term.
pub const TERM_KEY: &str = "term";

#[derive(Debug, Clone, Copy)]
pub struct ResultProjector<'a> {
    specs: &'a AttributeSpecTable,
    single_attr: Option<&'a str>,
    key_attr: Option<&'a str>
}

impl<'a> ResultProjector<'a> {
    pub fn new(
        specs: &'a AttributeSpecTable,
        single_attr: Option<&'a str>,
        key_attr: Option<&'a str>
    ) -> Self {
        Self {
            specs,
            single_attr,
            key_attr
        }
    }

    pub fn from_selection(selection: &'a AttributeSelection, key_attr: Option<&'a str>) -> Self {
        Self::new(selection.specs(), selection.single_attr(), key_attr)
    }

    /// Project the entries one search returned for `term`.
    ///
    /// # Errors
    ///
    /// - `LookupError::MissingAttribute` when an entry lacks the key attribute
    /// - `LookupError::ValueDecode` when a value does not decode in its
    ///   attribute's encoding
    pub fn project(&self, term: &Value, entries: &[DirectoryEntry]) -> LookupResult<Vec<OutputRecord>> {
        let mut records = Vec::new();
        for entry in entries {
            match self.single_attr {
                Some(attribute) => self.project_single(attribute, term, entry, &mut records)?,
                None => records.push(self.project_full(term, entry)?)
            }
        }
        Ok(records)
    }

    fn project_single(
        &self,
        attribute: &str,
        term: &Value,
        entry: &DirectoryEntry,
        records: &mut Vec<OutputRecord>
    ) -> LookupResult<()> {
        let spec = self.specs.spec_for(attribute);
        let key = match self.key_attr {
            Some(key_attr) => Some((key_attr, self.key_for(key_attr, term, entry)?)),
            None => None
        };

        let items: Vec<&[u8]> = if attribute == DN_ATTRIBUTE {
            vec![entry.dn.as_bytes()]
        } else {
            entry
                .values(attribute)
                .unwrap_or_default()
                .iter()
                .map(Vec::as_slice)
                .collect()
        };

        for item in items {
            let value = encode(attribute, item, spec.encoding)?;
            records.push(match &key {
                Some((key_attr, key)) => {
                    let mut record = Map::new();
                    record.insert((*key_attr).to_string(), key.clone());
                    record.insert(attribute.to_string(), value);
                    Value::Object(record)
                }
                None => value
            });
        }
        Ok(())
    }

    fn key_for(&self, key_attr: &str, term: &Value, entry: &DirectoryEntry) -> LookupResult<Value> {
        match key_attr {
            TERM_KEY => Ok(term.clone()),
            DN_ATTRIBUTE => Ok(Value::String(entry.dn.clone())),
            _ => {
                let first = entry
                    .values(key_attr)
                    .and_then(<[Vec<u8>]>::first)
                    .ok_or_else(|| LookupError::MissingAttribute {
                        attribute: key_attr.to_string(),
                        dn: entry.dn.clone()
                    })?;
                encode(key_attr, first, self.specs.spec_for(key_attr).encoding)
            }
        }
    }

    fn project_full(&self, term: &Value, entry: &DirectoryEntry) -> LookupResult<OutputRecord> {
        let mut record = Map::new();
        record.insert(TERM_KEY.to_string(), term.clone());
        record.insert(DN_ATTRIBUTE.to_string(), Value::String(entry.dn.clone()));

        for (attribute, raw_values) in &entry.attributes {
            let spec = self.specs.spec_for(attribute);
            if spec.skip {
                continue;
            }
            let values = raw_values
                .iter()
                .map(|raw| encode(attribute, raw, spec.encoding))
                .collect::<LookupResult<Vec<_>>>()?;
            record.insert(attribute.clone(), shape(spec, values));
        }

        Ok(Value::Object(record))
    }
}

fn shape(spec: &AttributeSpec, mut values: Vec<Value>) -> Value {
    if let Some(separator) = &spec.join {
        let parts: Vec<&str> = values.iter().filter_map(Value::as_str).collect();
        return Value::String(parts.join(separator));
    }
    if values.len() == 1 && !spec.always_list {
        return values.remove(0);
    }
    Value::Array(values)
}
