//! # Value Codec
//!
//! Turns raw attribute values into output values according to the
//! attribute's `encoding` property.

use base64::{Engine, engine::general_purpose::STANDARD};
use errors::{LookupError, LookupResult};
use serde_json::Value;
use strum::{Display, EnumString};

/// Output encoding of an attribute's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ValueEncoding {
    /// Standard base64 of the raw bytes.
    #[strum(to_string = "binary")]
    Binary,
    #[strum(to_string = "utf-8", serialize = "utf8")]
    Utf8,
    #[strum(to_string = "ascii", serialize = "us-ascii")]
    Ascii,
    #[strum(
        to_string = "latin-1",
        serialize = "latin1",
        serialize = "iso-8859-1",
        serialize = "iso8859-1"
    )]
    Latin1,
    #[strum(to_string = "utf-16le", serialize = "utf16le")]
    Utf16Le,
    #[strum(to_string = "utf-16be", serialize = "utf16be")]
    Utf16Be
}

/// Encode one raw value of `attribute`.
///
/// Without an encoding the bytes are read as UTF-8, replacing invalid
/// sequences.
pub fn encode(attribute: &str, raw: &[u8], encoding: Option<ValueEncoding>) -> LookupResult<Value> {
    let text = match encoding {
        None => String::from_utf8_lossy(raw).into_owned(),
        Some(ValueEncoding::Binary) => STANDARD.encode(raw),
        Some(ValueEncoding::Utf8) => String::from_utf8(raw.to_vec())
            .map_err(|e| decode_error(attribute, ValueEncoding::Utf8, e))?,
        Some(ValueEncoding::Ascii) => {
            if let Some(position) = raw.iter().position(|b| !b.is_ascii()) {
                return Err(decode_error(
                    attribute,
                    ValueEncoding::Ascii,
                    format!("non-ASCII byte at offset {position}")
                ));
            }
            raw.iter().map(|&b| char::from(b)).collect()
        }
        Some(ValueEncoding::Latin1) => raw.iter().map(|&b| char::from(b)).collect(),
        Some(encoding @ (ValueEncoding::Utf16Le | ValueEncoding::Utf16Be)) => {
            decode_utf16(attribute, raw, encoding)?
        }
    };

    Ok(Value::String(text))
}

fn decode_utf16(attribute: &str, raw: &[u8], encoding: ValueEncoding) -> LookupResult<String> {
    if raw.len() % 2 != 0 {
        return Err(decode_error(attribute, encoding, "odd number of bytes"));
    }

    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|pair| match encoding {
            ValueEncoding::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
            _ => u16::from_le_bytes([pair[0], pair[1]])
        })
        .collect();

    String::from_utf16(&units).map_err(|e| decode_error(attribute, encoding, e))
}

fn decode_error(attribute: &str, encoding: ValueEncoding, reason: impl ToString) -> LookupError {
    LookupError::ValueDecode {
        attribute: attribute.to_string(),
        encoding: encoding.to_string(),
        reason: reason.to_string()
    }
}
