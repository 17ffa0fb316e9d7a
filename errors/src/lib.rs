//! # Lookup Errors
//!
//! Error handling for the LDAP lookup pipeline.
//!
//! - Uses `thiserror` for structured error definitions
//! - Named fields in every message so logs stay greppable
//! - Every variant aborts the invocation; nothing here is retried

use thiserror::Error;

pub type LookupResult<T> = Result<T, LookupError>;

/// Errors surfaced by a lookup invocation.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Unknown named context, unresolvable template, bad option value.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Connect, bind or search failure reported by the directory client.
    #[error("Directory {operation} failed: {reason}")]
    Directory { operation: String, reason: String },

    /// The key attribute requested for keyed output is absent from an entry.
    #[error("Attribute {attribute} missing from entry {dn}")]
    MissingAttribute { attribute: String, dn: String },

    /// Term-position mappings after a search term, and similar call mistakes.
    #[error("Usage error: {message}")]
    Usage { message: String },

    #[error("Cannot decode value of {attribute} as {encoding}: {reason}")]
    ValueDecode {
        attribute: String,
        encoding: String,
        reason: String
    },

    #[error("Invalid DN {dn}: {reason}")]
    InvalidDn { dn: String, reason: String }
}

impl LookupError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into()
        }
    }

    pub fn directory(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Directory {
            operation: operation.into(),
            reason: reason.to_string()
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into()
        }
    }

    pub fn invalid_dn(dn: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDn {
            dn: dn.into(),
            reason: reason.into()
        }
    }

    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}
