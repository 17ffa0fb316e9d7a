//! # Connection Parameters
//!
//! Typed view of the connection-level options, extracted once from the
//! rendered configuration and validated with the `validator` crate.

use std::str::FromStr;
use std::time::Duration;

use errors::{LookupError, LookupResult};
use strum::{Display, EnumString};
use url::Url;
use validator::Validate;

use crate::options::{Options, parse_flag, scalar_string};

const LDAP_SCHEMES: [&str; 3] = ["ldap", "ldaps", "ldapi"];

/// How the session authenticates after connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthMethod {
    /// Simple bind with `binddn`/`bindpw`; anonymous when both are empty.
    #[default]
    Simple,
    /// SASL/GSSAPI bind using the caller's Kerberos credentials.
    Gssapi
}

/// Server certificate checking, named after the `TLS_REQCERT` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TlsRequireCert {
    Never,
    Allow,
    Try,
    Demand,
    Hard
}

impl TlsRequireCert {
    /// Whether a bad server certificate aborts the handshake.
    ///
    /// `try` only tolerates a missing certificate, and a TLS server always
    /// presents one, so it verifies like `demand`.
    #[must_use]
    pub const fn verifies_certificate(self) -> bool {
        matches!(self, Self::Try | Self::Demand | Self::Hard)
    }
}

#[derive(Clone, PartialEq, Validate)]
pub struct ConnectionParams {
    #[validate(length(min = 1), custom(function = "validate_url_scheme"))]
    pub url: String,
    pub binddn: String,
    pub bindpw: String,
    pub auth: AuthMethod,
    pub tls_reqcert: Option<TlsRequireCert>,
    pub starttls: bool,
    #[validate(range(min = 1))]
    pub timeout_seconds: Option<u64>
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("url", &self.url)
            .field("binddn", &self.binddn)
            .field(
                "bindpw",
                &if self.bindpw.is_empty() { "" } else { "***REDACTED***" }
            )
            .field("auth", &self.auth)
            .field("tls_reqcert", &self.tls_reqcert)
            .field("starttls", &self.starttls)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

fn validate_url_scheme(url: &str) -> Result<(), validator::ValidationError> {
    match Url::parse(url) {
        Ok(parsed) if LDAP_SCHEMES.contains(&parsed.scheme()) => Ok(()),
        _ => Err(validator::ValidationError::new("url must use ldap://, ldaps:// or ldapi://"))
    }
}

impl ConnectionParams {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            binddn: String::new(),
            bindpw: String::new(),
            auth: AuthMethod::default(),
            tls_reqcert: None,
            starttls: false,
            timeout_seconds: None
        }
    }

    /// Extract and validate connection parameters from rendered options.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Configuration` when `url` is missing, an
    /// enumerated option has an unknown value, or validation fails.
    pub fn from_options(options: &Options) -> LookupResult<Self> {
        let url = scalar_string("url", options.get("url"))?
            .ok_or_else(|| LookupError::configuration("url is required"))?;

        let auth = match scalar_string("auth", options.get("auth"))? {
            Some(value) if !value.is_empty() => AuthMethod::from_str(&value).map_err(|_| {
                LookupError::configuration(format!("unknown auth method {value}"))
            })?,
            _ => AuthMethod::default()
        };

        let tls_reqcert = match scalar_string("tls_reqcert", options.get("tls_reqcert"))? {
            Some(value) if !value.is_empty() => {
                Some(TlsRequireCert::from_str(&value).map_err(|_| {
                    LookupError::configuration(format!("unknown tls_reqcert value {value}"))
                })?)
            }
            _ => None
        };

        let timeout_seconds = match scalar_string("timeout", options.get("timeout"))? {
            Some(value) => Some(value.trim().parse::<u64>().map_err(|_| {
                LookupError::configuration(format!(
                    "timeout expects a whole number of seconds, got {value}"
                ))
            })?),
            None => None
        };

        let params = Self {
            url,
            binddn: scalar_string("binddn", options.get("binddn"))?.unwrap_or_default(),
            bindpw: scalar_string("bindpw", options.get("bindpw"))?.unwrap_or_default(),
            auth,
            tls_reqcert,
            starttls: match options.get("starttls") {
                Some(value) => parse_flag("starttls", value)?,
                None => false
            },
            timeout_seconds
        };

        params.validate().map_err(|e| {
            LookupError::configuration(format!("invalid connection parameters: {e}"))
        })?;

        Ok(params)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Host part of the URL, used as the GSSAPI service principal host.
    pub fn host(&self) -> Option<String> {
        let parsed = Url::parse(&self.url).ok()?;
        let host = parsed.host_str()?.trim_start_matches('[').trim_end_matches(']');
        (!host.is_empty()).then(|| host.to_string())
    }
}
