//! # Directory Search Client
//!
//! Async seams to the directory (`DirectoryConnector`, `DirectorySession`)
//! and their `ldap3` implementation.
//!
//! One session is opened per invocation, bound once, used for every term
//! and unbound at the end. Sessions are never pooled or shared.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use config::{AuthMethod, ConnectionParams};
use errors::{LookupError, LookupResult};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, ResultEntry, SearchEntry};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::search::{SearchDescription, SearchScope};

/// Filter used when the search description carries none.
pub const MATCH_ALL_FILTER: &str = "(objectClass=*)";

/// Process-wide lock around protocol option setting and connection setup.
///
/// Concurrent invocations in one process serialize only this section; the
/// bind and searches run outside it. Callers outside this module cannot
/// take it, so it bounds interference between lookups but cannot rule out
/// other users of the TLS stack.
static LIBRARY_OPTIONS_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// One search result: a DN and its raw attribute values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: BTreeMap<String, Vec<Vec<u8>>>
}

impl DirectoryEntry {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: BTreeMap::new()
        }
    }

    /// Add (or replace) an attribute.
    #[must_use]
    pub fn with_values<I, V>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>
    {
        self.attributes.insert(
            attribute.into(),
            values.into_iter().map(|v| v.as_ref().to_vec()).collect()
        );
        self
    }

    pub fn values(&self, attribute: &str) -> Option<&[Vec<u8>]> {
        self.attributes.get(attribute).map(Vec::as_slice)
    }

    /// Merge the text and binary attribute maps of an `ldap3` entry.
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        let mut attributes: BTreeMap<String, Vec<Vec<u8>>> = BTreeMap::new();
        for (name, values) in entry.attrs {
            attributes
                .entry(name)
                .or_default()
                .extend(values.into_iter().map(String::into_bytes));
        }
        for (name, values) in entry.bin_attrs {
            attributes.entry(name).or_default().extend(values);
        }
        Self {
            dn: entry.dn,
            attributes
        }
    }
}

/// Opens bound sessions.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Connect and bind.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Directory` when the server is unreachable or
    /// rejects the bind.
    async fn connect(&self, params: &ConnectionParams) -> LookupResult<Box<dyn DirectorySession>>;
}

/// A bound directory session.
#[async_trait]
pub trait DirectorySession: Send {
    /// Run one search. `attrlist` of `None` requests every attribute.
    async fn search(
        &mut self,
        description: &SearchDescription,
        attrlist: Option<&[String]>
    ) -> LookupResult<Vec<DirectoryEntry>>;

    async fn unbind(&mut self) -> LookupResult<()>;
}

impl From<SearchScope> for ldap3::Scope {
    fn from(scope: SearchScope) -> Self {
        match scope {
            SearchScope::Base => ldap3::Scope::Base,
            SearchScope::One => ldap3::Scope::OneLevel,
            SearchScope::Subtree => ldap3::Scope::Subtree
        }
    }
}

/// `ldap3`-backed connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

impl Ldap3Connector {
    pub fn new() -> Self {
        Self
    }
}

fn connection_settings(params: &ConnectionParams) -> LdapConnSettings {
    let mut settings = LdapConnSettings::new().set_starttls(params.starttls);
    if let Some(timeout) = params.timeout() {
        settings = settings.set_conn_timeout(timeout);
    }
    if let Some(reqcert) = params.tls_reqcert {
        settings = settings.set_no_tls_verify(!reqcert.verifies_certificate());
    }
    settings
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(&self, params: &ConnectionParams) -> LookupResult<Box<dyn DirectorySession>> {
        let (conn, mut ldap) = {
            let _guard = LIBRARY_OPTIONS_LOCK.lock().await;
            LdapConnAsync::with_settings(connection_settings(params), &params.url)
                .await
                .map_err(|e| LookupError::directory("connect", e))?
        };

        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        if let Some(timeout) = params.timeout() {
            ldap.with_timeout(timeout);
        }
        match params.auth {
            AuthMethod::Simple => simple_bind(&mut ldap, params).await?,
            AuthMethod::Gssapi => gssapi_bind(&mut ldap, params).await?
        }
        info!(url = %params.url, auth = %params.auth, "Bound to directory");

        Ok(Box::new(Ldap3Session {
            ldap,
            timeout: params.timeout()
        }))
    }
}

async fn simple_bind(ldap: &mut Ldap, params: &ConnectionParams) -> LookupResult<()> {
    ldap.simple_bind(&params.binddn, &params.bindpw)
        .await
        .map_err(|e| LookupError::directory("bind", e))?
        .success()
        .map_err(|e| LookupError::directory("bind", e))?;
    Ok(())
}

#[cfg(feature = "gssapi")]
async fn gssapi_bind(ldap: &mut Ldap, params: &ConnectionParams) -> LookupResult<()> {
    let host = params
        .host()
        .ok_or_else(|| LookupError::directory("bind", "GSSAPI bind needs a server host name"))?;
    ldap.sasl_gssapi_bind(&host)
        .await
        .map_err(|e| LookupError::directory("bind", e))?
        .success()
        .map_err(|e| LookupError::directory("bind", e))?;
    Ok(())
}

#[cfg(not(feature = "gssapi"))]
async fn gssapi_bind(_ldap: &mut Ldap, _params: &ConnectionParams) -> LookupResult<()> {
    Err(LookupError::directory(
        "bind",
        "GSSAPI support is not compiled in (enable the gssapi feature)"
    ))
}

/// Bound `ldap3` session.
pub struct Ldap3Session {
    ldap: Ldap,
    timeout: Option<Duration>
}

#[async_trait]
impl DirectorySession for Ldap3Session {
    async fn search(
        &mut self,
        description: &SearchDescription,
        attrlist: Option<&[String]>
    ) -> LookupResult<Vec<DirectoryEntry>> {
        let (filter, attrs) = search_request(description, attrlist);

        if let Some(timeout) = self.timeout {
            self.ldap.with_timeout(timeout);
        }
        let (results, _) = self
            .ldap
            .search(&description.base, description.scope.into(), filter, attrs)
            .await
            .map_err(|e| LookupError::directory("search", e))?
            .success()
            .map_err(|e| LookupError::directory("search", e))?;

        let entries: Vec<DirectoryEntry> = results
            .into_iter()
            .filter(|result| is_entry(result))
            .map(|result| DirectoryEntry::from_search_entry(SearchEntry::construct(result)))
            .collect();

        debug!(
            base = %description.base,
            scope = %description.scope,
            filter = %filter,
            count = entries.len(),
            "Search completed"
        );
        Ok(entries)
    }

    async fn unbind(&mut self) -> LookupResult<()> {
        self.ldap
            .unbind()
            .await
            .map_err(|e| LookupError::directory("unbind", e))
    }
}

/// Filter and attribute list sent for one search. No filter matches every
/// object; no attribute list asks for all user attributes.
fn search_request<'a>(
    description: &'a SearchDescription,
    attrlist: Option<&'a [String]>
) -> (&'a str, Vec<&'a str>) {
    let filter = description.filter.as_deref().unwrap_or(MATCH_ALL_FILTER);
    let attrs = match attrlist {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => vec!["*"]
    };
    (filter, attrs)
}

fn is_entry(result: &ResultEntry) -> bool {
    if result.is_ref() || result.is_intermediate() {
        debug!("Dropping referral or intermediate search result");
        return false;
    }
    true
}
