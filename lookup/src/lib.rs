//! # LDAP Lookup
//!
//! Configuration-driven LDAP searches with per-attribute result shaping.
//!
//! A run resolves its configuration from layered contexts, binds to the
//! directory once and searches once per term. Each entry found is projected
//! into an output record:
//! - bare values or `{key: ..., attr: ...}` pairs when a single attribute
//!   is requested
//! - full `{term, dn, ...}` records otherwise, shaped per attribute by
//!   `skip`, `join`, `always_list` and `encoding`
//!
//! Host name / DN conversion helpers live in [`dn`].

pub mod attrs;
pub mod codec;
pub mod directory;
pub mod dn;
pub mod kv;
pub mod lookup;
pub mod memory;
pub mod projector;
pub mod search;
pub mod template;

pub use attrs::{AttributeSelection, AttributeSpec, AttributeSpecTable};
pub use codec::{ValueEncoding, encode};
pub use directory::{DirectoryConnector, DirectoryEntry, DirectorySession, Ldap3Connector};
pub use dn::{dn_to_hostname, hostname_to_dn};
pub use kv::parse_kv;
pub use lookup::{LdapLookup, split_terms};
pub use memory::{InMemoryDirectory, RecordedSearch};
pub use projector::{OutputRecord, ResultProjector};
pub use search::{SearchDescription, SearchScope, SearchTemplate, SearchTemplateBinder};
pub use template::{HandlebarsEvaluator, TemplateEvaluator};
