//! # Configuration System
//!
//! Layered configuration for LDAP lookups.
//!
//! This crate provides:
//! - The dynamically typed option model (`Options`) and the resolved
//!   `Configuration` with its immutable context lineage
//! - Named context stores and the `ContextResolver` that layers
//!   defaults, named contexts and call-site overrides
//! - Typed, validated connection parameters
//! - Vars file loading (TOML/YAML) and the `LDAP_LOOKUP_*` environment layer
//!
//! # Precedence (lowest to highest)
//! 1. Default context (`ldap_lookup_config`), with the environment layer on top
//! 2. Named contexts referenced through a `context` key
//! 3. Term-position mappings
//! 4. Call-site keyword overrides

pub mod connection;
pub mod file_loader;
pub mod loader;
pub mod options;
pub mod precedence;
pub mod store;

pub use connection::{AuthMethod, ConnectionParams, TlsRequireCert};
pub use file_loader::{ConfigFileError, load_from_file, load_from_toml, load_from_yaml};
pub use loader::load_from_env;
pub use options::{
    CONTEXT_KEY, Configuration, DEFAULT_CONTEXT_NAME, Lineage, Options, parse_flag, redact,
    scalar_string
};
pub use precedence::{ContextResolver, resolve};
pub use store::{NamedContextStore, NamedContexts};
pub use validator::Validate;
