//! Per-host credential storage for repofetch.
//!
//! This crate owns the mapping from git host to stored authentication
//! record. The map is loaded once at startup and flushed through a
//! persistence backend on every mutation:
//!
//! - [`CredentialStore`]: serialized get/put/remove over the host map
//! - [`CredentialBackend`]: persistence collaborator owning the on-disk format
//! - [`JsonFileBackend`]: default JSON file backend
//!
//! # Quick Start
//!
//! ```no_run
//! use repofetch_config::{CredentialStore, HostCredential};
//!
//! # fn main() -> repofetch_config::error::Result<()> {
//! let store = CredentialStore::open_default()?;
//! store.put("github.com", HostCredential::new("ghp_token"))?;
//!
//! if let Some(cred) = store.get("github.com") {
//!     println!("token for github.com: {}", cred.token);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod hosts;
pub mod store;

pub use error::{ConfigError, Result};
pub use hosts::{HostCredential, HostMap};
pub use store::{CredentialBackend, CredentialStore, JsonFileBackend, MemoryBackend};
