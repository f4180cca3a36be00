//! Repository reference resolution and content retrieval for repofetch.
//!
//! This crate turns user-supplied repository references into checked-out
//! content on disk:
//!
//! - [`RepoReference`]: parser for HTTPS, SSH, and `owner/repo` shorthand
//! - [`TransportSelector`]: picks one transport per reference and credential state
//! - [`RepositoryFetcher`]: clone, checkout, and sub-path validation
//! - [`MirrorCache`]: local bare mirrors for repeated fetches
//!
//! # Quick Start
//!
//! ```no_run
//! use repofetch_config::CredentialStore;
//! use repofetch_vcs::{RepoReference, RepositoryFetcher, TransportSelector};
//!
//! # fn main() -> repofetch_vcs::error::Result<()> {
//! let reference = RepoReference::parse("https://github.com/owner/repo?subPath=examples")?;
//! let store = CredentialStore::in_memory();
//! let transport = TransportSelector::new().select(&reference, &store);
//!
//! let result = RepositoryFetcher::new().fetch(&reference, &transport)?;
//! println!("content at {}", result.content_root.display());
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod reference;
pub mod transport;

pub use cache::MirrorCache;
pub use error::{Result, TransportFailure, VcsError};
pub use fetcher::{FetchResult, RepositoryFetcher};
pub use reference::{RefScheme, RepoReference, DEFAULT_GIT_HOST};
pub use transport::{HostKeyPolicy, TransportConfig, TransportKind, TransportSelector};
