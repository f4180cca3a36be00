//! GitHub device authorization and credential management for repofetch.
//!
//! Two layers:
//!
//! - [`DeviceFlowClient`]: the OAuth device authorization grant itself,
//!   request plus polling with backoff, expiry, and cancellation
//! - [`GithubAuth`]: the interactive login/logout/status surface that wires
//!   the flow into the credential store
//!
//! # Quick Start
//!
//! ```no_run
//! use repofetch_auth::{DeviceFlowClient, GithubAuth};
//! use repofetch_config::CredentialStore;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn login(prompter: &dyn repofetch_auth::Prompter) -> repofetch_auth::Result<()> {
//! let auth = GithubAuth::new(DeviceFlowClient::new("my-client-id"));
//! let store = CredentialStore::open_default()?;
//!
//! if auth.login(&store, prompter, &CancellationToken::new()).await? {
//!     println!("logged in to {}", auth.host());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod device;
pub mod error;
pub mod login;

pub use device::{
    DeviceAuthorizationSession, DeviceFlowClient, FlowOutcome, DEFAULT_LOGIN_HOST,
};
pub use error::{AuthError, Result};
pub use login::{AuthStatus, GithubAuth, Prompter};
