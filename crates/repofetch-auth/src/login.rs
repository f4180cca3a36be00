//! Interactive GitHub authentication on top of the device flow.
//!
//! Mirrors the usual CLI login surface: log in with a browser or a pasted
//! token, log out by dropping the stored credential, and report status by
//! asking the API who the token belongs to.

use crate::device::{DeviceFlowClient, FlowOutcome};
use crate::error::{AuthError, Result};
use repofetch_config::{CredentialStore, HostCredential};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// How login interacts with the user. Implementations own the terminal.
pub trait Prompter: Send + Sync {
    /// Pick one of the options, returning its index.
    fn choose(&self, prompt: &str, options: &[&str]) -> Result<usize>;
    /// Read a secret without echoing it.
    fn secret(&self, prompt: &str) -> Result<String>;
    /// Show a message.
    fn inform(&self, message: &str);
}

/// Result of a status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    /// No credential stored for the host.
    NotLoggedIn,
    /// A credential is stored and the API accepted it.
    LoggedIn {
        /// Account login the token belongs to.
        login: String,
    },
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    login: String,
}

/// GitHub authentication for one host.
#[derive(Debug, Clone)]
pub struct GithubAuth {
    flow: DeviceFlowClient,
    http: reqwest::Client,
    host: String,
    api_base: String,
}

impl GithubAuth {
    /// Authenticator for github.com.
    #[must_use]
    pub fn new(flow: DeviceFlowClient) -> Self {
        Self {
            flow,
            http: reqwest::Client::new(),
            host: "github.com".to_string(),
            api_base: api_base_for("github.com"),
        }
    }

    /// Authenticate against a different host, e.g. GitHub Enterprise.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self.api_base = api_base_for(&self.host);
        self
    }

    /// Override the API base URL. Primarily for tests.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Host this authenticator manages credentials for.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Log in and store the resulting credential.
    ///
    /// Offers a browser-based device flow and a pasted token. Returns
    /// `true` if a credential was stored.
    ///
    /// # Errors
    /// Returns error if prompting, the flow request, or persistence fails.
    pub async fn login(
        &self,
        store: &CredentialStore,
        prompter: &dyn Prompter,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let choice = prompter.choose(
            "How would you like to authenticate?",
            &[
                "Log in with a web browser",
                "Paste an authentication token",
            ],
        )?;

        let token = match choice {
            0 => match self.login_via_device_flow(prompter, cancel).await? {
                Some(token) => token,
                None => return Ok(false),
            },
            1 => {
                let token = prompter.secret("Paste your authentication token:")?;
                if token.trim().is_empty() {
                    return Err(AuthError::prompt("empty token"));
                }
                token.trim().to_string()
            }
            other => {
                return Err(AuthError::prompt(format!(
                    "unexpected choice index {other}"
                )));
            }
        };

        store.put(&self.host, HostCredential::new(token))?;
        info!(host = %self.host, "credential stored");
        Ok(true)
    }

    async fn login_via_device_flow(
        &self,
        prompter: &dyn Prompter,
        cancel: &CancellationToken,
    ) -> Result<Option<String>> {
        let session = self.flow.request_device_flow().await?;

        prompter.inform(&format!(
            "First, copy your one-time code: {}",
            session.user_code
        ));
        prompter.inform(&format!(
            "Then open {} in your browser and enter the code",
            session.verification_uri
        ));

        match self.flow.run_to_completion(&session, cancel).await {
            FlowOutcome::Authorized(token) => Ok(Some(token)),
            FlowOutcome::Denied => {
                prompter.inform("Authorization was denied");
                Ok(None)
            }
            FlowOutcome::Expired => {
                prompter.inform("The device code expired before authorization");
                Ok(None)
            }
            FlowOutcome::Cancelled => {
                prompter.inform("Login cancelled");
                Ok(None)
            }
            FlowOutcome::Failed(message) => Err(AuthError::protocol(message)),
        }
    }

    /// Drop the stored credential for the host.
    ///
    /// Returns `true` if a credential was removed, `false` if none existed.
    ///
    /// # Errors
    /// Returns error if persistence fails.
    pub fn logout(&self, store: &CredentialStore) -> Result<bool> {
        let removed = store.remove(&self.host)?;
        if removed {
            info!(host = %self.host, "credential removed");
        } else {
            debug!(host = %self.host, "no credential to remove");
        }
        Ok(removed)
    }

    /// Report who the stored credential belongs to.
    ///
    /// # Errors
    /// Returns error if the API rejects the token or responds with
    /// something unexpected.
    pub async fn status(&self, store: &CredentialStore) -> Result<AuthStatus> {
        let Some(credential) = store.get(&self.host) else {
            return Ok(AuthStatus::NotLoggedIn);
        };

        let url = format!("{}/user", self.api_base);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", credential.token))
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "repofetch")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::protocol(format!(
                "identity endpoint returned {status}"
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| AuthError::protocol(format!("malformed identity response: {e}")))?;

        Ok(AuthStatus::LoggedIn { login: user.login })
    }
}

fn api_base_for(host: &str) -> String {
    if host == "github.com" {
        "https://api.github.com".to_string()
    } else {
        format!("https://{host}/api/v3")
    }
}
