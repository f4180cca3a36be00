//! OAuth device authorization flow against GitHub-style login endpoints.
//!
//! The flow has two legs: request a device/user code pair, then poll the
//! token endpoint while the user approves the code in a browser. Polling
//! respects the server's interval, backs off on `slow_down`, and treats
//! transport hiccups as pending so a flaky network does not abort an
//! otherwise healthy authorization.

use crate::error::{AuthError, Result};
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Default login host for the flow.
pub const DEFAULT_LOGIN_HOST: &str = "https://github.com";

/// Floor for the polling interval, applied even when the server asks for
/// something shorter.
const DEFAULT_MIN_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Added to the interval on every `slow_down` response.
const DEFAULT_SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: u64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    interval: Option<u64>,
}

/// An in-progress device authorization.
#[derive(Debug, Clone)]
pub struct DeviceAuthorizationSession {
    /// Code the user enters at the verification page.
    pub user_code: String,
    /// Page where the user enters the code.
    pub verification_uri: String,
    device_code: String,
    expires_at: Instant,
    interval: Duration,
}

/// Terminal state of a device authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// The user approved; carries the access token.
    Authorized(String),
    /// The user rejected the authorization.
    Denied,
    /// The device code expired before approval.
    Expired,
    /// The server returned something the flow cannot recover from.
    Failed(String),
    /// The caller cancelled while polling.
    Cancelled,
}

enum PollStep {
    Token(String),
    Pending,
    SlowDown(Option<u64>),
    Denied,
    Expired,
    Failed(String),
}

/// Client for the device authorization grant.
#[derive(Debug, Clone)]
pub struct DeviceFlowClient {
    http: reqwest::Client,
    login_host: String,
    client_id: String,
    scope: String,
    min_poll_interval: Duration,
    slow_down_increment: Duration,
    request_timeout: Duration,
}

impl DeviceFlowClient {
    /// Client for the given OAuth application, talking to github.com.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            login_host: DEFAULT_LOGIN_HOST.to_string(),
            client_id: client_id.into(),
            scope: "repo".to_string(),
            min_poll_interval: DEFAULT_MIN_POLL_INTERVAL,
            slow_down_increment: DEFAULT_SLOW_DOWN_INCREMENT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Point the flow at a different login host, e.g. a GitHub Enterprise
    /// instance. Scheme and host only, no trailing slash.
    #[must_use]
    pub fn with_login_host(mut self, host: impl Into<String>) -> Self {
        self.login_host = host.into();
        self
    }

    /// Request a different OAuth scope.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Lower bound for the polling interval.
    #[must_use]
    pub const fn with_min_poll_interval(mut self, interval: Duration) -> Self {
        self.min_poll_interval = interval;
        self
    }

    /// Backoff added on each `slow_down` response.
    #[must_use]
    pub const fn with_slow_down_increment(mut self, increment: Duration) -> Self {
        self.slow_down_increment = increment;
        self
    }

    /// Per-request timeout for both legs of the flow.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Start a device authorization and return the session to poll.
    ///
    /// # Errors
    /// Returns error if the endpoint is unreachable or responds with
    /// anything other than a well-formed device code grant.
    pub async fn request_device_flow(&self) -> Result<DeviceAuthorizationSession> {
        let url = format!("{}/login/device/code", self.login_host);
        debug!(url, client_id = %self.client_id, "requesting device code");

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::protocol(format!(
                "device code endpoint returned {status}"
            )));
        }

        let body: DeviceCodeResponse = response.json().await.map_err(|e| {
            AuthError::protocol(format!("malformed device code response: {e}"))
        })?;

        let interval = Duration::from_secs(body.interval).max(self.min_poll_interval);
        debug!(
            user_code = %body.user_code,
            expires_in = body.expires_in,
            interval_secs = interval.as_secs(),
            "device code issued"
        );

        Ok(DeviceAuthorizationSession {
            user_code: body.user_code,
            verification_uri: body.verification_uri,
            device_code: body.device_code,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
            interval,
        })
    }

    /// Poll until the flow reaches a terminal state.
    ///
    /// Polls once immediately, then sleeps the current interval between
    /// attempts. Cancellation is observed at every sleep.
    pub async fn run_to_completion(
        &self,
        session: &DeviceAuthorizationSession,
        cancel: &CancellationToken,
    ) -> FlowOutcome {
        let mut interval = session.interval.max(self.min_poll_interval);

        loop {
            if cancel.is_cancelled() {
                return FlowOutcome::Cancelled;
            }
            if Instant::now() >= session.expires_at {
                return FlowOutcome::Expired;
            }

            match self.poll_once(session).await {
                Ok(PollStep::Token(token)) => return FlowOutcome::Authorized(token),
                Ok(PollStep::Pending) => {}
                Ok(PollStep::SlowDown(server_interval)) => {
                    let bumped = interval + self.slow_down_increment;
                    let requested = server_interval
                        .map_or(Duration::ZERO, Duration::from_secs);
                    // Only ever grows.
                    interval = bumped.max(requested);
                    trace!(interval_secs = interval.as_secs(), "slow down");
                }
                Ok(PollStep::Denied) => return FlowOutcome::Denied,
                Ok(PollStep::Expired) => return FlowOutcome::Expired,
                Ok(PollStep::Failed(message)) => return FlowOutcome::Failed(message),
                Err(e) if e.is_timeout() || e.is_connect() => {
                    // Transient transport trouble, keep polling.
                    warn!(error = %e, "token poll failed, retrying");
                }
                Err(e) => return FlowOutcome::Failed(e.to_string()),
            }

            tokio::select! {
                () = cancel.cancelled() => return FlowOutcome::Cancelled,
                () = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Convenience wrapper: poll to completion, yield the token on approval.
    pub async fn wait_for_token(
        &self,
        session: &DeviceAuthorizationSession,
        cancel: &CancellationToken,
    ) -> Option<String> {
        match self.run_to_completion(session, cancel).await {
            FlowOutcome::Authorized(token) => Some(token),
            _ => None,
        }
    }

    async fn poll_once(
        &self,
        session: &DeviceAuthorizationSession,
    ) -> std::result::Result<PollStep, reqwest::Error> {
        let url = format!("{}/login/oauth/access_token", self.login_host);

        let response = self
            .http
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("device_code", session.device_code.as_str()),
                (
                    "grant_type",
                    "urn:ietf:params:oauth:grant-type:device_code",
                ),
            ])
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(PollStep::Failed(format!(
                "token endpoint returned {status}"
            )));
        }

        let Ok(body) = response.json::<AccessTokenResponse>().await else {
            return Ok(PollStep::Failed(
                "malformed token response".to_string(),
            ));
        };

        if let Some(token) = body.access_token {
            return Ok(PollStep::Token(token));
        }

        Ok(match body.error.as_deref() {
            Some("authorization_pending") => PollStep::Pending,
            Some("slow_down") => PollStep::SlowDown(body.interval),
            Some("access_denied") => PollStep::Denied,
            Some("expired_token") => PollStep::Expired,
            Some(other) => PollStep::Failed(
                body.error_description
                    .unwrap_or_else(|| other.to_string()),
            ),
            None => PollStep::Failed("token response carried neither token nor error".to_string()),
        })
    }
}
