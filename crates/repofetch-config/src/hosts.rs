//! Per-host credential records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Mapping from host name to its stored credential.
pub type HostMap = HashMap<String, HostCredential>;

/// Credential stored for a single git host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostCredential {
    /// OAuth or personal access token.
    pub token: String,
    /// Optional expiry timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl HostCredential {
    /// Create a credential without an expiry.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expiry: None,
        }
    }

    /// Create a credential with an expiry timestamp.
    #[must_use]
    pub fn with_expiry(token: impl Into<String>, expiry: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expiry: Some(expiry),
        }
    }

    /// Check whether the credential has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|at| at <= Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn credential_without_expiry_never_expires() {
        let cred = HostCredential::new("ghp_abc123");
        assert!(!cred.is_expired());
    }

    #[test]
    fn credential_expiry() {
        let past = Utc::now() - Duration::hours(1);
        let future = Utc::now() + Duration::hours(1);

        assert!(HostCredential::with_expiry("t", past).is_expired());
        assert!(!HostCredential::with_expiry("t", future).is_expired());
    }

    #[test]
    fn credential_serde_round_trip() {
        let cred = HostCredential::new("ghp_abc123");
        let json = serde_json::to_string(&cred).unwrap();
        // No expiry key when unset
        assert!(!json.contains("expiry"));

        let back: HostCredential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
    }
}
