//! Repository reference parsing.
//!
//! A reference is an arbitrary user-supplied string naming a repository:
//! a full HTTPS URL, an SSH `user@host:path` shorthand, or a bare
//! `owner/repo` pair. Parsing is pure string work with no I/O; the optional
//! `subPath` and `ref` query parameters are carried along for the fetcher.

use crate::error::{Result, VcsError};
use std::fmt;

/// Default host for bare `owner/repo` shorthand references.
pub const DEFAULT_GIT_HOST: &str = "github.com";

/// Syntax family a reference was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefScheme {
    /// `https://host/owner/repo` (or `http://`).
    Https,
    /// `user@host:owner/repo`.
    Ssh,
    /// Bare `owner/repo` with the default host.
    Shorthand,
}

impl fmt::Display for RefScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Https => write!(f, "https"),
            Self::Ssh => write!(f, "ssh"),
            Self::Shorthand => write!(f, "shorthand"),
        }
    }
}

/// Structured descriptor parsed from a raw repository reference string.
///
/// Immutable once parsed; derived purely from the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoReference {
    /// The raw input string.
    pub raw: String,
    /// Which syntax family matched.
    pub scheme: RefScheme,
    /// Host name (default host for shorthand references).
    pub host: String,
    /// Owner/repository path with any `.git` suffix stripped.
    pub owner_repo_path: String,
    /// SSH user when parsed from the SSH form.
    pub ssh_user: Option<String>,
    /// Optional git ref (branch, tag, or commit) from the `ref` parameter.
    pub git_ref: Option<String>,
    /// Optional sub-path from the `subPath` parameter.
    pub sub_path: Option<String>,
}

impl RepoReference {
    /// Parse a raw reference string.
    ///
    /// Recognized forms, in precedence order:
    /// 1. `scheme://host/owner/repo[?subPath=…]`
    /// 2. `user@host:owner/repo[.git][?subPath=…]`
    /// 3. `owner/repo`
    ///
    /// # Errors
    /// Returns [`VcsError::InvalidReference`] if the string matches none of
    /// the recognized syntaxes.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VcsError::invalid_reference(raw, "empty reference"));
        }

        let (base, sub_path, git_ref) = split_query(trimmed);
        if base.is_empty() {
            return Err(VcsError::invalid_reference(raw, "missing repository"));
        }

        if base.contains("://") {
            return Self::parse_url(raw, base, sub_path, git_ref);
        }
        if base.contains('@') {
            return Self::parse_ssh(raw, base, sub_path, git_ref);
        }
        Self::parse_shorthand(raw, base, sub_path, git_ref)
    }

    fn parse_url(
        raw: &str,
        base: &str,
        sub_path: Option<String>,
        git_ref: Option<String>,
    ) -> Result<Self> {
        let parsed = url::Url::parse(base)
            .map_err(|e| VcsError::invalid_reference(raw, format!("invalid url: {e}")))?;

        match parsed.scheme() {
            "https" | "http" => {}
            other => {
                return Err(VcsError::invalid_reference(
                    raw,
                    format!("unsupported scheme '{other}'"),
                ));
            }
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| VcsError::invalid_reference(raw, "missing host"))?
            .to_string();

        let path = parsed.path().trim_matches('/');
        let path = strip_git_suffix(path);
        if path.is_empty() {
            return Err(VcsError::invalid_reference(raw, "missing repository path"));
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: RefScheme::Https,
            host,
            owner_repo_path: path.to_string(),
            ssh_user: None,
            git_ref,
            sub_path,
        })
    }

    fn parse_ssh(
        raw: &str,
        base: &str,
        sub_path: Option<String>,
        git_ref: Option<String>,
    ) -> Result<Self> {
        if base.matches('@').count() != 1 {
            return Err(VcsError::invalid_reference(raw, "multiple '@' separators"));
        }

        let (user, rest) = base.split_once('@').unwrap_or_default();
        if user.is_empty() {
            return Err(VcsError::invalid_reference(raw, "missing ssh user"));
        }

        let Some((host, path)) = rest.split_once(':') else {
            return Err(VcsError::invalid_reference(
                raw,
                "missing ':' between host and path",
            ));
        };
        if host.is_empty() || host.contains('/') {
            return Err(VcsError::invalid_reference(raw, "invalid ssh host"));
        }

        let path = strip_git_suffix(path.trim_matches('/'));
        if path.is_empty() {
            return Err(VcsError::invalid_reference(raw, "missing repository path"));
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: RefScheme::Ssh,
            host: host.to_string(),
            owner_repo_path: path.to_string(),
            ssh_user: Some(user.to_string()),
            git_ref,
            sub_path,
        })
    }

    fn parse_shorthand(
        raw: &str,
        base: &str,
        sub_path: Option<String>,
        git_ref: Option<String>,
    ) -> Result<Self> {
        if base.chars().any(char::is_whitespace) || base.contains(':') {
            return Err(VcsError::invalid_reference(raw, "not a repository path"));
        }
        let path = strip_git_suffix(base.trim_matches('/'));
        if path.is_empty() || !path.contains('/') || path.split('/').any(str::is_empty) {
            return Err(VcsError::invalid_reference(
                raw,
                "expected 'owner/repo' shorthand",
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            scheme: RefScheme::Shorthand,
            host: DEFAULT_GIT_HOST.to_string(),
            owner_repo_path: path.to_string(),
            ssh_user: None,
            git_ref,
            sub_path,
        })
    }

    /// Canonical URL to hand to the git transport.
    #[must_use]
    pub fn clone_url(&self) -> String {
        match self.scheme {
            RefScheme::Https | RefScheme::Shorthand => {
                format!("https://{}/{}", self.host, self.owner_repo_path)
            }
            RefScheme::Ssh => {
                let user = self.ssh_user.as_deref().unwrap_or("git");
                format!("{user}@{}:{}", self.host, self.owner_repo_path)
            }
        }
    }
}

impl fmt::Display for RepoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split the query suffix off a reference.
///
/// The query is not truly part of SSH syntax, but it is accepted uniformly
/// across all forms. A repeated parameter keeps its last occurrence, even
/// in pathological `…?subPath=a?subPath=b` inputs.
fn split_query(input: &str) -> (&str, Option<String>, Option<String>) {
    let Some((base, query)) = input.split_once('?') else {
        return (input, None, None);
    };

    let mut sub_path = None;
    let mut git_ref = None;
    for segment in query.split('?') {
        for (key, value) in url::form_urlencoded::parse(segment.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "subPath" if !value.is_empty() => sub_path = Some(value),
                "ref" if !value.is_empty() => git_ref = Some(value),
                _ => {}
            }
        }
    }
    (base, sub_path, git_ref)
}

fn strip_git_suffix(path: &str) -> &str {
    path.strip_suffix(".git").unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_https_with_sub_path() {
        let parsed =
            RepoReference::parse("https://github.com/habuma/spring-ai-examples?subPath=vector-store-loader")
                .unwrap();
        assert_eq!(parsed.scheme, RefScheme::Https);
        assert_eq!(parsed.host, "github.com");
        assert_eq!(parsed.owner_repo_path, "habuma/spring-ai-examples");
        assert_eq!(parsed.sub_path.as_deref(), Some("vector-store-loader"));
        assert_eq!(parsed.git_ref, None);
    }

    #[test]
    fn parse_ssh_strips_git_suffix() {
        let parsed = RepoReference::parse("git@github.com:habuma/spring-ai-rag-example.git").unwrap();
        assert_eq!(parsed.scheme, RefScheme::Ssh);
        assert_eq!(parsed.host, "github.com");
        assert_eq!(parsed.owner_repo_path, "habuma/spring-ai-rag-example");
        assert_eq!(parsed.ssh_user.as_deref(), Some("git"));
        assert_eq!(parsed.sub_path, None);
    }

    #[test]
    fn parse_ssh_with_sub_path_query() {
        let parsed =
            RepoReference::parse("git@github.com:habuma/spring-ai-examples.git?subPath=spring-ai-multimodal")
                .unwrap();
        assert_eq!(parsed.scheme, RefScheme::Ssh);
        assert_eq!(parsed.owner_repo_path, "habuma/spring-ai-examples");
        assert_eq!(parsed.sub_path.as_deref(), Some("spring-ai-multimodal"));
    }

    #[test]
    fn parse_shorthand_defaults_host() {
        let parsed = RepoReference::parse("rd-1-2022/rest-service").unwrap();
        assert_eq!(parsed.scheme, RefScheme::Shorthand);
        assert_eq!(parsed.host, DEFAULT_GIT_HOST);
        assert_eq!(parsed.owner_repo_path, "rd-1-2022/rest-service");
    }

    #[test]
    fn parse_https_strips_git_suffix() {
        let parsed = RepoReference::parse("https://github.com/owner/repo.git").unwrap();
        assert_eq!(parsed.owner_repo_path, "owner/repo");
    }

    #[test]
    fn parse_ref_query_parameter() {
        let parsed = RepoReference::parse("https://github.com/owner/repo?ref=v1.2.0").unwrap();
        assert_eq!(parsed.git_ref.as_deref(), Some("v1.2.0"));
    }

    #[test]
    fn repeated_sub_path_uses_last_occurrence() {
        let parsed =
            RepoReference::parse("https://github.com/owner/repo?subPath=first?subPath=second").unwrap();
        assert_eq!(parsed.sub_path.as_deref(), Some("second"));

        let parsed =
            RepoReference::parse("https://github.com/owner/repo?subPath=first&subPath=second").unwrap();
        assert_eq!(parsed.sub_path.as_deref(), Some("second"));
    }

    #[test]
    fn parse_rejects_empty_input() {
        assert_matches!(
            RepoReference::parse(""),
            Err(VcsError::InvalidReference { .. })
        );
        assert_matches!(
            RepoReference::parse("   "),
            Err(VcsError::InvalidReference { .. })
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_matches!(
            RepoReference::parse("justgarbage"),
            Err(VcsError::InvalidReference { .. })
        );
        assert_matches!(
            RepoReference::parse("ftp://github.com/a/b"),
            Err(VcsError::InvalidReference { .. })
        );
        assert_matches!(
            RepoReference::parse("https://github.com"),
            Err(VcsError::InvalidReference { .. })
        );
    }

    #[test]
    fn parse_rejects_multiple_at_signs() {
        assert_matches!(
            RepoReference::parse("git@github.com@extra:owner/repo"),
            Err(VcsError::InvalidReference { .. })
        );
    }

    #[test]
    fn parse_rejects_ssh_without_path_separator() {
        assert_matches!(
            RepoReference::parse("git@github.com"),
            Err(VcsError::InvalidReference { .. })
        );
    }

    #[test]
    fn error_message_echoes_input_and_syntaxes() {
        let err = RepoReference::parse("notaref").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("notaref"));
        assert!(message.contains("owner/repo"));
    }

    #[test]
    fn clone_url_rendering() {
        let https = RepoReference::parse("https://ghe.example.com/team/app.git").unwrap();
        assert_eq!(https.clone_url(), "https://ghe.example.com/team/app");

        let ssh = RepoReference::parse("deploy@ghe.example.com:team/app.git").unwrap();
        assert_eq!(ssh.clone_url(), "deploy@ghe.example.com:team/app");

        let short = RepoReference::parse("team/app").unwrap();
        assert_eq!(short.clone_url(), "https://github.com/team/app");
    }
}
