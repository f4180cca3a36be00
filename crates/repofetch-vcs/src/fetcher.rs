//! Repository content retrieval via the git CLI.
//!
//! The fetcher clones into a temporary working directory, checks out the
//! requested ref, validates the requested sub-path, and only then releases
//! the directory to the caller. Any failure along the way drops the
//! temporary directory, so partial clones never survive.

use crate::cache::MirrorCache;
use crate::error::{Result, TransportFailure, VcsError};
use crate::reference::RepoReference;
use crate::transport::TransportConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// Outcome of a successful fetch.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Retained working directory. Ownership passes to the caller; deleting
    /// this directory cleans up the whole fetch.
    pub work_root: PathBuf,
    /// Directory holding the requested content, inside [`Self::work_root`]:
    /// the sub-path directory when one was requested, the repository root
    /// otherwise.
    pub content_root: PathBuf,
    /// Sub-path that was applied, if any.
    pub used_sub_path: Option<String>,
}

/// Fetches repository content for parsed references.
#[derive(Debug, Clone, Default)]
pub struct RepositoryFetcher {
    cache: Option<MirrorCache>,
    work_root: Option<PathBuf>,
}

impl RepositoryFetcher {
    /// Fetcher without a mirror cache, working in the system temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route clones through a local mirror cache.
    #[must_use]
    pub fn with_cache(mut self, cache: MirrorCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Create working directories under the given root instead of the
    /// system temp directory.
    #[must_use]
    pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.work_root = Some(root.into());
        self
    }

    /// Fetch the content a reference names.
    ///
    /// # Errors
    /// Returns error if the clone, checkout, or sub-path validation fails.
    pub fn fetch(
        &self,
        reference: &RepoReference,
        transport: &TransportConfig,
    ) -> Result<FetchResult> {
        let url = reference.clone_url();
        let authenticated = transport.authenticated_url(reference);

        self.fetch_from_url(
            &url,
            &authenticated,
            reference.git_ref.as_deref(),
            reference.sub_path.as_deref(),
            transport,
        )
    }

    fn fetch_from_url(
        &self,
        url: &str,
        authenticated_url: &str,
        git_ref: Option<&str>,
        sub_path: Option<&str>,
        transport: &TransportConfig,
    ) -> Result<FetchResult> {
        let workdir = self.make_workdir()?;
        let checkout_dir = workdir.path().join("repo");

        let clone_source = match &self.cache {
            Some(cache) => {
                let mirror = cache.ensure(url, authenticated_url, transport)?;
                mirror.to_string_lossy().into_owned()
            }
            None => authenticated_url.to_string(),
        };

        debug!(url, dest = ?checkout_dir, "cloning repository");
        self.clone_into(url, &clone_source, &checkout_dir, transport)?;

        if let Some(wanted) = git_ref {
            Self::checkout_ref(&checkout_dir, wanted)?;
        }

        if let Some(sub) = sub_path {
            // Components like `..` would resolve outside the clone.
            if !is_clean_relative(sub) || !checkout_dir.join(sub).is_dir() {
                return Err(VcsError::SubPathNotFound {
                    sub_path: sub.to_string(),
                });
            }
        }

        // Everything validated, keep the working directory.
        let work_root = workdir.keep();
        let content_root = match sub_path {
            Some(sub) => work_root.join("repo").join(sub),
            None => work_root.join("repo"),
        };

        info!(url, content_root = ?content_root, "fetch complete");
        Ok(FetchResult {
            work_root,
            content_root,
            used_sub_path: sub_path.map(str::to_string),
        })
    }

    fn make_workdir(&self) -> Result<TempDir> {
        match &self.work_root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| VcsError::io(root, e))?;
                tempfile::tempdir_in(root).map_err(|e| VcsError::io(root, e))
            }
            None => tempfile::tempdir().map_err(|e| VcsError::io(std::env::temp_dir(), e)),
        }
    }

    fn clone_into(
        &self,
        url: &str,
        source: &str,
        dest: &Path,
        transport: &TransportConfig,
    ) -> Result<()> {
        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg(source)
            .arg(dest)
            .env("GIT_PROTOCOL", "version=2");
        transport.apply(&mut cmd);

        let output = cmd.output().map_err(|e| VcsError::Command {
            command: "git clone".to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_git_failure(&stderr, url));
        }

        Ok(())
    }

    fn checkout_ref(repo_path: &Path, reference: &str) -> Result<()> {
        debug!(reference, "checking out");

        let output = Command::new("git")
            .current_dir(repo_path)
            .args(["checkout", reference])
            .output()
            .map_err(|e| VcsError::Command {
                command: "git checkout".to_string(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_checkout_failure(&stderr, reference));
        }

        Ok(())
    }
}

/// A sub-path must stay inside the clone: relative, no parent or root
/// components.
fn is_clean_relative(sub_path: &str) -> bool {
    let path = Path::new(sub_path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, std::path::Component::Normal(_)))
}

/// Map git checkout stderr to a `VcsError`. Only a genuinely missing ref
/// becomes `RefNotFound`.
fn classify_checkout_failure(stderr: &str, reference: &str) -> VcsError {
    let lower = stderr.to_lowercase();

    if lower.contains("did not match")
        || lower.contains("unknown revision")
        || lower.contains("pathspec")
    {
        return VcsError::RefNotFound {
            reference: reference.to_string(),
        };
    }

    VcsError::Command {
        command: "git checkout".to_string(),
        message: stderr.trim().to_string(),
    }
}

/// Map git stderr output to a `VcsError`.
pub(crate) fn classify_git_failure(stderr: &str, url: &str) -> VcsError {
    let lower = stderr.to_lowercase();

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("access denied")
        || lower.contains("invalid credentials")
        || lower.contains("could not read username")
        || lower.contains("host key verification failed")
    {
        return VcsError::transport(url, TransportFailure::Auth, stderr.trim());
    }

    if lower.contains("repository not found")
        || lower.contains("does not exist")
        || lower.contains("not found")
    {
        return VcsError::RepositoryNotFound {
            url: url.to_string(),
        };
    }

    VcsError::transport(url, TransportFailure::Connectivity, stderr.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HostKeyPolicy, TransportKind};
    use assert_matches::assert_matches;

    fn anonymous() -> TransportConfig {
        TransportConfig {
            kind: TransportKind::AnonymousHttps,
            credential: None,
            host_key_policy: HostKeyPolicy::Strict,
        }
    }

    fn git_available() -> bool {
        Command::new("git")
            .arg("--version")
            .output()
            .is_ok_and(|out| out.status.success())
    }

    fn run_git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .current_dir(dir)
            .args(args)
            .env("GIT_AUTHOR_NAME", "test")
            .env("GIT_AUTHOR_EMAIL", "test@example.com")
            .env("GIT_COMMITTER_NAME", "test")
            .env("GIT_COMMITTER_EMAIL", "test@example.com")
            .status()
            .unwrap();
        assert!(status.success(), "git {args:?} failed");
    }

    fn init_fixture(dir: &Path) {
        run_git(dir, &["init", "--quiet"]);
        std::fs::write(dir.join("README.md"), "fixture\n").unwrap();
        std::fs::create_dir_all(dir.join("module/nested")).unwrap();
        std::fs::write(dir.join("module/lib.rs"), "// lib\n").unwrap();
        std::fs::write(dir.join("module/nested/deep.rs"), "// deep\n").unwrap();
        run_git(dir, &["add", "."]);
        run_git(dir, &["commit", "--quiet", "-m", "initial"]);
        run_git(dir, &["tag", "v1.0"]);
    }

    #[test]
    fn fetch_local_repository() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();

        let fetcher = RepositoryFetcher::new();
        let result = fetcher
            .fetch_from_url(&url, &url, None, None, &anonymous())
            .unwrap();

        assert!(result.content_root.join("README.md").exists());
        assert!(result.content_root.starts_with(&result.work_root));
        assert!(result.used_sub_path.is_none());
        std::fs::remove_dir_all(&result.work_root).unwrap();
    }

    #[test]
    fn fetch_honors_sub_path() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();

        let fetcher = RepositoryFetcher::new();
        let result = fetcher
            .fetch_from_url(&url, &url, None, Some("module"), &anonymous())
            .unwrap();

        assert!(result.content_root.join("lib.rs").exists());
        assert_eq!(result.used_sub_path.as_deref(), Some("module"));
        std::fs::remove_dir_all(&result.work_root).unwrap();
    }

    #[test]
    fn nested_sub_path_cleanup_goes_through_work_root() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();

        let fetcher = RepositoryFetcher::new();
        let result = fetcher
            .fetch_from_url(&url, &url, None, Some("module/nested"), &anonymous())
            .unwrap();

        assert!(result.content_root.join("deep.rs").exists());
        assert!(result.content_root.starts_with(&result.work_root));

        std::fs::remove_dir_all(&result.work_root).unwrap();
        assert!(!result.content_root.exists());
    }

    #[test]
    fn fetch_honors_tagged_ref() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();

        let fetcher = RepositoryFetcher::new();
        let result = fetcher
            .fetch_from_url(&url, &url, Some("v1.0"), None, &anonymous())
            .unwrap();

        assert!(result.content_root.join("README.md").exists());
        std::fs::remove_dir_all(&result.work_root).unwrap();
    }

    #[test]
    fn missing_sub_path_cleans_up_workdir() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();
        let work_root = tempfile::tempdir().unwrap();

        let fetcher = RepositoryFetcher::new().with_work_root(work_root.path());
        let err = fetcher
            .fetch_from_url(&url, &url, None, Some("no-such-dir"), &anonymous())
            .unwrap_err();

        assert_matches!(err, VcsError::SubPathNotFound { sub_path } if sub_path == "no-such-dir");
        let leftovers: Vec<_> = std::fs::read_dir(work_root.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn traversal_sub_path_is_rejected() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();
        let work_root = tempfile::tempdir().unwrap();

        let fetcher = RepositoryFetcher::new().with_work_root(work_root.path());
        // `../..` resolves to an existing directory outside the clone.
        let err = fetcher
            .fetch_from_url(&url, &url, None, Some("../.."), &anonymous())
            .unwrap_err();

        assert_matches!(err, VcsError::SubPathNotFound { sub_path } if sub_path == "../..");
        let leftovers: Vec<_> = std::fs::read_dir(work_root.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn sub_path_must_be_clean_and_relative() {
        assert!(is_clean_relative("module"));
        assert!(is_clean_relative("module/nested"));
        assert!(!is_clean_relative(""));
        assert!(!is_clean_relative(".."));
        assert!(!is_clean_relative("a/../b"));
        assert!(!is_clean_relative("/etc"));
    }

    #[test]
    fn missing_ref_cleans_up_workdir() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();
        let work_root = tempfile::tempdir().unwrap();

        let fetcher = RepositoryFetcher::new().with_work_root(work_root.path());
        let err = fetcher
            .fetch_from_url(&url, &url, Some("no-such-ref"), None, &anonymous())
            .unwrap_err();

        assert_matches!(err, VcsError::RefNotFound { reference } if reference == "no-such-ref");
        let leftovers: Vec<_> = std::fs::read_dir(work_root.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn missing_repository_cleans_up_workdir() {
        if !git_available() {
            return;
        }
        let work_root = tempfile::tempdir().unwrap();
        let url = work_root.path().join("no-such-repo");
        let url = url.to_string_lossy().into_owned();

        let fetcher = RepositoryFetcher::new().with_work_root(work_root.path());
        let err = fetcher
            .fetch_from_url(&url, &url, None, None, &anonymous())
            .unwrap_err();

        assert!(err.is_not_found() || err.is_retryable());
        let leftovers: Vec<_> = std::fs::read_dir(work_root.path()).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn fetch_through_mirror_cache() {
        if !git_available() {
            return;
        }
        let origin = tempfile::tempdir().unwrap();
        init_fixture(origin.path());
        let url = origin.path().to_string_lossy().into_owned();
        let cache_root = tempfile::tempdir().unwrap();

        let fetcher =
            RepositoryFetcher::new().with_cache(MirrorCache::new(cache_root.path()));

        // First fetch seeds the mirror, second reuses it.
        for _ in 0..2 {
            let result = fetcher
                .fetch_from_url(&url, &url, None, None, &anonymous())
                .unwrap();
            assert!(result.content_root.join("README.md").exists());
            std::fs::remove_dir_all(&result.work_root).unwrap();
        }

        let cache = MirrorCache::new(cache_root.path());
        assert!(cache.mirror_path(&url).join("HEAD").exists());
    }

    #[test]
    fn classify_auth_failure() {
        let err = classify_git_failure(
            "fatal: Authentication failed for 'https://github.com/foo/bar'",
            "https://github.com/foo/bar",
        );
        assert!(err.is_auth_error());
    }

    #[test]
    fn classify_host_key_failure_as_auth() {
        let err = classify_git_failure(
            "Host key verification failed.\nfatal: Could not read from remote repository.",
            "git@github.com:foo/bar",
        );
        assert!(err.is_auth_error());
    }

    #[test]
    fn classify_missing_repository() {
        let err = classify_git_failure(
            "fatal: repository 'https://github.com/foo/bar' not found",
            "https://github.com/foo/bar",
        );
        assert_matches!(err, VcsError::RepositoryNotFound { .. });
    }

    #[test]
    fn classify_checkout_missing_ref() {
        let err = classify_checkout_failure(
            "error: pathspec 'no-such-ref' did not match any file(s) known to git",
            "no-such-ref",
        );
        assert_matches!(err, VcsError::RefNotFound { reference } if reference == "no-such-ref");
    }

    #[test]
    fn classify_checkout_io_failure_is_not_ref_not_found() {
        let err = classify_checkout_failure(
            "fatal: unable to write new index file",
            "main",
        );
        assert_matches!(err, VcsError::Command { .. });
    }

    #[test]
    fn classify_dns_failure_as_connectivity() {
        let err = classify_git_failure(
            "fatal: unable to access 'https://nowhere.invalid/foo/bar': Could not resolve host",
            "https://nowhere.invalid/foo/bar",
        );
        assert!(err.is_retryable());
    }
}
