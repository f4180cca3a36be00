//! Local mirror cache for repeated fetches of the same repository.
//!
//! Mirrors live under a cache root keyed by a hash of the clone URL. A fetch
//! that goes through the cache clones from the local mirror instead of the
//! network, after refreshing the mirror's refs.

use crate::error::{Result, VcsError};
use crate::transport::TransportConfig;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Cache of bare mirror clones, one per remote URL.
#[derive(Debug, Clone)]
pub struct MirrorCache {
    root: PathBuf,
}

impl MirrorCache {
    /// Cache rooted at the given directory. The directory is created lazily
    /// on first use.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Mirror directory for a clone URL. Deterministic for a given URL.
    #[must_use]
    pub fn mirror_path(&self, url: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        let digest = hasher.finalize();
        self.root.join(format!("{digest:x}.git"))
    }

    /// Ensure a fresh mirror exists for the URL and return its path.
    ///
    /// Seeds the mirror with `git clone --mirror` on first use, refreshes
    /// refs with `git remote update --prune` on later uses.
    ///
    /// # Errors
    /// Returns error if the mirror cannot be seeded or refreshed.
    pub fn ensure(&self, url: &str, authenticated_url: &str, transport: &TransportConfig) -> Result<PathBuf> {
        let mirror = self.mirror_path(url);

        if mirror.join("HEAD").exists() {
            self.refresh(url, &mirror, transport)?;
            return Ok(mirror);
        }

        std::fs::create_dir_all(&self.root).map_err(|e| VcsError::io(&self.root, e))?;

        debug!(url, mirror = ?mirror, "seeding mirror");

        let mut cmd = Command::new("git");
        cmd.arg("clone")
            .arg("--mirror")
            .arg(authenticated_url)
            .arg(&mirror)
            .env("GIT_PROTOCOL", "version=2");
        transport.apply(&mut cmd);

        let output = cmd.output().map_err(|e| VcsError::Command {
            command: "git clone --mirror".to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Do not leave a partial mirror behind.
            let _ = std::fs::remove_dir_all(&mirror);
            return Err(crate::fetcher::classify_git_failure(&stderr, url));
        }

        info!(url, "mirror seeded");
        Ok(mirror)
    }

    fn refresh(&self, url: &str, mirror: &Path, transport: &TransportConfig) -> Result<()> {
        debug!(url, mirror = ?mirror, "refreshing mirror");

        let mut cmd = Command::new("git");
        cmd.current_dir(mirror)
            .args(["remote", "update", "--prune"])
            .env("GIT_PROTOCOL", "version=2");
        transport.apply(&mut cmd);

        let output = cmd.output().map_err(|e| VcsError::Command {
            command: "git remote update".to_string(),
            message: e.to_string(),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(crate::fetcher::classify_git_failure(&stderr, url));
        }

        Ok(())
    }
}
