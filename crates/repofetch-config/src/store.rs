//! Credential store with write-through persistence.
//!
//! The store owns an in-memory host map guarded by a mutex; every mutation is
//! flushed through a [`CredentialBackend`] before the lock is released, so a
//! racing writer can never observe (or persist) a half-applied state.

use crate::error::{ConfigError, Result};
use crate::hosts::{HostCredential, HostMap};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Persistence collaborator for the credential store.
///
/// Implementations own the on-disk format and location; the store only
/// depends on the load/store capability pair.
pub trait CredentialBackend: Send + Sync + std::fmt::Debug {
    /// Load the full host map. A missing backing file is an empty map.
    fn load(&self) -> Result<HostMap>;

    /// Persist the full host map.
    fn store(&self, hosts: &HostMap) -> Result<()>;
}

/// JSON file backend, the default persistence collaborator.
#[derive(Debug)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Create a backend persisting to the given file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend at the conventional per-user location.
    #[must_use]
    pub fn default_location() -> Self {
        let path = directories::ProjectDirs::from("", "", "repofetch")
            .map(|dirs| dirs.config_dir().join("hosts.json"))
            .unwrap_or_else(|| PathBuf::from("hosts.json"));
        Self::new(path)
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialBackend for JsonFileBackend {
    fn load(&self) -> Result<HostMap> {
        if !self.path.exists() {
            trace!(path = ?self.path, "hosts file absent, starting empty");
            return Ok(HostMap::new());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| ConfigError::io(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::json(&self.path, &e))
    }

    fn store(&self, hosts: &HostMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;
        }
        let content =
            serde_json::to_string_pretty(hosts).map_err(|e| ConfigError::json(&self.path, &e))?;
        std::fs::write(&self.path, content).map_err(|e| ConfigError::io(&self.path, e))
    }
}

/// In-memory backend for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    hosts: Mutex<HostMap>,
}

impl CredentialBackend for MemoryBackend {
    fn load(&self) -> Result<HostMap> {
        Ok(self.hosts.lock().clone())
    }

    fn store(&self, hosts: &HostMap) -> Result<()> {
        *self.hosts.lock() = hosts.clone();
        Ok(())
    }
}

/// Process-wide store of per-host authentication records.
#[derive(Debug)]
pub struct CredentialStore {
    backend: Box<dyn CredentialBackend>,
    entries: Mutex<HostMap>,
}

impl CredentialStore {
    /// Create a store over a backend, loading existing entries.
    ///
    /// # Errors
    /// Returns error if the backend cannot be read.
    pub fn new(backend: Box<dyn CredentialBackend>) -> Result<Self> {
        let entries = backend.load()?;
        debug!(count = entries.len(), "loaded host credentials");
        Ok(Self {
            backend,
            entries: Mutex::new(entries),
        })
    }

    /// Store backed by the conventional per-user hosts file.
    ///
    /// # Errors
    /// Returns error if the hosts file exists but cannot be parsed.
    pub fn open_default() -> Result<Self> {
        Self::new(Box::new(JsonFileBackend::default_location()))
    }

    /// Store backed by memory only.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Box::new(MemoryBackend::default()),
            entries: Mutex::new(HostMap::new()),
        }
    }

    /// Look up the credential for a host. No side effects.
    #[must_use]
    pub fn get(&self, host: &str) -> Option<HostCredential> {
        self.entries.lock().get(host).cloned()
    }

    /// Insert or overwrite the credential for a host and persist.
    ///
    /// # Errors
    /// Returns error if the backend write fails.
    pub fn put(&self, host: impl Into<String>, credential: HostCredential) -> Result<()> {
        let host = host.into();
        let mut entries = self.entries.lock();
        entries.insert(host.clone(), credential);
        self.backend.store(&entries)?;
        debug!(host = %host, "stored credential");
        Ok(())
    }

    /// Remove the credential for a host and persist. Removing an absent
    /// host is a no-op, not an error.
    ///
    /// # Errors
    /// Returns error if the backend write fails.
    pub fn remove(&self, host: &str) -> Result<bool> {
        let mut entries = self.entries.lock();
        if entries.remove(host).is_none() {
            trace!(host, "no credential to remove");
            return Ok(false);
        }
        self.backend.store(&entries)?;
        debug!(host, "removed credential");
        Ok(true)
    }

    /// Hosts with a stored credential.
    #[must_use]
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self.entries.lock().keys().cloned().collect();
        hosts.sort();
        hosts
    }
}
