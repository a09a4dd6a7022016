//! Session context and durable local storage
//!
//! The session holds the only process-wide state of the portal: the role
//! marker and the cached profile snapshot. It is created once when a view
//! mounts ([`SessionContext::mount`]) and shared by `Arc` with the access
//! guard, the profile store and the registration flow. [`SessionContext::logout`]
//! is the teardown: it clears both keys.
//!
//! The cache is a best-effort mirror. Reads that fail or hold malformed JSON
//! are logged and treated as "nothing cached".

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::error::Result;
use crate::profile::PatientProfile;
use crate::role::Role;

/// Key of the role marker
pub const ROLE_KEY: &str = "role";

/// Key of the cached profile snapshot
pub const PROFILE_KEY: &str = "patientProfile";

/// String key/value storage that survives restarts.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store, used by tests and by embedders with their own persistence
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // a poisoned map is still a valid map
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

/// One file per key under a cache directory
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl DurableStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        fs::write(&path, value)?;
        debug!(path = %path.display(), "wrote cache entry");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Explicit process-wide session state
pub struct SessionContext {
    store: Arc<dyn DurableStore>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Create the session for a freshly mounted view.
    pub fn mount(store: Arc<dyn DurableStore>) -> Arc<Self> {
        Arc::new(SessionContext { store })
    }

    /// Session backed by a fresh [`MemoryStore`]
    pub fn in_memory() -> Arc<Self> {
        Self::mount(Arc::new(MemoryStore::new()))
    }

    /// Current role marker.
    ///
    /// An unreadable or unrecognised marker counts as absent.
    pub fn role(&self) -> Option<Role> {
        let raw = match self.store.get(ROLE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "could not read role marker");
                return None;
            }
        };

        match raw.parse::<Role>() {
            Ok(role) => Some(role),
            Err(e) => {
                warn!(error = %e, "ignoring role marker");
                None
            }
        }
    }

    /// Record the role of the signed-in account.
    ///
    /// Sign-in itself happens elsewhere; this only persists the marker.
    pub fn sign_in(&self, role: Role) -> Result<()> {
        self.store.set(ROLE_KEY, role.as_str())
    }

    /// Last known profile snapshot, if one was cached
    pub fn cached_profile(&self) -> Option<PatientProfile> {
        let raw = match self.store.get(PROFILE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "could not read cached profile");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "discarding malformed cached profile");
                None
            }
        }
    }

    /// Mirror a snapshot into durable storage
    pub fn cache_profile(&self, profile: &PatientProfile) -> Result<()> {
        let json = serde_json::to_string(profile)?;
        self.store.set(PROFILE_KEY, &json)
    }

    /// Clear the role marker and cached profile, returning the login route of `role`.
    ///
    /// Server-side sessions are not touched.
    pub fn logout(&self, role: Role) -> String {
        for key in [ROLE_KEY, PROFILE_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "could not clear session key");
            }
        }
        debug!(%role, "logged out");
        role.login_path()
    }
}
