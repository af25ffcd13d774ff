//! Credential cache persisted on disk

use crate::auth::credential::Credential;
use crate::error::YplError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

const CACHE_VERSION: u32 = 1;

/// Storage abstraction for the persisted credential
pub trait CredentialStore: Send + Sync {
    /// Load the cached credential; `Ok(None)` when nothing is cached
    fn load(&self) -> Result<Option<Credential>, YplError>;
    /// Persist the credential
    fn save(&self, credential: &Credential) -> Result<(), YplError>;
}

/// File-backed credential store.
///
/// The file is only ever readable and writable by its owner. No locking is
/// done; concurrent runs may race on the file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    credential: Credential,
    saved_at: DateTime<Utc>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persistence_error(&self, source: std::io::Error) -> YplError {
        YplError::Persistence {
            path: self.path.clone(),
            source,
        }
    }

    fn corrupt(&self, reason: impl ToString) -> YplError {
        YplError::CorruptCredential {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, YplError> {
        let raw = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cached credential at {}", self.path.display());
                return Ok(None);
            }
            Err(err) => return Err(self.corrupt(err)),
        };

        let file: CacheFile = serde_json::from_slice(&raw).map_err(|err| self.corrupt(err))?;
        if file.version != CACHE_VERSION {
            return Err(self.corrupt(format!("unsupported cache version {}", file.version)));
        }

        debug!(
            "Loaded cached credential from {} (saved {})",
            self.path.display(),
            file.saved_at
        );
        Ok(Some(file.credential))
    }

    fn save(&self, credential: &Credential) -> Result<(), YplError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.persistence_error(err))?;
        }

        let file = CacheFile {
            version: CACHE_VERSION,
            credential: credential.clone(),
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_vec_pretty(&file)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut out = options
            .open(&self.path)
            .map_err(|err| self.persistence_error(err))?;

        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .map_err(|err| self.persistence_error(err))?;
        }

        out.write_all(&serialized)
            .and_then(|()| out.flush())
            .map_err(|err| self.persistence_error(err))?;

        debug!("Saved credential to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store, for runs that must not touch the disk
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credential: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, YplError> {
        Ok(self
            .credential
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), YplError> {
        *self
            .credential
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credential.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample() -> Credential {
        Credential::new("access")
            .with_refresh_token("refresh")
            .expiring_in(Duration::from_secs(3600))
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join(".ypl.token"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("nested").join(".ypl.token"));
        let cred = sample();

        store.save(&cred).unwrap();
        assert_eq!(store.load().unwrap(), Some(cred));
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ypl.token");
        fs::write(&path, b"\x80\x04\x95 pickled").unwrap();

        let store = FileCredentialStore::new(&path);
        match store.load() {
            Err(YplError::CorruptCredential { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected corrupt credential, got {:?}", other),
        }
    }

    #[test]
    fn test_load_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ypl.token");
        fs::write(
            &path,
            r#"{"version":7,"credential":{"access_token":"a"},"saved_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();

        let store = FileCredentialStore::new(&path);
        assert!(matches!(store.load(), Err(YplError::CorruptCredential { .. })));
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join(".ypl.token"));

        store.save(&sample()).unwrap();
        let newer = Credential::new("newer");
        store.save(&newer).unwrap();
        assert_eq!(store.load().unwrap(), Some(newer));
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ypl.token");
        fs::write(&path, b"{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        FileCredentialStore::new(&path).save(&sample()).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_save_into_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();

        // parent is a regular file, so the directory cannot be created
        let store = FileCredentialStore::new(blocker.join(".ypl.token"));
        assert!(matches!(store.save(&sample()), Err(YplError::Persistence { .. })));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().access_token, "access");
    }
}
