use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::crypto::{self, KdfParams, Passphrase};

/// Keys used by the tracker inside any [`KeyValueStore`].
pub mod keys {
    pub const CYCLE_SETTINGS: &str = "@cycle_settings";
    pub const PERIOD_DATES: &str = "@period_dates";
    pub const NOTIFICATION_SETTINGS: &str = "@notification_settings";
    pub const MEDICATIONS: &str = "@medications";
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
    #[error("no vault at {}", .0.display())]
    NotFound(PathBuf),
    #[error("a vault already exists at {}", .0.display())]
    AlreadyExists(PathBuf),
}

/// String-keyed store holding JSON blobs.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Default vault location: `<data_local_dir>/bloomcycle/vault.bloom`.
pub fn default_vault_path() -> Result<PathBuf, StorageError> {
    Ok(dirs::data_local_dir()
        .ok_or(StorageError::NoDataDir)?
        .join("bloomcycle")
        .join("vault.bloom"))
}

/// Key/value map kept encrypted on disk.
///
/// The whole map is decrypted on open and re-sealed on every write.
pub struct EncryptedFileStore {
    path: PathBuf,
    passphrase: Passphrase,
    params: KdfParams,
    entries: BTreeMap<String, String>,
}

impl EncryptedFileStore {
    /// Create a new, empty vault. Fails if one is already present.
    pub fn create(
        path: impl Into<PathBuf>,
        passphrase: Passphrase,
        params: KdfParams,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        if path.exists() {
            return Err(StorageError::AlreadyExists(path));
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let store = Self {
            path,
            passphrase,
            params,
            entries: BTreeMap::new(),
        };
        store.flush(&store.entries)?;
        info!(path = %store.path.display(), "created vault");
        Ok(store)
    }

    pub fn open(path: impl Into<PathBuf>, passphrase: Passphrase) -> Result<Self, StorageError> {
        let path = path.into();
        if !path.exists() {
            return Err(StorageError::NotFound(path));
        }
        let sealed = fs::read(&path)?;
        let params = crypto::sealed_params(&sealed)?;
        let plaintext = crypto::open(&passphrase, &sealed)?;
        let entries: BTreeMap<String, String> = serde_json::from_slice(&plaintext)?;
        debug!(path = %path.display(), keys = entries.len(), "opened vault");
        Ok(Self {
            path,
            passphrase,
            params,
            entries,
        })
    }

    /// Open the vault at `path`, creating it if it does not exist yet.
    pub fn open_or_create(
        path: impl Into<PathBuf>,
        passphrase: Passphrase,
    ) -> Result<Self, StorageError> {
        let path = path.into();
        if path.exists() {
            Self::open(path, passphrase)
        } else {
            Self::create(path, passphrase, KdfParams::default())
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Plain JSON of every stored entry.
    pub fn export(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Delete the vault file permanently.
    pub fn wipe(self) -> Result<(), StorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        info!(path = %self.path.display(), "wiped vault");
        Ok(())
    }

    /// Seal `entries` and replace the vault file with them.
    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let json = zeroize::Zeroizing::new(serde_json::to_vec(entries)?);
        let sealed = crypto::seal(&self.passphrase, &self.params, &json)?;
        // Write beside the target, then rename over it.
        let tmp = self.path.with_extension("tmp");
        let written = fs::write(&tmp, sealed).and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }

    /// Apply `change` to a copy of the entries and keep it only once it is
    /// on disk.
    fn commit(
        &mut self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let mut next = self.entries.clone();
        change(&mut next);
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }
}

impl KeyValueStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.commit(|entries| {
            entries.insert(key.to_string(), value);
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        self.commit(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_vault(dir: &Path, pass: &str) -> EncryptedFileStore {
        EncryptedFileStore::create(
            dir.join("vault.bloom"),
            Passphrase::new(pass),
            KdfParams::INSECURE_FAST,
        )
        .unwrap()
    }

    #[test]
    fn memory_store_get_set_remove() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get(keys::PERIOD_DATES).unwrap(), None);
        store.set(keys::PERIOD_DATES, "[]".into()).unwrap();
        assert_eq!(store.get(keys::PERIOD_DATES).unwrap().as_deref(), Some("[]"));
        assert_eq!(store.keys().unwrap(), vec![keys::PERIOD_DATES.to_string()]);
        store.remove(keys::PERIOD_DATES).unwrap();
        assert_eq!(store.get(keys::PERIOD_DATES).unwrap(), None);
    }

    #[test]
    fn vault_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = fast_vault(dir.path(), "pw");
        vault
            .set(keys::CYCLE_SETTINGS, "{\"cycleDays\":30}".into())
            .unwrap();

        let path = dir.path().join("vault.bloom");
        let reopened = EncryptedFileStore::open(path, Passphrase::new("pw")).unwrap();
        assert_eq!(
            reopened.get(keys::CYCLE_SETTINGS).unwrap().as_deref(),
            Some("{\"cycleDays\":30}")
        );
    }

    #[test]
    fn vault_rejects_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        fast_vault(dir.path(), "pw");
        let path = dir.path().join("vault.bloom");
        let result = EncryptedFileStore::open(path, Passphrase::new("nope"));
        assert!(matches!(result, Err(StorageError::Crypto(_))));
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        fast_vault(dir.path(), "pw");
        let again = EncryptedFileStore::create(
            dir.path().join("vault.bloom"),
            Passphrase::new("pw"),
            KdfParams::INSECURE_FAST,
        );
        assert!(matches!(again, Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn open_missing_vault_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.bloom");
        let result = EncryptedFileStore::open(path, Passphrase::new("pw"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn vault_file_does_not_contain_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = fast_vault(dir.path(), "pw");
        vault
            .set(keys::PERIOD_DATES, "[\"2024-01-01\"]".into())
            .unwrap();
        let raw = fs::read(dir.path().join("vault.bloom")).unwrap();
        let needle = b"2024-01-01";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn failed_write_keeps_memory_and_disk_in_step() {
        let dir = tempfile::tempdir().unwrap();
        let mut vault = fast_vault(dir.path(), "pw");
        vault.set(keys::PERIOD_DATES, "[]".into()).unwrap();

        // A non-empty directory at the vault path makes the rename fail.
        let path = dir.path().join("vault.bloom");
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();
        fs::write(path.join("blocker"), b"x").unwrap();

        let result = vault.set(keys::PERIOD_DATES, "[\"2024-01-01\"]".into());
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert_eq!(vault.get(keys::PERIOD_DATES).unwrap().as_deref(), Some("[]"));
        assert!(!dir.path().join("vault.tmp").exists());
    }

    #[test]
    fn wipe_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let vault = fast_vault(dir.path(), "pw");
        let path = vault.path().to_path_buf();
        vault.wipe().unwrap();
        assert!(!path.exists());
    }
}
