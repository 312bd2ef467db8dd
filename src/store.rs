//! Token persistence.
//!
//! `CredentialStore` is the capability the gate uses to read and clear the
//! locally held token. Implementations must never fail toward
//! "authenticated": a storage fault reads as an absent token, and write or
//! clear failures are logged and swallowed.

use std::cell::RefCell;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Fixed key under which the token is persisted
pub const CREDENTIAL_KEY: &str = "auth_token";

/// Keychain service name for `KeyringStore`
const SERVICE_NAME: &str = "authgate";

/// Persistence for the opaque authentication token.
///
/// All operations are synchronous and local; none may block indefinitely.
pub trait CredentialStore {
    /// Read the persisted token; storage faults read as absent.
    fn read(&self) -> Option<String>;

    /// Persist a token, replacing any existing one.
    fn write(&self, token: &str);

    /// Remove the persisted token. Clearing an absent token is a no-op.
    fn clear(&self);
}

/// On-disk token record. `saved_at` is diagnostic only.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    token: String,
    saved_at: DateTime<Utc>,
}

/// File-backed store: one JSON file named after the credential key,
/// surviving reloads but scoped to this device.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default store directory under the platform config dir.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(SERVICE_NAME))
    }

    fn credential_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", CREDENTIAL_KEY))
    }

    fn try_read(&self) -> Result<Option<String>> {
        let path = self.credential_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read credential file")?;
        let stored: StoredCredential =
            serde_json::from_str(&contents).context("Failed to parse credential file")?;
        Ok(Some(stored.token))
    }

    fn try_write(&self, token: &str) -> Result<()> {
        let stored = StoredCredential {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let path = self.credential_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn try_clear(&self) -> Result<()> {
        let path = self.credential_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl CredentialStore for FileStore {
    fn read(&self) -> Option<String> {
        match self.try_read() {
            Ok(token) => token,
            Err(e) => {
                warn!("Credential read failed, treating token as absent: {:#}", e);
                None
            }
        }
    }

    fn write(&self, token: &str) {
        if let Err(e) = self.try_write(token) {
            warn!("Credential write failed: {:#}", e);
        }
    }

    fn clear(&self) {
        if let Err(e) = self.try_clear() {
            warn!("Credential clear failed: {:#}", e);
        }
    }
}

/// Store backed by the OS keychain.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a custom keychain service name (e.g. per embedding application).
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn read(&self) -> Option<String> {
        let result = Entry::new(&self.service, CREDENTIAL_KEY).and_then(|e| e.get_password());
        match result {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!("Keychain read failed, treating token as absent: {}", e);
                None
            }
        }
    }

    fn write(&self, token: &str) {
        let result =
            Entry::new(&self.service, CREDENTIAL_KEY).and_then(|e| e.set_password(token));
        if let Err(e) = result {
            warn!("Keychain write failed: {}", e);
        }
    }

    fn clear(&self) {
        let result =
            Entry::new(&self.service, CREDENTIAL_KEY).and_then(|e| e.delete_credential());
        match result {
            Ok(()) | Err(keyring::Error::NoEntry) => {}
            Err(e) => warn!("Keychain clear failed: {}", e),
        }
    }
}

/// In-memory store for tests and embedding. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    token: RefCell<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RefCell::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn read(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    fn write(&self, token: &str) {
        *self.token.borrow_mut() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.borrow_mut() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer that buffers formatted log output for assertions
    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.read(), None);

        store.write("tok-1");
        assert_eq!(store.read(), Some("tok-1".to_string()));

        store.write("tok-2");
        assert_eq!(store.read(), Some("tok-2".to_string()));
    }

    #[test]
    fn memory_store_clear_is_idempotent() {
        let store = MemoryStore::with_token("tok");
        store.clear();
        assert_eq!(store.read(), None);

        // Clearing again leaves the store in the same state
        store.clear();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        assert_eq!(store.read(), None);
        store.write("tok-abc");
        assert_eq!(store.read(), Some("tok-abc".to_string()));
    }

    #[test]
    fn file_store_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        FileStore::new(dir.path()).write("persisted");

        // A fresh store over the same directory sees the token
        let reloaded = FileStore::new(dir.path());
        assert_eq!(reloaded.read(), Some("persisted".to_string()));
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.write("tok");

        store.clear();
        assert_eq!(store.read(), None);
        store.clear();
        assert_eq!(store.read(), None);
    }

    #[test]
    fn file_store_corrupt_file_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.credential_path(), "{not valid json").unwrap();

        assert_eq!(store.read(), None);
    }

    #[test]
    fn file_store_corrupt_file_warns_but_does_not_fail() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        std::fs::write(store.credential_path(), "{not valid json").unwrap();

        let log = CapturedLog::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(log.clone())
            .with_ansi(false)
            .finish();

        let token = tracing::subscriber::with_default(subscriber, || store.read());

        assert_eq!(token, None);
        assert!(log.contents().contains("Credential read failed"));
    }

    #[test]
    fn file_store_missing_directory_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("never-created"));

        assert_eq!(store.read(), None);
    }
}
