//! Storage backends: where the serialised credential record lives.
//!
//! The vault owns exactly one logical record. A backend must provide
//! confidentiality at rest and whole-record replace semantics: a write
//! either fully replaces the previous record or fails leaving it intact.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::vault::crypto;
use crate::vault::error::{VaultError, VaultResult};

/// Single-record storage contract.
pub trait StorageBackend: Send + Sync {
    /// Read the record. `Ok(None)` means no record has ever been written.
    fn read(&self) -> VaultResult<Option<String>>;

    /// Atomically replace the record.
    fn write(&self, payload: &str) -> VaultResult<()>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Encrypted file backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// File-backed storage, sealed with AES-256-GCM.
///
/// Writes go to a temp sibling first and are renamed over the record, so a
/// crash mid-write never corrupts the previous state.
pub struct EncryptedFileBackend {
    path: PathBuf,
    passphrase: String,
}

impl EncryptedFileBackend {
    pub fn new(path: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Backend at the platform data directory (`<data_dir>/rollkey/vault.json`).
    pub fn at_default_location(passphrase: impl Into<String>) -> VaultResult<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| VaultError::io("no platform data directory"))?
            .join("rollkey");
        Ok(Self::new(dir.join("vault.json"), passphrase))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for EncryptedFileBackend {
    fn read(&self) -> VaultResult<Option<String>> {
        let sealed = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        crypto::open(&sealed, &self.passphrase).map(Some)
    }

    fn write(&self, payload: &str) -> VaultResult<()> {
        let sealed = crypto::seal(payload, &self.passphrase)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(sealed.as_bytes())?;
            tmp.flush()?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!("vault record replaced at {}", self.path.display());
        Ok(())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Memory backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// In-memory record, shared between clones.
///
/// Used by tests and by hosts that hand the sealed record to their own
/// keystore instead of the filesystem.
#[derive(Clone, Default)]
pub struct MemoryBackend(Arc<Mutex<Option<String>>>);

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self) -> VaultResult<Option<String>> {
        let guard = self
            .0
            .lock()
            .map_err(|_| VaultError::io("memory backend poisoned"))?;
        Ok(guard.clone())
    }

    fn write(&self, payload: &str) -> VaultResult<()> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| VaultError::io("memory backend poisoned"))?;
        *guard = Some(payload.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::error::VaultErrorKind;

    // ── Encrypted file backend ───────────────────────────────────

    #[test]
    fn file_backend_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = EncryptedFileBackend::new(dir.path().join("vault.json"), "pw");
        assert_eq!(backend.read().unwrap(), None);

        backend.write(r#"{"credentials":[]}"#).unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some(r#"{"credentials":[]}"#));
    }

    #[test]
    fn file_backend_stores_only_ciphertext() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let backend = EncryptedFileBackend::new(&path, "pw");
        backend.write(r#"{"secret":"JBSWY3DPEHPK3PXP"}"#).unwrap();

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(!on_disk.contains("JBSWY3DPEHPK3PXP"));
        assert!(crypto::is_sealed(&on_disk));
    }

    #[test]
    fn file_backend_wrong_passphrase() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        EncryptedFileBackend::new(&path, "right").write("data").unwrap();

        let err = EncryptedFileBackend::new(&path, "wrong").read().unwrap_err();
        assert_eq!(err.kind, VaultErrorKind::Decryption);
    }

    #[test]
    fn file_backend_creates_parent_dirs_and_cleans_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/vault.json");
        let backend = EncryptedFileBackend::new(&path, "pw");
        backend.write("payload").unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn file_backend_replaces_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let backend = EncryptedFileBackend::new(dir.path().join("v.json"), "pw");
        backend.write("first").unwrap();
        backend.write("second").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("second"));
    }

    // ── Memory backend ───────────────────────────────────────────

    #[test]
    fn memory_backend_shared_between_clones() {
        let backend = MemoryBackend::new();
        let other = backend.clone();
        backend.write("hello").unwrap();
        assert_eq!(other.read().unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn memory_backend_starts_empty() {
        assert_eq!(MemoryBackend::new().read().unwrap(), None);
    }
}
