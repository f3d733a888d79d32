//! The durable credential collection.
//!
//! One serialised record holds every credential in insertion order. Each
//! mutation is a load-modify-store cycle ending in a single whole-record
//! write; callers serialise cycles through the service mutex.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use rollkey_totp::totp::types::{Credential, CredentialDraft};

use crate::vault::backend::StorageBackend;
use crate::vault::error::{VaultError, VaultResult};

const RECORD_VERSION: u32 = 1;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The persisted shape: version, last-write timestamp, ordered credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub credentials: Vec<Credential>,
}

impl VaultRecord {
    pub fn empty() -> Self {
        Self {
            version: RECORD_VERSION,
            updated_at: Utc::now(),
            credentials: Vec::new(),
        }
    }

    pub fn to_json(&self) -> VaultResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> VaultResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Result of an `add`: whether anything was inserted, plus the full list.
///
/// A duplicate secret is not an error; the collection is simply unchanged
/// and `added` is false, so the scan flow can tell the user the credential
/// already exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddOutcome {
    pub added: bool,
    pub credentials: Vec<Credential>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Credential collection over a storage backend.
///
/// Not internally synchronised: wrap it in the service mutex so concurrent
/// mutations cannot interleave their load-modify-store cycles.
pub struct CredentialStore {
    backend: Box<dyn StorageBackend>,
}

impl CredentialStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    fn load(&self) -> VaultResult<VaultRecord> {
        match self.backend.read()? {
            Some(json) => VaultRecord::from_json(&json),
            None => Ok(VaultRecord::empty()),
        }
    }

    fn persist(&self, record: &mut VaultRecord) -> VaultResult<()> {
        record.updated_at = Utc::now();
        self.backend.write(&record.to_json()?)
    }

    /// All credentials in insertion order.
    ///
    /// A backend that has never been written is an empty vault; a backend
    /// that fails to read is an error, not an empty list.
    pub fn list(&self) -> VaultResult<Vec<Credential>> {
        Ok(self.load()?.credentials)
    }

    /// Look up a single credential.
    pub fn get(&self, id: &str) -> VaultResult<Credential> {
        self.load()?
            .credentials
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| VaultError::not_found(format!("no credential with id {}", id)))
    }

    /// Admit a draft: validate, deduplicate, assign an id, append, persist.
    pub fn add(&self, draft: CredentialDraft) -> VaultResult<AddOutcome> {
        if draft.normalised_secret().is_empty() {
            return Err(VaultError::invalid_credential("credential has no secret"));
        }

        let mut record = self.load()?;

        // Dedup invariant: no two live credentials share a secret.
        let incoming = draft.normalised_secret();
        if record
            .credentials
            .iter()
            .any(|c| c.normalised_secret() == incoming)
        {
            return Ok(AddOutcome {
                added: false,
                credentials: record.credentials,
            });
        }

        let credential = draft.into_credential(uuid::Uuid::new_v4().to_string());
        info!("adding credential {} ({})", credential.id, credential.display_name());
        record.credentials.push(credential);
        self.persist(&mut record)?;

        Ok(AddOutcome {
            added: true,
            credentials: record.credentials,
        })
    }

    /// Remove by id. Removing an unknown id is a no-op success, and skips
    /// the redundant write.
    pub fn remove(&self, id: &str) -> VaultResult<Vec<Credential>> {
        let mut record = self.load()?;
        let before = record.credentials.len();
        record.credentials.retain(|c| c.id != id);

        if record.credentials.len() != before {
            info!("removed credential {}", id);
            self.persist(&mut record)?;
        }
        Ok(record.credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::backend::MemoryBackend;
    use rollkey_totp::totp::types::UNKNOWN_ISSUER;

    fn store() -> CredentialStore {
        CredentialStore::new(Box::new(MemoryBackend::new()))
    }

    fn draft(name: &str, secret: &str) -> CredentialDraft {
        CredentialDraft::new(name, secret)
    }

    // ── Add ──────────────────────────────────────────────────────

    #[test]
    fn add_assigns_fresh_ids() {
        let store = store();
        let a = store.add(draft("alice", "AAAA")).unwrap();
        let b = store.add(draft("bob", "BBBB")).unwrap();
        assert!(a.added && b.added);

        let ids: Vec<&str> = b.credentials.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert!(!ids[0].is_empty());
    }

    #[test]
    fn add_preserves_every_field() {
        let store = store();
        let outcome = store
            .add(draft("alice@example.com", "JBSWY3DPEHPK3PXP").with_issuer("ACME"))
            .unwrap();
        let stored = &outcome.credentials[0];
        assert_eq!(stored.name, "alice@example.com");
        assert_eq!(stored.issuer, "ACME");
        assert_eq!(stored.secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(stored.digits, 6);
        assert_eq!(stored.period, 30);
    }

    #[test]
    fn duplicate_secret_is_not_inserted() {
        let store = store();
        store.add(draft("first", "JBSWY3DPEHPK3PXP")).unwrap();
        let outcome = store.add(draft("second", "JBSWY3DPEHPK3PXP")).unwrap();
        assert!(!outcome.added);
        assert_eq!(outcome.credentials.len(), 1);
        assert_eq!(outcome.credentials[0].name, "first");
    }

    #[test]
    fn duplicate_detection_normalises_secrets() {
        let store = store();
        store.add(draft("first", "JBSWY3DPEHPK3PXP")).unwrap();
        let outcome = store.add(draft("second", "jbsw y3dp-ehpk 3pxp")).unwrap();
        assert!(!outcome.added);
    }

    #[test]
    fn empty_secret_is_rejected_before_creation() {
        let store = store();
        let err = store.add(draft("nobody", "   ")).unwrap_err();
        assert_eq!(err.kind, crate::vault::error::VaultErrorKind::InvalidCredential);
        assert!(store.list().unwrap().is_empty());
    }

    // ── List / order ─────────────────────────────────────────────

    #[test]
    fn list_keeps_insertion_order() {
        let store = store();
        for (name, secret) in [("c", "CCCC"), ("a", "AAAA"), ("b", "BBBB")] {
            store.add(draft(name, secret)).unwrap();
        }
        let listed = store.list().unwrap();
        let names: Vec<&str> = listed.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn list_roundtrips_through_the_backend() {
        let backend = MemoryBackend::new();
        let writer = CredentialStore::new(Box::new(backend.clone()));
        writer.add(draft("alice", "AAAA")).unwrap();

        let reader = CredentialStore::new(Box::new(backend));
        let listed = reader.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "alice");
        assert_eq!(listed[0].issuer, UNKNOWN_ISSUER);
    }

    #[test]
    fn unwritten_backend_is_an_empty_vault() {
        assert!(store().list().unwrap().is_empty());
    }

    #[test]
    fn failing_backend_is_an_error_not_an_empty_list() {
        struct FailingBackend;
        impl StorageBackend for FailingBackend {
            fn read(&self) -> VaultResult<Option<String>> {
                Err(VaultError::io("backing store unavailable"))
            }
            fn write(&self, _: &str) -> VaultResult<()> {
                Err(VaultError::io("backing store unavailable"))
            }
        }

        let store = CredentialStore::new(Box::new(FailingBackend));
        let err = store.list().unwrap_err();
        assert_eq!(err.kind, crate::vault::error::VaultErrorKind::Io);
        assert!(store.add(draft("a", "AAAA")).is_err());
    }

    // ── Remove ───────────────────────────────────────────────────

    #[test]
    fn remove_filters_one_entry_and_keeps_order() {
        let store = store();
        store.add(draft("a", "AAAA")).unwrap();
        let target = store.add(draft("b", "BBBB")).unwrap().credentials[1].id.clone();
        store.add(draft("c", "CCCC")).unwrap();

        let remaining = store.remove(&target).unwrap();
        let names: Vec<&str> = remaining.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn remove_unknown_id_is_a_noop_success() {
        let store = store();
        store.add(draft("a", "AAAA")).unwrap();
        let remaining = store.remove("no-such-id").unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn removed_id_frees_its_secret() {
        let store = store();
        let id = store.add(draft("a", "AAAA")).unwrap().credentials[0].id.clone();
        store.remove(&id).unwrap();
        // The dedup invariant covers live credentials only.
        assert!(store.add(draft("a-again", "AAAA")).unwrap().added);
    }

    // ── Get ──────────────────────────────────────────────────────

    #[test]
    fn get_finds_by_id() {
        let store = store();
        let id = store.add(draft("alice", "AAAA")).unwrap().credentials[0].id.clone();
        assert_eq!(store.get(&id).unwrap().name, "alice");
        assert_eq!(
            store.get("missing").unwrap_err().kind,
            crate::vault::error::VaultErrorKind::NotFound
        );
    }

    // ── Record layout ────────────────────────────────────────────

    #[test]
    fn persisted_record_uses_the_stable_field_names() {
        let backend = MemoryBackend::new();
        let store = CredentialStore::new(Box::new(backend.clone()));
        store
            .add(draft("alice", "JBSWY3DPEHPK3PXP").with_issuer("ACME"))
            .unwrap();

        let raw = backend.read().unwrap().unwrap();
        for field in ["\"id\"", "\"name\"", "\"issuer\"", "\"secret\"", "\"type\""] {
            assert!(raw.contains(field), "missing {} in {}", field, raw);
        }
        let record = VaultRecord::from_json(&raw).unwrap();
        assert_eq!(record.version, 1);
        assert_eq!(record.credentials.len(), 1);
    }
}
