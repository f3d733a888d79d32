//! High-level orchestrator — owns the store, delegates to the OTP engine.
//! This is the surface the shell collaborators call: the scan-result handler
//! feeds [`VaultService::import_scan`], the display loop polls
//! [`VaultService::codes`] once per second.

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use rollkey_totp::totp::clock::{Clock, SystemClock};
use rollkey_totp::totp::types::*;
use rollkey_totp::totp::{core, uri};

use crate::vault::backend::StorageBackend;
use crate::vault::error::{ImportError, VaultError, VaultResult};
use crate::vault::store::{AddOutcome, CredentialStore};

/// Thread-safe service state.
///
/// Every store mutation is a load-modify-store cycle; routing all access
/// through this mutex is what keeps two concurrent additions from reading
/// the same snapshot and overwriting each other.
pub type VaultServiceState = Arc<Mutex<VaultService>>;

/// Default verification drift window (time steps either side of now).
const DEFAULT_DRIFT_WINDOW: u32 = 1;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Poll results
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Per-credential outcome of a code poll. One credential failing (bad
/// secret, unsupported mode) never hides the codes of the others.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CodeOutcome {
    Ready(GeneratedCode),
    Failed(GenerateError),
}

impl CodeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// A credential's entry in the display poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodePoll {
    pub credential_id: String,
    pub name: String,
    pub issuer: String,
    pub outcome: CodeOutcome,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Service
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Central vault service.
pub struct VaultService {
    store: CredentialStore,
    clock: Arc<dyn Clock>,
}

impl VaultService {
    /// Create a service over the given backend, wrapped in `Arc<Mutex<_>>`,
    /// on the system clock.
    pub fn new(backend: Box<dyn StorageBackend>) -> VaultServiceState {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    /// Create with an explicit clock (tests, replay).
    pub fn with_clock(backend: Box<dyn StorageBackend>, clock: Arc<dyn Clock>) -> VaultServiceState {
        Arc::new(Mutex::new(VaultService {
            store: CredentialStore::new(backend),
            clock,
        }))
    }

    // ─── Collection ──────────────────────────────────────────────

    /// All credentials, insertion order.
    pub fn list(&self) -> VaultResult<Vec<Credential>> {
        self.store.list()
    }

    /// Handle decoded scan text: parse the enrolment URI and admit the
    /// credential. Parse failures are the scan collaborator's cue to
    /// re-prompt; storage failures are real faults.
    pub fn import_scan(&mut self, scanned: &str) -> Result<AddOutcome, ImportError> {
        let draft = uri::parse(scanned)?;
        let outcome = self.store.add(draft)?;
        if !outcome.added {
            info!("scan matched an existing credential, vault unchanged");
        }
        Ok(outcome)
    }

    /// Admit an already-built draft.
    pub fn add(&mut self, draft: CredentialDraft) -> VaultResult<AddOutcome> {
        self.store.add(draft)
    }

    /// Remove a credential by id; unknown ids are a no-op success.
    pub fn remove(&mut self, id: &str) -> VaultResult<Vec<Credential>> {
        self.store.remove(id)
    }

    // ─── Codes ───────────────────────────────────────────────────

    /// Compute the current code for every credential, at one instant.
    pub fn codes(&self) -> VaultResult<Vec<CodePoll>> {
        let now = self.clock.now_unix();
        Ok(self
            .store
            .list()?
            .iter()
            .map(|credential| poll_one(credential, now))
            .collect())
    }

    /// Compute the current code for a single credential.
    pub fn code_for(&self, id: &str) -> VaultResult<CodePoll> {
        let credential = self.store.get(id)?;
        Ok(poll_one(&credential, self.clock.now_unix()))
    }

    /// Check a user-supplied code against a stored credential.
    pub fn verify(
        &self,
        id: &str,
        candidate: &str,
        drift_window: Option<u32>,
    ) -> VaultResult<VerifyOutcome> {
        let credential = self.store.get(id)?;
        let window = drift_window.unwrap_or(DEFAULT_DRIFT_WINDOW);
        core::verify(&credential, candidate, window, self.clock.as_ref())
            .map_err(|e| VaultError::invalid_credential(e.to_string()))
    }

    // ─── Export ──────────────────────────────────────────────────

    /// The `otpauth://` URI for a stored credential.
    pub fn credential_uri(&self, id: &str) -> VaultResult<String> {
        Ok(uri::build_otpauth_uri(&self.store.get(id)?))
    }
}

fn poll_one(credential: &Credential, now: u64) -> CodePoll {
    let outcome = match core::current_code_at(credential, now) {
        Ok(code) => CodeOutcome::Ready(code),
        Err(e) => CodeOutcome::Failed(e),
    };
    CodePoll {
        credential_id: credential.id.clone(),
        name: credential.name.clone(),
        issuer: credential.issuer.clone(),
        outcome,
    }
}
