//! Vault-specific error types.

use rollkey_totp::totp::types::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorised storage error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultError {
    pub kind: VaultErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum VaultErrorKind {
    /// Reading or writing the backing store failed.
    Io,
    /// The stored record could not be (de)serialised.
    Serialization,
    /// Sealing the record failed.
    Encryption,
    /// Opening the record failed: wrong passphrase or corrupted data.
    Decryption,
    /// The candidate credential is not admissible (e.g. empty secret).
    InvalidCredential,
    /// No credential with the requested id.
    NotFound,
}

pub type VaultResult<T> = Result<T, VaultError>;

// ── Construction helpers ─────────────────────────────────────────────

impl VaultError {
    pub fn new(kind: VaultErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            message: msg.into(),
        }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Io, msg)
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Serialization, msg)
    }

    pub fn encryption(msg: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Encryption, msg)
    }

    pub fn decryption(msg: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::Decryption, msg)
    }

    pub fn invalid_credential(msg: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::InvalidCredential, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(VaultErrorKind::NotFound, msg)
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for VaultError {}

impl From<std::io::Error> for VaultError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for VaultError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}

// ── Scan-path composite ──────────────────────────────────────────────

/// Failure of the scan-to-store path: either the scanned text did not parse,
/// or persisting the parsed credential failed. Both are recoverable: the
/// scan collaborator re-prompts on `Parse` and surfaces `Storage` as a fault.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImportError {
    Parse(ParseError),
    Storage(VaultError),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "scan rejected: {}", e),
            Self::Storage(e) => write!(f, "could not persist credential: {}", e),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<ParseError> for ImportError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<VaultError> for ImportError {
    fn from(e: VaultError) -> Self {
        Self::Storage(e)
    }
}
