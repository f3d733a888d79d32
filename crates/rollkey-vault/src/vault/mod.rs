//! Vault crate: sub-modules.

pub mod backend;
pub mod crypto;
pub mod error;
pub mod store;
pub mod service;

// Re-export top-level items for convenience.
pub use backend::{EncryptedFileBackend, MemoryBackend, StorageBackend};
pub use error::{ImportError, VaultError, VaultErrorKind, VaultResult};
pub use service::{CodeOutcome, CodePoll, VaultService, VaultServiceState};
pub use store::{AddOutcome, CredentialStore, VaultRecord};
