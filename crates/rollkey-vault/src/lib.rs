//! # Rollkey – encrypted credential vault
//!
//! Durable, deduplicated storage for TOTP credentials:
//!
//! - **Store** – insertion-ordered collection with add/list/remove, a fresh
//!   UUID per admitted credential, and the no-two-credentials-share-a-secret
//!   invariant enforced at insertion
//! - **At-rest encryption** – AES-256-GCM sealing with PBKDF2-HMAC-SHA256
//!   key derivation, behind a pluggable storage-backend trait
//! - **Atomic persistence** – whole-record replace via temp-file rename;
//!   a failed write never corrupts the previous state
//! - **Service façade** – `Arc<tokio::sync::Mutex<_>>` state that serialises
//!   every load-modify-store cycle, plus per-credential code polling for the
//!   display collaborator

pub mod vault;
