//! At-rest sealing for the vault record.
//!
//! - **Key derivation**: PBKDF2-HMAC-SHA256
//! - **Encryption**: AES-256-GCM with a random 96-bit nonce
//! - **Envelope**: JSON with iteration count, salt, nonce and ciphertext,
//!   all base-64, versioned for future migration

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::vault::error::{VaultError, VaultResult};

/// PBKDF2 iteration count (current OWASP figure for PBKDF2-HMAC-SHA256).
const KDF_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Envelope format version.
const ENVELOPE_VERSION: u32 = 1;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Envelope
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The sealed form the backing store actually holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SealedVault {
    pub version: u32,
    pub kdf_iterations: u32,
    pub salt: String,
    pub nonce: String,
    pub ciphertext: String,
}

/// Quick structural check: does this payload look like a sealed envelope?
pub fn is_sealed(payload: &str) -> bool {
    serde_json::from_str::<SealedVault>(payload.trim()).is_ok()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Key derivation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Derive an AES-256 key from a passphrase.
pub fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(passphrase.as_bytes(), salt, iterations, &mut key);
    key
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Seal / open
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Seal a plaintext record (typically the JSON collection) into an envelope
/// JSON string. Salt and nonce are fresh on every call.
pub fn seal(plaintext: &str, passphrase: &str) -> VaultResult<String> {
    let salt = random_bytes::<SALT_LEN>();
    let nonce_bytes = random_bytes::<NONCE_LEN>();
    let key = derive_key(passphrase, &salt, KDF_ITERATIONS);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| VaultError::encryption(format!("cipher init: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
        .map_err(|e| VaultError::encryption(format!("seal: {}", e)))?;

    let envelope = SealedVault {
        version: ENVELOPE_VERSION,
        kdf_iterations: KDF_ITERATIONS,
        salt: BASE64.encode(salt),
        nonce: BASE64.encode(nonce_bytes),
        ciphertext: BASE64.encode(ciphertext),
    };

    serde_json::to_string_pretty(&envelope)
        .map_err(|e| VaultError::encryption(format!("envelope serialise: {}", e)))
}

/// Open an envelope JSON string back into the plaintext record.
pub fn open(envelope_json: &str, passphrase: &str) -> VaultResult<String> {
    let envelope: SealedVault = serde_json::from_str(envelope_json.trim())
        .map_err(|e| VaultError::decryption(format!("invalid envelope: {}", e)))?;

    let salt = decode_field(&envelope.salt, "salt")?;
    let nonce_bytes = decode_field(&envelope.nonce, "nonce")?;
    let ciphertext = decode_field(&envelope.ciphertext, "ciphertext")?;

    if nonce_bytes.len() != NONCE_LEN {
        return Err(VaultError::decryption(format!(
            "nonce length {} != expected {}",
            nonce_bytes.len(),
            NONCE_LEN
        )));
    }

    let key = derive_key(passphrase, &salt, envelope.kdf_iterations);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| VaultError::decryption(format!("cipher init: {}", e)))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_slice())
        .map_err(|_| VaultError::decryption("wrong passphrase or corrupted data"))?;

    String::from_utf8(plaintext)
        .map_err(|e| VaultError::decryption(format!("utf-8 decode: {}", e)))
}

fn decode_field(value: &str, field: &str) -> VaultResult<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| VaultError::decryption(format!("bad {} encoding: {}", field, e)))
}
