//! Code generation — RFC 4226 (HOTP) and RFC 6238 (TOTP).
//!
//! Deterministic, stateless functions of (secret, time). Every public
//! operation has a `*_at` form taking an explicit unix timestamp; the
//! clock-taking wrappers exist for callers that hold a [`Clock`].

use crate::totp::clock::Clock;
use crate::totp::types::*;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Secret handling
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Decode a base-32 secret into raw key bytes.
///
/// Case-insensitive and tolerant of missing padding and space/dash
/// separators. Decoding happens at generation time, never at parse time, so
/// a bad secret fails here with [`GenerateError::InvalidSecret`].
pub fn decode_secret(secret: &str) -> Result<Vec<u8>, GenerateError> {
    let cleaned = normalise_secret(secret);
    if cleaned.is_empty() {
        return Err(GenerateError::InvalidSecret("secret is empty".into()));
    }

    let padded = pad_base32(&cleaned);
    let key = base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &padded)
        .or_else(|| base32::decode(base32::Alphabet::Rfc4648 { padding: false }, &cleaned))
        .ok_or_else(|| GenerateError::InvalidSecret("not valid base-32".into()))?;

    if key.is_empty() {
        return Err(GenerateError::InvalidSecret("secret decodes to no key bytes".into()));
    }
    Ok(key)
}

/// Encode raw key bytes to base-32 (uppercase, no padding).
pub fn encode_secret(bytes: &[u8]) -> String {
    base32::encode(base32::Alphabet::Rfc4648 { padding: false }, bytes)
}

/// Generate a cryptographically random base-32 secret.
pub fn generate_secret(byte_length: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut buf);
    encode_secret(&buf)
}

fn pad_base32(s: &str) -> String {
    match s.len() % 8 {
        0 => s.to_string(),
        r => format!("{}{}", s, "=".repeat(8 - r)),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HMAC-OTP primitive (RFC 4226 §5.3)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute an HOTP code for raw key bytes and a counter value.
pub fn hotp_raw(key: &[u8], counter: u64, digits: u8, algorithm: Algorithm) -> String {
    let digest = compute_hmac(key, &counter.to_be_bytes(), algorithm);
    truncate(&digest, digits)
}

fn compute_hmac(key: &[u8], message: &[u8], algorithm: Algorithm) -> Vec<u8> {
    match algorithm {
        Algorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
        Algorithm::Sha512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key).expect("HMAC accepts any key length");
            mac.update(message);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Dynamic truncation: the low nibble of the final digest byte selects a
/// 4-byte window, read big-endian with the sign bit masked off.
fn truncate(digest: &[u8], digits: u8) -> String {
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    let code = binary % 10u32.pow(u32::from(digits));
    format!("{:0>width$}", code, width = digits as usize)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Time-step math (RFC 6238)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The time-step counter for a unix timestamp.
pub fn time_step_at(unix_seconds: u64, period: u32) -> u64 {
    unix_seconds / u64::from(period.max(1))
}

/// Seconds until the current step expires, in `[1, period]`.
///
/// A step boundary reports the full period rather than 0: the boundary means
/// a fresh counter, and the next poll computes the new code.
pub fn seconds_remaining_at(unix_seconds: u64, period: u32) -> u32 {
    let p = u64::from(period.max(1));
    (p - (unix_seconds % p)) as u32
}

/// Fraction of the current period already elapsed (0.0 = fresh code).
pub fn progress_at(unix_seconds: u64, period: u32) -> f64 {
    let p = u64::from(period.max(1));
    (unix_seconds % p) as f64 / p as f64
}

/// Seconds until rotation, read off the supplied clock.
pub fn seconds_remaining(period: u32, clock: &dyn Clock) -> u32 {
    seconds_remaining_at(clock.now_unix(), period)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TOTP generation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Generate a TOTP code from a base-32 secret at an explicit timestamp.
pub fn generate_totp_at(
    secret: &str,
    digits: u8,
    period: u32,
    algorithm: Algorithm,
    unix_seconds: u64,
) -> Result<String, GenerateError> {
    let key = decode_secret(secret)?;
    Ok(hotp_raw(&key, time_step_at(unix_seconds, period), digits, algorithm))
}

/// Compute the current code and timing for a credential at a timestamp.
pub fn current_code_at(
    credential: &Credential,
    unix_seconds: u64,
) -> Result<GeneratedCode, GenerateError> {
    if credential.otp_type != OtpType::Totp {
        return Err(GenerateError::UnsupportedAlgorithm(format!(
            "{} credentials cannot be generated, only totp",
            credential.otp_type
        )));
    }

    let key = decode_secret(&credential.secret)?;
    let step = time_step_at(unix_seconds, credential.period);
    Ok(GeneratedCode {
        code: hotp_raw(&key, step, credential.digits, credential.algorithm),
        remaining_seconds: seconds_remaining_at(unix_seconds, credential.period),
        period: credential.period,
        progress: progress_at(unix_seconds, credential.period),
        counter: step,
        credential_id: credential.id.clone(),
    })
}

/// Compute the current code for a credential, reading the supplied clock.
pub fn current_code(
    credential: &Credential,
    clock: &dyn Clock,
) -> Result<GeneratedCode, GenerateError> {
    current_code_at(credential, clock.now_unix())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Verification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Verify a user-supplied code against a credential at a timestamp.
///
/// `drift_window` is the number of time steps checked on either side of the
/// current one, to absorb client clock skew. A malformed candidate (wrong
/// length, non-digits) is simply invalid, not an error.
pub fn verify_at(
    credential: &Credential,
    candidate: &str,
    drift_window: u32,
    unix_seconds: u64,
) -> Result<VerifyOutcome, GenerateError> {
    if credential.otp_type != OtpType::Totp {
        return Err(GenerateError::UnsupportedAlgorithm(format!(
            "{} credentials cannot be verified, only totp",
            credential.otp_type
        )));
    }

    // Length is not sensitive; fail fast before touching the key.
    if candidate.len() != credential.digits as usize
        || !candidate.chars().all(|c| c.is_ascii_digit())
    {
        return Ok(VerifyOutcome { valid: false, drift: 0 });
    }

    let key = decode_secret(&credential.secret)?;
    let step = time_step_at(unix_seconds, credential.period);
    let start = step.saturating_sub(u64::from(drift_window));
    let end = step + u64::from(drift_window);

    for counter in start..=end {
        let expected = hotp_raw(&key, counter, credential.digits, credential.algorithm);
        if constant_time_eq(expected.as_bytes(), candidate.as_bytes()) {
            return Ok(VerifyOutcome {
                valid: true,
                drift: counter as i64 - step as i64,
            });
        }
    }

    Ok(VerifyOutcome { valid: false, drift: 0 })
}

/// Verify against the supplied clock.
pub fn verify(
    credential: &Credential,
    candidate: &str,
    drift_window: u32,
    clock: &dyn Clock,
) -> Result<VerifyOutcome, GenerateError> {
    verify_at(credential, candidate, drift_window, clock.now_unix())
}

/// Constant-time comparison, so verification does not leak match prefixes.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
