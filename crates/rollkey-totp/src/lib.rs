//! # Rollkey – one-time password engine
//!
//! Pure OTP domain crate, no I/O:
//!
//! - **RFC 4226 / 6238** – HOTP & TOTP code generation with SHA-1, SHA-256, SHA-512
//! - **otpauth:// URIs** – Parsing & generation per the Google Authenticator spec
//! - **Verification** – Drift-window code checking with constant-time comparison
//! - **Injectable clock** – Every time-dependent operation takes an explicit
//!   timestamp or a [`totp::Clock`], so behaviour is deterministic under test

pub mod totp;
