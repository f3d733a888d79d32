//! Core types for the OTP engine and credential model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Issuer recorded when the enrolment URI carries no `issuer` parameter.
pub const UNKNOWN_ISSUER: &str = "Unknown";
/// Account name recorded when the URI label decodes to nothing usable.
pub const FALLBACK_NAME: &str = "Account";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Algorithm
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash algorithm used for HMAC-based OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Algorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::Sha1
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "SHA1"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha512 => write!(f, "SHA512"),
        }
    }
}

impl Algorithm {
    /// Parse from a case-insensitive string, tolerating the spellings that
    /// show up in enrolment URIs in the wild.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "SHA1" | "SHA-1" | "HMACSHA1" | "HMAC-SHA1" => Some(Self::Sha1),
            "SHA256" | "SHA-256" | "HMACSHA256" | "HMAC-SHA256" => Some(Self::Sha256),
            "SHA512" | "SHA-512" | "HMACSHA512" | "HMAC-SHA512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OTP type
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Whether a credential is time-based or counter-based.
///
/// Counter-based (`hotp`) credentials are recognised and carried through the
/// model, but code generation rejects them; only `totp` is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    Totp,
    Hotp,
}

impl Default for OtpType {
    fn default() -> Self {
        Self::Totp
    }
}

impl fmt::Display for OtpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Totp => write!(f, "totp"),
            Self::Hotp => write!(f, "hotp"),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Credential
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn default_digits() -> u8 {
    6
}

fn default_period() -> u32 {
    30
}

/// A stored credential: the persisted entity of the vault.
///
/// The serde layout keeps the historical record readable: `id`, `name`,
/// `issuer`, `secret` and `type` are the original field set, while
/// `algorithm`, `digits` and `period` default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Unique identifier, assigned by the store at insertion.
    pub id: String,
    /// Display label for the account (derived from the URI label).
    pub name: String,
    /// Display label for the issuing service; [`UNKNOWN_ISSUER`] when the
    /// URI carried none.
    pub issuer: String,
    /// Base-32 encoded shared secret, stored as received.
    pub secret: String,
    /// Time-based or counter-based.
    #[serde(rename = "type", default)]
    pub otp_type: OtpType,
    /// HMAC hash algorithm.
    #[serde(default)]
    pub algorithm: Algorithm,
    /// Number of digits in the generated code.
    #[serde(default = "default_digits")]
    pub digits: u8,
    /// Rotation interval in seconds.
    #[serde(default = "default_period")]
    pub period: u32,
}

impl Credential {
    /// Display name: "Issuer (name)", or just the name when the issuer is
    /// the unknown sentinel.
    pub fn display_name(&self) -> String {
        if self.issuer.is_empty() || self.issuer == UNKNOWN_ISSUER {
            self.name.clone()
        } else {
            format!("{} ({})", self.issuer, self.name)
        }
    }

    /// Normalise the secret for decoding and comparison (uppercase, no
    /// spaces or dashes).
    pub fn normalised_secret(&self) -> String {
        normalise_secret(&self.secret)
    }
}

/// Normalise a base-32 secret string (uppercase, separators stripped).
pub fn normalise_secret(secret: &str) -> String {
    secret.replace(' ', "").replace('-', "").to_uppercase()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Credential draft
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parser output: a credential that has not been admitted to the store yet
/// and therefore has no id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialDraft {
    pub name: String,
    pub issuer: String,
    pub secret: String,
    #[serde(rename = "type", default)]
    pub otp_type: OtpType,
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default = "default_digits")]
    pub digits: u8,
    #[serde(default = "default_period")]
    pub period: u32,
}

impl CredentialDraft {
    /// Create a minimal time-based draft with defaults.
    pub fn new(name: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            issuer: UNKNOWN_ISSUER.to_string(),
            secret: secret.into(),
            otp_type: OtpType::Totp,
            algorithm: Algorithm::default(),
            digits: default_digits(),
            period: default_period(),
        }
    }

    /// Builder: set issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Builder: set algorithm.
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Builder: set digit count.
    pub fn with_digits(mut self, digits: u8) -> Self {
        self.digits = digits;
        self
    }

    /// Builder: set rotation period.
    pub fn with_period(mut self, period: u32) -> Self {
        self.period = period;
        self
    }

    /// Builder: mark as counter-based.
    pub fn as_hotp(mut self) -> Self {
        self.otp_type = OtpType::Hotp;
        self
    }

    /// Normalised secret, as for [`Credential::normalised_secret`].
    pub fn normalised_secret(&self) -> String {
        normalise_secret(&self.secret)
    }

    /// Promote to a stored [`Credential`] under the given id.
    pub fn into_credential(self, id: impl Into<String>) -> Credential {
        Credential {
            id: id.into(),
            name: self.name,
            issuer: self.issuer,
            secret: self.secret,
            otp_type: self.otp_type,
            algorithm: self.algorithm,
            digits: self.digits,
            period: self.period,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generated code
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A generated OTP code with the timing the display collaborator polls for.
/// Ephemeral: recomputed on every request, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// The code string (e.g. "123456"), zero-padded to `digits` characters.
    pub code: String,
    /// Seconds until the code rotates, in `[1, period]`.
    pub remaining_seconds: u32,
    /// Rotation period in seconds.
    pub period: u32,
    /// Fraction of the period already elapsed, 0.0–1.0.
    pub progress: f64,
    /// The time step the code was computed for.
    pub counter: u64,
    /// Credential this code belongs to.
    pub credential_id: String,
}

/// Result of checking a user-supplied code against a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutcome {
    pub valid: bool,
    /// Signed distance in time steps from the current step (0 = exact).
    pub drift: i64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Failure while parsing an enrolment URI. All variants are detected
/// synchronously and are recoverable at the scan boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseError {
    /// Input does not begin with `otpauth://`.
    UnsupportedScheme,
    /// No usable `secret` query parameter.
    MissingSecret,
    /// Structurally broken URI, or an unrecognised OTP type.
    MalformedUri(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedScheme => write!(f, "not an otpauth:// URI"),
            Self::MissingSecret => write!(f, "URI carries no secret"),
            Self::MalformedUri(detail) => write!(f, "malformed otpauth URI: {}", detail),
        }
    }
}

impl std::error::Error for ParseError {}

/// Failure while generating or verifying a code. Surfaced per credential:
/// one credential failing never blocks the rest of the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerateError {
    /// The stored secret does not decode to usable key bytes.
    InvalidSecret(String),
    /// The credential's OTP mode or hash cannot be computed here.
    UnsupportedAlgorithm(String),
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSecret(detail) => write!(f, "invalid secret: {}", detail),
            Self::UnsupportedAlgorithm(detail) => write!(f, "unsupported algorithm: {}", detail),
        }
    }
}

impl std::error::Error for GenerateError {}
