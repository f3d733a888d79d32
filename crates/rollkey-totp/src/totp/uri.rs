//! `otpauth://` enrolment URI parsing and generation, per the Google
//! Authenticator key-URI format:
//! <https://github.com/google/google-authenticator/wiki/Key-Uri-Format>
//!
//! Shape: `otpauth://totp/ISSUER:NAME?secret=BASE32&issuer=ISSUER`
//! with optional `algorithm=`, `digits=` and `period=` parameters.

use crate::totp::types::*;
use log::warn;

const SCHEME_PREFIX: &str = "otpauth://";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Parse
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse decoded scan text into a [`CredentialDraft`].
///
/// Anything that does not begin with the literal `otpauth://` prefix is
/// rejected outright; no partial parsing is attempted. The secret is not
/// base-32 validated here; an unusable secret fails at generation time.
pub fn parse(input: &str) -> Result<CredentialDraft, ParseError> {
    let input = input.trim();
    if !input.starts_with(SCHEME_PREFIX) {
        return Err(ParseError::UnsupportedScheme);
    }

    let url = url::Url::parse(input).map_err(|e| ParseError::MalformedUri(e.to_string()))?;

    let otp_type = match url.host_str().map(|h| h.to_ascii_lowercase()).as_deref() {
        Some("totp") => OtpType::Totp,
        Some("hotp") => OtpType::Hotp,
        other => {
            return Err(ParseError::MalformedUri(format!(
                "unknown OTP type {:?}",
                other.unwrap_or("")
            )))
        }
    };

    // Path is "/NAME" or "/ISSUER:NAME"; only the part after the first
    // colon names the account, the prefix is informative.
    let path = url.path();
    let label = percent_decode(path.strip_prefix('/').unwrap_or(path));
    let name = match label.find(':') {
        Some(pos) => label[pos + 1..].trim(),
        None => label.trim(),
    };
    let name = if name.is_empty() { FALLBACK_NAME } else { name };

    let mut secret: Option<String> = None;
    let mut issuer: Option<String> = None;
    let mut algorithm = Algorithm::default();
    let mut digits = 6u8;
    let mut period = 30u32;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "secret" => {
                if !value.trim().is_empty() {
                    secret = Some(value.to_string());
                }
            }
            "issuer" => {
                if !value.trim().is_empty() {
                    issuer = Some(value.to_string());
                }
            }
            "algorithm" => match Algorithm::from_str_loose(&value) {
                Some(algo) => algorithm = algo,
                None => warn!("unrecognised OTP algorithm '{}', keeping SHA1", value),
            },
            "digits" => {
                if let Ok(d) = value.parse::<u8>() {
                    if (6..=8).contains(&d) {
                        digits = d;
                    }
                }
            }
            "period" => {
                if let Ok(p) = value.parse::<u32>() {
                    if p > 0 {
                        period = p;
                    }
                }
            }
            _ => {} // ignore unknown params (incl. hotp's counter)
        }
    }

    let secret = secret.ok_or(ParseError::MissingSecret)?;

    let mut draft = CredentialDraft::new(name, secret)
        .with_algorithm(algorithm)
        .with_digits(digits)
        .with_period(period);
    draft.otp_type = otp_type;
    if let Some(issuer) = issuer {
        draft = draft.with_issuer(issuer);
    }

    Ok(draft)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Generate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Render a stored credential back into an `otpauth://` URI.
///
/// Default algorithm/digits/period are omitted, as is the issuer when it is
/// the unknown sentinel.
pub fn build_otpauth_uri(credential: &Credential) -> String {
    let name = percent_encode(&credential.name);
    let has_issuer =
        !credential.issuer.is_empty() && credential.issuer != UNKNOWN_ISSUER;

    let path = if has_issuer {
        format!("{}:{}", percent_encode(&credential.issuer), name)
    } else {
        name
    };

    let mut params = vec![format!("secret={}", credential.normalised_secret())];
    if has_issuer {
        params.push(format!("issuer={}", percent_encode(&credential.issuer)));
    }
    if credential.algorithm != Algorithm::Sha1 {
        params.push(format!("algorithm={}", credential.algorithm));
    }
    if credential.digits != 6 {
        params.push(format!("digits={}", credential.digits));
    }
    if credential.period != 30 {
        params.push(format!("period={}", credential.period));
    }

    format!("otpauth://{}/{}?{}", credential.otp_type, path, params.join("&"))
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Percent-encoding helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn percent_decode(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let mut iter = s.bytes();
    while let Some(b) = iter.next() {
        match b {
            b'%' => {
                let hi = iter.next();
                let lo = iter.next();
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        let hex = [hi, lo];
                        match u8::from_str_radix(std::str::from_utf8(&hex).unwrap_or(""), 16) {
                            Ok(byte) => bytes.push(byte),
                            Err(_) => {
                                bytes.push(b'%');
                                bytes.extend_from_slice(&hex);
                            }
                        }
                    }
                    _ => bytes.push(b'%'),
                }
            }
            b'+' => bytes.push(b' '),
            _ => bytes.push(b),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Basic TOTP parsing ───────────────────────────────────────

    #[test]
    fn parse_issuer_prefixed_label() {
        let draft =
            parse("otpauth://totp/ACME:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=ACME")
                .unwrap();
        assert_eq!(draft.name, "alice@example.com");
        assert_eq!(draft.issuer, "ACME");
        assert_eq!(draft.secret, "JBSWY3DPEHPK3PXP");
        assert_eq!(draft.otp_type, OtpType::Totp);
        assert_eq!(draft.algorithm, Algorithm::Sha1);
        assert_eq!(draft.digits, 6);
        assert_eq!(draft.period, 30);
    }

    #[test]
    fn parse_plain_label() {
        let draft = parse("otpauth://totp/myaccount?secret=ABCDEFGH").unwrap();
        assert_eq!(draft.name, "myaccount");
        assert_eq!(draft.issuer, UNKNOWN_ISSUER);
    }

    #[test]
    fn parse_name_is_everything_after_first_colon() {
        let draft = parse("otpauth://totp/Corp:mail:backup?secret=AAAA").unwrap();
        assert_eq!(draft.name, "mail:backup");
    }

    #[test]
    fn parse_empty_name_falls_back() {
        let draft = parse("otpauth://totp/ACME:?secret=AAAA").unwrap();
        assert_eq!(draft.name, FALLBACK_NAME);
        let draft = parse("otpauth://totp/?secret=AAAA").unwrap();
        assert_eq!(draft.name, FALLBACK_NAME);
    }

    #[test]
    fn parse_percent_decodes_label() {
        let draft =
            parse("otpauth://totp/My%20Corp:my%20user?secret=AAAA&issuer=My%20Corp").unwrap();
        assert_eq!(draft.name, "my user");
        assert_eq!(draft.issuer, "My Corp");
    }

    #[test]
    fn parse_issuer_defaults_when_param_absent() {
        // The path prefix is informative only; the parameter is the source.
        let draft = parse("otpauth://totp/ACME:alice?secret=AAAA").unwrap();
        assert_eq!(draft.issuer, UNKNOWN_ISSUER);
        assert_eq!(draft.name, "alice");
    }

    // ── Optional parameters ──────────────────────────────────────

    #[test]
    fn parse_all_parameters() {
        let draft = parse(
            "otpauth://totp/GitHub:user?secret=ABC&algorithm=SHA256&digits=8&period=60&issuer=GitHub",
        )
        .unwrap();
        assert_eq!(draft.algorithm, Algorithm::Sha256);
        assert_eq!(draft.digits, 8);
        assert_eq!(draft.period, 60);
        assert_eq!(draft.issuer, "GitHub");
    }

    #[test]
    fn parse_ignores_out_of_range_parameters() {
        let draft =
            parse("otpauth://totp/u?secret=ABC&digits=12&period=0&algorithm=MD5").unwrap();
        assert_eq!(draft.digits, 6);
        assert_eq!(draft.period, 30);
        assert_eq!(draft.algorithm, Algorithm::Sha1);
    }

    #[test]
    fn parse_hotp_is_recognised() {
        let draft = parse("otpauth://hotp/Label?secret=JBSWY3DPEHPK3PXP&counter=42").unwrap();
        assert_eq!(draft.otp_type, OtpType::Hotp);
        assert_eq!(draft.name, "Label");
    }

    // ── Rejections ───────────────────────────────────────────────

    #[test]
    fn parse_rejects_foreign_schemes() {
        assert_eq!(
            parse("https://example.com/?secret=AAAA"),
            Err(ParseError::UnsupportedScheme)
        );
        assert_eq!(parse("not a uri at all"), Err(ParseError::UnsupportedScheme));
        assert_eq!(parse(""), Err(ParseError::UnsupportedScheme));
    }

    #[test]
    fn parse_rejects_missing_or_empty_secret() {
        assert_eq!(
            parse("otpauth://totp/Test?issuer=X"),
            Err(ParseError::MissingSecret)
        );
        assert_eq!(
            parse("otpauth://totp/Test?secret="),
            Err(ParseError::MissingSecret)
        );
    }

    #[test]
    fn parse_rejects_unknown_otp_type() {
        assert!(matches!(
            parse("otpauth://steam/Test?secret=AAAA"),
            Err(ParseError::MalformedUri(_))
        ));
    }

    // ── Generation ───────────────────────────────────────────────

    #[test]
    fn build_basic_uri() {
        let cred = CredentialDraft::new("alice@example.com", "JBSWY3DPEHPK3PXP")
            .with_issuer("Example")
            .into_credential("1");
        let uri = build_otpauth_uri(&cred);
        assert!(uri.starts_with("otpauth://totp/Example:alice%40example.com?"));
        assert!(uri.contains("secret=JBSWY3DPEHPK3PXP"));
        assert!(uri.contains("issuer=Example"));
    }

    #[test]
    fn build_omits_defaults_and_unknown_issuer() {
        let cred = CredentialDraft::new("user", "ABCDEF").into_credential("1");
        let uri = build_otpauth_uri(&cred);
        assert_eq!(uri, "otpauth://totp/user?secret=ABCDEF");
    }

    #[test]
    fn build_emits_non_default_parameters() {
        let cred = CredentialDraft::new("user", "ABCDEF")
            .with_issuer("Acme")
            .with_algorithm(Algorithm::Sha512)
            .with_digits(8)
            .with_period(60)
            .into_credential("1");
        let uri = build_otpauth_uri(&cred);
        assert!(uri.contains("algorithm=SHA512"));
        assert!(uri.contains("digits=8"));
        assert!(uri.contains("period=60"));
    }

    #[test]
    fn parse_build_roundtrip() {
        let original =
            "otpauth://totp/GitHub:user%40mail.com?secret=JBSWY3DPEHPK3PXP&issuer=GitHub&algorithm=SHA256&digits=8&period=60";
        let draft = parse(original).unwrap();
        let rebuilt = build_otpauth_uri(&draft.clone().into_credential("x"));
        let reparsed = parse(&rebuilt).unwrap();
        assert_eq!(reparsed, draft);
    }

    // ── Percent helpers ──────────────────────────────────────────

    #[test]
    fn percent_encode_decode() {
        assert_eq!(percent_encode("a@b c"), "a%40b%20c");
        assert_eq!(percent_decode("a%40b%20c"), "a@b c");
        assert_eq!(percent_decode("plus+joined"), "plus joined");
        // Multi-byte UTF-8 survives the round trip.
        assert_eq!(percent_decode(&percent_encode("café")), "café");
    }

    #[test]
    fn percent_decode_tolerates_broken_escapes() {
        assert_eq!(percent_decode("50%"), "50%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }
}
