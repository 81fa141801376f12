//! Pure verification functions.
//!
//! These functions hold the decision logic of token acceptance with no I/O
//! and no clock access, so they can be unit tested directly and checked by
//! Kani.
//!
//! # Security Properties
//!
//! | Function | Property Verified |
//! |----------|-------------------|
//! | [`check_expiration`] | Current time is strictly less than expiration |
//! | [`check_algorithm`] | Header algorithm equals the pinned algorithm (exact match) |
//! | [`is_compact_alphabet`] | Input holds only base64url characters and `.` |

use chrono::{DateTime, Utc};

use crate::error::AuthError;
use crate::signature::Algorithm;

/// Pure function: checks if a token has expired at a given time.
///
/// A token whose expiry equals `now` is already expired.
///
/// # Errors
///
/// Returns `AuthError::Expired` if `now >= exp`.
///
/// # Examples
///
/// ```
/// use chrono::{Utc, Duration};
/// use compact_auth::check_expiration;
///
/// let now = Utc::now();
///
/// assert!(check_expiration(now + Duration::seconds(1), now).is_ok());
/// assert!(check_expiration(now - Duration::seconds(1), now).is_err());
/// assert!(check_expiration(now, now).is_err());
/// ```
pub fn check_expiration(exp: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), AuthError> {
    if now < exp {
        Ok(())
    } else {
        Err(AuthError::Expired {
            expired_at: exp.to_rfc3339(),
        })
    }
}

/// Pure function: checks that the header algorithm is the pinned one.
///
/// Comparison is exact and case-sensitive.
///
/// # Errors
///
/// Returns `AuthError::AlgorithmMismatch` if `header_alg` differs from
/// `expected`.
///
/// # Examples
///
/// ```
/// use compact_auth::{check_algorithm, Algorithm};
///
/// assert!(check_algorithm("EdDSA", Algorithm::EdDsa).is_ok());
/// assert!(check_algorithm("none", Algorithm::EdDsa).is_err());
/// assert!(check_algorithm("eddsa", Algorithm::EdDsa).is_err());
/// ```
pub fn check_algorithm(header_alg: &str, expected: Algorithm) -> Result<(), AuthError> {
    if header_alg == expected.as_str() {
        Ok(())
    } else {
        Err(AuthError::AlgorithmMismatch {
            found: header_alg.to_string(),
            expected: expected.as_str(),
        })
    }
}

/// Pure function: returns true if `byte` may appear in a compact token.
#[must_use]
pub const fn is_compact_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte == b'.'
}

/// Pure function: returns true if every byte of `input` is base64url or `.`.
///
/// Any envelope syntax (braces, quotes, colons, whitespace, padding) makes
/// this false.
///
/// # Examples
///
/// ```
/// use compact_auth::is_compact_alphabet;
///
/// assert!(is_compact_alphabet("eyJh.eyJz.c2ln"));
/// assert!(!is_compact_alphabet("{\"  eyJh.eyJz.\":\"\"}"));
/// assert!(!is_compact_alphabet("eyJh.eyJz.c2ln=="));
/// ```
#[must_use]
pub fn is_compact_alphabet(input: &str) -> bool {
    input.bytes().all(is_compact_byte)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn expiration_boundary_is_exclusive() {
        let now = Utc::now();

        assert!(check_expiration(now + Duration::seconds(1), now).is_ok());
        assert!(matches!(
            check_expiration(now, now),
            Err(AuthError::Expired { .. })
        ));
        assert!(matches!(
            check_expiration(now - Duration::seconds(1), now),
            Err(AuthError::Expired { .. })
        ));
    }

    #[test]
    fn expired_error_reports_rfc3339_time() {
        let now = Utc::now();
        let exp = now - Duration::hours(1);

        let Err(AuthError::Expired { expired_at }) = check_expiration(exp, now) else {
            panic!("expected Expired");
        };
        assert_eq!(expired_at, exp.to_rfc3339());
    }

    #[test]
    fn algorithm_must_match_exactly() {
        assert!(check_algorithm("EdDSA", Algorithm::EdDsa).is_ok());

        for alg in ["none", "HS256", "RS256", "PS256", "EDDSA", "EdDSA ", ""] {
            let result = check_algorithm(alg, Algorithm::EdDsa);
            assert_eq!(
                result,
                Err(AuthError::AlgorithmMismatch {
                    found: alg.to_string(),
                    expected: "EdDSA",
                }),
                "algorithm {alg:?} must be rejected"
            );
        }
    }

    #[test]
    fn compact_alphabet_accepts_base64url() {
        assert!(is_compact_alphabet(
            "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_."
        ));
    }

    #[test]
    fn compact_alphabet_rejects_envelope_characters() {
        for c in ['{', '}', '"', ':', ',', ' ', '\n', '\t', '=', '+', '/', '[', ']'] {
            let input = format!("abc.d{c}f.ghi");
            assert!(!is_compact_alphabet(&input), "{c:?} must be rejected");
        }
    }

    #[test]
    fn compact_alphabet_rejects_non_ascii() {
        assert!(!is_compact_alphabet("abc.déf.ghi"));
    }
}
