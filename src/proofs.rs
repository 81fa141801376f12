//! Kani formal verification proof harnesses.
//!
//! # Running Proofs
//!
//! ```bash
//! cargo kani
//! ```
//!
//! # Properties Verified
//!
//! | Category | Property | Harness |
//! |----------|----------|---------|
//! | Expiration | Never panics | `check_expiration_never_panics` |
//! | Expiration | Expired fails | `expired_tokens_always_fail` |
//! | Expiration | Valid passes | `valid_tokens_pass_expiration` |
//! | Alphabet | Envelope bytes rejected | `envelope_bytes_never_compact` |
//! | Alphabet | Base64url bytes accepted | `base64url_bytes_always_compact` |
//! | Algorithm | Pinned algorithm accepted | `pinned_algorithm_passes` |

#![cfg(kani)]

use chrono::{TimeZone, Utc};

use crate::signature::Algorithm;
use crate::verification::{check_algorithm, check_expiration, is_compact_byte};

mod expiration_proofs {
    use super::*;

    /// Prove `check_expiration` never panics with valid timestamps.
    #[kani::proof]
    #[kani::unwind(2)]
    fn check_expiration_never_panics() {
        let exp_secs: i64 = kani::any();
        let now_secs: i64 = kani::any();

        kani::assume(exp_secs > -86400 * 365 * 100 && exp_secs < 86400 * 365 * 100);
        kani::assume(now_secs > -86400 * 365 * 100 && now_secs < 86400 * 365 * 100);

        if let (Some(exp), Some(now)) = (
            Utc.timestamp_opt(exp_secs, 0).single(),
            Utc.timestamp_opt(now_secs, 0).single(),
        ) {
            let _ = check_expiration(exp, now);
        }
    }

    /// Prove `now >= exp` always fails, including equality.
    #[kani::proof]
    #[kani::unwind(2)]
    fn expired_tokens_always_fail() {
        let exp_secs: i64 = kani::any();
        let offset: i64 = kani::any();

        kani::assume(exp_secs > 0 && exp_secs < i64::MAX / 2);
        kani::assume(offset >= 0 && offset < 86400 * 365 * 10);

        if let (Some(exp), Some(now)) = (
            Utc.timestamp_opt(exp_secs, 0).single(),
            Utc.timestamp_opt(exp_secs + offset, 0).single(),
        ) {
            assert!(check_expiration(exp, now).is_err());
        }
    }

    /// Prove `now < exp` always passes.
    #[kani::proof]
    #[kani::unwind(2)]
    fn valid_tokens_pass_expiration() {
        let exp_secs: i64 = kani::any();
        let offset: i64 = kani::any();

        kani::assume(exp_secs > 86400 * 365 * 10 && exp_secs < i64::MAX / 2);
        kani::assume(offset > 0 && offset < 86400 * 365 * 10);

        if let (Some(exp), Some(now)) = (
            Utc.timestamp_opt(exp_secs, 0).single(),
            Utc.timestamp_opt(exp_secs - offset, 0).single(),
        ) {
            assert!(check_expiration(exp, now).is_ok());
        }
    }
}

mod alphabet_proofs {
    use super::*;

    /// Prove JSON and padding syntax can never pass the alphabet check.
    #[kani::proof]
    fn envelope_bytes_never_compact() {
        let byte: u8 = kani::any();
        kani::assume(matches!(
            byte,
            b'{' | b'}' | b'[' | b']' | b'"' | b':' | b',' | b' ' | b'=' | b'+' | b'/'
        ));

        assert!(!is_compact_byte(byte));
    }

    /// Prove every base64url byte passes the alphabet check.
    #[kani::proof]
    fn base64url_bytes_always_compact() {
        let byte: u8 = kani::any();
        kani::assume(byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_');

        assert!(is_compact_byte(byte));
    }
}

mod algorithm_proofs {
    use super::*;

    /// Prove the pinned algorithm's own identifier is accepted.
    #[kani::proof]
    fn pinned_algorithm_passes() {
        let expected = Algorithm::EdDsa;
        assert!(check_algorithm(expected.as_str(), expected).is_ok());
    }
}
