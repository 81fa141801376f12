//! Signing and fail-closed signature verification.
//!
//! Only one algorithm exists. The verifier is pinned to it and checks the
//! header's algorithm identifier before any signature math runs, so a
//! token naming `none`, `HS256` or any other algorithm can never reach the
//! Ed25519 code path.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Signer};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::keys::{KeyProvider, VerifyingKey};
use crate::verification::check_algorithm;

/// Length in bytes of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Signature algorithms this crate can pin a verifier to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// Ed25519 signatures (RFC 8037 `EdDSA`).
    #[default]
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl Algorithm {
    /// Returns the identifier written to the token header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EdDsa => "EdDSA",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EdDSA" => Ok(Self::EdDsa),
            other => Err(AuthError::AlgorithmMismatch {
                found: other.to_string(),
                expected: Self::EdDsa.as_str(),
            }),
        }
    }
}

/// Signs `message` with the provider's private key.
#[must_use]
pub fn sign(message: &[u8], key: &KeyProvider) -> [u8; SIGNATURE_LENGTH] {
    key.as_dalek().sign(message).to_bytes()
}

/// Verifies `signature` over `message`.
///
/// `header_alg` is the algorithm named by the token; it must equal
/// `expected` or the call fails before the signature is even parsed.
///
/// # Errors
///
/// - `AlgorithmMismatch` if `header_alg` is not `expected`
/// - `SignatureInvalid` if the signature has the wrong length or does not
///   verify under strict Ed25519 rules
pub fn verify(
    message: &[u8],
    signature: &[u8],
    key: &VerifyingKey,
    header_alg: &str,
    expected: Algorithm,
) -> Result<(), AuthError> {
    check_algorithm(header_alg, expected)?;

    let signature = Signature::from_slice(signature).map_err(|_| AuthError::SignatureInvalid)?;

    key.as_dalek()
        .verify_strict(message, &signature)
        .map_err(|_| AuthError::SignatureInvalid)
}
