//! Error types for token issuance and verification.

use std::fmt;

/// Errors that can occur while issuing or resolving tokens.
///
/// Every failure is terminal. Nothing in this crate retries a verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The TTL is shorter than one second or out of the timestamp range.
    InvalidTtl,
    /// A claim supplied at issuance is not acceptable.
    InvalidClaim {
        /// Name of the offending claim
        name: String,
        /// Why the claim was refused
        reason: &'static str,
    },
    /// The token does not follow the compact grammar.
    MalformedToken {
        /// Description of the structural violation
        reason: String,
    },
    /// The header names an algorithm other than the configured one.
    AlgorithmMismatch {
        /// Algorithm named by the token header
        found: String,
        /// Algorithm the verifier is pinned to
        expected: &'static str,
    },
    /// Signature verification failed.
    SignatureInvalid,
    /// Token has expired.
    Expired {
        /// When the token expired
        expired_at: String,
    },
    /// The credential store refused the username/password pair.
    CredentialRejected,
    /// Key bytes are not a valid Ed25519 key.
    InvalidKeyFormat {
        /// Description of the key error
        reason: String,
    },
}

impl AuthError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    /// Returns true for failures caused by the presented token.
    ///
    /// HTTP glue should collapse all of these into a single opaque
    /// "token invalid" response so that callers cannot tell which stage
    /// rejected the token.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken { .. }
                | Self::AlgorithmMismatch { .. }
                | Self::SignatureInvalid
                | Self::Expired { .. }
        )
    }

    /// Returns true for failures caused by the presented username/password.
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        matches!(self, Self::CredentialRejected)
    }

    /// Short stable identifier for structured logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidTtl => "invalid_ttl",
            Self::InvalidClaim { .. } => "invalid_claim",
            Self::MalformedToken { .. } => "malformed_token",
            Self::AlgorithmMismatch { .. } => "algorithm_mismatch",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired { .. } => "expired",
            Self::CredentialRejected => "credential_rejected",
            Self::InvalidKeyFormat { .. } => "invalid_key_format",
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTtl => {
                write!(f, "TTL must be at least one second and within the timestamp range")
            }
            Self::InvalidClaim { name, reason } => {
                write!(f, "claim '{name}' rejected: {reason}")
            }
            Self::MalformedToken { reason } => {
                write!(f, "malformed token: {reason}")
            }
            Self::AlgorithmMismatch { found, expected } => {
                write!(
                    f,
                    "token algorithm '{found}' does not match the pinned algorithm '{expected}'"
                )
            }
            Self::SignatureInvalid => {
                write!(
                    f,
                    "token signature verification failed; token may have been tampered with"
                )
            }
            Self::Expired { expired_at } => {
                write!(f, "token expired at {expired_at}; request a new token")
            }
            Self::CredentialRejected => {
                write!(f, "username or password rejected")
            }
            Self::InvalidKeyFormat { reason } => {
                write!(f, "invalid key format: {reason}")
            }
        }
    }
}

impl std::error::Error for AuthError {}
