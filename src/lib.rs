//! Strict compact signed tokens for HTTP authentication.
//!
//! This crate issues Ed25519-signed claim tokens and resolves them back to
//! the subject they were issued for. The decoder accepts exactly one wire
//! grammar, so a token cannot be smuggled past it inside an alternate
//! envelope.
//!
//! # Example
//!
//! ```rust
//! use compact_auth::{AuthConfig, AuthService, AuthError, KeyProvider};
//! use std::collections::BTreeMap;
//! use std::time::Duration;
//!
//! let service = AuthService::new(KeyProvider::generate(), AuthConfig::default());
//!
//! let token = service
//!     .issue("alice", Duration::from_secs(60), BTreeMap::new())
//!     .unwrap();
//! assert_eq!(service.resolve(&token).unwrap(), "alice");
//!
//! // Wrapping the token in a JSON envelope never works.
//! let wrapped = format!("{{\"token\":\"{token}\",\"sub\":\"admin\"}}");
//! assert!(matches!(
//!     service.resolve(&wrapped),
//!     Err(AuthError::MalformedToken { .. })
//! ));
//! ```
//!
//! # Token Structure
//!
//! ```text
//! base64url({"alg":"EdDSA","typ":"JWT"}) "." base64url(claims) "." base64url(signature)
//! ```
//!
//! Claims are a flat JSON object with sorted keys:
//!
//! - `sub`: subject (required)
//! - `exp`: expiry, integer seconds since the Unix epoch (required)
//! - `iat`: issued-at, integer seconds since the Unix epoch
//! - `jti`: unique token identifier
//! - any custom string, integer, float or boolean claims
//!
//! # Security Properties
//!
//! | Property | How Achieved |
//! |----------|--------------|
//! | No serialization confusion | Single grammar; any non-base64url byte is rejected |
//! | No algorithm confusion | Header `alg` pinned before any signature math |
//! | Tamper detection | Ed25519 strict verification over the original segments |
//! | Unambiguous claims | Duplicate keys and non-canonical JSON rejected |
//! | Bounded lifetime | `exp` checked with `now >= exp` meaning expired |
//!
//! Revocation lists and not-before checks are not provided.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod claims;
pub mod codec;
mod config;
mod credentials;
mod error;
mod guard;
mod keys;
#[cfg(kani)]
mod proofs;
mod service;
mod signature;
mod verification;

pub use claims::{
    ClaimSet, ClaimSetBuilder, ClaimValue, EXPIRY_CLAIM, ISSUED_AT_CLAIM, RESERVED_CLAIMS,
    SUBJECT_CLAIM, TOKEN_ID_CLAIM,
};
pub use codec::{Header, MAX_TOKEN_LENGTH};
pub use config::AuthConfig;
pub use credentials::{CredentialStore, InMemoryCredentialStore};
pub use error::AuthError;
pub use guard::{Guard, Principal, Rejection, TOKEN_QUERY_PARAM, bearer_token, query_token};
pub use keys::{KeyProvider, VerifyingKey};
pub use service::AuthService;
pub use signature::{Algorithm, SIGNATURE_LENGTH, sign, verify};
pub use verification::{check_algorithm, check_expiration, is_compact_alphabet, is_compact_byte};

/// A prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use compact_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Algorithm, AuthConfig, AuthError, AuthService, ClaimSet, ClaimValue, CredentialStore,
        Guard, InMemoryCredentialStore, KeyProvider, Principal, Rejection, VerifyingKey,
    };
}
