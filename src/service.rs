//! The issue/resolve facade.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::claims::{ClaimSet, ClaimValue};
use crate::codec;
use crate::config::AuthConfig;
use crate::credentials::CredentialStore;
use crate::error::AuthError;
use crate::keys::{KeyProvider, VerifyingKey};

/// Issues tokens and resolves them back to subjects.
///
/// Holds only immutable state, so one instance can be cloned into every
/// request handler and used concurrently without locking.
///
/// Resolution runs the stages `Received → StructurallyParsed →
/// SignatureVerified → ClaimsValidated → Accepted`. A failure at any stage
/// yields exactly one [`AuthError`] and no claims.
///
/// # Example
///
/// ```
/// use compact_auth::{AuthConfig, AuthService, KeyProvider};
/// use std::collections::BTreeMap;
/// use std::time::Duration;
///
/// let service = AuthService::new(KeyProvider::generate(), AuthConfig::default());
///
/// let token = service
///     .issue("alice", Duration::from_secs(60), BTreeMap::new())
///     .unwrap();
///
/// assert_eq!(service.resolve(&token).unwrap(), "alice");
/// ```
#[derive(Debug, Clone)]
pub struct AuthService {
    keys: Arc<KeyProvider>,
    public_key: VerifyingKey,
    config: AuthConfig,
}

impl AuthService {
    /// Creates a service around an existing keypair.
    #[must_use]
    pub fn new(keys: KeyProvider, config: AuthConfig) -> Self {
        let public_key = keys.public_key();
        Self {
            keys: Arc::new(keys),
            public_key,
            config,
        }
    }

    /// Creates a service with a freshly generated keypair.
    #[must_use]
    pub fn generate(config: AuthConfig) -> Self {
        Self::new(KeyProvider::generate(), config)
    }

    /// Returns the verifying key.
    #[must_use]
    pub fn public_key(&self) -> &VerifyingKey {
        &self.public_key
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Issues a token for `subject` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// - `InvalidTtl` if `ttl` is under one second
    /// - `InvalidClaim` if the subject is empty or a custom claim is invalid
    pub fn issue(
        &self,
        subject: &str,
        ttl: Duration,
        extra_claims: BTreeMap<String, ClaimValue>,
    ) -> Result<String, AuthError> {
        let claims = ClaimSet::build(subject, ttl, extra_claims)?;
        self.issue_claims(&claims)
    }

    /// Issues a token for `subject` with the configured default TTL.
    ///
    /// # Errors
    ///
    /// See [`AuthService::issue`].
    pub fn issue_default(&self, subject: &str) -> Result<String, AuthError> {
        self.issue(subject, self.config.default_ttl, BTreeMap::new())
    }

    /// Issues a token for pre-built claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidClaim` if the claims cannot be serialized.
    pub fn issue_claims(&self, claims: &ClaimSet) -> Result<String, AuthError> {
        let token = codec::encode(claims, self.config.algorithm, &self.keys)?;

        debug!(
            subject = claims.subject(),
            token_id = claims.token_id(),
            expires_at = %claims.expiry(),
            "issued token"
        );

        Ok(token)
    }

    /// Resolves a token to its subject.
    ///
    /// # Errors
    ///
    /// One of `MalformedToken`, `AlgorithmMismatch`, `SignatureInvalid` or
    /// `Expired`.
    pub fn resolve(&self, token: &str) -> Result<String, AuthError> {
        self.resolve_at(token, Utc::now())
    }

    /// Resolves a token to its subject, judging expiry at `now`.
    ///
    /// # Errors
    ///
    /// See [`AuthService::resolve`].
    pub fn resolve_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        self.resolve_claims_at(token, now)
            .map(|claims| claims.subject().to_string())
    }

    /// Resolves a token to its full claim set.
    ///
    /// # Errors
    ///
    /// See [`AuthService::resolve`].
    pub fn resolve_claims(&self, token: &str) -> Result<ClaimSet, AuthError> {
        self.resolve_claims_at(token, Utc::now())
    }

    /// Resolves a token to its full claim set, judging expiry at `now`.
    ///
    /// # Errors
    ///
    /// See [`AuthService::resolve`].
    pub fn resolve_claims_at(&self, token: &str, now: DateTime<Utc>) -> Result<ClaimSet, AuthError> {
        let result = codec::decode(token, self.config.max_token_length)
            .and_then(|parsed| parsed.verify(&self.public_key, self.config.algorithm))
            .and_then(|verified| verified.validate_at(now));

        match &result {
            Ok(claims) => debug!(
                subject = claims.subject(),
                token_id = claims.token_id(),
                "accepted token"
            ),
            Err(e) => warn!(error = e.kind(), "rejected token"),
        }

        result
    }

    /// Checks a username/password with `store` and issues a default-TTL
    /// token for the username.
    ///
    /// # Errors
    ///
    /// - `CredentialRejected` if the store refuses the pair
    /// - any error of [`AuthService::issue`]
    pub fn issue_token_for_user<S: CredentialStore + ?Sized>(
        &self,
        store: &S,
        username: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        if !store.verify(username, password) {
            warn!(error = AuthError::CredentialRejected.kind(), "login refused");
            return Err(AuthError::CredentialRejected);
        }

        self.issue_default(username)
    }

    /// Resolves a token to the username it was issued for.
    ///
    /// # Errors
    ///
    /// See [`AuthService::resolve`].
    pub fn resolve_user(&self, token: &str) -> Result<String, AuthError> {
        self.resolve(token)
    }
}
