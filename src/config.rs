//! Configuration for the authentication service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::MAX_TOKEN_LENGTH;
use crate::signature::Algorithm;

/// Configuration for [`AuthService`](crate::AuthService).
///
/// Missing fields take their defaults when loaded with
/// [`AuthConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// TTL used by [`AuthService::issue_default`](crate::AuthService::issue_default).
    ///
    /// Default: 1 hour
    pub default_ttl: Duration,

    /// The only algorithm tokens may name.
    ///
    /// Default: `EdDSA`
    pub algorithm: Algorithm,

    /// Longest token the decoder will look at, in bytes.
    ///
    /// Default: 8192
    pub max_token_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            algorithm: Algorithm::EdDsa,
            max_token_length: MAX_TOKEN_LENGTH,
        }
    }
}

impl AuthConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the document is not a valid
    /// configuration object.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Sets the default TTL.
    #[must_use]
    pub const fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the pinned algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the maximum token length.
    #[must_use]
    pub const fn with_max_token_length(mut self, max: usize) -> Self {
        self.max_token_length = max;
        self
    }
}
