//! Key material for signing and verifying tokens.

use ed25519_dalek::{SigningKey as DalekSigningKey, VerifyingKey as DalekVerifyingKey};

use crate::error::AuthError;

/// Owner of the process signing keypair.
///
/// Wraps an Ed25519 private key. Construct once at startup and hand it to
/// [`AuthService`](crate::AuthService); the key is immutable afterwards.
///
/// # Example
///
/// ```
/// use compact_auth::KeyProvider;
///
/// let provider = KeyProvider::generate();
/// let public_key = provider.public_key();
/// # let _ = public_key;
/// ```
#[derive(Clone)]
pub struct KeyProvider {
    inner: DalekSigningKey,
}

impl KeyProvider {
    /// Creates a new random keypair from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            inner: DalekSigningKey::generate(&mut rng),
        }
    }

    /// Loads a keypair from a 32-byte Ed25519 secret.
    #[must_use]
    pub fn from_secret_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: DalekSigningKey::from_bytes(bytes),
        }
    }

    /// Exports the raw secret bytes for persistence in an external store.
    #[must_use]
    pub fn secret_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Returns the public half of the keypair.
    #[must_use]
    pub fn public_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    pub(crate) fn as_dalek(&self) -> &DalekSigningKey {
        &self.inner
    }
}

impl std::fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProvider")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// The public key used to verify tokens.
///
/// Safe to share and distribute.
///
/// # Example
///
/// ```
/// use compact_auth::{KeyProvider, VerifyingKey};
///
/// let bytes = KeyProvider::generate().public_key().to_bytes();
/// let recovered = VerifyingKey::from_bytes(&bytes).unwrap();
/// assert_eq!(recovered.to_bytes(), bytes);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: DalekVerifyingKey,
}

impl VerifyingKey {
    /// Creates a verifying key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKeyFormat` if the bytes do not encode a
    /// valid Ed25519 curve point.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, AuthError> {
        DalekVerifyingKey::from_bytes(bytes)
            .map(|inner| Self { inner })
            .map_err(|e| AuthError::InvalidKeyFormat {
                reason: e.to_string(),
            })
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    pub(crate) fn as_dalek(&self) -> &DalekVerifyingKey {
        &self.inner
    }
}

impl std::fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bytes = self.to_bytes();
        write!(
            f,
            "VerifyingKey({:02x}{:02x}{:02x}{:02x}...)",
            bytes[0], bytes[1], bytes[2], bytes[3]
        )
    }
}
