//! Username/password collaborator.
//!
//! Password storage belongs to the host application. This module defines the
//! capability the service needs from it and ships a small in-memory store
//! for tests and demos.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Checks a username/password pair.
///
/// Implementations own hashing and persistence and must be safe to call
/// from many requests at once.
pub trait CredentialStore: Send + Sync {
    /// Returns true if `password` is correct for `username`.
    fn verify(&self, username: &str, password: &str) -> bool;
}

const UNKNOWN_USER_SALT: [u8; 16] = [0u8; 16];

#[derive(Clone)]
struct StoredCredential {
    salt: [u8; 16],
    digest: [u8; 32],
}

/// In-memory [`CredentialStore`] holding salted SHA-256 digests.
///
/// This is not a password hash. A single salted SHA-256 has no key
/// stretching, so the store is only fit for tests and demos. Back
/// [`CredentialStore`] with a slow KDF such as Argon2 or scrypt anywhere
/// real passwords are kept.
///
/// Digests are compared in constant time, and a lookup for an unknown
/// username still computes one digest.
///
/// # Example
///
/// ```
/// use compact_auth::{CredentialStore, InMemoryCredentialStore};
///
/// let store = InMemoryCredentialStore::new();
/// assert!(store.register("alice", "wonderland"));
///
/// assert!(store.verify("alice", "wonderland"));
/// assert!(!store.verify("alice", "looking-glass"));
/// ```
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: RwLock<HashMap<String, StoredCredential>>,
}

impl InMemoryCredentialStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user. Returns false if the username is already taken.
    pub fn register(&self, username: impl Into<String>, password: &str) -> bool {
        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let credential = StoredCredential {
            salt,
            digest: digest(&salt, password),
        };

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        match users.entry(username.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(credential);
                true
            }
        }
    }

    /// Returns true if `username` is registered.
    #[must_use]
    pub fn contains(&self, username: &str) -> bool {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(username)
    }

    /// Returns the number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if no users are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn verify(&self, username: &str, password: &str) -> bool {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);

        // Unknown users still pay for one digest so timing does not reveal
        // which usernames exist.
        let Some(stored) = users.get(username) else {
            std::hint::black_box(digest(&UNKNOWN_USER_SALT, password));
            return false;
        };

        digest(&stored.salt, password).ct_eq(&stored.digest).into()
    }
}

impl std::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("users", &self.len())
            .finish()
    }
}

fn digest(salt: &[u8; 16], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}
