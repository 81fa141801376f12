//! Claim set types.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;
use crate::verification::check_expiration;

/// Wire name of the subject claim.
pub const SUBJECT_CLAIM: &str = "sub";
/// Wire name of the expiry claim.
pub const EXPIRY_CLAIM: &str = "exp";
/// Wire name of the issued-at claim.
pub const ISSUED_AT_CLAIM: &str = "iat";
/// Wire name of the token id claim.
pub const TOKEN_ID_CLAIM: &str = "jti";

/// Claim names that cannot be used as custom claims.
pub const RESERVED_CLAIMS: [&str; 4] = [EXPIRY_CLAIM, ISSUED_AT_CLAIM, TOKEN_ID_CLAIM, SUBJECT_CLAIM];

/// A scalar claim value.
///
/// Values keep their JSON type through a round trip: an integer never comes
/// back as a float and a numeric string never comes back as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    /// A JSON string
    String(String),
    /// A JSON integer
    Integer(i64),
    /// A finite JSON number with a fractional part or exponent
    Float(f64),
    /// A JSON boolean
    Bool(bool),
}

impl ClaimValue {
    /// Returns the string value, if this is a string claim.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer claim.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float value, if this is a float claim.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean claim.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ClaimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for ClaimValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// The payload of a token.
///
/// `subject` and `expiry` are mandatory. `issued_at` and `token_id` are
/// always set on issuance but optional when decoding. Everything else lives
/// in an open map of custom claims.
///
/// Timestamps have one-second granularity.
///
/// # Example
///
/// ```
/// use compact_auth::ClaimSet;
/// use std::time::Duration;
///
/// let claims = ClaimSet::builder("alice")
///     .ttl(Duration::from_secs(60))
///     .claim("role", "reader")
///     .build()
///     .unwrap();
///
/// assert_eq!(claims.subject(), "alice");
/// assert_eq!(claims.get("role").and_then(|v| v.as_str()), Some("reader"));
/// assert!(!claims.is_expired());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimSet {
    subject: String,
    issued_at: Option<DateTime<Utc>>,
    expiry: DateTime<Utc>,
    token_id: Option<String>,
    extra: BTreeMap<String, ClaimValue>,
}

impl ClaimSet {
    /// Creates a builder for claims about `subject`.
    #[must_use]
    pub fn builder(subject: impl Into<String>) -> ClaimSetBuilder {
        ClaimSetBuilder::new(subject)
    }

    /// Builds claims valid from now for `ttl`.
    ///
    /// # Errors
    ///
    /// - `InvalidTtl` if `ttl` is shorter than one second
    /// - `InvalidClaim` if the subject is empty or a custom claim is invalid
    pub fn build(
        subject: impl Into<String>,
        ttl: Duration,
        extra_claims: BTreeMap<String, ClaimValue>,
    ) -> Result<Self, AuthError> {
        Self::builder(subject).ttl(ttl).claims(extra_claims).build()
    }

    /// The authenticated identity.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// When the token was issued, if recorded.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    /// When the token stops being valid.
    #[must_use]
    pub fn expiry(&self) -> DateTime<Utc> {
        self.expiry
    }

    /// Unique token identifier, if recorded.
    #[must_use]
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// Custom claims.
    #[must_use]
    pub fn extra(&self) -> &BTreeMap<String, ClaimValue> {
        &self.extra
    }

    /// Looks up a custom claim.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.extra.get(name)
    }

    /// Checks validity at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Expired` if `now >= expiry`.
    pub fn validate_at(&self, now: DateTime<Utc>) -> Result<(), AuthError> {
        check_expiration(self.expiry, now)
    }

    /// Returns true if the claims have expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.validate_at(Utc::now()).is_err()
    }

    /// Flattens the claims into the map that is serialized on the wire.
    pub(crate) fn to_wire(&self) -> BTreeMap<String, ClaimValue> {
        let mut map = self.extra.clone();
        map.insert(SUBJECT_CLAIM.into(), ClaimValue::String(self.subject.clone()));
        map.insert(EXPIRY_CLAIM.into(), ClaimValue::Integer(self.expiry.timestamp()));
        if let Some(iat) = self.issued_at {
            map.insert(ISSUED_AT_CLAIM.into(), ClaimValue::Integer(iat.timestamp()));
        }
        if let Some(jti) = &self.token_id {
            map.insert(TOKEN_ID_CLAIM.into(), ClaimValue::String(jti.clone()));
        }
        map
    }

    /// Rebuilds claims from a decoded wire map, enforcing required fields.
    pub(crate) fn from_wire(mut map: BTreeMap<String, ClaimValue>) -> Result<Self, AuthError> {
        let subject = match map.remove(SUBJECT_CLAIM) {
            Some(ClaimValue::String(s)) if !s.is_empty() => s,
            Some(_) => return Err(AuthError::malformed("'sub' must be a non-empty string")),
            None => return Err(AuthError::malformed("missing 'sub' claim")),
        };

        let expiry = match map.remove(EXPIRY_CLAIM) {
            Some(ClaimValue::Integer(secs)) => timestamp(secs, EXPIRY_CLAIM)?,
            Some(_) => return Err(AuthError::malformed("'exp' must be an integer timestamp")),
            None => return Err(AuthError::malformed("missing 'exp' claim")),
        };

        let issued_at = match map.remove(ISSUED_AT_CLAIM) {
            Some(ClaimValue::Integer(secs)) => Some(timestamp(secs, ISSUED_AT_CLAIM)?),
            Some(_) => return Err(AuthError::malformed("'iat' must be an integer timestamp")),
            None => None,
        };

        let token_id = match map.remove(TOKEN_ID_CLAIM) {
            Some(ClaimValue::String(s)) => Some(s),
            Some(_) => return Err(AuthError::malformed("'jti' must be a string")),
            None => None,
        };

        Ok(Self {
            subject,
            issued_at,
            expiry,
            token_id,
            extra: map,
        })
    }
}

fn timestamp(secs: i64, name: &str) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AuthError::malformed(format!("'{name}' is out of range")))
}

/// Builder for [`ClaimSet`].
///
/// # Example
///
/// ```
/// use compact_auth::ClaimSetBuilder;
/// use std::time::Duration;
///
/// let claims = ClaimSetBuilder::new("alice")
///     .ttl(Duration::from_secs(300))
///     .claim("tenant", 42)
///     .claim("admin", false)
///     .build()
///     .unwrap();
///
/// assert_eq!(claims.extra().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct ClaimSetBuilder {
    subject: String,
    ttl: Duration,
    extra: BTreeMap<String, ClaimValue>,
}

impl ClaimSetBuilder {
    /// Creates a new builder with a default TTL of one hour.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ttl: Duration::from_secs(3600),
            extra: BTreeMap::new(),
        }
    }

    /// Sets the time-to-live.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Adds a custom claim.
    #[must_use]
    pub fn claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    /// Adds several custom claims.
    #[must_use]
    pub fn claims(mut self, claims: impl IntoIterator<Item = (String, ClaimValue)>) -> Self {
        self.extra.extend(claims);
        self
    }

    /// Builds claims issued now.
    ///
    /// # Errors
    ///
    /// See [`ClaimSetBuilder::build_at`].
    pub fn build(self) -> Result<ClaimSet, AuthError> {
        self.build_at(Utc::now())
    }

    /// Builds claims issued at `now` (truncated to whole seconds).
    ///
    /// # Errors
    ///
    /// - `InvalidTtl` if the TTL is under one second or overflows
    /// - `InvalidClaim` if the subject is empty, a custom claim uses a
    ///   reserved name, or a float claim is not finite
    pub fn build_at(self, now: DateTime<Utc>) -> Result<ClaimSet, AuthError> {
        if self.subject.is_empty() {
            return Err(AuthError::InvalidClaim {
                name: SUBJECT_CLAIM.to_string(),
                reason: "subject must not be empty",
            });
        }

        for (name, value) in &self.extra {
            if RESERVED_CLAIMS.contains(&name.as_str()) {
                return Err(AuthError::InvalidClaim {
                    name: name.clone(),
                    reason: "name is reserved",
                });
            }
            if matches!(value, ClaimValue::Float(n) if !n.is_finite()) {
                return Err(AuthError::InvalidClaim {
                    name: name.clone(),
                    reason: "float must be finite",
                });
            }
        }

        let secs = i64::try_from(self.ttl.as_secs()).map_err(|_| AuthError::InvalidTtl)?;
        if secs == 0 {
            return Err(AuthError::InvalidTtl);
        }
        let ttl = TimeDelta::try_seconds(secs).ok_or(AuthError::InvalidTtl)?;

        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).ok_or(AuthError::InvalidTtl)?;
        let expiry = issued_at.checked_add_signed(ttl).ok_or(AuthError::InvalidTtl)?;

        Ok(ClaimSet {
            subject: self.subject,
            issued_at: Some(issued_at),
            expiry,
            token_id: Some(Uuid::new_v4().to_string()),
            extra: self.extra,
        })
    }
}
