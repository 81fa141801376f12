//! Canonical compact token encoding and strict decoding.
//!
//! # Wire Format
//!
//! ```text
//! token     = header-b64 "." payload-b64 "." signature-b64
//! header    = {"alg":"EdDSA","typ":"JWT"}
//! payload   = flat JSON object, keys sorted, no whitespace
//! signature = Ed25519 over the ASCII bytes of header-b64 "." payload-b64
//! ```
//!
//! Every segment is base64url without padding.
//!
//! # Strict Decoding
//!
//! The decoder knows exactly one grammar and has no fallback. Input is
//! rejected with `MalformedToken` unless:
//!
//! 1. it is at most `max_len` bytes of `[A-Za-z0-9_-]` and `.`
//! 2. it has exactly three non-empty segments
//! 3. each segment is canonical unpadded base64url
//! 4. header and payload are flat JSON objects without duplicate keys and
//!    are byte-identical to their canonical re-serialization
//!
//! The signature is checked over the *original* first two segments as they
//! appear in the input. Nothing is re-encoded before verification.
//!
//! Step 1 is what defeats envelope forgeries such as
//! `{"  H.P'.":"","protected":"H","payload":"P","signature":"S"}`, which
//! splits into exactly three segments on `.` but carries JSON syntax around
//! them.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

use crate::claims::{ClaimSet, ClaimValue};
use crate::error::AuthError;
use crate::keys::{KeyProvider, VerifyingKey};
use crate::signature::{self, Algorithm};
use crate::verification::is_compact_byte;

/// Default maximum accepted token length in bytes.
pub const MAX_TOKEN_LENGTH: usize = 8192;

/// Value of the header `typ` field.
pub const TOKEN_TYPE: &str = "JWT";

const SEPARATOR: char = '.';

/// The token header.
///
/// Field order matches lexicographic key order, so the derived serializer
/// already produces the canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Header {
    /// Algorithm identifier
    pub alg: String,
    /// Token type, always `JWT`
    pub typ: String,
}

impl Header {
    /// Creates the header for `algorithm`.
    #[must_use]
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            alg: algorithm.as_str().to_string(),
            typ: TOKEN_TYPE.to_string(),
        }
    }
}

/// Encodes and signs `claims` into a compact token.
///
/// # Errors
///
/// Returns `AuthError::InvalidClaim` if the claims cannot be serialized.
pub fn encode(claims: &ClaimSet, algorithm: Algorithm, key: &KeyProvider) -> Result<String, AuthError> {
    let header_b64 = encode_segment(&canonical_json(&Header::new(algorithm))?);
    let payload_b64 = encode_segment(&canonical_json(&claims.to_wire())?);

    let signing_input = format!("{header_b64}{SEPARATOR}{payload_b64}");
    let signature = signature::sign(signing_input.as_bytes(), key);

    Ok(format!("{signing_input}{SEPARATOR}{}", encode_segment(&signature)))
}

/// Strictly decodes `token` without verifying it.
///
/// The result only exposes the header; claims stay sealed until
/// [`ParsedToken::verify`] succeeds.
///
/// # Errors
///
/// Returns `AuthError::MalformedToken` for any deviation from the compact
/// grammar.
pub fn decode(token: &str, max_len: usize) -> Result<ParsedToken<'_>, AuthError> {
    let [header_b64, payload_b64, signature_b64] = split_compact(token, max_len)?;

    let header_bytes = decode_segment(header_b64, "header")?;
    let payload_bytes = decode_segment(payload_b64, "payload")?;
    let signature = decode_segment(signature_b64, "signature")?;

    let header = parse_header(&header_bytes)?;
    let claims = parse_claims(&payload_bytes)?;

    // header-b64 "." payload-b64, borrowed from the input itself
    let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];

    Ok(ParsedToken {
        signing_input,
        header,
        claims,
        signature,
    })
}

/// A token that passed structural parsing but not signature verification.
#[derive(Debug)]
pub struct ParsedToken<'a> {
    signing_input: &'a str,
    header: Header,
    claims: ClaimSet,
    signature: Vec<u8>,
}

impl<'a> ParsedToken<'a> {
    /// The parsed header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The exact `header-b64.payload-b64` slice the signature covers.
    #[must_use]
    pub fn signing_input(&self) -> &'a str {
        self.signing_input
    }

    /// Checks the algorithm and signature.
    ///
    /// # Errors
    ///
    /// - `AlgorithmMismatch` if the header names another algorithm
    /// - `SignatureInvalid` if the signature does not verify
    pub fn verify(self, key: &VerifyingKey, expected: Algorithm) -> Result<VerifiedToken, AuthError> {
        signature::verify(
            self.signing_input.as_bytes(),
            &self.signature,
            key,
            &self.header.alg,
            expected,
        )?;

        Ok(VerifiedToken {
            header: self.header,
            claims: self.claims,
        })
    }
}

/// A token whose signature has been verified but whose claims have not
/// been checked against the clock.
#[derive(Debug)]
pub struct VerifiedToken {
    header: Header,
    claims: ClaimSet,
}

impl VerifiedToken {
    /// The verified header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Checks claim validity at `now` and releases the claims.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Expired` if the token expired at or before `now`.
    pub fn validate_at(self, now: DateTime<Utc>) -> Result<ClaimSet, AuthError> {
        self.claims.validate_at(now)?;
        Ok(self.claims)
    }
}

fn split_compact(token: &str, max_len: usize) -> Result<[&str; 3], AuthError> {
    if token.is_empty() {
        return Err(AuthError::malformed("token is empty"));
    }

    if token.len() > max_len {
        return Err(AuthError::malformed(format!(
            "token length {} exceeds maximum {max_len}",
            token.len()
        )));
    }

    if let Some(position) = token.bytes().position(|b| !is_compact_byte(b)) {
        return Err(AuthError::malformed(format!(
            "unexpected character at position {position}"
        )));
    }

    let mut segments = token.split(SEPARATOR);
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::malformed(
            "expected exactly three '.'-separated segments",
        ));
    };

    for (name, segment) in [("header", header), ("payload", payload), ("signature", signature)] {
        if segment.is_empty() {
            return Err(AuthError::malformed(format!("{name} segment is empty")));
        }
    }

    Ok([header, payload, signature])
}

fn encode_segment(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>, AuthError> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::malformed(format!("{name} segment is not canonical base64url: {e}")))
}

fn canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>, AuthError> {
    serde_json::to_vec(value).map_err(|_| AuthError::InvalidClaim {
        name: "payload".to_string(),
        reason: "not serializable as JSON",
    })
}

fn parse_header(bytes: &[u8]) -> Result<Header, AuthError> {
    let header: Header = serde_json::from_slice(bytes)
        .map_err(|e| AuthError::malformed(format!("invalid header: {e}")))?;

    if header.typ != TOKEN_TYPE {
        return Err(AuthError::malformed(format!(
            "unsupported token type '{}'",
            header.typ
        )));
    }

    ensure_canonical(&header, bytes, "header")?;
    Ok(header)
}

fn parse_claims(bytes: &[u8]) -> Result<ClaimSet, AuthError> {
    let StrictObject(map) = serde_json::from_slice::<StrictObject<ClaimValue>>(bytes)
        .map_err(|e| AuthError::malformed(format!("invalid payload: {e}")))?;

    ensure_canonical(&map, bytes, "payload")?;
    ClaimSet::from_wire(map)
}

/// Fails unless `bytes` is exactly the canonical serialization of `value`.
fn ensure_canonical<T: Serialize>(value: &T, bytes: &[u8], name: &str) -> Result<(), AuthError> {
    let canonical = serde_json::to_vec(value)
        .map_err(|e| AuthError::malformed(format!("{name} cannot be re-serialized: {e}")))?;

    if canonical != bytes {
        return Err(AuthError::malformed(format!("{name} is not in canonical form")));
    }

    Ok(())
}

/// A JSON object that refuses duplicate keys.
///
/// `serde_json` keeps the last value for a repeated key when collecting into
/// a map; that would let two readers of the same bytes disagree.
struct StrictObject<V>(BTreeMap<String, V>);

impl<'de, V: Deserialize<'de>> Deserialize<'de> for StrictObject<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ObjectVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for ObjectVisitor<V> {
            type Value = StrictObject<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a flat JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = BTreeMap::new();
                while let Some(key) = access.next_key::<String>()? {
                    if map.contains_key(&key) {
                        return Err(de::Error::custom(format_args!("duplicate key '{key}'")));
                    }
                    let value = access.next_value::<V>()?;
                    map.insert(key, value);
                }
                Ok(StrictObject(map))
            }
        }

        deserializer.deserialize_map(ObjectVisitor(PhantomData))
    }
}
