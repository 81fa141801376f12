//! Attack scenarios against the token decoder.
//!
//! Every forged input must be refused, and none may ever resolve to a
//! subject other than the one the token was signed for.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use compact_auth::{AuthConfig, AuthError, AuthService, KeyProvider, sign};

struct Fixture {
    service: AuthService,
    keys: KeyProvider,
    token: String,
}

impl Fixture {
    fn new() -> Self {
        let keys = KeyProvider::generate();
        let service = AuthService::new(
            KeyProvider::from_secret_bytes(&keys.secret_bytes()),
            AuthConfig::default(),
        );
        let token = service
            .issue("alice", std::time::Duration::from_secs(60), Default::default())
            .unwrap();
        Self {
            service,
            keys,
            token,
        }
    }

    fn segments(&self) -> (&str, &str, &str) {
        let mut parts = self.token.split('.');
        (
            parts.next().unwrap(),
            parts.next().unwrap(),
            parts.next().unwrap(),
        )
    }

    fn payload_json(&self) -> String {
        let (_, payload, _) = self.segments();
        String::from_utf8(URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
    }

    /// Signs `header.payload` with the service's own key, producing a token
    /// whose signature is genuine.
    fn sign_raw(&self, header_json: &str, payload_json: &str) -> String {
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(payload_json)
        );
        let signature = sign(signing_input.as_bytes(), &self.keys);
        format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
    }

    fn assert_never_admin(&self, input: &str) -> AuthError {
        match self.service.resolve(input) {
            Ok(subject) => panic!("forged input resolved to {subject:?}: {input}"),
            Err(e) => e,
        }
    }

    fn assert_malformed(&self, input: &str) {
        let err = self.assert_never_admin(input);
        assert!(
            matches!(err, AuthError::MalformedToken { .. }),
            "expected MalformedToken for {input}, got {err:?}"
        );
    }
}

fn forged_payload(original: &str) -> String {
    let forged = original.replace("\"sub\":\"alice\"", "\"sub\":\"admin\"");
    assert_ne!(original, forged);
    URL_SAFE_NO_PAD.encode(forged)
}

// =============================================================================
// Serialization confusion
// =============================================================================

mod envelope_tests {
    use super::*;

    #[test]
    fn sanity_original_token_resolves() {
        let fixture = Fixture::new();
        assert_eq!(fixture.service.resolve(&fixture.token).unwrap(), "alice");
    }

    #[test]
    fn quoted_key_envelope_is_malformed() {
        // The forged payload sits in a quoted key so that naive splitting on
        // '.' still yields three parts.
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();
        let admin = forged_payload(&fixture.payload_json());

        let forged = format!(
            r#"{{"  {header}.{admin}.":"","protected":"{header}", "payload":"{payload}","signature":"{signature}"}}"#
        );

        assert_eq!(forged.split('.').count(), 3);
        fixture.assert_malformed(&forged);
    }

    #[test]
    fn flattened_json_serialization_is_malformed() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();

        let flattened = format!(
            r#"{{"protected":"{header}","payload":"{payload}","signature":"{signature}"}}"#
        );

        fixture.assert_malformed(&flattened);
    }

    #[test]
    fn general_json_serialization_is_malformed() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();

        let general = format!(
            r#"{{"payload":"{payload}","signatures":[{{"protected":"{header}","signature":"{signature}"}}]}}"#
        );

        fixture.assert_malformed(&general);
    }

    #[test]
    fn injected_subject_field_is_malformed() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();

        let wrapped = format!(
            r#"{{"protected":"{header}","payload":"{payload}","signature":"{signature}","subject":"admin"}}"#
        );

        fixture.assert_malformed(&wrapped);
    }

    #[test]
    fn json_string_wrapped_token_is_malformed() {
        let fixture = Fixture::new();
        fixture.assert_malformed(&format!("\"{}\"", fixture.token));
    }

    #[test]
    fn surrounding_whitespace_is_malformed() {
        let fixture = Fixture::new();
        for input in [
            format!(" {}", fixture.token),
            format!("{} ", fixture.token),
            format!("{}\n", fixture.token),
            format!("\t{}", fixture.token),
        ] {
            fixture.assert_malformed(&input);
        }
    }

    #[test]
    fn padded_segments_are_malformed() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();

        fixture.assert_malformed(&format!("{header}=.{payload}.{signature}"));
        fixture.assert_malformed(&format!("{header}.{payload}.{signature}=="));
    }

    #[test]
    fn standard_base64_alphabet_is_malformed() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();
        let standard = signature.replace('-', "+").replace('_', "/");

        if standard != signature {
            fixture.assert_malformed(&format!("{header}.{payload}.{standard}"));
        }
        fixture.assert_malformed(&format!("{header}.{payload}.{signature}+"));
    }

    #[test]
    fn extra_and_missing_segments_are_malformed() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();

        fixture.assert_malformed(&format!("{}.{}", fixture.token, fixture.token));
        fixture.assert_malformed(&format!("{}.", fixture.token));
        fixture.assert_malformed(&format!(".{}", fixture.token));
        fixture.assert_malformed(&format!("{header}.{payload}"));
        fixture.assert_malformed(&format!("{header}..{signature}"));
        fixture.assert_malformed(&format!("{header}.{payload}.{signature}.{signature}"));
    }
}

// =============================================================================
// Tampering
// =============================================================================

mod tamper_tests {
    use super::*;

    #[test]
    fn rewritten_subject_fails_signature() {
        let fixture = Fixture::new();
        let (header, _, signature) = fixture.segments();
        let admin = forged_payload(&fixture.payload_json());

        let err = fixture.assert_never_admin(&format!("{header}.{admin}.{signature}"));
        assert_eq!(err, AuthError::SignatureInvalid);
    }

    #[test]
    fn every_payload_bit_flip_is_rejected() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();
        let bytes = URL_SAFE_NO_PAD.decode(payload).unwrap();

        for index in 0..bytes.len() {
            for bit in 0..8 {
                let mut flipped = bytes.clone();
                flipped[index] ^= 1 << bit;
                let tampered = format!(
                    "{header}.{}.{signature}",
                    URL_SAFE_NO_PAD.encode(&flipped)
                );

                let err = fixture.assert_never_admin(&tampered);
                assert!(
                    matches!(
                        err,
                        AuthError::SignatureInvalid | AuthError::MalformedToken { .. }
                    ),
                    "byte {index} bit {bit}: {err:?}"
                );
            }
        }
    }

    #[test]
    fn every_signature_bit_flip_is_rejected() {
        let fixture = Fixture::new();
        let (header, payload, signature) = fixture.segments();
        let bytes = URL_SAFE_NO_PAD.decode(signature).unwrap();

        for index in 0..bytes.len() {
            for bit in 0..8 {
                let mut flipped = bytes.clone();
                flipped[index] ^= 1 << bit;
                let tampered = format!("{header}.{payload}.{}", URL_SAFE_NO_PAD.encode(&flipped));

                assert_eq!(
                    fixture.assert_never_admin(&tampered),
                    AuthError::SignatureInvalid,
                    "byte {index} bit {bit}"
                );
            }
        }
    }

    #[test]
    fn swapped_signature_from_another_token_fails() {
        let fixture = Fixture::new();
        let other = fixture
            .service
            .issue("admin", std::time::Duration::from_secs(60), Default::default())
            .unwrap();
        let (header, payload, _) = fixture.segments();
        let other_signature = other.rsplit('.').next().unwrap();

        let err = fixture.assert_never_admin(&format!("{header}.{payload}.{other_signature}"));
        assert_eq!(err, AuthError::SignatureInvalid);
    }

    #[test]
    fn truncated_signature_fails() {
        let fixture = Fixture::new();
        let (header, payload, _) = fixture.segments();
        let short = URL_SAFE_NO_PAD.encode([0u8; 63]);

        let err = fixture.assert_never_admin(&format!("{header}.{payload}.{short}"));
        assert_eq!(err, AuthError::SignatureInvalid);
    }
}

// =============================================================================
// Algorithm confusion
// =============================================================================

mod algorithm_tests {
    use super::*;

    #[test]
    fn foreign_algorithm_with_garbage_signature_is_mismatch() {
        let fixture = Fixture::new();
        let (_, payload, _) = fixture.segments();
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
        let garbage = URL_SAFE_NO_PAD.encode(b"not a signature");

        let err = fixture.assert_never_admin(&format!("{header}.{payload}.{garbage}"));
        assert!(
            matches!(&err, AuthError::AlgorithmMismatch { found, .. } if found == "HS256"),
            "{err:?}"
        );
    }

    #[test]
    fn foreign_algorithm_with_genuine_signature_is_mismatch() {
        // Even a signature made by the right key does not rescue a header
        // that names another algorithm.
        let fixture = Fixture::new();
        let payload = fixture.payload_json();

        for alg in ["none", "HS256", "RS256", "PS256", "ES256", "eddsa", "Ed25519"] {
            let header = format!(r#"{{"alg":"{alg}","typ":"JWT"}}"#);
            let token = fixture.sign_raw(&header, &payload);

            let err = fixture.assert_never_admin(&token);
            assert!(
                matches!(&err, AuthError::AlgorithmMismatch { found, .. } if found == alg),
                "{alg}: {err:?}"
            );
        }
    }

    #[test]
    fn header_tricks_are_malformed() {
        let fixture = Fixture::new();
        let payload = fixture.payload_json();

        for header in [
            r#"{"typ":"JWT","alg":"EdDSA"}"#,
            r#"{"alg":"EdDSA","typ":"JWT","kid":"x"}"#,
            r#"{"alg":"EdDSA","alg":"EdDSA","typ":"JWT"}"#,
            r#"{"alg":"EdDSA"}"#,
            r#"{"alg":"EdDSA","typ":"JWS"}"#,
            r#"{"alg": "EdDSA","typ":"JWT"}"#,
            r#"[{"alg":"EdDSA","typ":"JWT"}]"#,
        ] {
            let token = fixture.sign_raw(header, &payload);
            fixture.assert_malformed(&token);
        }
    }

    #[test]
    fn genuine_signature_over_duplicate_subject_is_malformed() {
        // A payload naming two subjects is refused outright, signed or not.
        let fixture = Fixture::new();
        let payload = fixture
            .payload_json()
            .replace("\"sub\":\"alice\"", "\"sub\":\"alice\",\"sub\":\"admin\"");
        let token = fixture.sign_raw(r#"{"alg":"EdDSA","typ":"JWT"}"#, &payload);

        fixture.assert_malformed(&token);
    }
}
