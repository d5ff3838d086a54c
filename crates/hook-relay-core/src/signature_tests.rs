//! Tests for webhook signature verification.

use super::*;
use hmac::{Hmac, Mac};

fn sign_sha256(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn sign_sha1(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

// ============================================================================
// HMAC-SHA256 (preferred scheme)
// ============================================================================

#[test]
fn test_accepts_correct_sha256_signature() {
    let secret = "It's a Secret to Everybody";
    let body = br#"{"zen":"Design for failure.","hook_id":1}"#;
    let verifier = SignatureVerifier::new(secret.as_bytes().to_vec());

    let signature = sign_sha256(secret, body);

    assert!(verifier.verify_sha256(&signature, body));
}

#[test]
fn test_rejects_when_single_body_byte_differs() {
    let secret = "webhook-secret";
    let body = b"{\"action\":\"opened\",\"number\":42}";
    let verifier = SignatureVerifier::new(secret.as_bytes().to_vec());

    let signature = sign_sha256(secret, body);

    let mut tampered = body.to_vec();
    tampered[0] ^= 0x01;

    assert!(!verifier.verify_sha256(&signature, &tampered));
}

#[test]
fn test_rejects_signature_from_different_secret() {
    let body = b"payload bytes";
    let verifier = SignatureVerifier::new(b"right-secret".to_vec());

    let signature = sign_sha256("wrong-secret", body);

    assert!(!verifier.verify_sha256(&signature, body));
}

// ============================================================================
// Malformed headers never abort differently from a mismatch
// ============================================================================

#[test]
fn test_rejects_non_hex_suffix() {
    let verifier = SignatureVerifier::new(b"secret".to_vec());

    assert!(!verifier.verify_sha256("sha256=not-hex-at-all!", b"body"));
}

#[test]
fn test_rejects_missing_prefix() {
    let secret = "secret";
    let body = b"body";
    let verifier = SignatureVerifier::new(secret.as_bytes().to_vec());

    // Valid digest but without the scheme prefix.
    let bare_digest = sign_sha256(secret, body).replace("sha256=", "");

    assert!(!verifier.verify_sha256(&bare_digest, body));
}

#[test]
fn test_rejects_wrong_scheme_prefix() {
    let secret = "secret";
    let body = b"body";
    let verifier = SignatureVerifier::new(secret.as_bytes().to_vec());

    // A SHA-1 header value presented where SHA-256 is expected.
    let legacy = sign_sha1(secret, body);

    assert!(!verifier.verify_sha256(&legacy, body));
}

#[test]
fn test_rejects_truncated_digest() {
    let secret = "secret";
    let body = b"body";
    let verifier = SignatureVerifier::new(secret.as_bytes().to_vec());

    let mut signature = sign_sha256(secret, body);
    signature.truncate(signature.len() - 2);

    assert!(!verifier.verify_sha256(&signature, body));
}

#[test]
fn test_rejects_empty_header_value() {
    let verifier = SignatureVerifier::new(b"secret".to_vec());

    assert!(!verifier.verify_sha256("", b"body"));
}

// ============================================================================
// Legacy HMAC-SHA1 scheme
// ============================================================================

#[test]
fn test_accepts_correct_sha1_signature() {
    let secret = "legacy-secret";
    let body = b"legacy payload";
    let verifier = SignatureVerifier::new(secret.as_bytes().to_vec());

    let signature = sign_sha1(secret, body);

    assert!(verifier.verify_sha1(&signature, body));
}

#[test]
fn test_sha1_rejects_tampered_body() {
    let secret = "legacy-secret";
    let verifier = SignatureVerifier::new(secret.as_bytes().to_vec());

    let signature = sign_sha1(secret, b"original");

    assert!(!verifier.verify_sha1(&signature, b"altered"));
}

// ============================================================================
// Scheme metadata
// ============================================================================

#[test]
fn test_schemes_are_keyed_by_header_name() {
    assert_eq!(
        SignatureScheme::Sha256.header_name(),
        "X-Hub-Signature-256"
    );
    assert_eq!(SignatureScheme::Sha1.header_name(), "X-Hub-Signature");
    assert_eq!(SignatureScheme::Sha256.prefix(), "sha256=");
    assert_eq!(SignatureScheme::Sha1.prefix(), "sha1=");
}

#[test]
fn test_debug_output_redacts_secret() {
    let verifier = SignatureVerifier::new(b"super-secret".to_vec());

    let rendered = format!("{:?}", verifier);

    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("REDACTED"));
}
