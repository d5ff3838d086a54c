//! Webhook signature verification.
//!
//! Verifies the keyed hash a provider computes over the raw request body.
//! HMAC-SHA256 (`X-Hub-Signature-256`, `sha256=<hex>`) is the preferred
//! scheme; HMAC-SHA1 (`X-Hub-Signature`, `sha1=<hex>`) is retained for
//! providers that still send the legacy header.
//!
//! # Security
//!
//! - Constant-time comparison via the `subtle` crate to prevent timing
//!   side-channels.
//! - Malformed signature headers (missing prefix, invalid hex, truncated
//!   digest) verify as `false` — never a distinct error path an attacker
//!   could distinguish from a genuine mismatch.
//! - Secrets are never logged and are redacted from `Debug` output.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;

// ============================================================================
// Signature Schemes
// ============================================================================

/// The MAC algorithm a provider used, keyed by which header it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    /// HMAC-SHA256, the preferred scheme.
    Sha256,
    /// HMAC-SHA1, deprecated but kept for backward compatibility.
    Sha1,
}

impl SignatureScheme {
    /// The HTTP header carrying signatures for this scheme.
    pub fn header_name(&self) -> &'static str {
        match self {
            SignatureScheme::Sha256 => "X-Hub-Signature-256",
            SignatureScheme::Sha1 => "X-Hub-Signature",
        }
    }

    /// The fixed prefix in front of the hex digest.
    pub fn prefix(&self) -> &'static str {
        match self {
            SignatureScheme::Sha256 => "sha256=",
            SignatureScheme::Sha1 => "sha1=",
        }
    }
}

// ============================================================================
// SignatureVerifier
// ============================================================================

/// Verifies webhook signatures against a shared secret.
///
/// Constructed once at startup from configuration and shared across
/// requests; verification itself is pure.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    /// Create a verifier for the given shared secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verify a signature header value against the exact raw body bytes.
    ///
    /// Returns `true` only when the header carries the scheme's prefix, the
    /// suffix decodes as hex, and the decoded MAC matches the HMAC of `body`
    /// under the configured secret. Every malformation is an ordinary
    /// `false`.
    pub fn verify(&self, scheme: SignatureScheme, signature: &str, body: &[u8]) -> bool {
        let Some(hex_digest) = signature.strip_prefix(scheme.prefix()) else {
            return false;
        };

        let Ok(received) = hex::decode(hex_digest) else {
            return false;
        };

        let expected = match scheme {
            SignatureScheme::Sha256 => self.compute_sha256(body),
            SignatureScheme::Sha1 => self.compute_sha1(body),
        };

        let Some(expected) = expected else {
            return false;
        };

        // Length is public information; only the digest bytes need the
        // constant-time comparison.
        if received.len() != expected.len() {
            return false;
        }

        received.ct_eq(&expected).into()
    }

    /// Verify an `X-Hub-Signature-256` header value.
    pub fn verify_sha256(&self, signature: &str, body: &[u8]) -> bool {
        self.verify(SignatureScheme::Sha256, signature, body)
    }

    /// Verify a legacy `X-Hub-Signature` header value.
    pub fn verify_sha1(&self, signature: &str, body: &[u8]) -> bool {
        self.verify(SignatureScheme::Sha1, signature, body)
    }

    fn compute_sha256(&self, body: &[u8]) -> Option<Vec<u8>> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret).ok()?;
        mac.update(body);
        Some(mac.finalize().into_bytes().to_vec())
    }

    fn compute_sha1(&self, body: &[u8]) -> Option<Vec<u8>> {
        let mut mac = Hmac::<Sha1>::new_from_slice(&self.secret).ok()?;
        mac.update(body);
        Some(mac.finalize().into_bytes().to_vec())
    }
}

// Security: don't expose the secret in debug output
impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
