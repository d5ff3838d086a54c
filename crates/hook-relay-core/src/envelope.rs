//! Queue push-delivery envelope decoding.
//!
//! The consumer endpoint receives webhook deliveries wrapped in the queue's
//! push envelope: the original request headers replayed as a JSON-encoded
//! attribute and the original body carried as base64 data. Decoding is
//! all-or-nothing — a delivery whose headers, base64, or payload JSON fail
//! to decode is rejected before normalization is attempted.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// ============================================================================
// Replayed Headers
// ============================================================================

/// Original HTTP headers replayed through the queue: name to ordered values.
pub type ReplayedHeaders = HashMap<String, Vec<String>>;

/// Case-insensitive read view over replayed headers.
///
/// Header names pass through two HTTP stacks before reaching the consumer
/// and their casing is not preserved, so every lookup ignores ASCII case.
#[derive(Debug, Clone, Copy)]
pub struct HeaderView<'a> {
    inner: &'a ReplayedHeaders,
}

impl<'a> HeaderView<'a> {
    pub fn new(inner: &'a ReplayedHeaders) -> Self {
        Self { inner }
    }

    /// Whether a header with this name is present at all.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.keys().any(|k| k.eq_ignore_ascii_case(name))
    }

    /// The first value of the named header, if present.
    pub fn first(&self, name: &str) -> Option<&'a str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

// ============================================================================
// Wire Format
// ============================================================================

/// A queue push delivery as received by the consumer endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    pub message: EnvelopeMessage,

    /// Subscription path the queue delivered on; informational only.
    #[serde(default)]
    pub subscription: String,
}

/// The message portion of a push delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeMessage {
    /// Queue-assigned delivery id, unique per delivery.
    #[serde(rename = "messageId")]
    pub message_id: String,

    #[serde(rename = "publishTime", default)]
    pub publish_time: Option<DateTime<Utc>>,

    /// Base64-encoded raw JSON body of the original webhook.
    pub data: String,

    pub attributes: EnvelopeAttributes,
}

/// Message attributes set by the ingress when republishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeAttributes {
    /// JSON-encoded [`ReplayedHeaders`] map.
    pub headers: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Failure decoding a push delivery. All variants are transport-class:
/// the consumer surfaces them as 5xx so the queue may redeliver.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope is not valid JSON: {0}")]
    MalformedEnvelope(serde_json::Error),

    #[error("attributes.headers does not decode to a header map: {0}")]
    MalformedHeaders(serde_json::Error),

    #[error("message data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("decoded payload is not valid JSON: {0}")]
    MalformedPayload(serde_json::Error),
}

// ============================================================================
// Decoding
// ============================================================================

/// A fully decoded delivery, ready for normalization.
#[derive(Debug, Clone)]
pub struct DecodedDelivery {
    /// Passthrough queue delivery id.
    pub msg_id: String,

    /// Replayed ingress headers.
    pub headers: ReplayedHeaders,

    /// Parsed payload tree.
    pub payload: Value,

    /// The exact payload bytes, kept verbatim for the audit column.
    pub raw_payload: Bytes,
}

impl WebhookEnvelope {
    /// Parse an envelope from the consumer request body.
    pub fn from_slice(body: &[u8]) -> Result<Self, EnvelopeError> {
        serde_json::from_slice(body).map_err(EnvelopeError::MalformedEnvelope)
    }

    /// Decode the replayed headers and payload carried by this envelope.
    pub fn decode(self) -> Result<DecodedDelivery, EnvelopeError> {
        let headers: ReplayedHeaders = serde_json::from_str(&self.message.attributes.headers)
            .map_err(EnvelopeError::MalformedHeaders)?;

        let raw_payload = Bytes::from(BASE64.decode(self.message.data.as_bytes())?);

        let payload: Value =
            serde_json::from_slice(&raw_payload).map_err(EnvelopeError::MalformedPayload)?;

        Ok(DecodedDelivery {
            msg_id: self.message.message_id,
            headers,
            payload,
            raw_payload,
        })
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
