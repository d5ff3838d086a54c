//! # Hook-Relay HTTP Service
//!
//! HTTP layer for the Hook-Relay pipeline. Exposes two independent routers:
//!
//! - **Ingress** (`POST /`) — receives provider webhooks, classifies the
//!   source, verifies the signature over the raw body, and republishes the
//!   delivery to the queue with the original headers replayed as a message
//!   attribute.
//! - **Consumer** (`POST /`, `GET /`) — receives queue push deliveries,
//!   decodes the envelope, normalizes the payload into a canonical record,
//!   and hands it to the analytics sink.
//!
//! Every request is an independent, stateless unit of work; the shared
//! [`AppState`] holds only immutable configuration and `Arc`ed
//! collaborators.

pub mod config;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hook_relay_core::envelope::{HeaderView, ReplayedHeaders, WebhookEnvelope};
use hook_relay_core::normalize::{self, Outcome};
use hook_relay_core::relay::{EventSink, QueuePublisher, RelayMessage};
use hook_relay_core::signature::SignatureVerifier;
use hook_relay_core::source;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    /// Verifies webhook signatures against the configured shared secret.
    pub verifier: Arc<SignatureVerifier>,

    /// Republishes verified webhooks to the message queue.
    pub publisher: Arc<dyn QueuePublisher>,

    /// Persists canonical records to the analytics sink.
    pub sink: Arc<dyn EventSink>,
}

// ============================================================================
// Routers
// ============================================================================

/// Router for the webhook receiver endpoint.
pub fn ingress_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(ingress_index))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router for the queue push-delivery endpoint.
pub fn consumer_router(state: AppState) -> Router {
    Router::new()
        .route("/", any(consumer_index))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Ingress Handler
// ============================================================================

/// Webhook receiver: verify, classify, republish.
///
/// Responds 204 on success *and* on republish failure — the verification
/// outcome is the only thing a provider may learn from the status code, and
/// provider-side retry of a queue hiccup is not wanted. 403 covers both
/// unauthorized sources and failed signature checks; 400 is produced by the
/// body extractor for unreadable bodies.
async fn ingress_index(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return StatusCode::NOT_FOUND.into_response();
    }

    let replayed = replayed_headers(&headers);
    let view = HeaderView::new(&replayed);
    let provider = source::classify(&view);

    let Some(scheme) = source::signature_scheme_for(&provider) else {
        warn!(provider = %provider, "webhook from unauthorized source rejected");
        return StatusCode::FORBIDDEN.into_response();
    };

    // The signature may arrive as a query parameter named after the
    // signature header, with the header as the fallback.
    let signature = query
        .get(scheme.header_name())
        .cloned()
        .or_else(|| view.first(scheme.header_name()).map(str::to_owned));

    let Some(signature) = signature else {
        warn!(provider = %provider, "webhook carried no signature");
        return StatusCode::FORBIDDEN.into_response();
    };

    if !state.verifier.verify(scheme, &signature, &body) {
        warn!(provider = %provider, "webhook signature verification failed");
        return StatusCode::FORBIDDEN.into_response();
    }

    // Replay every header except Authorization to the queue.
    let mut to_replay = replayed;
    to_replay.retain(|name, _| !name.eq_ignore_ascii_case("authorization"));

    let headers_json = match serde_json::to_string(&to_replay) {
        Ok(json) => json,
        Err(err) => {
            error!(error = %err, "could not serialize replayed headers");
            return StatusCode::NO_CONTENT.into_response();
        }
    };

    let mut attributes = HashMap::new();
    attributes.insert("headers".to_string(), headers_json);

    let message = RelayMessage {
        topic: provider.as_str().to_string(),
        attributes,
        data: body,
    };

    match state.publisher.publish(message).await {
        Ok(message_id) => {
            info!(provider = %provider, message_id = %message_id, "webhook republished");
        }
        Err(err) => {
            error!(provider = %provider, error = %err, "failed to republish webhook");
        }
    }

    StatusCode::NO_CONTENT.into_response()
}

/// Collect request headers into the replayed multi-value map.
fn replayed_headers(headers: &HeaderMap) -> ReplayedHeaders {
    let mut replayed = ReplayedHeaders::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        replayed
            .entry(name.as_str().to_string())
            .or_default()
            .push(value);
    }
    replayed
}

// ============================================================================
// Consumer Handler
// ============================================================================

/// Queue push-delivery endpoint: decode, normalize, persist.
///
/// Only envelope-decode failures answer 5xx (redelivery may help). Skips,
/// extraction failures, and sink failures are all acknowledged with 200:
/// the transport preserves neither order nor uniqueness, and a payload the
/// normalizer cannot extract today will fail identically on redelivery
/// (poison-message policy).
async fn consumer_index(State(state): State<AppState>, method: Method, body: Bytes) -> Response {
    if method != Method::POST && method != Method::GET {
        return StatusCode::NOT_FOUND.into_response();
    }

    let envelope = match WebhookEnvelope::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            error!(error = %err, "could not decode delivery envelope");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let delivery = match envelope.decode() {
        Ok(delivery) => delivery,
        Err(err) => {
            error!(error = %err, "could not decode delivery contents");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match normalize::normalize(&delivery) {
        Ok(Outcome::Skip { event_type }) => {
            debug!(
                event_type = %event_type,
                msg_id = %delivery.msg_id,
                "event type not tracked, skipping"
            );
            StatusCode::OK.into_response()
        }
        Ok(Outcome::Record(event)) => {
            match state.sink.insert(&event).await {
                Ok(()) => {
                    info!(
                        event_type = %event.event_type,
                        id = %event.id,
                        msg_id = %event.msg_id,
                        "event persisted"
                    );
                }
                Err(err) => {
                    error!(error = %err, msg_id = %event.msg_id, "could not persist event");
                }
            }
            StatusCode::OK.into_response()
        }
        Err(err) => {
            warn!(error = %err, msg_id = %delivery.msg_id, "could not normalize delivery");
            StatusCode::OK.into_response()
        }
    }
}
