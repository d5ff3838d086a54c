//! # Hook-Relay Core
//!
//! Core business logic for the Hook-Relay webhook intake and normalization
//! pipeline.
//!
//! This crate contains the domain logic for authenticating provider webhooks,
//! classifying their source, relaying them through a message queue, and
//! normalizing the replayed deliveries into canonical analytics records used
//! to compute software-delivery metrics (deployment frequency, lead time).
//!
//! ## Architecture
//!
//! The pipeline is split into pure, stateless components:
//! - [`payload`] — typed traversal of untyped JSON payload trees
//! - [`signature`] — HMAC verification of raw webhook bodies
//! - [`source`] — provider classification from request headers
//! - [`envelope`] — decoding of queue push deliveries
//! - [`normalize`] — per-event-type extraction into [`NormalizedEvent`]
//! - [`relay`] — trait boundaries for the queue and the analytics sink
//!
//! External transports (message queue, analytics sink) are abstracted behind
//! traits in [`relay`]; infrastructure implementations are injected at
//! startup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod envelope;
pub mod normalize;
pub mod payload;
pub mod relay;
pub mod signature;
pub mod source;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

// ============================================================================
// Event Types
// ============================================================================

/// The set of webhook event types tracked for delivery metrics.
///
/// Any event type outside this set is skipped during normalization — most
/// provider traffic is irrelevant to delivery metrics and skipping it is a
/// success, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Push,
    PullRequest,
    PullRequestReview,
    PullRequestReviewComment,
    Issues,
    IssueComment,
    CheckRun,
    CheckSuite,
    Status,
    DeploymentStatus,
    Release,
}

impl EventType {
    /// All recognized event types, in dispatch-table order.
    pub const ALL: [EventType; 11] = [
        EventType::Push,
        EventType::PullRequest,
        EventType::PullRequestReview,
        EventType::PullRequestReviewComment,
        EventType::Issues,
        EventType::IssueComment,
        EventType::CheckRun,
        EventType::CheckSuite,
        EventType::Status,
        EventType::DeploymentStatus,
        EventType::Release,
    ];

    /// The wire tag as sent in the `X-Github-Event` header.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Push => "push",
            EventType::PullRequest => "pull_request",
            EventType::PullRequestReview => "pull_request_review",
            EventType::PullRequestReviewComment => "pull_request_review_comment",
            EventType::Issues => "issues",
            EventType::IssueComment => "issue_comment",
            EventType::CheckRun => "check_run",
            EventType::CheckSuite => "check_suite",
            EventType::Status => "status",
            EventType::DeploymentStatus => "deployment_status",
            EventType::Release => "release",
        }
    }

    /// Parse a wire tag into a recognized event type.
    ///
    /// Returns `None` for tags outside the tracked set; callers must treat
    /// that as a skip, not an error.
    pub fn parse(tag: &str) -> Option<EventType> {
        EventType::ALL.iter().copied().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnrecognizedEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::parse(s).ok_or_else(|| UnrecognizedEventType {
            tag: s.to_string(),
        })
    }
}

/// Error for event-type tags outside the tracked set.
///
/// Only produced by the [`FromStr`] impl; the normalization path uses
/// [`EventType::parse`] and treats `None` as a deliberate skip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event type {tag} is not in the tracked set")]
pub struct UnrecognizedEventType {
    pub tag: String,
}

// ============================================================================
// Canonical Record
// ============================================================================

/// Canonical event record handed to the analytics sink.
///
/// Written once per delivery and never mutated. Field names and types match
/// the sink schema exactly. Production is deterministic: normalizing the same
/// delivery twice yields byte-identical records (no wall-clock or random
/// state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Recognized event type tag.
    pub event_type: EventType,

    /// Content-derived identifier. For some types a composition of the
    /// repository name and a numeric sequence joined by `/`; for others a
    /// field copied directly from the payload.
    pub id: String,

    /// Original raw JSON payload, stored verbatim for auditability.
    pub metadata: String,

    /// Creation timestamp parsed from the payload (RFC 3339 on the wire).
    pub time_created: DateTime<Utc>,

    /// Raw signature header value as received at ingress. Stored for audit
    /// and replay detection; not re-validated at this stage.
    pub signature: String,

    /// Queue delivery id, passed through as a foreign key.
    pub msg_id: String,

    /// Source classification tag (e.g. `github` vs `github_mock`).
    pub source: String,
}
