//! Event normalization: the per-event-type dispatch table.
//!
//! Turns a decoded queue delivery (replayed headers plus payload tree) into
//! a canonical [`NormalizedEvent`], or fails informatively. Normalization is
//! a pure, stateless function of its inputs; the same delivery always
//! produces the same record.
//!
//! Outcomes are three-way:
//! - [`Outcome::Record`] — a canonical record was extracted.
//! - [`Outcome::Skip`] — the event type is not tracked. This is a success:
//!   most provider traffic is irrelevant to delivery metrics.
//! - [`NormalizeError`] — a recognized type whose required fields are absent
//!   or malformed. The caller logs and acknowledges (poison-message policy);
//!   redelivery would reproduce the same failure.

use crate::envelope::{DecodedDelivery, HeaderView};
use crate::payload::{self, LookupError};
use crate::signature::SignatureScheme;
use crate::source;
use crate::{EventType, NormalizedEvent};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Header carrying the provider's event-type tag.
pub const EVENT_TYPE_HEADER: &str = "X-Github-Event";

/// An ordered key path into the payload tree.
type Path = &'static [&'static str];

/// Every id composition reads the repository name from the same place.
const REPOSITORY_NAME_PATH: Path = &["repository", "name"];

// ============================================================================
// Error Types
// ============================================================================

/// Failure normalizing a recognized event type.
#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    /// A header required for normalization was not replayed with the
    /// delivery.
    #[error("required header {name} is missing from the delivery")]
    MissingHeader { name: &'static str },

    /// Required payload fields were absent or of the wrong type. Timestamp
    /// and identifier failures are accumulated, not short-circuited, so
    /// payload drift is diagnosable in one pass.
    #[error("payload extraction failed: {}", join_causes(.causes))]
    Extraction { causes: Vec<LookupError> },

    /// The resolved timestamp string was not RFC 3339.
    #[error("could not parse time_created {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Defensive: a type passed the recognized filter but has no entry in
    /// the dispatch table. Distinct from the unrecognized-type skip — the
    /// two must never be conflated.
    #[error("event type {event_type} is recognized but has no extraction rule")]
    MissingRule { event_type: EventType },
}

fn join_causes(causes: &[LookupError]) -> String {
    causes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of normalizing one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A canonical record, ready for the sink.
    Record(NormalizedEvent),

    /// The event type is not in the tracked set; acknowledge with no record.
    Skip { event_type: String },
}

// ============================================================================
// Dispatch Table
// ============================================================================

/// Extraction rule for one event type: where its creation timestamp and
/// canonical identifier live in the payload.
pub struct ExtractionRule {
    pub event_type: EventType,
    pub time_created: TimeRule,
    pub id: IdRule,
}

/// Candidate timestamp paths, tried in priority order; only the first
/// present path is used.
pub struct TimeRule {
    pub primary: Path,
    pub fallbacks: &'static [Path],
}

/// How the canonical identifier is derived.
pub enum IdRule {
    /// Copied from a string field.
    StringField(Path),

    /// Copied from a numeric field, formatted as a truncated integer.
    NumericField(Path),

    /// Composed as `"<repository.name>/<number>"` from the repository name
    /// and a numeric sequence field.
    RepoAndNumber { number: Path },
}

/// The dispatch table: one rule per recognized event type.
///
/// Field paths mirror the upstream mapping exactly, including its quirks
/// (`pull_request_review_comment` reads `review.id`, not `comment.id`).
/// Preserving them keeps identifiers stable across the migration; the
/// tests pin each path.
pub static EXTRACTION_RULES: [ExtractionRule; 11] = [
    ExtractionRule {
        event_type: EventType::Push,
        time_created: TimeRule {
            primary: &["head_commit", "timestamp"],
            fallbacks: &[],
        },
        id: IdRule::StringField(&["head_commit", "id"]),
    },
    ExtractionRule {
        event_type: EventType::PullRequest,
        time_created: TimeRule {
            primary: &["pull_request", "updated_at"],
            fallbacks: &[],
        },
        id: IdRule::RepoAndNumber {
            number: &["number"],
        },
    },
    ExtractionRule {
        event_type: EventType::PullRequestReview,
        time_created: TimeRule {
            primary: &["review", "submitted_at"],
            fallbacks: &[],
        },
        id: IdRule::NumericField(&["review", "id"]),
    },
    ExtractionRule {
        event_type: EventType::PullRequestReviewComment,
        time_created: TimeRule {
            primary: &["comment", "updated_at"],
            fallbacks: &[],
        },
        // Upstream mapping quirk: the id comes from review.id, not
        // comment.id. Kept as-is.
        id: IdRule::NumericField(&["review", "id"]),
    },
    ExtractionRule {
        event_type: EventType::Issues,
        time_created: TimeRule {
            primary: &["issue", "updated_at"],
            fallbacks: &[],
        },
        id: IdRule::RepoAndNumber {
            number: &["issue", "number"],
        },
    },
    ExtractionRule {
        event_type: EventType::IssueComment,
        time_created: TimeRule {
            primary: &["comment", "updated_at"],
            fallbacks: &[],
        },
        id: IdRule::StringField(&["comment", "id"]),
    },
    ExtractionRule {
        event_type: EventType::CheckRun,
        time_created: TimeRule {
            primary: &["check_run", "completed_at"],
            fallbacks: &[&["check_run", "started_at"]],
        },
        id: IdRule::StringField(&["check_run", "id"]),
    },
    ExtractionRule {
        event_type: EventType::CheckSuite,
        time_created: TimeRule {
            primary: &["check_suite", "updated_at"],
            fallbacks: &[&["check_suite", "created_at"]],
        },
        id: IdRule::StringField(&["check_suite", "id"]),
    },
    ExtractionRule {
        event_type: EventType::Status,
        time_created: TimeRule {
            primary: &["updated_at"],
            fallbacks: &[],
        },
        id: IdRule::StringField(&["id"]),
    },
    ExtractionRule {
        event_type: EventType::DeploymentStatus,
        time_created: TimeRule {
            primary: &["deployment_status", "updated_at"],
            fallbacks: &[],
        },
        id: IdRule::StringField(&["deployment_status", "id"]),
    },
    ExtractionRule {
        event_type: EventType::Release,
        time_created: TimeRule {
            primary: &["release", "published_at"],
            fallbacks: &[&["release", "created_at"]],
        },
        id: IdRule::StringField(&["release", "id"]),
    },
];

/// The rule for a recognized event type.
pub fn rule_for(event_type: EventType) -> Option<&'static ExtractionRule> {
    EXTRACTION_RULES.iter().find(|r| r.event_type == event_type)
}

// ============================================================================
// Normalization
// ============================================================================

/// Normalize one decoded delivery into a canonical record.
///
/// Signature and source are copied through from the replayed headers
/// without re-verification — verification already happened at ingress.
pub fn normalize(delivery: &DecodedDelivery) -> Result<Outcome, NormalizeError> {
    let headers = HeaderView::new(&delivery.headers);

    let tag = headers
        .first(EVENT_TYPE_HEADER)
        .ok_or(NormalizeError::MissingHeader {
            name: EVENT_TYPE_HEADER,
        })?;

    let Some(event_type) = EventType::parse(tag) else {
        return Ok(Outcome::Skip {
            event_type: tag.to_string(),
        });
    };

    let signature = headers
        .first(SignatureScheme::Sha256.header_name())
        .ok_or(NormalizeError::MissingHeader {
            name: SignatureScheme::Sha256.header_name(),
        })?
        .to_string();

    let source = if source::is_mock(&headers) {
        "github_mock"
    } else {
        "github"
    };

    let rule = rule_for(event_type).ok_or(NormalizeError::MissingRule { event_type })?;

    let time_result = resolve_time_created(&rule.time_created, &delivery.payload);
    let id_result = resolve_id(&rule.id, &delivery.payload);

    let (raw_time, id) = match (time_result, id_result) {
        (Ok(raw_time), Ok(id)) => (raw_time, id),
        (time_result, id_result) => {
            let mut causes = Vec::new();
            if let Err(cause) = time_result {
                causes.push(cause);
            }
            if let Err(cause_list) = id_result {
                causes.extend(cause_list);
            }
            return Err(NormalizeError::Extraction { causes });
        }
    };

    let time_created = DateTime::parse_from_rfc3339(&raw_time)
        .map_err(|source| NormalizeError::InvalidTimestamp {
            value: raw_time.clone(),
            source,
        })?
        .with_timezone(&Utc);

    // The payload parsed as JSON from these exact bytes, so they are valid
    // UTF-8; the lossy conversion never rewrites anything here.
    let metadata = String::from_utf8_lossy(&delivery.raw_payload).into_owned();

    Ok(Outcome::Record(NormalizedEvent {
        event_type,
        id,
        metadata,
        time_created,
        signature,
        msg_id: delivery.msg_id.clone(),
        source: source.to_string(),
    }))
}

/// Resolve the creation timestamp through the rule's fallback chain.
///
/// Candidates are tried silently in order; when all are absent the
/// diagnostic for the primary path is surfaced.
fn resolve_time_created(rule: &TimeRule, payload: &Value) -> Result<String, LookupError> {
    if let Some(value) = payload::lookup::<String>(payload, rule.primary) {
        return Ok(value);
    }

    for path in rule.fallbacks {
        if let Some(value) = payload::lookup::<String>(payload, path) {
            return Ok(value);
        }
    }

    payload::lookup_or_err::<String>(payload, rule.primary)
}

/// Resolve the canonical identifier for a rule.
///
/// The composed form can fail on both of its fields; failures are collected
/// so the caller reports them together.
fn resolve_id(rule: &IdRule, payload: &Value) -> Result<String, Vec<LookupError>> {
    match rule {
        IdRule::StringField(path) => {
            payload::lookup_or_err::<String>(payload, path).map_err(|cause| vec![cause])
        }
        IdRule::NumericField(path) => payload::lookup_or_err::<f64>(payload, path)
            .map(format_numeric_id)
            .map_err(|cause| vec![cause]),
        IdRule::RepoAndNumber { number } => {
            let name = payload::lookup_or_err::<String>(payload, REPOSITORY_NAME_PATH);
            let sequence = payload::lookup_or_err::<f64>(payload, number);

            match (name, sequence) {
                (Ok(name), Ok(sequence)) => Ok(format!("{}/{}", name, sequence as i64)),
                (name, sequence) => {
                    let mut causes = Vec::new();
                    if let Err(cause) = name {
                        causes.push(cause);
                    }
                    if let Err(cause) = sequence {
                        causes.push(cause);
                    }
                    Err(causes)
                }
            }
        }
    }
}

/// JSON numbers decode as f64; identifiers format as truncated integers,
/// matching the upstream conversion.
fn format_numeric_id(value: f64) -> String {
    format!("{}", value as i64)
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
