//! Tests for the per-event-type normalization dispatch table.

use super::*;
use crate::envelope::ReplayedHeaders;
use bytes::Bytes;
use serde_json::json;

const TIMESTAMP: &str = "2023-05-01T10:00:00Z";

fn make_delivery(event_type: &str, payload: Value) -> DecodedDelivery {
    let mut headers = ReplayedHeaders::new();
    headers.insert("X-Github-Event".to_string(), vec![event_type.to_string()]);
    headers.insert(
        "X-Hub-Signature-256".to_string(),
        vec!["sha256=cafebabe".to_string()],
    );

    let raw_payload = Bytes::from(payload.to_string());
    DecodedDelivery {
        msg_id: "msg-1".to_string(),
        headers,
        payload,
        raw_payload,
    }
}

fn expect_record(delivery: &DecodedDelivery) -> NormalizedEvent {
    match normalize(delivery).expect("normalization must succeed") {
        Outcome::Record(event) => event,
        Outcome::Skip { event_type } => {
            panic!("expected a record, got a skip for {}", event_type)
        }
    }
}

fn parsed(timestamp: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(timestamp)
        .unwrap()
        .with_timezone(&Utc)
}

// ============================================================================
// Per-type happy paths
// ============================================================================

#[test]
fn test_push_uses_head_commit_fields() {
    let delivery = make_delivery(
        "push",
        json!({"head_commit": {"id": "c0ffee", "timestamp": TIMESTAMP}}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.event_type, EventType::Push);
    assert_eq!(event.id, "c0ffee");
    assert_eq!(event.time_created, parsed(TIMESTAMP));
    assert_eq!(event.signature, "sha256=cafebabe");
    assert_eq!(event.msg_id, "msg-1");
    assert_eq!(event.source, "github");
}

#[test]
fn test_pull_request_composes_repo_and_number() {
    let delivery = make_delivery(
        "pull_request",
        json!({
            "repository": {"name": "acme/widgets"},
            "number": 42,
            "pull_request": {"updated_at": TIMESTAMP}
        }),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "acme/widgets/42");
    assert_eq!(event.event_type, EventType::PullRequest);
}

#[test]
fn test_pull_request_review_reads_numeric_review_id() {
    let delivery = make_delivery(
        "pull_request_review",
        json!({"review": {"id": 987654, "submitted_at": TIMESTAMP}}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "987654");
}

#[test]
fn test_pull_request_review_comment_reads_review_id_not_comment_id() {
    // The upstream mapping reads review.id for this type even though the
    // payload carries its own comment.id. The path is preserved verbatim;
    // this test pins the quirk so any change to it is deliberate.
    let delivery = make_delivery(
        "pull_request_review_comment",
        json!({
            "comment": {"id": 111, "updated_at": TIMESTAMP},
            "review": {"id": 222}
        }),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "222");
}

#[test]
fn test_issues_composes_repo_and_issue_number() {
    let delivery = make_delivery(
        "issues",
        json!({
            "repository": {"name": "acme/api"},
            "issue": {"number": 7, "updated_at": TIMESTAMP}
        }),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "acme/api/7");
}

#[test]
fn test_issue_comment_copies_comment_id_string() {
    let delivery = make_delivery(
        "issue_comment",
        json!({"comment": {"id": "c-555", "updated_at": TIMESTAMP}}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "c-555");
}

#[test]
fn test_status_reads_top_level_fields() {
    let delivery = make_delivery(
        "status",
        json!({"id": "st-9", "updated_at": TIMESTAMP, "state": "success"}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "st-9");
    assert_eq!(event.time_created, parsed(TIMESTAMP));
}

#[test]
fn test_deployment_status_reads_nested_fields() {
    let delivery = make_delivery(
        "deployment_status",
        json!({"deployment_status": {"id": "dep-3", "updated_at": TIMESTAMP}}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "dep-3");
}

// ============================================================================
// Timestamp fallback chains
// ============================================================================

#[test]
fn test_check_run_prefers_completed_at_over_started_at() {
    let completed = "2023-05-01T11:00:00Z";
    let started = "2023-05-01T10:00:00Z";
    let delivery = make_delivery(
        "check_run",
        json!({"check_run": {
            "id": "cr-1",
            "completed_at": completed,
            "started_at": started
        }}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.time_created, parsed(completed));
}

#[test]
fn test_check_run_falls_back_to_started_at() {
    let started = "2023-05-01T10:00:00Z";
    let delivery = make_delivery(
        "check_run",
        json!({"check_run": {"id": "cr-1", "started_at": started}}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.time_created, parsed(started));
}

#[test]
fn test_check_suite_falls_back_to_created_at() {
    let delivery = make_delivery(
        "check_suite",
        json!({"check_suite": {"id": "cs-1", "created_at": TIMESTAMP}}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.time_created, parsed(TIMESTAMP));
}

#[test]
fn test_release_falls_back_to_created_at() {
    let delivery = make_delivery(
        "release",
        json!({"release": {"id": "rel-1", "created_at": TIMESTAMP}}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.id, "rel-1");
    assert_eq!(event.time_created, parsed(TIMESTAMP));
}

#[test]
fn test_release_prefers_published_at() {
    let published = "2023-05-02T00:00:00Z";
    let delivery = make_delivery(
        "release",
        json!({"release": {
            "id": "rel-1",
            "published_at": published,
            "created_at": TIMESTAMP
        }}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.time_created, parsed(published));
}

#[test]
fn test_timezone_offsets_are_normalized_to_utc() {
    let delivery = make_delivery(
        "push",
        json!({"head_commit": {
            "id": "c0ffee",
            "timestamp": "2023-05-01T19:00:00+09:00"
        }}),
    );

    let event = expect_record(&delivery);

    assert_eq!(event.time_created, parsed("2023-05-01T10:00:00Z"));
}

// ============================================================================
// Skip vs. error
// ============================================================================

#[test]
fn test_unrecognized_event_type_is_skip_not_error() {
    let delivery = make_delivery("star", json!({"anything": true}));

    let outcome = normalize(&delivery).expect("skip is a success outcome");

    assert_eq!(
        outcome,
        Outcome::Skip {
            event_type: "star".to_string()
        }
    );
}

#[test]
fn test_every_recognized_type_has_a_dispatch_rule() {
    for event_type in EventType::ALL {
        assert!(
            rule_for(event_type).is_some(),
            "no extraction rule for {}",
            event_type
        );
    }
}

#[test]
fn test_missing_event_type_header_is_an_error() {
    let mut delivery = make_delivery("push", json!({}));
    delivery.headers.remove("X-Github-Event");

    let err = normalize(&delivery).unwrap_err();

    assert!(matches!(
        err,
        NormalizeError::MissingHeader {
            name: "X-Github-Event"
        }
    ));
}

#[test]
fn test_missing_signature_header_is_an_error() {
    let mut delivery = make_delivery("push", json!({}));
    delivery.headers.remove("X-Hub-Signature-256");

    let err = normalize(&delivery).unwrap_err();

    assert!(matches!(
        err,
        NormalizeError::MissingHeader {
            name: "X-Hub-Signature-256"
        }
    ));
}

// ============================================================================
// Extraction failure accumulation
// ============================================================================

#[test]
fn test_missing_timestamp_and_id_are_reported_together() {
    let delivery = make_delivery("push", json!({"unrelated": 1}));

    let err = normalize(&delivery).unwrap_err();

    let NormalizeError::Extraction { causes } = err else {
        panic!("expected an extraction failure, got {:?}", err);
    };
    assert_eq!(causes.len(), 2, "both failure causes must be accumulated");
}

#[test]
fn test_composed_id_reports_each_missing_component() {
    // pull_request with nothing present: the timestamp plus both halves of
    // the composed id are missing, three causes in total.
    let delivery = make_delivery("pull_request", json!({}));

    let err = normalize(&delivery).unwrap_err();

    let NormalizeError::Extraction { causes } = err else {
        panic!("expected an extraction failure, got {:?}", err);
    };
    assert_eq!(causes.len(), 3);
}

#[test]
fn test_extraction_diagnostics_name_the_failing_path() {
    let delivery = make_delivery("push", json!({"head_commit": {"id": "c0ffee"}}));

    let err = normalize(&delivery).unwrap_err();

    let message = err.to_string();
    assert!(
        message.contains("key timestamp not found in head_commit"),
        "diagnostic must name the failing segment, got: {}",
        message
    );
}

#[test]
fn test_unparsable_timestamp_is_a_hard_failure() {
    let delivery = make_delivery(
        "push",
        json!({"head_commit": {"id": "c0ffee", "timestamp": "yesterday at noon"}}),
    );

    let err = normalize(&delivery).unwrap_err();

    assert!(matches!(err, NormalizeError::InvalidTimestamp { .. }));
}

// ============================================================================
// Source and metadata passthrough
// ============================================================================

#[test]
fn test_mock_sentinel_switches_source_tag() {
    let mut delivery = make_delivery(
        "push",
        json!({"head_commit": {"id": "c0ffee", "timestamp": TIMESTAMP}}),
    );
    delivery
        .headers
        .insert("Mock".to_string(), vec!["True".to_string()]);

    let event = expect_record(&delivery);

    assert_eq!(event.source, "github_mock");
}

#[test]
fn test_metadata_is_verbatim_payload() {
    let payload = json!({"head_commit": {"id": "c0ffee", "timestamp": TIMESTAMP}});
    let delivery = make_delivery("push", payload.clone());

    let event = expect_record(&delivery);

    assert_eq!(event.metadata, payload.to_string());
}

#[test]
fn test_normalization_is_deterministic() {
    let delivery = make_delivery(
        "pull_request",
        json!({
            "repository": {"name": "acme/widgets"},
            "number": 42,
            "pull_request": {"updated_at": TIMESTAMP}
        }),
    );

    let first = expect_record(&delivery);
    let second = expect_record(&delivery);

    let first_bytes = serde_json::to_vec(&first).unwrap();
    let second_bytes = serde_json::to_vec(&second).unwrap();
    assert_eq!(first_bytes, second_bytes, "output must be byte-identical");
}
