//! Provider classification from inbound request headers.
//!
//! Decides which upstream system produced a webhook, independent of
//! signature verification. Classification is an ordered priority list of
//! (predicate, provider) pairs — first match wins. The ordering is
//! deliberate: crafted input can satisfy more than one predicate, and the
//! earlier rule takes precedence.

use crate::envelope::HeaderView;
use crate::signature::SignatureScheme;

// ============================================================================
// Provider Tags
// ============================================================================

/// The upstream system that originated a webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
    Github,
    Gitlab,
    Tekton,
    CircleCi,
    PagerDuty,
    /// No rule matched; carries the raw client-identification string
    /// verbatim (possibly empty).
    Other(String),
}

impl Provider {
    /// Tag string used as the queue topic and in logs.
    pub fn as_str(&self) -> &str {
        match self {
            Provider::Github => "github",
            Provider::Gitlab => "gitlab",
            Provider::Tekton => "tekton",
            Provider::CircleCi => "circleci",
            Provider::PagerDuty => "pagerduty",
            Provider::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Classification Rules
// ============================================================================

/// One entry in the classification priority list.
pub struct ClassifierRule {
    pub provider: Provider,
    matches: fn(&HeaderView<'_>) -> bool,
}

impl ClassifierRule {
    /// Evaluate this rule's predicate against the given headers.
    pub fn matches(&self, headers: &HeaderView<'_>) -> bool {
        (self.matches)(headers)
    }
}

fn has_gitlab_event(headers: &HeaderView<'_>) -> bool {
    headers.contains("X-Gitlab-Event")
}

fn has_tekton_ce_type(headers: &HeaderView<'_>) -> bool {
    headers
        .first("Ce-Type")
        .is_some_and(|v| v.contains("tekton"))
}

fn has_github_user_agent(headers: &HeaderView<'_>) -> bool {
    headers
        .first("User-Agent")
        .is_some_and(|v| v.contains("GitHub-Hookshot"))
}

fn has_circleci_event(headers: &HeaderView<'_>) -> bool {
    headers.contains("Circleci-Event-Type")
}

fn has_pagerduty_signature(headers: &HeaderView<'_>) -> bool {
    headers.contains("X-Pagerduty-Signature")
}

/// The classification priority list, evaluated top to bottom.
pub static CLASSIFIER_RULES: [ClassifierRule; 5] = [
    ClassifierRule {
        provider: Provider::Gitlab,
        matches: has_gitlab_event,
    },
    ClassifierRule {
        provider: Provider::Tekton,
        matches: has_tekton_ce_type,
    },
    ClassifierRule {
        provider: Provider::Github,
        matches: has_github_user_agent,
    },
    ClassifierRule {
        provider: Provider::CircleCi,
        matches: has_circleci_event,
    },
    ClassifierRule {
        provider: Provider::PagerDuty,
        matches: has_pagerduty_signature,
    },
];

// ============================================================================
// Classification
// ============================================================================

/// Classify the provider behind a request from its headers.
///
/// Falls back to the raw `User-Agent` value when no rule matches.
pub fn classify(headers: &HeaderView<'_>) -> Provider {
    for rule in &CLASSIFIER_RULES {
        if rule.matches(headers) {
            return rule.provider.clone();
        }
    }

    Provider::Other(headers.first("User-Agent").unwrap_or_default().to_string())
}

/// Whether the request is flagged as synthetic test traffic.
///
/// The `Mock` sentinel header segregates test deliveries in the sink; it is
/// independent of provider classification.
pub fn is_mock(headers: &HeaderView<'_>) -> bool {
    headers.contains("Mock")
}

/// The signature scheme required for an authorized provider.
///
/// Returns `None` for providers this deployment does not accept webhooks
/// from; the ingress answers those with 403 and drops the delivery.
pub fn signature_scheme_for(provider: &Provider) -> Option<SignatureScheme> {
    match provider {
        Provider::Github => Some(SignatureScheme::Sha256),
        _ => None,
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
