//! Trait boundaries for the message queue and the analytics sink.
//!
//! The pipeline treats both transports as external collaborators: the
//! ingress publishes verified webhooks to a queue topic, and the consumer
//! persists canonical records to an analytics sink. Both are abstracted
//! behind traits so infrastructure implementations can be injected at
//! startup.
//!
//! The in-memory implementations here are fully functional and double as
//! the reference transport for tests and local development.

use crate::NormalizedEvent;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

// ============================================================================
// Error Types
// ============================================================================

/// Failure publishing a message to the queue.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("queue unavailable: {message}")]
    Unavailable { message: String },

    #[error("message rejected by queue: {message}")]
    Rejected { message: String },
}

/// Failure inserting a record into the analytics sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink unavailable: {message}")]
    Unavailable { message: String },

    #[error("row rejected by sink: {message}")]
    Rejected { message: String },
}

// ============================================================================
// Queue Boundary
// ============================================================================

/// A message republished by the ingress after verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayMessage {
    /// Topic named after the classified provider.
    pub topic: String,

    /// Message attributes; carries the JSON-serialized replayed headers
    /// under the `headers` key.
    pub attributes: HashMap<String, String>,

    /// The raw, unmodified webhook body bytes.
    pub data: Bytes,
}

/// Publishes verified webhooks to the message queue.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// Publish one message; returns the queue-assigned message id.
    async fn publish(&self, message: RelayMessage) -> Result<String, PublishError>;
}

/// Persists canonical records to the analytics sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn insert(&self, event: &NormalizedEvent) -> Result<(), SinkError>;
}

// ============================================================================
// In-Memory Implementations
// ============================================================================

/// In-memory [`QueuePublisher`] for tests and local development.
///
/// Stores published messages in arrival order and assigns sequential
/// message ids.
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    messages: RwLock<Vec<RelayMessage>>,
    next_id: AtomicU64,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in order.
    pub fn published(&self) -> Vec<RelayMessage> {
        self.messages
            .read()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QueuePublisher for InMemoryPublisher {
    async fn publish(&self, message: RelayMessage) -> Result<String, PublishError> {
        let mut messages = self
            .messages
            .write()
            .map_err(|_| PublishError::Unavailable {
                message: "in-memory queue lock poisoned".to_string(),
            })?;

        messages.push(message);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("mem-{}", id))
    }
}

/// In-memory [`EventSink`] for tests and local development.
///
/// Stores inserted records in arrival order. Can be switched into a failing
/// mode to exercise sink-unavailable handling.
#[derive(Debug, Default)]
pub struct InMemorySink {
    rows: RwLock<Vec<NormalizedEvent>>,
    failing: AtomicBool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every inserted record, in order.
    pub fn rows(&self) -> Vec<NormalizedEvent> {
        self.rows
            .read()
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    /// Make subsequent inserts fail with [`SinkError::Unavailable`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventSink for InMemorySink {
    async fn insert(&self, event: &NormalizedEvent) -> Result<(), SinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SinkError::Unavailable {
                message: "in-memory sink is in failing mode".to_string(),
            });
        }

        let mut rows = self.rows.write().map_err(|_| SinkError::Unavailable {
            message: "in-memory sink lock poisoned".to_string(),
        })?;

        rows.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
