//! Event types and broadcast bus for the TQA pipeline
//!
//! Events are emitted at layer/score boundaries and consumed by SSE
//! endpoints and notification listeners. Emission is fire-and-forget:
//! a missing subscriber never fails pipeline work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Pipeline event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TqaEvent {
    /// A processing layer finished for a file
    LayerCompleted {
        file_id: Uuid,
        layer: String,
        finding_count: usize,
        partial_failure: bool,
        timestamp: DateTime<Utc>,
    },

    /// A score was computed and persisted for a file
    ScoreCalculated {
        file_id: Uuid,
        score: f64,
        npt: f64,
        status: String,
        timestamp: DateTime<Utc>,
    },

    /// A file was auto-passed without manual review
    AutoPassed {
        file_id: Uuid,
        score: f64,
        rationale: String,
        timestamp: DateTime<Utc>,
    },

    /// A language pair graduated out of the mandatory-review window
    PairGraduated {
        tenant_id: Uuid,
        project_id: Uuid,
        source_language: String,
        target_language: String,
        file_count: i64,
        timestamp: DateTime<Utc>,
    },

    /// A file's pipeline run failed terminally
    FileFailed {
        file_id: Uuid,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl TqaEvent {
    /// Event type name as carried in the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            TqaEvent::LayerCompleted { .. } => "LayerCompleted",
            TqaEvent::ScoreCalculated { .. } => "ScoreCalculated",
            TqaEvent::AutoPassed { .. } => "AutoPassed",
            TqaEvent::PairGraduated { .. } => "PairGraduated",
            TqaEvent::FileFailed { .. } => "FileFailed",
        }
    }
}

/// Central event distribution bus
///
/// Backed by tokio::broadcast: non-blocking publish, multiple concurrent
/// subscribers, automatic cleanup when subscribers drop.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TqaEvent>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TqaEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the subscriber count, or an error when nobody is listening.
    /// Callers treat the error as non-fatal.
    pub fn emit(&self, event: TqaEvent) -> std::result::Result<usize, Box<TqaEvent>> {
        self.tx
            .send(event)
            .map_err(|broadcast::error::SendError(event)| Box::new(event))
    }
}
