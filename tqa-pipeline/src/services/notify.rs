//! Graduation notification collaborator
//!
//! Failure to deliver never fails the scoring run that triggered it.

use async_trait::async_trait;
use chrono::Utc;
use tqa_common::events::{EventBus, TqaEvent};
use tracing::warn;
use uuid::Uuid;

/// Notification collaborator contract
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce that a language pair finished its new-pair review window
    async fn pair_graduated(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        source_language: &str,
        target_language: &str,
        file_count: i64,
    );
}

/// Notifier that publishes on the shared event bus
pub struct EventBusNotifier {
    event_bus: EventBus,
}

impl EventBusNotifier {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl Notifier for EventBusNotifier {
    async fn pair_graduated(
        &self,
        tenant_id: Uuid,
        project_id: Uuid,
        source_language: &str,
        target_language: &str,
        file_count: i64,
    ) {
        let event = TqaEvent::PairGraduated {
            tenant_id,
            project_id,
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
            file_count,
            timestamp: Utc::now(),
        };
        if self.event_bus.emit(event).is_err() {
            warn!(
                %tenant_id, %project_id,
                "pair graduation notification dropped: no subscribers"
            );
        }
    }
}
