//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` across the application.
//! Publishing never blocks and never fails the caller.

use chrono::{DateTime, Utc};
use dedupe_core::audit::{event_types, ENTITY_DUPLICATE_SET};
use dedupe_core::scan::ScanReport;
use dedupe_core::types::DbId;
use dedupe_db::models::duplicate_set::DuplicateSet;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// Something the engine did that belongs in the audit trail.
///
/// Constructed via [`DomainEvent::new`] and enriched with
/// [`with_entity`](DomainEvent::with_entity),
/// [`with_actor`](DomainEvent::with_actor), and
/// [`with_payload`](DomainEvent::with_payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, e.g. `"duplicates.merged"`.
    pub event_type: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub actor_user_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            entity_type: None,
            entity_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    /// Attach the entity the event is about.
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id);
        self
    }

    /// Attach the acting user. `None` leaves the event anonymous.
    pub fn with_actor(mut self, user_id: Option<DbId>) -> Self {
        self.actor_user_id = user_id;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// `duplicates.scan_completed` with per-type counts.
    pub fn scan_completed(report: &ScanReport, actor: Option<DbId>) -> Self {
        Self::new(event_types::SCAN_COMPLETED)
            .with_actor(actor)
            .with_payload(serde_json::json!({
                "organizations": report.organizations,
                "contacts": report.contacts,
                "totalSaved": report.total_saved,
            }))
    }

    /// A reviewer decision (`merged`, `rejected`, `skipped`, `merge_undone`)
    /// on one set.
    pub fn set_decision(event_type: &str, set: &DuplicateSet, actor: Option<DbId>) -> Self {
        Self::new(event_type)
            .with_entity(ENTITY_DUPLICATE_SET, set.id)
            .with_actor(actor)
            .with_payload(serde_json::json!({
                "entityType": set.entity_type,
                "primaryId": set.primary_id,
                "secondaryId": set.secondary_id,
                "status": set.status,
                "masterId": set.merged_master_id,
            }))
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Without subscribers the event is dropped.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use dedupe_core::scan::ScanCounts;

    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            DomainEvent::new(event_types::REJECTED)
                .with_entity(ENTITY_DUPLICATE_SET, 42)
                .with_actor(Some(7))
                .with_payload(serde_json::json!({"key": "value"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "duplicates.rejected");
        assert_eq!(received.entity_type.as_deref(), Some("duplicate_set"));
        assert_eq!(received.entity_id, Some(42));
        assert_eq!(received.actor_user_id, Some(7));
        assert_eq!(received.payload["key"], "value");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.publish(DomainEvent::new(event_types::SKIPPED));
    }

    #[test]
    fn scan_event_carries_counts_per_type() {
        let report = ScanReport {
            organizations: Some(ScanCounts {
                scanned: 10,
                candidates: 3,
                saved: 2,
                error: None,
            }),
            contacts: None,
            total_saved: 2,
            summary: String::new(),
        };
        let event = DomainEvent::scan_completed(&report, Some(1));
        assert_eq!(event.event_type, "duplicates.scan_completed");
        assert_eq!(event.payload["organizations"]["saved"], 2);
        assert!(event.payload["contacts"].is_null());
        assert_eq!(event.payload["totalSaved"], 2);
    }
}
