//! Durable audit persistence service.
//!
//! [`AuditPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every [`DomainEvent`] to `audit_events`. It runs as a
//! long-lived background task and exits when the bus is dropped.

use dedupe_core::types::DbId;
use dedupe_db::models::audit_event::CreateAuditEvent;
use dedupe_db::repositories::AuditEventRepo;
use dedupe_db::DbPool;
use tokio::sync::broadcast;

use crate::bus::DomainEvent;

/// Background service that persists audit events.
pub struct AuditPersistence;

impl AuditPersistence {
    /// Run the persistence loop until the channel closes.
    pub async fn run(pool: DbPool, mut receiver: broadcast::Receiver<DomainEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist audit event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Audit persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, audit persistence shutting down");
                    break;
                }
            }
        }
    }

    async fn persist(pool: &DbPool, event: &DomainEvent) -> Result<DbId, sqlx::Error> {
        AuditEventRepo::insert(
            pool,
            &CreateAuditEvent {
                event_type: event.event_type.clone(),
                entity_type: event.entity_type.clone(),
                entity_id: event.entity_id,
                actor_user_id: event.actor_user_id,
                payload: event.payload.clone(),
            },
        )
        .await
    }
}
