//! The persistence task drains the bus into `audit_events`.

use dedupe_core::audit::{event_types, ENTITY_DUPLICATE_SET};
use dedupe_db::repositories::AuditEventRepo;
use dedupe_events::{AuditPersistence, DomainEvent, EventBus};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_published_events_are_persisted(pool: PgPool) {
    let bus = EventBus::default();
    let handle = tokio::spawn(AuditPersistence::run(pool.clone(), bus.subscribe()));

    bus.publish(
        DomainEvent::new(event_types::MERGED)
            .with_entity(ENTITY_DUPLICATE_SET, 5)
            .with_actor(Some(9))
            .with_payload(serde_json::json!({"masterId": 11})),
    );
    bus.publish(DomainEvent::new(event_types::SCAN_COMPLETED));

    // Dropping the bus closes the channel after the buffered events drain.
    drop(bus);
    handle.await.unwrap();

    let events = AuditEventRepo::list_recent(&pool, None, 10, 0).await.unwrap();
    assert_eq!(events.len(), 2);

    let merged = AuditEventRepo::list_recent(&pool, Some("duplicates.merged"), 10, 0)
        .await
        .unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].entity_type.as_deref(), Some("duplicate_set"));
    assert_eq!(merged[0].entity_id, Some(5));
    assert_eq!(merged[0].actor_user_id, Some(9));
    assert_eq!(merged[0].payload["masterId"], 11);
}
