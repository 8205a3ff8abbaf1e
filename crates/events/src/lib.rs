//! Audit event bus for the duplicate engine.
//!
//! - [`EventBus`] is the in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`DomainEvent`] is the event envelope.
//! - [`AuditPersistence`] is the background service that writes every event
//!   to the `audit_events` table.

pub mod bus;
pub mod persistence;

pub use bus::{DomainEvent, EventBus};
pub use persistence::AuditPersistence;
