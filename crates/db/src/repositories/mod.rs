//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Operations that must join a
//! caller's transaction take `&mut PgConnection` instead.

pub mod audit_event_repo;
pub mod contact_repo;
pub mod duplicate_set_repo;
pub mod merge_repo;
pub mod organization_repo;
pub mod project_repo;
pub mod rating_repo;
pub mod review_repo;

pub use audit_event_repo::AuditEventRepo;
pub use contact_repo::ContactRepo;
pub use duplicate_set_repo::DuplicateSetRepo;
pub use merge_repo::{MergeRepo, MergeSnapshot};
pub use organization_repo::OrganizationRepo;
pub use project_repo::ProjectRepo;
pub use rating_repo::RatingRepo;
pub use review_repo::ReviewRepo;
