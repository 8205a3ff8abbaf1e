//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the caller from a JWT Bearer token.
//! - [`rbac::RequireReviewer`] -- Requires a role allowed to resolve duplicates.

pub mod auth;
pub mod rbac;
