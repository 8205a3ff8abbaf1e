//! Well-known role name constants.
//!
//! These must match the role claims issued by the authentication service.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_REVIEWER: &str = "reviewer";
pub const ROLE_VIEWER: &str = "viewer";

/// Roles allowed to run scans and resolve duplicate sets.
pub const RESOLVING_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_REVIEWER];

/// Returns `true` if `role` may trigger scans, merges, rejections, and undo.
pub fn can_resolve_duplicates(role: &str) -> bool {
    RESOLVING_ROLES.contains(&role)
}
