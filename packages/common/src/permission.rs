//! Administrative permission names.
//!
//! Permissions are plain strings attached to roles. Holding [`ALL`] grants
//! every permission.

/// Wildcard permission.
pub const ALL: &str = "ALL";

/// Ban and unban users and businesses.
pub const BAN_USERS: &str = "BAN_USERS";

/// Grant trials and manage subscription plans.
pub const MANAGE_PLANS: &str = "MANAGE_PLANS";

/// Approve or reject payments.
pub const MANAGE_PAYMENTS: &str = "MANAGE_PAYMENTS";

/// Create categories.
pub const MANAGE_CATEGORIES: &str = "MANAGE_CATEGORIES";

/// Remove content (images) owned by other users.
pub const MANAGE_CONTENT: &str = "MANAGE_CONTENT";

/// Read the admin dashboard.
pub const VIEW_DASHBOARD: &str = "VIEW_DASHBOARD";

/// Returns true if `held` contains `required` or the wildcard.
pub fn grants<S: AsRef<str>>(held: &[S], required: &str) -> bool {
    held.iter()
        .any(|p| p.as_ref() == required || p.as_ref() == ALL)
}
