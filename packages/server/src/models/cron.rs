use serde::{Deserialize, Serialize};

/// Result of one plan expiry run.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq, Eq, utoipa::ToSchema)]
pub struct ExpirePlansResponse {
    /// Expired rows found.
    pub processed: u64,
    /// Rows deactivated.
    pub expired: u64,
    /// Notification emails that could not be sent.
    pub email_failures: u64,
}
