//! Runner DTOs
//!
//! Data transfer objects for self-hosted runner registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One-time token a runner agent uses to register with the organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationToken {
    pub token: String,

    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}
