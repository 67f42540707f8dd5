use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Binds a user to a school with a role. Only active memberships grant access.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub school_id: Uuid,
    pub role_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
