//! Role entity model.

use linksters_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `role` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Role {
    pub id: DbId,
    pub name: String,
}

/// DTO for creating a role.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRole {
    pub name: String,
}

/// A row from the `role_members` association table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct RoleMembership {
    pub role_id: DbId,
    pub player_id: DbId,
}
