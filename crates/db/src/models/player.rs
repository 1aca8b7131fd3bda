//! Player entity model and DTOs.

use linksters_core::roles::{self, Capability};
use linksters_core::types::DbId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::role::Role;

/// A row from the `player` table.
///
/// `phone` is always E.164. `main_subscription` is set exactly when the
/// player holds a role granting [`Capability::ClubBroadcasts`].
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Player {
    pub id: DbId,
    pub name: String,
    pub preferred_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub ghin_number: Option<String>,
    pub main_subscription: Option<String>,
}

/// DTO for creating a player. `phone` may be in any accepted input format.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlayer {
    pub name: String,
    pub preferred_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub ghin_number: Option<String>,
    /// Names of roles to grant on creation.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// DTO for replacing a player's editable fields and role set.
///
/// Unlike most update DTOs this one is a full replacement: the role list is
/// the player's complete role set afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePlayer {
    pub name: String,
    pub preferred_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub ghin_number: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// A player together with their roles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerWithRoles {
    #[serde(flatten)]
    pub player: Player,
    pub roles: Vec<Role>,
}

impl PlayerWithRoles {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        roles::grants(self.roles.iter().map(|r| r.name.as_str()), capability)
    }
}
