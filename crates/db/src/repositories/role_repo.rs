//! Repository for the `role` and `role_members` tables.

use linksters_core::types::DbId;
use sqlx::SqliteExecutor;

use crate::models::role::{Role, RoleMembership};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name";

pub struct RoleRepo;

impl RoleRepo {
    /// Insert a role. Fails with a unique violation if the name exists.
    pub async fn create<'e, E>(executor: E, name: &str) -> Result<Role, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("INSERT INTO role (name) VALUES (?) RETURNING {COLUMNS}");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_one(executor)
            .await
    }

    /// Find a role by name (case-sensitive).
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Role>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM role WHERE name = ?");
        sqlx::query_as::<_, Role>(&query)
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// List all roles ordered by ID ascending.
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Role>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM role ORDER BY id ASC");
        sqlx::query_as::<_, Role>(&query).fetch_all(executor).await
    }

    /// Roles held by one player, ordered by role ID.
    pub async fn list_for_player<'e, E>(executor: E, player_id: DbId) -> Result<Vec<Role>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, Role>(
            "SELECT r.id, r.name
             FROM role r
             JOIN role_members rm ON rm.role_id = r.id
             WHERE rm.player_id = ?
             ORDER BY r.id ASC",
        )
        .bind(player_id)
        .fetch_all(executor)
        .await
    }

    /// Every association row, for hydrating players in bulk.
    pub async fn list_memberships<'e, E>(executor: E) -> Result<Vec<RoleMembership>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as::<_, RoleMembership>(
            "SELECT role_id, player_id FROM role_members ORDER BY player_id ASC, role_id ASC",
        )
        .fetch_all(executor)
        .await
    }

    /// Grant a role. Granting a role the player already holds is a no-op.
    pub async fn add_member<'e, E>(executor: E, role_id: DbId, player_id: DbId) -> Result<(), sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query("INSERT OR IGNORE INTO role_members (role_id, player_id) VALUES (?, ?)")
            .bind(role_id)
            .bind(player_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Drop every role association of a player. Returns the number removed.
    pub async fn remove_all_for_player<'e, E>(executor: E, player_id: DbId) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM role_members WHERE player_id = ?")
            .bind(player_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
