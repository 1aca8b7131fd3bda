//! Repository for the `player` table.

use linksters_core::types::DbId;
use sqlx::SqliteExecutor;

use crate::models::player::Player;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, name, preferred_name, phone, email, ghin_number, main_subscription";

/// Validated, normalized player fields ready to be written.
#[derive(Debug, Clone, Copy)]
pub struct PlayerFields<'a> {
    pub name: &'a str,
    pub preferred_name: &'a str,
    /// E.164.
    pub phone: &'a str,
    pub email: Option<&'a str>,
    pub ghin_number: Option<&'a str>,
}

pub struct PlayerRepo;

impl PlayerRepo {
    /// Insert a player without a main subscription.
    pub async fn create<'e, E>(executor: E, fields: &PlayerFields<'_>) -> Result<Player, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO player (name, preferred_name, phone, email, ghin_number)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Player>(&query)
            .bind(fields.name)
            .bind(fields.preferred_name)
            .bind(fields.phone)
            .bind(fields.email)
            .bind(fields.ghin_number)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Player>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM player WHERE id = ?");
        sqlx::query_as::<_, Player>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// All players ordered by preferred name, then id.
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Player>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM player ORDER BY preferred_name ASC, id ASC");
        sqlx::query_as::<_, Player>(&query).fetch_all(executor).await
    }

    /// Replace the editable fields. The main subscription is untouched.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update<'e, E>(
        executor: E,
        id: DbId,
        fields: &PlayerFields<'_>,
    ) -> Result<Option<Player>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "UPDATE player SET
                name = ?,
                preferred_name = ?,
                phone = ?,
                email = ?,
                ghin_number = ?
             WHERE id = ?
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Player>(&query)
            .bind(fields.name)
            .bind(fields.preferred_name)
            .bind(fields.phone)
            .bind(fields.email)
            .bind(fields.ghin_number)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Store or clear (`None`) the main-channel subscription handle.
    ///
    /// Returns `true` if the row was updated.
    pub async fn set_main_subscription<'e, E>(
        executor: E,
        id: DbId,
        subscription: Option<&str>,
    ) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("UPDATE player SET main_subscription = ? WHERE id = ?")
            .bind(subscription)
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a player row. Role associations must already be gone.
    ///
    /// Returns `true` if a row was removed.
    pub async fn delete<'e, E>(executor: E, id: DbId) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM player WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
