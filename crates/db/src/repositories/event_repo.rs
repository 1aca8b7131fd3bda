//! Repositories for the `event`, `event_members` and `event_messages` tables.

use linksters_core::types::{DbId, Timestamp};
use sqlx::SqliteExecutor;

use crate::models::event::{Event, EventMember, EventMessage, NewEvent, UpdateEvent};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str =
    "id, name, date, paid_event, cost, topic, description, owner_id, invite_only";

const MEMBER_COLUMNS: &str = "event_id, player_id, paid, subscription";

const MESSAGE_COLUMNS: &str = "id, event_id, sender_id, body, date, message_handle";

// ---------------------------------------------------------------------------
// event
// ---------------------------------------------------------------------------

pub struct EventRepo;

impl EventRepo {
    pub async fn create<'e, E>(executor: E, input: &NewEvent<'_>) -> Result<Event, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO event
                (name, date, paid_event, cost, topic, description, owner_id, invite_only)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(input.name)
            .bind(input.date)
            .bind(input.paid_event)
            .bind(input.cost)
            .bind(input.topic)
            .bind(input.description)
            .bind(input.owner_id)
            .bind(input.invite_only)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: DbId) -> Result<Option<Event>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM event WHERE id = ?");
        sqlx::query_as::<_, Event>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Find an event by exact name. Names are not unique; the oldest wins.
    pub async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Event>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM event WHERE name = ? ORDER BY id ASC LIMIT 1");
        sqlx::query_as::<_, Event>(&query)
            .bind(name)
            .fetch_optional(executor)
            .await
    }

    /// All events, soonest first.
    pub async fn list<'e, E>(executor: E) -> Result<Vec<Event>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM event ORDER BY date ASC, id ASC");
        sqlx::query_as::<_, Event>(&query).fetch_all(executor).await
    }

    /// Apply the non-`None` fields of `input`.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update<'e, E>(
        executor: E,
        id: DbId,
        input: &UpdateEvent,
    ) -> Result<Option<Event>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "UPDATE event SET
                date = COALESCE(?, date),
                paid_event = COALESCE(?, paid_event),
                cost = COALESCE(?, cost),
                description = COALESCE(?, description),
                owner_id = COALESCE(?, owner_id),
                invite_only = COALESCE(?, invite_only)
             WHERE id = ?
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(input.date)
            .bind(input.paid_event)
            .bind(input.cost)
            .bind(&input.description)
            .bind(input.owner_id)
            .bind(input.invite_only)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Delete the event row. Returns the number of rows removed.
    pub async fn delete<'e, E>(executor: E, id: DbId) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM event WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

// ---------------------------------------------------------------------------
// event_members
// ---------------------------------------------------------------------------

pub struct EventMemberRepo;

impl EventMemberRepo {
    pub async fn insert<'e, E>(
        executor: E,
        event_id: DbId,
        player_id: DbId,
        paid: bool,
        subscription: &str,
    ) -> Result<EventMember, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO event_members (event_id, player_id, paid, subscription)
             VALUES (?, ?, ?, ?)
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, EventMember>(&query)
            .bind(event_id)
            .bind(player_id)
            .bind(paid)
            .bind(subscription)
            .fetch_one(executor)
            .await
    }

    pub async fn find<'e, E>(
        executor: E,
        event_id: DbId,
        player_id: DbId,
    ) -> Result<Option<EventMember>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM event_members WHERE event_id = ? AND player_id = ?"
        );
        sqlx::query_as::<_, EventMember>(&query)
            .bind(event_id)
            .bind(player_id)
            .fetch_optional(executor)
            .await
    }

    /// Members of one event in the order they joined.
    pub async fn list_for_event<'e, E>(executor: E, event_id: DbId) -> Result<Vec<EventMember>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM event_members WHERE event_id = ? ORDER BY rowid ASC"
        );
        sqlx::query_as::<_, EventMember>(&query)
            .bind(event_id)
            .fetch_all(executor)
            .await
    }

    /// Every membership row, for hydrating events in bulk.
    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<EventMember>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {MEMBER_COLUMNS} FROM event_members ORDER BY rowid ASC");
        sqlx::query_as::<_, EventMember>(&query).fetch_all(executor).await
    }

    /// Returns `true` if the membership exists.
    pub async fn set_paid<'e, E>(
        executor: E,
        event_id: DbId,
        player_id: DbId,
        paid: bool,
    ) -> Result<bool, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result =
            sqlx::query("UPDATE event_members SET paid = ? WHERE event_id = ? AND player_id = ?")
                .bind(paid)
                .bind(event_id)
                .bind(player_id)
                .execute(executor)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns the number of rows removed.
    pub async fn delete<'e, E>(executor: E, event_id: DbId, player_id: DbId) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM event_members WHERE event_id = ? AND player_id = ?")
            .bind(event_id)
            .bind(player_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_for_event<'e, E>(executor: E, event_id: DbId) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM event_members WHERE event_id = ?")
            .bind(event_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Memberships held by a player across all events.
    pub async fn count_for_player<'e, E>(executor: E, player_id: DbId) -> Result<i64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM event_members WHERE player_id = ?")
                .bind(player_id)
                .fetch_one(executor)
                .await?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// event_messages
// ---------------------------------------------------------------------------

pub struct EventMessageRepo;

impl EventMessageRepo {
    pub async fn insert<'e, E>(
        executor: E,
        event_id: DbId,
        sender_id: DbId,
        body: &str,
        date: Timestamp,
        message_handle: &str,
    ) -> Result<EventMessage, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO event_messages (event_id, sender_id, body, date, message_handle)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {MESSAGE_COLUMNS}"
        );
        sqlx::query_as::<_, EventMessage>(&query)
            .bind(event_id)
            .bind(sender_id)
            .bind(body)
            .bind(date)
            .bind(message_handle)
            .fetch_one(executor)
            .await
    }

    /// Messages of one event, oldest first.
    pub async fn list_for_event<'e, E>(executor: E, event_id: DbId) -> Result<Vec<EventMessage>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM event_messages WHERE event_id = ? ORDER BY id ASC"
        );
        sqlx::query_as::<_, EventMessage>(&query)
            .bind(event_id)
            .fetch_all(executor)
            .await
    }

    pub async fn list_all<'e, E>(executor: E) -> Result<Vec<EventMessage>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM event_messages ORDER BY id ASC");
        sqlx::query_as::<_, EventMessage>(&query).fetch_all(executor).await
    }

    pub async fn delete_for_event<'e, E>(executor: E, event_id: DbId) -> Result<u64, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM event_messages WHERE event_id = ?")
            .bind(event_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
