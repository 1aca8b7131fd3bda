//! Repository for the `game` table.
//!
//! Game scheduling lives elsewhere; the core only needs "the game on a given
//! day" to populate the cache, plus an insert for seeding.

use chrono::NaiveDate;
use sqlx::SqliteExecutor;

use crate::models::game::{CreateGame, Game};

const COLUMNS: &str = "id, date, ninth_tee, is_match";

pub struct GameRepo;

impl GameRepo {
    pub async fn create<'e, E>(executor: E, input: &CreateGame) -> Result<Game, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO game (date, ninth_tee, is_match) VALUES (?, ?, ?) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Game>(&query)
            .bind(input.date)
            .bind(&input.ninth_tee)
            .bind(input.is_match)
            .fetch_one(executor)
            .await
    }

    /// The game scheduled for `day`. If several exist the first one created wins.
    pub async fn find_for_day<'e, E>(executor: E, day: NaiveDate) -> Result<Option<Game>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        let query = format!("SELECT {COLUMNS} FROM game WHERE date = ? ORDER BY id ASC LIMIT 1");
        sqlx::query_as::<_, Game>(&query)
            .bind(day)
            .fetch_optional(executor)
            .await
    }
}
