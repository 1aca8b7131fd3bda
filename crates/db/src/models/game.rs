//! Game entity model.

use chrono::NaiveDate;
use linksters_core::types::DbId;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `game` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Game {
    pub id: DbId,
    pub date: NaiveDate,
    pub ninth_tee: String,
    pub is_match: bool,
}

/// DTO for scheduling a game.
#[derive(Debug, Clone)]
pub struct CreateGame {
    pub date: NaiveDate,
    pub ninth_tee: String,
    pub is_match: bool,
}
