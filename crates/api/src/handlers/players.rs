//! Handlers for the player directory.
//!
//! Reads come from the cache snapshot; writes go through the
//! [`Directory`](crate::sync::Directory) so the main-channel subscription
//! follows the player's roles.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use linksters_core::types::DbId;
use linksters_db::models::player::{CreatePlayer, UpdatePlayer};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/players
pub async fn list_players(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let players = state.directory.list_players().await;

    Ok(Json(DataResponse { data: players }))
}

/// POST /api/v1/players
///
/// Create a player. A `User` role subscribes them to the club-wide channel.
pub async fn create_player(
    State(state): State<AppState>,
    Json(input): Json<CreatePlayer>,
) -> AppResult<impl IntoResponse> {
    let player = state.directory.add_player(input).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: player })))
}

/// GET /api/v1/players/{id}
pub async fn get_player(
    State(state): State<AppState>,
    Path(player_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let player = state.directory.get_player(player_id).await?;

    Ok(Json(DataResponse { data: player }))
}

/// PUT /api/v1/players/{id}
///
/// Replace the player's fields and role set.
pub async fn update_player(
    State(state): State<AppState>,
    Path(player_id): Path<DbId>,
    Json(input): Json<UpdatePlayer>,
) -> AppResult<impl IntoResponse> {
    let player = state.directory.update_player(player_id, input).await?;

    Ok(Json(DataResponse { data: player }))
}

/// DELETE /api/v1/players/{id}
pub async fn delete_player(
    State(state): State<AppState>,
    Path(player_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.directory.delete_player(player_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
