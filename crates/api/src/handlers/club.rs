//! Club-wide endpoints: broadcasts to the main channel and today's game.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use linksters_db::models::game::Game;
use linksters_notify::MessageHandle;
use serde::Serialize;

use super::members::SendMessageRequest;
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BroadcastReceipt {
    pub message_handle: MessageHandle,
}

#[derive(Debug, Serialize)]
pub struct Today {
    pub date: chrono::NaiveDate,
    pub game: Option<Game>,
}

/// POST /api/v1/broadcasts
///
/// Text every main-channel subscriber. The sender needs a role that grants
/// club-wide communications.
pub async fn broadcast(
    State(state): State<AppState>,
    Json(input): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let message_handle = state
        .directory
        .broadcast(input.sender_id, &input.body)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: BroadcastReceipt { message_handle },
        }),
    ))
}

/// GET /api/v1/today
///
/// Today's game as of the last cache refresh.
pub async fn today(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let snapshot = state.cache.snapshot().await;

    Ok(Json(DataResponse {
        data: Today {
            date: state.cache.club_today(),
            game: snapshot.todays_game.clone(),
        },
    }))
}
