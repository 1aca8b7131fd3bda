//! Handlers for event memberships and event messages.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use linksters_core::types::DbId;
use serde::Deserialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddMemberRequest {
    pub player_id: DbId,
    #[serde(default)]
    pub paid: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub paid: bool,
}

/// Body of an event message or a club-wide broadcast.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: DbId,
    pub body: String,
}

/// POST /api/v1/events/{id}/members
pub async fn add_member(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    Json(input): Json<AddMemberRequest>,
) -> AppResult<impl IntoResponse> {
    let member = state
        .events
        .add_member(event_id, input.player_id, input.paid)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: member })))
}

/// PUT /api/v1/events/{id}/members/{player_id}
///
/// Set the paid flag. The member is texted on every call.
pub async fn update_member(
    State(state): State<AppState>,
    Path((event_id, player_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateMemberRequest>,
) -> AppResult<impl IntoResponse> {
    let member = state
        .events
        .update_member(event_id, player_id, input.paid)
        .await?;

    Ok(Json(DataResponse { data: member }))
}

/// DELETE /api/v1/events/{id}/members/{player_id}
pub async fn delete_member(
    State(state): State<AppState>,
    Path((event_id, player_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    state.events.delete_member(event_id, player_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/events/{id}/messages
pub async fn send_message(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    Json(input): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    let message = state
        .events
        .send_event_message(event_id, input.sender_id, &input.body)
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}
