//! Handlers for events.
//!
//! The list is served from the cache. Single events are hydrated from the
//! store so a client that just changed one sees its own write.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use linksters_core::types::DbId;
use linksters_db::models::event::{CreateEvent, UpdateEvent};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/events
pub async fn list_events(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let events = state.events.list_events().await;

    Ok(Json(DataResponse { data: events }))
}

/// POST /api/v1/events
///
/// Create an event and its channel. The owner becomes a paid member.
pub async fn create_event(
    State(state): State<AppState>,
    Json(input): Json<CreateEvent>,
) -> AppResult<impl IntoResponse> {
    let event = state.events.create_event(input).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: event })))
}

/// GET /api/v1/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let event = state.events.get_event_by_id(event_id).await?;

    Ok(Json(DataResponse { data: event }))
}

/// GET /api/v1/events/by-name/{name}
pub async fn get_event_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<impl IntoResponse> {
    let event = state.events.get_event_by_name(&name).await?;

    Ok(Json(DataResponse { data: event }))
}

/// PUT /api/v1/events/{id}
pub async fn update_event(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
    Json(input): Json<UpdateEvent>,
) -> AppResult<impl IntoResponse> {
    let event = state.events.update_event(event_id, input).await?;

    Ok(Json(DataResponse { data: event }))
}

/// DELETE /api/v1/events/{id}
///
/// Tell every member, drop their subscriptions and the channel, then
/// delete the event with its members and messages.
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<DbId>,
) -> AppResult<StatusCode> {
    state.events.delete_event(event_id).await?;

    Ok(StatusCode::NO_CONTENT)
}
