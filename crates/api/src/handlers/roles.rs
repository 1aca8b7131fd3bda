use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use linksters_db::models::role::CreateRole;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/roles
pub async fn list_roles(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let roles = state.directory.list_roles().await;

    Ok(Json(DataResponse { data: roles }))
}

/// POST /api/v1/roles
pub async fn create_role(
    State(state): State<AppState>,
    Json(input): Json<CreateRole>,
) -> AppResult<impl IntoResponse> {
    let role = state.directory.add_role(&input.name).await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: role })))
}
