use axum::routing::{get, post};
use axum::Router;

use crate::handlers::club;
use crate::state::AppState;

/// Club-wide routes merged into `/api/v1`.
///
/// ```text
/// POST /broadcasts  -> broadcast
/// GET  /today       -> today
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/broadcasts", post(club::broadcast))
        .route("/today", get(club::today))
}
