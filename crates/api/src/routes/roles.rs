use axum::routing::get;
use axum::Router;

use crate::handlers::roles;
use crate::state::AppState;

/// Role routes mounted at `/roles`.
///
/// ```text
/// GET  /  -> list_roles
/// POST /  -> create_role
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(roles::list_roles).post(roles::create_role))
}
