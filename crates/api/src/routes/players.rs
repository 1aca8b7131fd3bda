use axum::routing::get;
use axum::Router;

use crate::handlers::players;
use crate::state::AppState;

/// Player routes mounted at `/players`.
///
/// ```text
/// GET    /        -> list_players
/// POST   /        -> create_player
/// GET    /{id}    -> get_player
/// PUT    /{id}    -> update_player
/// DELETE /{id}    -> delete_player
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(players::list_players).post(players::create_player))
        .route(
            "/{id}",
            get(players::get_player)
                .put(players::update_player)
                .delete(players::delete_player),
        )
}
