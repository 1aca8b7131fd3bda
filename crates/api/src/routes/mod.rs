pub mod club;
pub mod events;
pub mod health;
pub mod players;
pub mod roles;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /players                                 list, create
/// /players/{id}                            get, update, delete
///
/// /roles                                   list, create
///
/// /events                                  list, create
/// /events/by-name/{name}                   get by exact name
/// /events/{id}                             get, update, delete
/// /events/{id}/members                     add member (POST)
/// /events/{id}/members/{player_id}         update paid flag, remove
/// /events/{id}/messages                    send to the event channel (POST)
///
/// /broadcasts                              send to the club-wide channel (POST)
/// /today                                   today's game
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/players", players::router())
        .nest("/roles", roles::router())
        .nest("/events", events::router())
        .merge(club::router())
}
