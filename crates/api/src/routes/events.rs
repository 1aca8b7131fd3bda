//! Route definitions for events, their members and their messages.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{events, members};
use crate::state::AppState;

/// Event routes mounted at `/events`.
///
/// ```text
/// GET    /                            -> list_events
/// POST   /                            -> create_event
/// GET    /by-name/{name}              -> get_event_by_name
/// GET    /{id}                        -> get_event
/// PUT    /{id}                        -> update_event
/// DELETE /{id}                        -> delete_event
/// POST   /{id}/members                -> add_member
/// PUT    /{id}/members/{player_id}    -> update_member
/// DELETE /{id}/members/{player_id}    -> delete_member
/// POST   /{id}/messages               -> send_message
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(events::list_events).post(events::create_event))
        .route("/by-name/{name}", get(events::get_event_by_name))
        .route(
            "/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/{id}/members", post(members::add_member))
        .route(
            "/{id}/members/{player_id}",
            put(members::update_member).delete(members::delete_member),
        )
        .route("/{id}/messages", post(members::send_message))
}
