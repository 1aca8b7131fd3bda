#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use linksters_api::config::ServerConfig;
use linksters_api::router::build_app_router;
use linksters_api::state::AppState;
use linksters_db::models::event::{CreateEvent, EventDetail};
use linksters_db::models::player::{CreatePlayer, PlayerWithRoles};
use linksters_db::DbPool;
use linksters_notify::{ChannelHandle, MemoryBridge, NotificationBridge};

pub const MAIN_CHANNEL: &str = "linksters-main";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        club_timezone: chrono_tz::UTC,
        ..ServerConfig::default()
    }
}

/// A fully wired application over a private in-memory store and an
/// in-memory bridge that records every call.
pub struct TestApp {
    pub pool: DbPool,
    pub bridge: Arc<MemoryBridge>,
    pub state: AppState,
    pub main_channel: ChannelHandle,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: ServerConfig) -> Self {
        let pool = linksters_db::create_memory_pool().await.unwrap();
        let bridge = Arc::new(MemoryBridge::new());
        let main_channel = bridge.create_channel(MAIN_CHANNEL).await.unwrap();
        bridge.clear_calls().await;

        let state = AppState::build(
            pool.clone(),
            config,
            bridge.clone(),
            main_channel.clone(),
        )
        .await
        .unwrap();

        Self {
            pool,
            bridge,
            state,
            main_channel,
        }
    }

    /// The router exactly as the binary builds it.
    pub fn router(&self) -> Router {
        build_app_router(self.state.clone(), &self.state.config)
    }

    /// Add a player through the directory.
    pub async fn player(&self, name: &str, phone: &str, roles: &[&str]) -> PlayerWithRoles {
        self.state
            .directory
            .add_player(player_input(name, phone, roles))
            .await
            .unwrap()
    }

    /// Create an event through the registry.
    pub async fn event(&self, name: &str, cost: f64, owner_id: i64) -> EventDetail {
        self.state
            .events
            .create_event(event_input(name, cost, owner_id))
            .await
            .unwrap()
    }
}

pub fn player_input(name: &str, phone: &str, roles: &[&str]) -> CreatePlayer {
    CreatePlayer {
        name: format!("{name} Tester"),
        preferred_name: name.to_string(),
        phone: phone.to_string(),
        email: None,
        ghin_number: None,
        roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

pub fn event_input(name: &str, cost: f64, owner_id: i64) -> CreateEvent {
    CreateEvent {
        name: name.to_string(),
        date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap(),
        paid_event: cost > 0.0,
        cost,
        description: None,
        owner_id,
        invite_only: false,
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn delete(app: Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}
