use std::sync::Arc;

use linksters_db::DbPool;
use linksters_notify::{ChannelHandle, NotificationBridge, TimeoutBridge};

use crate::cache::Cache;
use crate::config::ServerConfig;
use crate::error::AppResult;
use crate::sync::{Directory, EventRegistry, SyncContext};

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Read cache shared with the services that refresh it.
    pub cache: Arc<Cache>,
    /// Players, roles and club-wide messages.
    pub directory: Arc<Directory>,
    /// Events, memberships and event messages.
    pub events: Arc<EventRegistry>,
}

impl AppState {
    /// Wire the services over one pool and one bridge, then load the first
    /// cache snapshot.
    ///
    /// Every bridge call is bounded by the configured bridge timeout.
    pub async fn build(
        pool: DbPool,
        config: ServerConfig,
        bridge: Arc<dyn NotificationBridge>,
        main_channel: ChannelHandle,
    ) -> AppResult<Self> {
        let bridge: Arc<dyn NotificationBridge> =
            Arc::new(TimeoutBridge::new(bridge, config.bridge_timeout()));
        let cache = Arc::new(Cache::new(config.club_timezone));
        let ctx = Arc::new(SyncContext {
            pool: pool.clone(),
            bridge,
            cache: Arc::clone(&cache),
            store_timeout: config.store_timeout(),
        });
        ctx.refresh().await?;

        let directory = Directory::new(
            Arc::clone(&ctx),
            main_channel.clone(),
            config.player_delete_unsubscribes,
        );
        let events = EventRegistry::new(ctx, main_channel);

        Ok(Self {
            pool,
            config: Arc::new(config),
            cache,
            directory: Arc::new(directory),
            events: Arc::new(events),
        })
    }
}
