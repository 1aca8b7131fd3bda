//! The synchronizer: services that keep the store, the notification bridge
//! and the read cache consistent.
//!
//! Every mutating operation follows the same protocol:
//!
//! ```text
//! validate (no side effects)
//!   -> store / bridge steps, each compensable step recorded in a Saga
//!   -> on failure: unwind the saga in reverse, best-effort cache refresh,
//!      return the original error
//!   -> on success: Cache::refresh, then return
//! ```
//!
//! [`Directory`] owns players and roles, [`EventRegistry`] owns events,
//! memberships and messages. Both share one [`SyncContext`].

pub mod directory;
pub mod registry;
pub mod saga;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use linksters_db::DbPool;
use linksters_notify::NotificationBridge;

use crate::cache::Cache;
use crate::error::{AppError, AppResult};

pub use directory::Directory;
pub use registry::EventRegistry;

/// Handles shared by the synchronizing services.
pub struct SyncContext {
    pub pool: DbPool,
    pub bridge: Arc<dyn NotificationBridge>,
    pub cache: Arc<Cache>,
    pub store_timeout: Duration,
}

impl SyncContext {
    /// Run one store operation under the store deadline.
    ///
    /// An overrun is abandoned and reported as [`AppError::StoreTimeout`];
    /// it is never retried.
    pub async fn store<T, F>(&self, operation: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.store_timeout, operation).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(AppError::StoreTimeout(self.store_timeout)),
        }
    }

    /// Rebuild the read cache after a committed mutation.
    pub async fn refresh(&self) -> AppResult<()> {
        match tokio::time::timeout(self.store_timeout, self.cache.refresh(&self.pool)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::CacheRefresh(e.to_string())),
            Err(_) => Err(AppError::CacheRefresh(format!(
                "timed out after {:?}",
                self.store_timeout
            ))),
        }
    }

    /// Refresh after a failed operation so the cache reflects whatever did
    /// commit, then hand back the original error.
    pub async fn fail(&self, error: AppError) -> AppError {
        if let Err(refresh_err) = self.refresh().await {
            tracing::error!(error = %refresh_err, "Cache refresh after failed operation also failed");
        }
        error
    }
}
