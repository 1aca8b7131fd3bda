use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

/// Which [`linksters_notify::NotificationBridge`] implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyBackend {
    /// Amazon SNS.
    Sns,
    /// In-process bridge that only records calls (development).
    Memory,
}

impl FromStr for NotifyBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sns" => Ok(NotifyBackend::Sns),
            "memory" => Ok(NotifyBackend::Memory),
            other => Err(format!("unknown notification backend '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Budget for draining the pool after the listener stops (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Deadline for a single store operation (default: `5`).
    pub store_timeout_secs: u64,
    /// Deadline for a single notification bridge call (default: `10`).
    pub bridge_timeout_secs: u64,
    pub notify_backend: NotifyBackend,
    pub aws_region: String,
    /// Handle of the club-wide channel. Required for SNS; the memory backend
    /// creates one when unset.
    pub main_channel: Option<String>,
    /// The club's time zone, which decides what "today" means.
    pub club_timezone: Tz,
    /// Unsubscribe a deleted player's main-channel subscription.
    pub player_delete_unsubscribes: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            database_url: "sqlite://linksters.db?mode=rwc".into(),
            db_max_connections: 20,
            store_timeout_secs: 5,
            bridge_timeout_secs: 10,
            notify_backend: NotifyBackend::Memory,
            aws_region: "us-east-1".into(),
            main_channel: None,
            club_timezone: chrono_tz::America::Los_Angeles,
            player_delete_unsubscribes: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                          |
    /// |------------------------------|----------------------------------|
    /// | `HOST`                       | `0.0.0.0`                        |
    /// | `PORT`                       | `3000`                           |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`          |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                             |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                             |
    /// | `DATABASE_URL`               | `sqlite://linksters.db?mode=rwc` |
    /// | `DB_MAX_CONNECTIONS`         | `20`                             |
    /// | `STORE_TIMEOUT_SECS`         | `5`                              |
    /// | `BRIDGE_TIMEOUT_SECS`        | `10`                             |
    /// | `NOTIFY_BACKEND`             | `memory`                         |
    /// | `AWS_REGION`                 | `us-east-1`                      |
    /// | `MAIN_CHANNEL`               | unset                            |
    /// | `CLUB_TIMEZONE`              | `America/Los_Angeles`            |
    /// | `PLAYER_DELETE_UNSUBSCRIBES` | `false`                          |
    ///
    /// Panics on unparsable values; misconfiguration should fail fast.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins: Vec<String> = match std::env::var("CORS_ORIGINS") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => defaults.cors_origins,
        };

        let main_channel = std::env::var("MAIN_CHANNEL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            cors_origins,
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            shutdown_timeout_secs: parsed("SHUTDOWN_TIMEOUT_SECS", defaults.shutdown_timeout_secs),
            database_url: std::env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            store_timeout_secs: parsed("STORE_TIMEOUT_SECS", defaults.store_timeout_secs),
            bridge_timeout_secs: parsed("BRIDGE_TIMEOUT_SECS", defaults.bridge_timeout_secs),
            notify_backend: parsed("NOTIFY_BACKEND", defaults.notify_backend),
            aws_region: std::env::var("AWS_REGION").unwrap_or(defaults.aws_region),
            main_channel,
            club_timezone: parsed("CLUB_TIMEZONE", defaults.club_timezone),
            player_delete_unsubscribes: parsed(
                "PLAYER_DELETE_UNSUBSCRIBES",
                defaults.player_delete_unsubscribes,
            ),
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn bridge_timeout(&self) -> Duration {
        Duration::from_secs(self.bridge_timeout_secs)
    }
}

fn parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}
