//! Process-wide read cache.
//!
//! The cache holds an immutable [`Snapshot`] behind an `Arc`. Readers clone
//! the `Arc` and keep a consistent view for as long as they hold it; a
//! refresh builds a complete new snapshot and swaps the pointer, so no reader
//! ever sees a half-built one. Refreshes are serialized so two concurrent
//! mutations cannot install their snapshots out of order.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use linksters_core::types::{DbId, Timestamp};
use linksters_db::hydrate;
use linksters_db::models::event::EventDetail;
use linksters_db::models::game::Game;
use linksters_db::models::player::PlayerWithRoles;
use linksters_db::models::role::Role;
use linksters_db::repositories::{GameRepo, RoleRepo};
use linksters_db::DbPool;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

/// A full, read-only copy of the club's state at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub players: Vec<PlayerWithRoles>,
    pub roles: Vec<Role>,
    pub events: Vec<EventDetail>,
    pub todays_game: Option<Game>,
    pub refreshed_at: Timestamp,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            players: Vec::new(),
            roles: Vec::new(),
            events: Vec::new(),
            todays_game: None,
            refreshed_at: Utc::now(),
        }
    }

    pub fn player(&self, id: DbId) -> Option<&PlayerWithRoles> {
        self.players.iter().find(|p| p.player.id == id)
    }

    pub fn event(&self, id: DbId) -> Option<&EventDetail> {
        self.events.iter().find(|e| e.event.id == id)
    }
}

pub struct Cache {
    current: RwLock<Arc<Snapshot>>,
    refresh_lock: Mutex<()>,
    club_timezone: Tz,
}

impl Cache {
    /// An empty cache; call [`Cache::refresh`] before serving reads.
    pub fn new(club_timezone: Tz) -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
            refresh_lock: Mutex::new(()),
            club_timezone,
        }
    }

    /// The current snapshot.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// The calendar day at the club right now.
    pub fn club_today(&self) -> NaiveDate {
        club_date(Utc::now(), self.club_timezone)
    }

    /// Rebuild the snapshot from one read transaction and install it.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn refresh(&self, pool: &DbPool) -> Result<Arc<Snapshot>, sqlx::Error> {
        let _serialized = self.refresh_lock.lock().await;

        let mut tx = pool.begin().await?;
        let players = hydrate::load_players(&mut tx).await?;
        let roles = RoleRepo::list(&mut *tx).await?;
        let events = hydrate::load_events(&mut tx).await?;
        let todays_game = GameRepo::find_for_day(&mut *tx, self.club_today()).await?;
        tx.commit().await?;

        let snapshot = Arc::new(Snapshot {
            players,
            roles,
            events,
            todays_game,
            refreshed_at: Utc::now(),
        });
        *self.current.write().await = Arc::clone(&snapshot);

        tracing::debug!(
            players = snapshot.players.len(),
            events = snapshot.events.len(),
            "Cache refreshed"
        );
        Ok(snapshot)
    }
}

/// The calendar day in `timezone` at instant `now`, daylight saving included.
pub fn club_date(now: DateTime<Utc>, timezone: Tz) -> NaiveDate {
    now.with_timezone(&timezone).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linksters_db::create_memory_pool;
    use linksters_db::repositories::player_repo::PlayerFields;
    use linksters_db::repositories::PlayerRepo;

    fn utc() -> Tz {
        chrono_tz::UTC
    }

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn club_date_follows_daylight_saving() {
        let la = chrono_tz::America::Los_Angeles;
        // 00:30 PDT on July 1st; a fixed UTC-8 offset would still say June 30th.
        assert_eq!(
            club_date(at("2024-07-01T07:30:00Z"), la),
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );
        // 23:30 PST on January 14th.
        assert_eq!(
            club_date(at("2024-01-15T07:30:00Z"), la),
            NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
        );
    }

    #[tokio::test]
    async fn starts_empty_and_fills_on_refresh() {
        let pool = create_memory_pool().await.unwrap();
        let cache = Cache::new(utc());
        assert!(cache.snapshot().await.roles.is_empty());

        cache.refresh(&pool).await.unwrap();
        assert_eq!(cache.snapshot().await.roles.len(), 4);
    }

    #[tokio::test]
    async fn held_snapshots_are_not_mutated_by_a_refresh() {
        let pool = create_memory_pool().await.unwrap();
        let cache = Cache::new(utc());
        cache.refresh(&pool).await.unwrap();
        let before = cache.snapshot().await;

        let fields = PlayerFields {
            name: "Pat",
            preferred_name: "Pat",
            phone: "+14155550123",
            email: None,
            ghin_number: None,
        };
        let pat = PlayerRepo::create(&pool, &fields).await.unwrap();
        cache.refresh(&pool).await.unwrap();

        assert!(before.player(pat.id).is_none());
        assert!(cache.snapshot().await.player(pat.id).is_some());
        assert!(cache.snapshot().await.refreshed_at >= before.refreshed_at);
    }
}
