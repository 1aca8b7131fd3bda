//! Players, roles and the club-wide channel.
//!
//! A player's main-channel subscription follows their role set: it exists
//! exactly when one of their roles grants [`Capability::ClubBroadcasts`].
//! [`Directory::reconcile`] is the single place that enforces this and it
//! only calls the bridge when the stored state disagrees with the roles, so
//! repeating an update is free. Mutations of one player are serialized so two
//! of them never reconcile against the same stale subscription.

use std::collections::HashMap;
use std::sync::Arc;

use linksters_core::error::CoreError;
use linksters_core::notices;
use linksters_core::phone::{self, E164};
use linksters_core::roles::{self, Capability};
use linksters_core::types::DbId;
use linksters_core::validation;
use linksters_db::hydrate;
use linksters_db::models::player::{CreatePlayer, Player, PlayerWithRoles, UpdatePlayer};
use linksters_db::models::role::Role;
use linksters_db::repositories::player_repo::PlayerFields;
use linksters_db::repositories::{EventMemberRepo, PlayerRepo, RoleRepo};
use linksters_notify::{ChannelHandle, MessageHandle, SubscriptionHandle};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::saga::{Compensation, Saga};
use super::SyncContext;
use crate::error::{AppError, AppResult};

pub struct Directory {
    ctx: Arc<SyncContext>,
    main_channel: ChannelHandle,
    delete_unsubscribes: bool,
    locks: PlayerLocks,
}

/// One async lock per player id.
#[derive(Default)]
struct PlayerLocks {
    locks: Mutex<HashMap<DbId, Arc<Mutex<()>>>>,
}

impl PlayerLocks {
    async fn lock(&self, id: DbId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.locks.lock().await.entry(id).or_default());
        lock.lock_owned().await
    }

    async fn forget(&self, id: DbId) {
        self.locks.lock().await.remove(&id);
    }
}

/// Validated player input.
struct PlayerDraft {
    name: String,
    preferred_name: String,
    phone: E164,
    email: Option<String>,
    ghin_number: Option<String>,
    roles: Vec<Role>,
}

impl PlayerDraft {
    fn fields(&self) -> PlayerFields<'_> {
        PlayerFields {
            name: &self.name,
            preferred_name: &self.preferred_name,
            phone: self.phone.as_str(),
            email: self.email.as_deref(),
            ghin_number: self.ghin_number.as_deref(),
        }
    }

    fn wants_main_subscription(&self) -> bool {
        roles::grants(self.roles.iter().map(|r| r.name.as_str()), Capability::ClubBroadcasts)
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Directory {
    pub fn new(ctx: Arc<SyncContext>, main_channel: ChannelHandle, delete_unsubscribes: bool) -> Self {
        Self {
            ctx,
            main_channel,
            delete_unsubscribes,
            locks: PlayerLocks::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Create a player, grant the requested roles and subscribe them to the
    /// main channel if their roles call for it.
    ///
    /// The player row is committed before the bridge is called. If the
    /// subscription fails the player is kept without one; a later
    /// [`Directory::update_player`] with the same roles subscribes them.
    pub async fn add_player(&self, input: CreatePlayer) -> AppResult<PlayerWithRoles> {
        let draft = self
            .validate(
                input.name,
                input.preferred_name,
                &input.phone,
                input.email,
                input.ghin_number,
                &input.roles,
            )
            .await?;

        let ctx = &self.ctx;
        let mut tx = ctx.store(ctx.pool.begin()).await?;
        let player = ctx.store(PlayerRepo::create(&mut *tx, &draft.fields())).await?;
        for role in &draft.roles {
            ctx.store(RoleRepo::add_member(&mut *tx, role.id, player.id)).await?;
        }
        let _player_lock = self.locks.lock(player.id).await;
        ctx.store(tx.commit()).await?;
        tracing::info!(player_id = player.id, roles = draft.roles.len(), "Player added");

        let mut saga = Saga::new(ctx, "add_player");
        let outcome = self
            .reconcile(&mut saga, &player, &draft.phone, draft.wants_main_subscription())
            .await;
        saga.settle(outcome).await?;

        ctx.refresh().await?;
        self.load_player(player.id).await
    }

    /// Replace a player's fields and role set, then bring the main-channel
    /// subscription in line with the new roles.
    pub async fn update_player(&self, id: DbId, input: UpdatePlayer) -> AppResult<PlayerWithRoles> {
        let draft = self
            .validate(
                input.name,
                input.preferred_name,
                &input.phone,
                input.email,
                input.ghin_number,
                &input.roles,
            )
            .await?;

        let ctx = &self.ctx;
        let _player_lock = self.locks.lock(id).await;
        let before = ctx
            .store(PlayerRepo::find_by_id(&ctx.pool, id))
            .await?
            .ok_or(AppError::not_found("Player", id))?;

        let mut tx = ctx.store(ctx.pool.begin()).await?;
        ctx.store(PlayerRepo::update(&mut *tx, id, &draft.fields()))
            .await?
            .ok_or(AppError::not_found("Player", id))?;
        ctx.store(RoleRepo::remove_all_for_player(&mut *tx, id)).await?;
        for role in &draft.roles {
            ctx.store(RoleRepo::add_member(&mut *tx, role.id, id)).await?;
        }
        ctx.store(tx.commit()).await?;
        tracing::info!(player_id = id, roles = draft.roles.len(), "Player updated");

        let mut saga = Saga::new(ctx, "update_player");
        let outcome = self
            .reconcile(&mut saga, &before, &draft.phone, draft.wants_main_subscription())
            .await;
        saga.settle(outcome).await?;

        ctx.refresh().await?;
        self.load_player(id).await
    }

    /// Delete a player and their role associations.
    ///
    /// The main-channel subscription is left live unless the directory was
    /// built with `delete_unsubscribes`. Players still in an event cannot be
    /// deleted.
    pub async fn delete_player(&self, id: DbId) -> AppResult<()> {
        let ctx = &self.ctx;
        let _player_lock = self.locks.lock(id).await;
        let player = ctx
            .store(PlayerRepo::find_by_id(&ctx.pool, id))
            .await?
            .ok_or(AppError::not_found("Player", id))?;

        let memberships = ctx.store(EventMemberRepo::count_for_player(&ctx.pool, id)).await?;
        if memberships > 0 {
            return Err(AppError::conflict(format!(
                "player {id} is a member of {memberships} event(s); remove them first"
            )));
        }

        let mut tx = ctx.store(ctx.pool.begin()).await?;
        ctx.store(RoleRepo::remove_all_for_player(&mut *tx, id)).await?;
        let deleted = ctx.store(PlayerRepo::delete(&mut *tx, id)).await?;
        if !deleted {
            return Err(AppError::not_found("Player", id));
        }
        ctx.store(tx.commit()).await?;
        self.locks.forget(id).await;
        tracing::info!(player_id = id, "Player deleted");

        if let Some(handle) = player.main_subscription {
            if self.delete_unsubscribes {
                let subscription = SubscriptionHandle::new(handle);
                if let Err(e) = ctx.bridge.unsubscribe(&subscription).await {
                    tracing::error!(
                        player_id = id,
                        subscription = %subscription,
                        error = %e,
                        "Deleted player's main subscription could not be removed"
                    );
                    return Err(ctx.fail(e.into()).await);
                }
                tracing::info!(player_id = id, subscription = %subscription, "Main subscription removed");
            } else {
                tracing::warn!(
                    player_id = id,
                    subscription = %handle,
                    "Deleted player keeps a live main-channel subscription"
                );
            }
        }

        ctx.refresh().await
    }

    /// A player with roles, from the cache.
    pub async fn get_player(&self, id: DbId) -> AppResult<PlayerWithRoles> {
        self.ctx
            .cache
            .snapshot()
            .await
            .player(id)
            .cloned()
            .ok_or(AppError::not_found("Player", id))
    }

    /// All players with roles, from the cache.
    pub async fn list_players(&self) -> Vec<PlayerWithRoles> {
        self.ctx.cache.snapshot().await.players.clone()
    }

    // -----------------------------------------------------------------------
    // Roles
    // -----------------------------------------------------------------------

    pub async fn add_role(&self, name: &str) -> AppResult<Role> {
        let name = name.trim();
        validation::require_text("name", name)?;

        let ctx = &self.ctx;
        if ctx.store(RoleRepo::find_by_name(&ctx.pool, name)).await?.is_some() {
            return Err(AppError::conflict(format!("role '{name}' already exists")));
        }
        let role = ctx.store(RoleRepo::create(&ctx.pool, name)).await?;
        tracing::info!(role_id = role.id, name = %role.name, "Role added");

        ctx.refresh().await?;
        Ok(role)
    }

    /// All roles, from the cache.
    pub async fn list_roles(&self) -> Vec<Role> {
        self.ctx.cache.snapshot().await.roles.clone()
    }

    // -----------------------------------------------------------------------
    // Club-wide messages
    // -----------------------------------------------------------------------

    /// Publish a text to every main-channel subscriber on behalf of a player
    /// allowed to send communications.
    pub async fn broadcast(&self, sender_id: DbId, body: &str) -> AppResult<MessageHandle> {
        validation::require_text("body", body)?;

        let ctx = &self.ctx;
        let mut conn = ctx.store(ctx.pool.acquire()).await?;
        let sender = ctx
            .store(hydrate::load_player(&mut conn, sender_id))
            .await?
            .ok_or(AppError::not_found("Player", sender_id))?;
        drop(conn);

        if !sender.has_capability(Capability::SendCommunications) {
            return Err(CoreError::Forbidden(format!(
                "{} may not send club-wide messages",
                sender.player.preferred_name
            ))
            .into());
        }

        let text = notices::message_from(&sender.player.preferred_name, body.trim());
        let message = ctx.bridge.send_to_channel(&text, &self.main_channel).await?;
        tracing::info!(sender_id, message = %message, "Club-wide message sent");
        Ok(message)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn validate(
        &self,
        name: String,
        preferred_name: String,
        raw_phone: &str,
        email: Option<String>,
        ghin_number: Option<String>,
        role_names: &[String],
    ) -> AppResult<PlayerDraft> {
        validation::require_text("name", &name)?;
        validation::require_text("preferred_name", &preferred_name)?;
        let phone = phone::normalize(raw_phone)?;
        let email = blank_to_none(email);
        validation::optional_email(email.as_deref())?;

        let mut roles: Vec<Role> = Vec::with_capacity(role_names.len());
        for name in role_names {
            let role = self
                .ctx
                .store(RoleRepo::find_by_name(&self.ctx.pool, name.trim()))
                .await?
                .ok_or_else(|| AppError::validation(format!("unknown role '{name}'")))?;
            if !roles.contains(&role) {
                roles.push(role);
            }
        }

        Ok(PlayerDraft {
            name: name.trim().to_string(),
            preferred_name: preferred_name.trim().to_string(),
            phone,
            email,
            ghin_number: blank_to_none(ghin_number),
            roles,
        })
    }

    /// Bring the stored main subscription of `before` in line with `wanted`.
    ///
    /// `before` is the player as stored prior to the mutation; `phone` is the
    /// number the player has now. A subscribed player whose number changed is
    /// moved: the new number is subscribed before the old one is dropped.
    async fn reconcile(
        &self,
        saga: &mut Saga<'_>,
        before: &Player,
        phone: &E164,
        wanted: bool,
    ) -> AppResult<()> {
        let ctx = &self.ctx;
        let player_id = before.id;
        let current = before.main_subscription.clone();
        let phone_changed = before.phone != phone.as_str();

        match (wanted, current) {
            (true, None) => {
                let sub = ctx.bridge.subscribe(phone, &self.main_channel).await?;
                saga.record(Compensation::Unsubscribe(sub.clone()));
                ctx.store(PlayerRepo::set_main_subscription(&ctx.pool, player_id, Some(sub.as_str())))
                    .await?;
                tracing::info!(player_id, subscription = %sub, "Subscribed to main channel");
            }
            (true, Some(old)) if phone_changed => {
                let sub = ctx.bridge.subscribe(phone, &self.main_channel).await?;
                saga.record(Compensation::Unsubscribe(sub.clone()));
                ctx.store(PlayerRepo::set_main_subscription(&ctx.pool, player_id, Some(sub.as_str())))
                    .await?;
                saga.record(Compensation::RestoreMainSubscription {
                    player_id,
                    previous: Some(old.clone()),
                });
                ctx.bridge.unsubscribe(&SubscriptionHandle::new(old.clone())).await?;
                tracing::info!(
                    player_id,
                    old_subscription = %old,
                    subscription = %sub,
                    "Main subscription moved to new phone number"
                );
            }
            (false, Some(old)) => {
                ctx.store(PlayerRepo::set_main_subscription(&ctx.pool, player_id, None))
                    .await?;
                saga.record(Compensation::RestoreMainSubscription {
                    player_id,
                    previous: Some(old.clone()),
                });
                ctx.bridge.unsubscribe(&SubscriptionHandle::new(old.clone())).await?;
                tracing::info!(player_id, subscription = %old, "Unsubscribed from main channel");
            }
            (true, Some(_)) | (false, None) => {}
        }
        Ok(())
    }

    async fn load_player(&self, id: DbId) -> AppResult<PlayerWithRoles> {
        let ctx = &self.ctx;
        let mut conn = ctx.store(ctx.pool.acquire()).await?;
        ctx.store(hydrate::load_player(&mut conn, id))
            .await?
            .ok_or(AppError::not_found("Player", id))
    }
}
