//! Events, memberships and event messages.
//!
//! Each event owns one broadcast channel, created with the event and deleted
//! with it, and each membership owns one subscription to that channel. The
//! owner is always a paid member.
//!
//! ```text
//! create_event:  channel -> event row -> owner subscription -> owner row -> welcome
//! add_member:    subscription -> member row -> welcome
//! delete_event:  per member (notice, unsubscribe, row) -> channel -> rows (forward-only)
//! delete_member: unsubscribe -> notice -> row                             (forward-only)
//! ```

use std::sync::Arc;

use chrono::Utc;
use linksters_core::notices;
use linksters_core::phone::{self, E164};
use linksters_core::types::DbId;
use linksters_core::validation;
use linksters_db::hydrate;
use linksters_db::models::event::{
    CreateEvent, Event, EventDetail, EventMember, EventMessageDetail, NewEvent, UpdateEvent,
};
use linksters_db::models::player::Player;
use linksters_db::repositories::{EventMemberRepo, EventMessageRepo, EventRepo, PlayerRepo};
use linksters_notify::{BridgeError, ChannelHandle, MessageHandle, SubscriptionHandle};

use super::saga::{Compensation, Saga};
use super::SyncContext;
use crate::error::{AppError, AppResult};

pub struct EventRegistry {
    ctx: Arc<SyncContext>,
    main_channel: ChannelHandle,
}

impl EventRegistry {
    pub fn new(ctx: Arc<SyncContext>, main_channel: ChannelHandle) -> Self {
        Self { ctx, main_channel }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Create an event with its channel and make the owner a paid member.
    ///
    /// Any failure undoes every completed step, so either the whole event
    /// exists afterwards or nothing does.
    pub async fn create_event(&self, input: CreateEvent) -> AppResult<EventDetail> {
        let name = input.name.trim().to_string();
        validation::require_text("name", &name)?;
        validation::non_negative_amount("cost", input.cost)?;
        let channel_name = notices::channel_name(&name).ok_or_else(|| {
            AppError::validation(format!("'{name}' cannot be used as a channel name"))
        })?;

        let ctx = &self.ctx;
        let owner = self.find_player(input.owner_id).await?;
        let owner_phone = phone::normalize(&owner.phone)?;

        let existing = ctx.store(EventRepo::list(&ctx.pool)).await?;
        if let Some(clash) = existing
            .iter()
            .find(|e| notices::channel_name(&e.name).as_deref() == Some(channel_name.as_str()))
        {
            return Err(AppError::conflict(format!(
                "event '{}' already uses the channel name '{channel_name}'",
                clash.name
            )));
        }

        let mut saga = Saga::new(ctx, "create_event");
        let outcome = self
            .create_event_steps(&mut saga, &input, &channel_name, &existing, &owner, &owner_phone)
            .await;
        let event = saga.settle(outcome).await?;
        tracing::info!(event_id = event.id, channel = %event.topic, "Event created");

        ctx.refresh().await?;
        self.get_event_by_id(event.id).await
    }

    async fn create_event_steps(
        &self,
        saga: &mut Saga<'_>,
        input: &CreateEvent,
        channel_name: &str,
        existing: &[Event],
        owner: &Player,
        owner_phone: &E164,
    ) -> AppResult<Event> {
        let ctx = &self.ctx;

        // Creating a channel is idempotent on the provider: an existing
        // channel comes back as is and must not be adopted or deleted.
        let channel = ctx.bridge.create_channel(channel_name).await?;
        if channel == self.main_channel || existing.iter().any(|e| e.topic == channel.as_str()) {
            return Err(AppError::conflict(format!(
                "channel '{channel_name}' is already in use"
            )));
        }
        saga.record(Compensation::DeleteChannel(channel.clone()));

        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let row = NewEvent {
            name: input.name.trim(),
            date: input.date,
            paid_event: input.paid_event,
            cost: input.cost,
            topic: channel.as_str(),
            description,
            owner_id: owner.id,
            invite_only: input.invite_only,
        };
        let event = ctx.store(EventRepo::create(&ctx.pool, &row)).await?;
        saga.record(Compensation::DeleteEventRow(event.id));

        self.add_member_steps(saga, &event, owner, owner_phone, true, owner)
            .await?;
        Ok(event)
    }

    /// Change an event's date, description, cost, flags or owner.
    ///
    /// The name and channel are fixed. A new owner becomes a paid member:
    /// added if absent, marked paid otherwise.
    pub async fn update_event(&self, id: DbId, input: UpdateEvent) -> AppResult<EventDetail> {
        if let Some(cost) = input.cost {
            validation::non_negative_amount("cost", cost)?;
        }
        let ctx = &self.ctx;
        let event = self.find_event(id).await?;

        let new_owner = match input.owner_id {
            Some(owner_id) if owner_id != event.owner_id => {
                let owner = self.find_player(owner_id).await?;
                let phone = phone::normalize(&owner.phone)?;
                Some((owner, phone))
            }
            _ => None,
        };

        let mut saga = Saga::new(ctx, "update_event");
        let outcome = self
            .update_event_steps(&mut saga, &event, &input, new_owner.as_ref())
            .await;
        saga.settle(outcome).await?;
        tracing::info!(event_id = id, "Event updated");

        ctx.refresh().await?;
        self.get_event_by_id(id).await
    }

    async fn update_event_steps(
        &self,
        saga: &mut Saga<'_>,
        event: &Event,
        input: &UpdateEvent,
        new_owner: Option<&(Player, E164)>,
    ) -> AppResult<()> {
        let ctx = &self.ctx;

        if let Some((owner, phone)) = new_owner {
            let membership = ctx
                .store(EventMemberRepo::find(&ctx.pool, event.id, owner.id))
                .await?;
            match membership {
                None => {
                    self.add_member_steps(saga, event, owner, phone, true, owner)
                        .await?;
                }
                Some(member) if !member.paid => {
                    ctx.store(EventMemberRepo::set_paid(&ctx.pool, event.id, owner.id, true))
                        .await?;
                    saga.record(Compensation::RestoreMemberPaid {
                        event_id: event.id,
                        player_id: owner.id,
                        paid: false,
                    });
                    let text = notices::payment_updated(&event.name, true, event.cost);
                    ctx.bridge.send_to_recipient(&text, phone).await?;
                }
                Some(_) => {}
            }
        }

        let mut input = input.clone();
        input.description = input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        ctx.store(EventRepo::update(&ctx.pool, event.id, &input))
            .await?
            .ok_or(AppError::not_found("Event", event.id))?;
        Ok(())
    }

    /// Notify, unsubscribe and drop every member, delete the channel, then
    /// the messages and the event row.
    ///
    /// Runs forward-only: the first failure stops the teardown and is
    /// returned, and nothing already done is undone. Each member row goes as
    /// soon as that member is released, so calling this again picks up where
    /// the failed run stopped.
    pub async fn delete_event(&self, id: DbId) -> AppResult<()> {
        let ctx = &self.ctx;
        let detail = self.get_event_by_id(id).await?;
        let event = &detail.event;

        let outcome: AppResult<()> = async {
            let text = notices::event_deleted(&event.name);
            for member in &detail.members {
                let phone = phone::normalize(&member.player.phone)?;
                ctx.bridge.send_to_recipient(&text, &phone).await?;
                already_released(
                    ctx.bridge
                        .unsubscribe(&SubscriptionHandle::new(member.subscription.clone()))
                        .await,
                )?;
                ctx.store(EventMemberRepo::delete(&ctx.pool, id, member.player.id))
                    .await?;
                tracing::debug!(event_id = id, player_id = member.player.id, "Member released");
            }

            already_released(
                ctx.bridge
                    .delete_channel(&ChannelHandle::new(event.topic.clone()))
                    .await,
            )?;

            let mut tx = ctx.store(ctx.pool.begin()).await?;
            ctx.store(EventMemberRepo::delete_for_event(&mut *tx, id)).await?;
            let messages = ctx.store(EventMessageRepo::delete_for_event(&mut *tx, id)).await?;
            let events = ctx.store(EventRepo::delete(&mut *tx, id)).await?;
            if events == 0 {
                return Err(AppError::conflict("no event deleted"));
            }
            ctx.store(tx.commit()).await?;
            tracing::info!(event_id = id, members = detail.members.len(), messages, "Event deleted");
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => ctx.refresh().await,
            Err(e) => Err(ctx.fail(e).await),
        }
    }

    /// Hydrate an event from the store.
    pub async fn get_event_by_id(&self, id: DbId) -> AppResult<EventDetail> {
        let event = self.find_event(id).await?;
        self.hydrate(event).await
    }

    /// Hydrate the oldest event with exactly this name from the store.
    ///
    /// Names carry no numeric id, so a miss is reported as a missing row.
    pub async fn get_event_by_name(&self, name: &str) -> AppResult<EventDetail> {
        let ctx = &self.ctx;
        let event = ctx
            .store(EventRepo::find_by_name(&ctx.pool, name))
            .await?
            .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;
        self.hydrate(event).await
    }

    /// All events with members and messages, from the cache.
    pub async fn list_events(&self) -> Vec<EventDetail> {
        self.ctx.cache.snapshot().await.events.clone()
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    /// Subscribe a player to the event's channel, record the membership and
    /// send them a welcome text.
    pub async fn add_member(&self, event_id: DbId, player_id: DbId, paid: bool) -> AppResult<EventMember> {
        let ctx = &self.ctx;
        let event = self.find_event(event_id).await?;
        let player = self.find_player(player_id).await?;
        let phone = phone::normalize(&player.phone)?;

        if ctx
            .store(EventMemberRepo::find(&ctx.pool, event_id, player_id))
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "player {player_id} is already a member of event {event_id}"
            )));
        }
        let owner = self.find_player(event.owner_id).await?;

        let mut saga = Saga::new(ctx, "add_member");
        let outcome = self
            .add_member_steps(&mut saga, &event, &player, &phone, paid, &owner)
            .await;
        let member = saga.settle(outcome).await?;

        ctx.refresh().await?;
        Ok(member)
    }

    async fn add_member_steps(
        &self,
        saga: &mut Saga<'_>,
        event: &Event,
        player: &Player,
        phone: &E164,
        paid: bool,
        owner: &Player,
    ) -> AppResult<EventMember> {
        let ctx = &self.ctx;
        let channel = ChannelHandle::new(event.topic.clone());

        let subscription = ctx.bridge.subscribe(phone, &channel).await?;
        saga.record(Compensation::Unsubscribe(subscription.clone()));

        let member = ctx
            .store(EventMemberRepo::insert(
                &ctx.pool,
                event.id,
                player.id,
                paid,
                subscription.as_str(),
            ))
            .await?;
        saga.record(Compensation::DeleteMemberRow {
            event_id: event.id,
            player_id: player.id,
        });

        let text = notices::member_added(&event.name, paid, event.cost, &owner.preferred_name);
        ctx.bridge.send_to_recipient(&text, phone).await?;

        tracing::info!(
            event_id = event.id,
            player_id = player.id,
            paid,
            subscription = %subscription,
            "Member added"
        );
        Ok(member)
    }

    /// Set a member's paid flag and text them the new state.
    ///
    /// The text goes out on every call, even when the flag did not change.
    pub async fn update_member(&self, event_id: DbId, player_id: DbId, paid: bool) -> AppResult<EventMember> {
        let ctx = &self.ctx;
        let event = self.find_event(event_id).await?;
        let member = ctx
            .store(EventMemberRepo::find(&ctx.pool, event_id, player_id))
            .await?
            .ok_or(AppError::not_found("EventMember", player_id))?;
        let player = self.find_player(player_id).await?;
        let phone = phone::normalize(&player.phone)?;

        let mut saga = Saga::new(ctx, "update_member");
        let outcome: AppResult<()> = async {
            ctx.store(EventMemberRepo::set_paid(&ctx.pool, event_id, player_id, paid))
                .await?;
            saga.record(Compensation::RestoreMemberPaid {
                event_id,
                player_id,
                paid: member.paid,
            });
            let text = notices::payment_updated(&event.name, paid, event.cost);
            ctx.bridge.send_to_recipient(&text, &phone).await?;
            Ok::<(), AppError>(())
        }
        .await;
        saga.settle(outcome).await?;
        tracing::info!(event_id, player_id, paid, "Member payment updated");

        ctx.refresh().await?;
        Ok(EventMember { paid, ..member })
    }

    /// Unsubscribe a member, tell them, and delete the membership row.
    ///
    /// A player who is not in the event's member list gets no bridge calls;
    /// the row delete still runs and finding nothing is `NotFound`. The owner
    /// cannot be removed. Runs forward-only.
    pub async fn delete_member(&self, event_id: DbId, player_id: DbId) -> AppResult<()> {
        let ctx = &self.ctx;
        let detail = self.get_event_by_id(event_id).await?;
        if detail.event.owner_id == player_id {
            return Err(AppError::conflict(
                "the event owner cannot be removed; transfer ownership first",
            ));
        }

        let outcome: AppResult<()> = async {
            match detail.member(player_id) {
                Some(member) => {
                    ctx.bridge
                        .unsubscribe(&SubscriptionHandle::new(member.subscription.clone()))
                        .await?;
                    let phone = phone::normalize(&member.player.phone)?;
                    let text = notices::member_removed(&detail.event.name);
                    ctx.bridge.send_to_recipient(&text, &phone).await?;
                }
                None => {
                    tracing::warn!(event_id, player_id, "Removing a player not listed as a member");
                }
            }

            let removed = ctx
                .store(EventMemberRepo::delete(&ctx.pool, event_id, player_id))
                .await?;
            if removed == 0 {
                return Err(AppError::not_found("EventMember", player_id));
            }
            tracing::info!(event_id, player_id, "Member removed");
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => ctx.refresh().await,
            Err(e) => Err(ctx.fail(e).await),
        }
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Publish a message to the event channel and append it to the log.
    ///
    /// The publish happens first so no record exists without a provider
    /// message id. The record keeps the body as typed; the published text
    /// carries the sender prefix.
    pub async fn send_event_message(
        &self,
        event_id: DbId,
        sender_id: DbId,
        body: &str,
    ) -> AppResult<EventMessageDetail> {
        let body = body.trim();
        validation::require_text("body", body)?;

        let ctx = &self.ctx;
        let event = self.find_event(event_id).await?;
        let sender = self.find_player(sender_id).await?;

        let text = notices::message_from(&sender.preferred_name, body);
        let message: MessageHandle = ctx
            .bridge
            .send_to_channel(&text, &ChannelHandle::new(event.topic.clone()))
            .await?;

        let row = match ctx
            .store(EventMessageRepo::insert(
                &ctx.pool,
                event_id,
                sender_id,
                body,
                Utc::now(),
                message.as_str(),
            ))
            .await
        {
            Ok(row) => row,
            Err(e) => {
                tracing::error!(
                    event_id,
                    message = %message,
                    error = %e,
                    "Message published but not recorded"
                );
                return Err(ctx.fail(e).await);
            }
        };
        tracing::info!(event_id, sender_id, message = %message, "Event message sent");

        ctx.refresh().await?;
        Ok(EventMessageDetail {
            id: row.id,
            sender,
            body: row.body,
            date: row.date,
            message_handle: row.message_handle,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn find_event(&self, id: DbId) -> AppResult<Event> {
        let ctx = &self.ctx;
        ctx.store(EventRepo::find_by_id(&ctx.pool, id))
            .await?
            .ok_or(AppError::not_found("Event", id))
    }

    async fn find_player(&self, id: DbId) -> AppResult<Player> {
        let ctx = &self.ctx;
        ctx.store(PlayerRepo::find_by_id(&ctx.pool, id))
            .await?
            .ok_or(AppError::not_found("Player", id))
    }

    async fn hydrate(&self, event: Event) -> AppResult<EventDetail> {
        let ctx = &self.ctx;
        let mut conn = ctx.store(ctx.pool.acquire()).await?;
        ctx.store(hydrate::load_event(&mut conn, event)).await
    }
}

/// Teardown treats a handle the provider no longer knows as released.
fn already_released(result: Result<(), BridgeError>) -> Result<(), BridgeError> {
    match result {
        Err(BridgeError::UnknownHandle { operation, handle }) => {
            tracing::warn!(operation = %operation, handle = %handle, "Handle already released");
            Ok(())
        }
        other => other,
    }
}
