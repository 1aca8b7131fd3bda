//! Compensation log for multi-step mutations spanning the store and the
//! notification bridge.
//!
//! Each step that succeeds and can be undone records its inverse. If a later
//! step fails the log is replayed newest-first. Compensation is best effort:
//! a failing inverse is logged and the remaining ones still run, and the
//! caller always gets the error that started the unwind.

use linksters_core::types::DbId;
use linksters_db::repositories::{EventMemberRepo, EventRepo, PlayerRepo};
use linksters_notify::{ChannelHandle, SubscriptionHandle};

use super::SyncContext;
use crate::error::{AppError, AppResult};

/// The inverse of one completed step.
#[derive(Debug, Clone, PartialEq)]
pub enum Compensation {
    /// A channel was created.
    DeleteChannel(ChannelHandle),
    /// A subscription was created.
    Unsubscribe(SubscriptionHandle),
    /// An event row was inserted.
    DeleteEventRow(DbId),
    /// A membership row was inserted.
    DeleteMemberRow { event_id: DbId, player_id: DbId },
    /// A player's main subscription column was overwritten.
    RestoreMainSubscription { player_id: DbId, previous: Option<String> },
    /// A member's paid flag was overwritten.
    RestoreMemberPaid { event_id: DbId, player_id: DbId, paid: bool },
}

pub struct Saga<'a> {
    ctx: &'a SyncContext,
    operation: &'static str,
    log: Vec<Compensation>,
}

impl<'a> Saga<'a> {
    pub fn new(ctx: &'a SyncContext, operation: &'static str) -> Self {
        Self {
            ctx,
            operation,
            log: Vec::new(),
        }
    }

    pub fn record(&mut self, step: Compensation) {
        self.log.push(step);
    }

    pub fn steps(&self) -> &[Compensation] {
        &self.log
    }

    /// Finish the operation: pass a success through, or unwind and hand back
    /// the error.
    pub async fn settle<T>(self, outcome: AppResult<T>) -> AppResult<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(error) => {
                let ctx = self.ctx;
                let error = self.unwind(error).await;
                Err(ctx.fail(error).await)
            }
        }
    }

    /// Run every recorded compensation, newest first.
    pub async fn unwind(self, error: AppError) -> AppError {
        if self.log.is_empty() {
            return error;
        }
        tracing::warn!(
            operation = self.operation,
            steps = self.log.len(),
            error = %error,
            "Operation failed, compensating"
        );
        for step in self.log.iter().rev() {
            if let Err(e) = self.compensate(step).await {
                tracing::error!(
                    operation = self.operation,
                    step = ?step,
                    error = %e,
                    "Compensation failed, manual reconciliation required"
                );
            }
        }
        error
    }

    async fn compensate(&self, step: &Compensation) -> AppResult<()> {
        let ctx = self.ctx;
        match step {
            Compensation::DeleteChannel(channel) => {
                ctx.bridge.delete_channel(channel).await?;
            }
            Compensation::Unsubscribe(subscription) => {
                ctx.bridge.unsubscribe(subscription).await?;
            }
            Compensation::DeleteEventRow(event_id) => {
                ctx.store(EventRepo::delete(&ctx.pool, *event_id)).await?;
            }
            Compensation::DeleteMemberRow { event_id, player_id } => {
                ctx.store(EventMemberRepo::delete(&ctx.pool, *event_id, *player_id))
                    .await?;
            }
            Compensation::RestoreMainSubscription { player_id, previous } => {
                ctx.store(PlayerRepo::set_main_subscription(
                    &ctx.pool,
                    *player_id,
                    previous.as_deref(),
                ))
                .await?;
            }
            Compensation::RestoreMemberPaid {
                event_id,
                player_id,
                paid,
            } => {
                ctx.store(EventMemberRepo::set_paid(&ctx.pool, *event_id, *player_id, *paid))
                    .await?;
            }
        }
        tracing::debug!(operation = self.operation, step = ?step, "Compensated");
        Ok(())
    }
}
