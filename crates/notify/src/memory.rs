//! In-process [`NotificationBridge`] that records every successful call.
//!
//! Channels and subscriptions are tracked so callers can assert on live
//! state, and any operation can be made to fail to exercise error paths.
//! Failed calls change nothing and are not recorded.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use linksters_core::phone::E164;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    BridgeError, BridgeOp, ChannelHandle, MessageHandle, NotificationBridge, SubscriptionHandle,
};

const CHANNEL_PREFIX: &str = "memory:channel:";

/// One successful bridge call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeCall {
    CreateChannel { name: String, channel: ChannelHandle },
    DeleteChannel { channel: ChannelHandle },
    Subscribe { phone: E164, channel: ChannelHandle, subscription: SubscriptionHandle },
    Unsubscribe { subscription: SubscriptionHandle },
    SendToRecipient { phone: E164, text: String, message: MessageHandle },
    SendToChannel { channel: ChannelHandle, text: String, message: MessageHandle },
}

impl BridgeCall {
    pub fn op(&self) -> BridgeOp {
        match self {
            BridgeCall::CreateChannel { .. } => BridgeOp::CreateChannel,
            BridgeCall::DeleteChannel { .. } => BridgeOp::DeleteChannel,
            BridgeCall::Subscribe { .. } => BridgeOp::Subscribe,
            BridgeCall::Unsubscribe { .. } => BridgeOp::Unsubscribe,
            BridgeCall::SendToRecipient { .. } => BridgeOp::SendToRecipient,
            BridgeCall::SendToChannel { .. } => BridgeOp::SendToChannel,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<BridgeCall>,
    channels: HashSet<ChannelHandle>,
    /// Live subscription -> (phone, channel).
    subscriptions: HashMap<SubscriptionHandle, (E164, ChannelHandle)>,
    /// Operations that fail until cleared.
    failing: HashSet<BridgeOp>,
    /// Operations that fail on their next call only.
    fail_once: HashSet<BridgeOp>,
}

#[derive(Debug, Default)]
pub struct MemoryBridge {
    state: Mutex<State>,
    latency: Option<Duration>,
}

impl MemoryBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it takes effect.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Make every call to `op` fail until [`Self::clear_failures`].
    pub async fn fail(&self, op: BridgeOp) {
        self.state.lock().await.failing.insert(op);
    }

    /// Make only the next call to `op` fail.
    pub async fn fail_next(&self, op: BridgeOp) {
        self.state.lock().await.fail_once.insert(op);
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failing.clear();
        state.fail_once.clear();
    }

    pub async fn calls(&self) -> Vec<BridgeCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn count(&self, op: BridgeOp) -> usize {
        self.state.lock().await.calls.iter().filter(|c| c.op() == op).count()
    }

    /// Forget recorded calls; live channels and subscriptions are kept.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Direct texts received by `phone`, oldest first.
    pub async fn texts_to(&self, phone: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                BridgeCall::SendToRecipient { phone: p, text, .. } if p.as_str() == phone => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Texts published to `channel`, oldest first.
    pub async fn channel_texts(&self, channel: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                BridgeCall::SendToChannel { channel: ch, text, .. } if ch.as_str() == channel => {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub async fn channel_exists(&self, channel: &str) -> bool {
        self.state
            .lock()
            .await
            .channels
            .contains(&ChannelHandle::new(channel))
    }

    pub async fn subscription_is_live(&self, subscription: &str) -> bool {
        self.state
            .lock()
            .await
            .subscriptions
            .contains_key(&SubscriptionHandle::new(subscription))
    }

    /// Phones currently subscribed to `channel`, sorted.
    pub async fn subscribers(&self, channel: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let mut phones: Vec<String> = state
            .subscriptions
            .values()
            .filter(|(_, ch)| ch.as_str() == channel)
            .map(|(phone, _)| phone.as_str().to_string())
            .collect();
        phones.sort();
        phones
    }

    pub async fn live_subscription_count(&self) -> usize {
        self.state.lock().await.subscriptions.len()
    }

    async fn begin(&self, op: BridgeOp) -> Result<tokio::sync::MutexGuard<'_, State>, BridgeError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().await;
        if state.failing.contains(&op) || state.fail_once.remove(&op) {
            tracing::debug!(operation = %op, "Injected bridge failure");
            return Err(rejected(op, "injected failure"));
        }
        Ok(state)
    }
}

fn rejected(operation: BridgeOp, reason: impl Into<String>) -> BridgeError {
    BridgeError::Rejected {
        operation,
        reason: reason.into(),
    }
}

fn unknown(operation: BridgeOp, handle: impl std::fmt::Display) -> BridgeError {
    BridgeError::UnknownHandle {
        operation,
        handle: handle.to_string(),
    }
}

#[async_trait]
impl NotificationBridge for MemoryBridge {
    /// Creating a channel that already exists returns the existing handle.
    async fn create_channel(&self, name: &str) -> Result<ChannelHandle, BridgeError> {
        let mut state = self.begin(BridgeOp::CreateChannel).await?;
        if name.is_empty() {
            return Err(rejected(BridgeOp::CreateChannel, "empty channel name"));
        }
        let channel = ChannelHandle::new(format!("{CHANNEL_PREFIX}{name}"));
        state.channels.insert(channel.clone());
        state.calls.push(BridgeCall::CreateChannel {
            name: name.to_string(),
            channel: channel.clone(),
        });
        tracing::debug!(channel = %channel, "Channel created");
        Ok(channel)
    }

    /// Deleting a channel drops its subscriptions too.
    async fn delete_channel(&self, channel: &ChannelHandle) -> Result<(), BridgeError> {
        let mut state = self.begin(BridgeOp::DeleteChannel).await?;
        if !state.channels.remove(channel) {
            return Err(unknown(BridgeOp::DeleteChannel, channel));
        }
        state.subscriptions.retain(|_, (_, ch)| ch != channel);
        state.calls.push(BridgeCall::DeleteChannel {
            channel: channel.clone(),
        });
        tracing::debug!(channel = %channel, "Channel deleted");
        Ok(())
    }

    async fn subscribe(
        &self,
        phone: &E164,
        channel: &ChannelHandle,
    ) -> Result<SubscriptionHandle, BridgeError> {
        let mut state = self.begin(BridgeOp::Subscribe).await?;
        if !state.channels.contains(channel) {
            return Err(unknown(BridgeOp::Subscribe, channel));
        }
        let subscription = SubscriptionHandle::new(format!("{channel}:{}", Uuid::new_v4()));
        state
            .subscriptions
            .insert(subscription.clone(), (phone.clone(), channel.clone()));
        state.calls.push(BridgeCall::Subscribe {
            phone: phone.clone(),
            channel: channel.clone(),
            subscription: subscription.clone(),
        });
        tracing::debug!(channel = %channel, subscription = %subscription, "Subscribed");
        Ok(subscription)
    }

    async fn unsubscribe(&self, subscription: &SubscriptionHandle) -> Result<(), BridgeError> {
        let mut state = self.begin(BridgeOp::Unsubscribe).await?;
        if state.subscriptions.remove(subscription).is_none() {
            return Err(unknown(BridgeOp::Unsubscribe, subscription));
        }
        state.calls.push(BridgeCall::Unsubscribe {
            subscription: subscription.clone(),
        });
        tracing::debug!(subscription = %subscription, "Unsubscribed");
        Ok(())
    }

    async fn send_to_recipient(&self, text: &str, phone: &E164) -> Result<MessageHandle, BridgeError> {
        let mut state = self.begin(BridgeOp::SendToRecipient).await?;
        let message = MessageHandle::new(Uuid::new_v4().to_string());
        state.calls.push(BridgeCall::SendToRecipient {
            phone: phone.clone(),
            text: text.to_string(),
            message: message.clone(),
        });
        tracing::debug!(message = %message, "Text sent to recipient");
        Ok(message)
    }

    async fn send_to_channel(
        &self,
        text: &str,
        channel: &ChannelHandle,
    ) -> Result<MessageHandle, BridgeError> {
        let mut state = self.begin(BridgeOp::SendToChannel).await?;
        if !state.channels.contains(channel) {
            return Err(unknown(BridgeOp::SendToChannel, channel));
        }
        let message = MessageHandle::new(Uuid::new_v4().to_string());
        state.calls.push(BridgeCall::SendToChannel {
            channel: channel.clone(),
            text: text.to_string(),
            message: message.clone(),
        });
        tracing::debug!(channel = %channel, message = %message, "Text published to channel");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use linksters_core::phone::normalize;

    fn phone() -> E164 {
        normalize("4155550123").unwrap()
    }

    #[tokio::test]
    async fn subscription_lifecycle_is_tracked() {
        let bridge = MemoryBridge::new();
        let channel = bridge.create_channel("Skins").await.unwrap();
        let sub = bridge.subscribe(&phone(), &channel).await.unwrap();

        assert!(bridge.subscription_is_live(sub.as_str()).await);
        assert_eq!(bridge.subscribers(channel.as_str()).await, ["+14155550123"]);

        bridge.unsubscribe(&sub).await.unwrap();
        assert!(!bridge.subscription_is_live(sub.as_str()).await);
        assert_matches!(
            bridge.unsubscribe(&sub).await,
            Err(BridgeError::UnknownHandle { operation: BridgeOp::Unsubscribe, .. })
        );
    }

    #[tokio::test]
    async fn deleting_a_channel_drops_its_subscriptions() {
        let bridge = MemoryBridge::new();
        let channel = bridge.create_channel("Skins").await.unwrap();
        bridge.subscribe(&phone(), &channel).await.unwrap();

        bridge.delete_channel(&channel).await.unwrap();
        assert!(!bridge.channel_exists(channel.as_str()).await);
        assert_eq!(bridge.live_subscription_count().await, 0);
        assert_matches!(
            bridge.send_to_channel("hi", &channel).await,
            Err(BridgeError::UnknownHandle { operation: BridgeOp::SendToChannel, .. })
        );
        assert_matches!(
            bridge.delete_channel(&channel).await,
            Err(BridgeError::UnknownHandle { operation: BridgeOp::DeleteChannel, .. })
        );
    }

    #[tokio::test]
    async fn injected_failures_change_nothing() {
        let bridge = MemoryBridge::new();
        bridge.fail_next(BridgeOp::CreateChannel).await;

        assert_matches!(
            bridge.create_channel("Skins").await,
            Err(BridgeError::Rejected { operation: BridgeOp::CreateChannel, .. })
        );
        assert!(bridge.calls().await.is_empty());
        assert!(bridge.create_channel("Skins").await.is_ok());

        bridge.fail(BridgeOp::SendToRecipient).await;
        assert!(bridge.send_to_recipient("a", &phone()).await.is_err());
        assert!(bridge.send_to_recipient("b", &phone()).await.is_err());
        bridge.clear_failures().await;
        bridge.send_to_recipient("c", &phone()).await.unwrap();
        assert_eq!(bridge.texts_to("+14155550123").await, ["c"]);
    }

    #[tokio::test]
    async fn channel_texts_are_kept_per_channel() {
        let bridge = MemoryBridge::new();
        let a = bridge.create_channel("A").await.unwrap();
        let b = bridge.create_channel("B").await.unwrap();
        bridge.send_to_channel("one", &a).await.unwrap();
        bridge.send_to_channel("two", &b).await.unwrap();

        assert_eq!(bridge.channel_texts(a.as_str()).await, ["one"]);
        assert_eq!(bridge.count(BridgeOp::SendToChannel).await, 2);
    }
}
