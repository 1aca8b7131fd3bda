//! Deadline decorator for any [`NotificationBridge`].
//!
//! A call that overruns is abandoned and reported as
//! [`BridgeError::Timeout`]; it is never retried. The remote side may still
//! complete the abandoned call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use linksters_core::phone::E164;

use crate::{
    BridgeError, BridgeOp, ChannelHandle, MessageHandle, NotificationBridge, SubscriptionHandle,
};

/// Default per-call deadline.
pub const DEFAULT_BRIDGE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TimeoutBridge {
    inner: Arc<dyn NotificationBridge>,
    timeout: Duration,
}

impl TimeoutBridge {
    pub fn new(inner: Arc<dyn NotificationBridge>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, operation: BridgeOp, call: F) -> Result<T, BridgeError>
    where
        F: Future<Output = Result<T, BridgeError>> + Send,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(operation = %operation, after = ?self.timeout, "Bridge call timed out");
                Err(BridgeError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl NotificationBridge for TimeoutBridge {
    async fn create_channel(&self, name: &str) -> Result<ChannelHandle, BridgeError> {
        self.bounded(BridgeOp::CreateChannel, self.inner.create_channel(name))
            .await
    }

    async fn delete_channel(&self, channel: &ChannelHandle) -> Result<(), BridgeError> {
        self.bounded(BridgeOp::DeleteChannel, self.inner.delete_channel(channel))
            .await
    }

    async fn subscribe(
        &self,
        phone: &E164,
        channel: &ChannelHandle,
    ) -> Result<SubscriptionHandle, BridgeError> {
        self.bounded(BridgeOp::Subscribe, self.inner.subscribe(phone, channel))
            .await
    }

    async fn unsubscribe(&self, subscription: &SubscriptionHandle) -> Result<(), BridgeError> {
        self.bounded(BridgeOp::Unsubscribe, self.inner.unsubscribe(subscription))
            .await
    }

    async fn send_to_recipient(&self, text: &str, phone: &E164) -> Result<MessageHandle, BridgeError> {
        self.bounded(BridgeOp::SendToRecipient, self.inner.send_to_recipient(text, phone))
            .await
    }

    async fn send_to_channel(
        &self,
        text: &str,
        channel: &ChannelHandle,
    ) -> Result<MessageHandle, BridgeError> {
        self.bounded(BridgeOp::SendToChannel, self.inner.send_to_channel(text, channel))
            .await
    }
}
