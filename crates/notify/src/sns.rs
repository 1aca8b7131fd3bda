//! Amazon SNS implementation of [`NotificationBridge`].
//!
//! Channels are SNS topics, subscriptions use the `sms` protocol with the
//! phone number as endpoint, and direct texts publish to a phone number.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;
use linksters_core::phone::E164;

use crate::{
    BridgeError, BridgeOp, ChannelHandle, MessageHandle, NotificationBridge, SubscriptionHandle,
};

const SMS_PROTOCOL: &str = "sms";

pub struct SnsBridge {
    client: Client,
}

impl SnsBridge {
    /// Build a client from the default AWS credential chain for `region`.
    pub async fn from_env(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        tracing::info!(region, "SNS notification bridge configured");
        Self::new(Client::new(&config))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn remote<E>(operation: BridgeOp, err: E) -> BridgeError
where
    E: std::error::Error,
{
    BridgeError::Remote {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn unknown(operation: BridgeOp, handle: &str) -> BridgeError {
    BridgeError::UnknownHandle {
        operation,
        handle: handle.to_string(),
    }
}

fn handle(operation: BridgeOp, value: Option<&str>) -> Result<String, BridgeError> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(BridgeError::MissingHandle { operation }),
    }
}

#[async_trait]
impl NotificationBridge for SnsBridge {
    async fn create_channel(&self, name: &str) -> Result<ChannelHandle, BridgeError> {
        let op = BridgeOp::CreateChannel;
        let out = self
            .client
            .create_topic()
            .name(name)
            .send()
            .await
            .map_err(|e| remote(op, e))?;
        let arn = handle(op, out.topic_arn())?;
        tracing::debug!(channel = %arn, name, "SNS topic created");
        Ok(ChannelHandle::new(arn))
    }

    async fn delete_channel(&self, channel: &ChannelHandle) -> Result<(), BridgeError> {
        let op = BridgeOp::DeleteChannel;
        self.client
            .delete_topic()
            .topic_arn(channel.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|err| err.is_not_found_exception()) {
                    unknown(op, channel.as_str())
                } else {
                    remote(op, e)
                }
            })?;
        tracing::debug!(channel = %channel, "SNS topic deleted");
        Ok(())
    }

    async fn subscribe(
        &self,
        phone: &E164,
        channel: &ChannelHandle,
    ) -> Result<SubscriptionHandle, BridgeError> {
        let op = BridgeOp::Subscribe;
        let out = self
            .client
            .subscribe()
            .topic_arn(channel.as_str())
            .protocol(SMS_PROTOCOL)
            .endpoint(phone.as_str())
            .return_subscription_arn(true)
            .send()
            .await
            .map_err(|e| remote(op, e))?;
        let arn = handle(op, out.subscription_arn())?;
        tracing::debug!(channel = %channel, subscription = %arn, "SNS subscription created");
        Ok(SubscriptionHandle::new(arn))
    }

    async fn unsubscribe(&self, subscription: &SubscriptionHandle) -> Result<(), BridgeError> {
        let op = BridgeOp::Unsubscribe;
        self.client
            .unsubscribe()
            .subscription_arn(subscription.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|err| err.is_not_found_exception()) {
                    unknown(op, subscription.as_str())
                } else {
                    remote(op, e)
                }
            })?;
        tracing::debug!(subscription = %subscription, "SNS subscription removed");
        Ok(())
    }

    async fn send_to_recipient(&self, text: &str, phone: &E164) -> Result<MessageHandle, BridgeError> {
        let op = BridgeOp::SendToRecipient;
        let out = self
            .client
            .publish()
            .message(text)
            .phone_number(phone.as_str())
            .send()
            .await
            .map_err(|e| remote(op, e))?;
        Ok(MessageHandle::new(handle(op, out.message_id())?))
    }

    async fn send_to_channel(
        &self,
        text: &str,
        channel: &ChannelHandle,
    ) -> Result<MessageHandle, BridgeError> {
        let op = BridgeOp::SendToChannel;
        let out = self
            .client
            .publish()
            .message(text)
            .topic_arn(channel.as_str())
            .send()
            .await
            .map_err(|e| remote(op, e))?;
        Ok(MessageHandle::new(handle(op, out.message_id())?))
    }
}
