//! SMS notification bridge.
//!
//! - [`NotificationBridge`]: the six operations the club needs from a
//!   pub/sub SMS provider (channels, per-phone subscriptions, direct and
//!   channel publishes).
//! - [`SnsBridge`]: Amazon SNS implementation.
//! - [`MemoryBridge`]: in-process implementation that records every call,
//!   used for local development and tests.
//! - [`TimeoutBridge`]: decorator bounding every call with a deadline.
//!
//! Handles returned by the provider are opaque strings wrapped in newtypes so
//! a subscription handle cannot be passed where a channel is expected.

pub mod error;
pub mod memory;
pub mod sns;
pub mod timeout;

use std::fmt;

use async_trait::async_trait;
use linksters_core::phone::E164;
use serde::Serialize;

pub use error::BridgeError;
pub use memory::{BridgeCall, MemoryBridge};
pub use sns::SnsBridge;
pub use timeout::TimeoutBridge;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_handle!(
    /// Identifies a broadcast channel (an SNS topic ARN).
    ChannelHandle
);
opaque_handle!(
    /// Identifies one phone's subscription to one channel.
    SubscriptionHandle
);
opaque_handle!(
    /// Provider id of a published message.
    MessageHandle
);

/// Names of the bridge operations, used in errors, logs and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeOp {
    CreateChannel,
    DeleteChannel,
    Subscribe,
    Unsubscribe,
    SendToRecipient,
    SendToChannel,
}

impl BridgeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            BridgeOp::CreateChannel => "create_channel",
            BridgeOp::DeleteChannel => "delete_channel",
            BridgeOp::Subscribe => "subscribe",
            BridgeOp::Unsubscribe => "unsubscribe",
            BridgeOp::SendToRecipient => "send_to_recipient",
            BridgeOp::SendToChannel => "send_to_channel",
        }
    }
}

impl fmt::Display for BridgeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A publish/subscribe SMS provider.
///
/// Each method is a single remote call with no retry. Phone numbers are
/// already E.164; the type system guarantees normalization happened first.
#[async_trait]
pub trait NotificationBridge: Send + Sync {
    async fn create_channel(&self, name: &str) -> Result<ChannelHandle, BridgeError>;

    async fn delete_channel(&self, channel: &ChannelHandle) -> Result<(), BridgeError>;

    async fn subscribe(
        &self,
        phone: &E164,
        channel: &ChannelHandle,
    ) -> Result<SubscriptionHandle, BridgeError>;

    async fn unsubscribe(&self, subscription: &SubscriptionHandle) -> Result<(), BridgeError>;

    async fn send_to_recipient(&self, text: &str, phone: &E164) -> Result<MessageHandle, BridgeError>;

    async fn send_to_channel(
        &self,
        text: &str,
        channel: &ChannelHandle,
    ) -> Result<MessageHandle, BridgeError>;
}
