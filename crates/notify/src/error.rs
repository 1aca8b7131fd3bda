use std::time::Duration;

use crate::BridgeOp;

/// Failure of a single bridge call.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The provider returned an error.
    #[error("{operation} failed: {message}")]
    Remote { operation: BridgeOp, message: String },

    /// The provider reported success but did not return the expected handle.
    #[error("{operation} returned no handle")]
    MissingHandle { operation: BridgeOp },

    /// The call did not complete within the configured deadline.
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: BridgeOp, after: Duration },

    /// The handle names nothing the provider knows of, usually because it
    /// was already deleted.
    #[error("{operation} failed: unknown handle {handle}")]
    UnknownHandle { operation: BridgeOp, handle: String },

    /// The call was refused before reaching a provider.
    #[error("{operation} rejected: {reason}")]
    Rejected { operation: BridgeOp, reason: String },
}

impl BridgeError {
    pub fn operation(&self) -> BridgeOp {
        match self {
            BridgeError::Remote { operation, .. }
            | BridgeError::MissingHandle { operation }
            | BridgeError::Timeout { operation, .. }
            | BridgeError::UnknownHandle { operation, .. }
            | BridgeError::Rejected { operation, .. } => *operation,
        }
    }
}
