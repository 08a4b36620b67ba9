//! Error types for the correlation registry.

use thiserror::Error;

use crate::id::ResponseId;

/// Errors returned to responders by the send operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The id is unknown: never allocated, already released, the reserved
    /// sentinel, or its receiver is gone.
    #[error("Channel has already been closed for response {0}")]
    ChannelClosed(ResponseId),

    /// The cancellation token fired before the value was delivered.
    #[error("Send cancelled before delivery")]
    Cancelled,

    /// The deadline passed before the value was delivered.
    #[error("Deadline exceeded before delivery")]
    DeadlineExceeded,
}

impl RegistryError {
    pub fn is_channel_closed(&self) -> bool {
        matches!(self, Self::ChannelClosed(_))
    }

    /// True for both cancellation and deadline expiry.
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
