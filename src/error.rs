//! Hub error types

use crate::hub::SubscriberId;

/// Result alias for hub operations
pub type Result<T> = std::result::Result<T, HubError>;

/// Error type for hub operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The coordination loop is no longer running
    Closed,
    /// Subscriber is not registered (never admitted, or already removed)
    UnknownSubscriber(SubscriberId),
}

impl std::fmt::Display for HubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HubError::Closed => write!(f, "Hub is not running"),
            HubError::UnknownSubscriber(id) => write!(f, "Unknown subscriber: {}", id),
        }
    }
}

impl std::error::Error for HubError {}
