//! Service error types

use thiserror::Error;

use crate::domain::ItemId;
use crate::state::StateError;

/// Smallest accepted item ID
pub const MIN_ITEM_ID: ItemId = 1;

/// Largest accepted item ID
pub const MAX_ITEM_ID: ItemId = 1_000_000_007;

/// Rejected ingestion input; nothing was created
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ids must not be empty")]
    EmptyIds,

    #[error("id {id} at position {index} is outside 1..=1000000007")]
    OutOfRange { index: usize, id: ItemId },
}

/// Errors surfaced to request callers
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid ids: {0}")]
    Validation(#[from] ValidationError),

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("State error: {0}")]
    State(StateError),
}

impl From<StateError> for ServiceError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::NotFound(what) => ServiceError::NotFound(what),
            other => ServiceError::State(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_not_found_maps_to_not_found() {
        let err: ServiceError = StateError::NotFound("Job abc".to_string()).into();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[test]
    fn test_channel_error_stays_state_error() {
        let err: ServiceError = StateError::ChannelError.into();
        assert!(matches!(err, ServiceError::State(StateError::ChannelError)));
    }

    #[test]
    fn test_validation_display() {
        let err = ValidationError::OutOfRange { index: 2, id: 0 };
        assert_eq!(err.to_string(), "id 0 at position 2 is outside 1..=1000000007");
    }
}
