//! Processor error types

use thiserror::Error;

use crate::domain::ItemId;

/// Errors returned by an external processor
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Processor rejected item {item}: {message}")]
    Rejected { item: ItemId, message: String },

    #[error("Processor unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ProcessError::Rejected {
            item: 7,
            message: "malformed".to_string(),
        };
        assert_eq!(err.to_string(), "Processor rejected item 7: malformed");
    }
}
