//! Error types for the order book store

use crate::core::{PriceLevelIndex, Side};
use thiserror::Error;

/// Store-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Update targeted a level with no addressable entry
    #[error("No {side} level found at price_level_index {price_level_index}")]
    LevelNotFound {
        /// Side the update was aimed at
        side: Side,
        /// The requested level
        price_level_index: PriceLevelIndex,
    },

    /// Delete removed the last remaining entries
    #[error("Book is empty after deleting price_level_index {price_level_index}")]
    EmptyBookAfterDelete {
        /// The deleted level
        price_level_index: PriceLevelIndex,
    },

    /// Instruction kind unknown or record incomplete
    #[error("Invalid instruction: {reason}")]
    InvalidInstruction {
        /// Why the record was rejected
        reason: String,
    },

    /// The book actor is no longer running
    #[error("Order book service stopped")]
    ServiceStopped,
}

impl StoreError {
    /// Shorthand for an `InvalidInstruction` error
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInstruction {
            reason: reason.into(),
        }
    }
}

/// Type alias for store results
pub type StoreResult<T> = Result<T, StoreError>;
