//! # Level-Indexed Order Book Store
//!
//! In-memory order-level state for a single instrument. Levels are ranked by
//! `price_level_index` (1 = top of book) and addressed by that rank:
//! - `new` appends a level
//! - `update` replaces the level at `(side, index)`
//! - `delete` removes an index from both sides and closes the gap
//! - depth queries pair bid and ask levels for display
//!
//! This is not a matching engine. Nothing crosses, nothing trades.
//!
//! The store itself is plain data; [`service::OrderBookService`] wraps it in a
//! single-writer tokio actor.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod metrics;
pub mod service;

// Re-exports for convenience
pub use crate::config::{ConfigError, ServiceConfig};
pub use crate::core::{apply_instruction, Entry, OrderBookStore, PriceLevelIndex, Side};
pub use crate::error::{StoreError, StoreResult};
pub use crate::events::{BookRow, Instruction, InstructionEvent, InstructionKind, Quote};
pub use crate::metrics::{MetricsSnapshot, PerformanceMetrics};
pub use crate::service::{OrderBookHandle, OrderBookService};
