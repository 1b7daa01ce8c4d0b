//! Instruction records and book query rows
//!
//! Instructions arrive as loosely typed records ([`InstructionEvent`]) that
//! mirror the inbound wire shape. They are validated into [`Instruction`]
//! before touching the store.

use crate::core::{Entry, PriceLevelIndex, Side};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of book instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionKind {
    /// Add a level
    New,
    /// Replace an existing level
    Update,
    /// Remove a level from both sides
    Delete,
}

impl InstructionKind {
    /// Wire name of the kind
    pub const fn as_str(&self) -> &'static str {
        match self {
            InstructionKind::New => "new",
            InstructionKind::Update => "update",
            InstructionKind::Delete => "delete",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstructionKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(InstructionKind::New),
            "update" => Ok(InstructionKind::Update),
            "delete" => Ok(InstructionKind::Delete),
            other => Err(StoreError::invalid(format!("unknown instruction kind '{other}'"))),
        }
    }
}

/// Raw inbound instruction record
///
/// `side`, `price` and `quantity` are absent for deletes.
/// `price_level_index` defaults to the unassigned marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionEvent {
    /// Instruction kind as received
    pub instruction: String,
    /// Side of the level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Quoted price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Resting size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u64>,
    /// Level rank
    #[serde(default)]
    pub price_level_index: PriceLevelIndex,
}

impl InstructionEvent {
    /// `new` record without a level; chain [`Self::at_level`] to set one
    pub fn add(side: Side, price: f64, quantity: u64) -> Self {
        Self {
            instruction: InstructionKind::New.to_string(),
            side: Some(side),
            price: Some(price),
            quantity: Some(quantity),
            price_level_index: PriceLevelIndex::UNASSIGNED,
        }
    }

    /// `update` record for `(side, level)`
    pub fn update(side: Side, price: f64, quantity: u64, level: impl Into<PriceLevelIndex>) -> Self {
        Self {
            instruction: InstructionKind::Update.to_string(),
            side: Some(side),
            price: Some(price),
            quantity: Some(quantity),
            price_level_index: level.into(),
        }
    }

    /// `delete` record for `level`
    pub fn delete(level: impl Into<PriceLevelIndex>) -> Self {
        Self {
            instruction: InstructionKind::Delete.to_string(),
            side: None,
            price: None,
            quantity: None,
            price_level_index: level.into(),
        }
    }

    /// Set the level rank
    #[must_use]
    pub fn at_level(mut self, level: impl Into<PriceLevelIndex>) -> Self {
        self.price_level_index = level.into();
        self
    }
}

/// Validated instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Append the entry
    New(Entry),
    /// Replace the entry at the same `(side, level)`
    Update(Entry),
    /// Remove a level from both sides
    Delete(PriceLevelIndex),
}

impl Instruction {
    /// Kind of this instruction
    pub fn kind(&self) -> InstructionKind {
        match self {
            Instruction::New(_) => InstructionKind::New,
            Instruction::Update(_) => InstructionKind::Update,
            Instruction::Delete(_) => InstructionKind::Delete,
        }
    }
}

impl TryFrom<InstructionEvent> for Instruction {
    type Error = StoreError;

    fn try_from(event: InstructionEvent) -> Result<Self, Self::Error> {
        let kind: InstructionKind = event.instruction.parse()?;
        let level = event.price_level_index;

        if kind == InstructionKind::Delete {
            return Ok(Instruction::Delete(level));
        }

        let (Some(side), Some(price), Some(quantity)) = (event.side, event.price, event.quantity) else {
            return Err(StoreError::invalid(format!(
                "{kind} at price_level_index {level} requires side, price and quantity"
            )));
        };
        let entry = Entry {
            side,
            price,
            quantity,
            price_level_index: level,
            instruction: kind,
        };

        Ok(match kind {
            InstructionKind::New => Instruction::New(entry),
            _ => Instruction::Update(entry),
        })
    }
}

/// Price and size on one side of a book row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Quoted price
    pub price: f64,
    /// Resting size
    pub quantity: u64,
}

/// Paired bid/ask view of one level
///
/// A missing side is `None` (serialized as `null`), never a zero quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRow {
    /// Level this row describes
    pub price_level_index: PriceLevelIndex,
    /// Ask at this level
    pub ask: Option<Quote>,
    /// Bid at this level
    pub bid: Option<Quote>,
}
