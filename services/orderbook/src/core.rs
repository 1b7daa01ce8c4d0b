//! Core level-indexed order book store
//!
//! The store keeps one flat collection of entries for both sides. Entries are
//! addressed by `(side, price_level_index)` for updates, by level alone for
//! deletes, and paired level by level when the book is queried.

use crate::error::{StoreError, StoreResult};
use crate::events::{BookRow, Instruction, InstructionEvent, InstructionKind, Quote};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Side of the order book (Bid or Ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side (bids)
    Bid,
    /// Sell side (asks/offers)
    Ask,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("bid"),
            Side::Ask => f.write_str("ask"),
        }
    }
}

/// Rank of a price level, 1 being the top of book
///
/// Zero is reserved as the "no index assigned" marker. Entries carrying it
/// can be added and deleted but are never addressable by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceLevelIndex(u32);

impl PriceLevelIndex {
    /// Marker for entries created without an explicit level
    pub const UNASSIGNED: Self = Self(0);

    /// Top of book
    pub const TOP: Self = Self(1);

    /// Wrap a raw level number
    #[inline]
    #[must_use]
    pub const fn new(level: u32) -> Self {
        Self(level)
    }

    /// Raw level number
    #[inline]
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Whether this index can be targeted by an update
    #[inline]
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != Self::UNASSIGNED.0
    }

    /// The next level towards the top of book
    #[inline]
    #[must_use]
    pub const fn shifted_down(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl From<u32> for PriceLevelIndex {
    fn from(level: u32) -> Self {
        Self(level)
    }
}

impl fmt::Display for PriceLevelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One resting order-level record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Side of the level
    pub side: Side,
    /// Quoted price
    pub price: f64,
    /// Resting size
    pub quantity: u64,
    /// Rank of the level
    pub price_level_index: PriceLevelIndex,
    /// Instruction that produced this record
    pub instruction: InstructionKind,
}

impl Entry {
    /// Create an entry as produced by a `New` instruction
    pub fn new(side: Side, price: f64, quantity: u64, price_level_index: PriceLevelIndex) -> Self {
        Self {
            side,
            price,
            quantity,
            price_level_index,
            instruction: InstructionKind::New,
        }
    }

    /// Whether an update for `(side, level)` may replace this entry
    #[inline]
    fn is_addressed_by(&self, side: Side, level: PriceLevelIndex) -> bool {
        self.price_level_index.is_assigned() && self.side == side && self.price_level_index == level
    }

    #[inline]
    fn quote(&self) -> Quote {
        Quote {
            price: self.price,
            quantity: self.quantity,
        }
    }
}

/// The order book store for a single instrument
///
/// Not synchronised: exclusive access is provided by its owner, normally the
/// book actor in [`crate::service`].
#[derive(Debug, Clone, Default)]
pub struct OrderBookStore {
    entries: Vec<Entry>,
}

impl OrderBookStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries across both sides
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read-only view of the entries, in no particular order
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Validate a raw instruction record and apply it
    pub fn apply(&mut self, event: InstructionEvent) -> StoreResult<()> {
        let instruction = Instruction::try_from(event)?;
        self.execute(instruction)
    }

    /// Apply an already validated instruction
    pub fn execute(&mut self, instruction: Instruction) -> StoreResult<()> {
        match instruction {
            Instruction::New(entry) => {
                self.add(entry);
                Ok(())
            }
            Instruction::Update(entry) => self.update(entry),
            Instruction::Delete(level) => self.delete_level(level),
        }
    }

    /// Apply a batch of records in order
    ///
    /// Stops at the first failure and reports its zero-based position. Records
    /// before it stay applied. Returns the number applied on success.
    pub fn apply_all<I>(&mut self, events: I) -> Result<usize, (usize, StoreError)>
    where
        I: IntoIterator<Item = InstructionEvent>,
    {
        let mut applied = 0;
        for event in events {
            self.apply(event).map_err(|e| (applied, e))?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Append an entry. Existing entries at the same level are kept.
    pub fn add(&mut self, entry: Entry) {
        debug!(
            side = %entry.side,
            level = %entry.price_level_index,
            price = entry.price,
            quantity = entry.quantity,
            "adding level"
        );
        self.entries.push(entry);
    }

    /// Replace the entry at `(entry.side, entry.price_level_index)`
    ///
    /// Only the first matching entry is replaced. Unassigned levels never
    /// match.
    pub fn update(&mut self, entry: Entry) -> StoreResult<()> {
        let side = entry.side;
        let level = entry.price_level_index;

        let Some(pos) = self.entries.iter().position(|e| e.is_addressed_by(side, level)) else {
            warn!(side = %side, level = %level, "update for unknown level");
            return Err(StoreError::LevelNotFound {
                side,
                price_level_index: level,
            });
        };

        debug!(
            side = %side,
            level = %level,
            price = entry.price,
            quantity = entry.quantity,
            "updating level"
        );
        self.entries[pos] = entry;
        Ok(())
    }

    /// Remove a level from both sides and close the gap it leaves
    ///
    /// Every surviving entry ranked deeper than `level`, on either side, moves
    /// up by one. If nothing survives the store is left empty and
    /// [`StoreError::EmptyBookAfterDelete`] is returned.
    ///
    /// Deleting [`PriceLevelIndex::UNASSIGNED`] drops the unassigned entries
    /// and shifts every other entry up, so level 1 becomes unassigned and is
    /// no longer reachable by an update.
    pub fn delete_level(&mut self, level: PriceLevelIndex) -> StoreResult<()> {
        let mut survivors: Vec<Entry> = self
            .entries
            .drain(..)
            .filter(|e| e.price_level_index != level)
            .collect();

        survivors.sort_by(|a, b| b.price_level_index.cmp(&a.price_level_index));

        let Some(top) = survivors.first().map(|e| e.price_level_index) else {
            warn!(level = %level, "delete left the book empty");
            return Err(StoreError::EmptyBookAfterDelete {
                price_level_index: level,
            });
        };

        let ladder = level..=top;
        for entry in survivors
            .iter_mut()
            .filter(|e| ladder.contains(&e.price_level_index))
        {
            entry.price_level_index = entry.price_level_index.shifted_down();
        }

        debug!(level = %level, remaining = survivors.len(), "deleted level");
        self.entries = survivors;
        Ok(())
    }

    /// Pair bid and ask levels `1..=depth`, top of book first
    ///
    /// Levels with no entry on either side are skipped, so the result may be
    /// shorter than `depth`. Where a level holds duplicates, the first entry
    /// in storage order is shown. Cost depends on the entry count only, not
    /// on `depth`.
    pub fn order_book(&self, depth: u32) -> Vec<BookRow> {
        let wanted = PriceLevelIndex::TOP..=PriceLevelIndex::new(depth);
        let mut levels: BTreeMap<PriceLevelIndex, (Option<Quote>, Option<Quote>)> = BTreeMap::new();

        for entry in self
            .entries
            .iter()
            .filter(|e| wanted.contains(&e.price_level_index))
        {
            let (bid, ask) = levels.entry(entry.price_level_index).or_default();
            let slot = match entry.side {
                Side::Bid => bid,
                Side::Ask => ask,
            };
            slot.get_or_insert_with(|| entry.quote());
        }

        levels
            .into_iter()
            .map(|(price_level_index, (bid, ask))| BookRow {
                price_level_index,
                bid,
                ask,
            })
            .collect()
    }
}

/// Apply one raw instruction record to `store`
pub fn apply_instruction(store: &mut OrderBookStore, event: InstructionEvent) -> StoreResult<()> {
    store.apply(event)
}
