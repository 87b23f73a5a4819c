use crate::types::{BookEntry, Side};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, VecDeque};

/// One side of a book: price levels in a balanced tree, FIFO per level.
/// Side determines which end of the tree is "best":
/// - Asks: lowest price is best (front of the tree)
/// - Bids: highest price is best (back of the tree)
pub struct PriceLevels {
    side: Side,
    levels: BTreeMap<Decimal, VecDeque<BookEntry>>,
}

impl PriceLevels {
    /// Creates empty price levels for the given side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
        }
    }

    /// True if no resting entries remain on this side.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Adds an entry at the back of its price level, creating the level if
    /// it doesn't exist yet. O(log n).
    pub fn push(&mut self, entry: BookEntry) {
        self.levels
            .entry(entry.order.price)
            .or_default()
            .push_back(entry);
    }

    /// Re-inserts a partially-filled maker at the front of its price
    /// level's queue, preserving its original time priority against
    /// entries that arrived after it at the same price.
    pub fn push_front(&mut self, entry: BookEntry) {
        self.levels
            .entry(entry.order.price)
            .or_default()
            .push_front(entry);
    }

    /// The best price on this side without removing anything. O(1).
    pub fn best_price(&self) -> Option<Decimal> {
        match self.side {
            Side::Ask => self.levels.keys().next().copied(),
            Side::Bid => self.levels.keys().next_back().copied(),
        }
    }

    /// Looks at the best entry without removing it. O(1).
    pub fn peek_best(&self) -> Option<&BookEntry> {
        let px = self.best_price()?;
        self.levels.get(&px).and_then(|q| q.front())
    }

    /// Removes and returns the best entry, cleaning up an emptied price
    /// level. O(log n).
    pub fn pop_best(&mut self) -> Option<BookEntry> {
        let px = self.best_price()?;
        let q = self.levels.get_mut(&px)?;
        let entry = q.pop_front();
        if q.is_empty() {
            self.levels.remove(&px);
        }
        entry
    }

    /// Total number of resting entries on this side. Used by tests and
    /// property checks, not on the matching hot path.
    pub fn total_len(&self) -> usize {
        self.levels.values().map(VecDeque::len).sum()
    }

    /// Sum of remaining quantity across every resting entry on this side.
    pub fn total_qty(&self) -> u64 {
        self.levels
            .values()
            .flat_map(|q| q.iter())
            .map(|e| e.remaining_qty)
            .sum()
    }
}
