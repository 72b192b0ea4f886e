//! Price level with time-priority order queue and cached aggregate size.
//!
//! Orders are kept in arrival order (`IndexMap` preserves insertion order
//! while giving O(1) lookup), so the front of the queue is the oldest order.
//!
//! # Invariant
//!
//! `total_size` MUST always equal the sum of the member orders' sizes and
//! `order_count()` their cardinality. Mutation only goes through `push_back`
//! and `remove`, and debug builds re-check the sum after each one.
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `push_back` | O(1) amortized |
//! | `remove` | O(n) in the queue length (order-preserving shift) |
//! | `total_size` | O(1) |
//! | `order_count` | O(1) |

use indexmap::IndexMap;

/// A price level: FIFO queue of live order ids at one price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: i64,
    /// Orders in time priority: order_id → size
    orders: IndexMap<u64, u32>,
    /// Cached total size (invariant: == orders.values().sum())
    total_size: u64,
}

impl PriceLevel {
    /// Create a new empty level at `price`.
    #[inline]
    pub fn new(price: i64) -> Self {
        Self {
            price,
            orders: IndexMap::new(),
            total_size: 0,
        }
    }

    /// Level price (fixed-point).
    #[inline]
    pub fn price(&self) -> i64 {
        self.price
    }

    /// Append an order to the back of the queue.
    ///
    /// Returns `false` (and leaves the level untouched) if the id is already
    /// queued here.
    #[inline]
    pub fn push_back(&mut self, order_id: u64, size: u32) -> bool {
        if self.orders.contains_key(&order_id) {
            return false;
        }
        self.orders.insert(order_id, size);
        self.total_size += u64::from(size);

        #[cfg(debug_assertions)]
        self.verify_invariant();

        true
    }

    /// Remove an order, preserving the relative order of the rest.
    #[inline]
    pub fn remove(&mut self, order_id: u64) -> Option<u32> {
        let size = self.orders.shift_remove(&order_id)?;
        self.total_size -= u64::from(size);

        #[cfg(debug_assertions)]
        self.verify_invariant();

        Some(size)
    }

    /// Aggregate size of all orders at this level (O(1)).
    #[inline]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Number of orders at this level.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    #[inline]
    pub fn contains(&self, order_id: u64) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Queue position of an order (0 = front).
    #[inline]
    pub fn position(&self, order_id: u64) -> Option<usize> {
        self.orders.get_index_of(&order_id)
    }

    /// Iterate order ids front to back.
    #[inline]
    pub fn order_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.orders.keys().copied()
    }

    /// Sum the member sizes directly (O(n)).
    pub fn compute_actual_total(&self) -> u64 {
        self.orders.values().map(|&s| u64::from(s)).sum()
    }

    /// Verify the size invariant holds.
    #[cfg(debug_assertions)]
    #[inline]
    pub fn verify_invariant(&self) {
        let actual = self.compute_actual_total();
        debug_assert_eq!(
            actual, self.total_size,
            "PriceLevel invariant violated at {}: actual={}, cached={}",
            self.price, actual, self.total_size
        );
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    pub fn verify_invariant(&self) {}
}
