//! Order index: order id → resting order attributes.
//!
//! The index is the single owner of live `Order` values. Ladders only hold
//! order ids (plus a size copy for O(1) aggregates), so every cancel goes
//! through here first to learn where the order rests.

use ahash::AHashMap;

use crate::error::{BookError, Result};
use crate::types::{Order, Side};

/// O(1) lookup of live orders by id.
#[derive(Debug, Clone, Default)]
pub struct OrderIndex {
    orders: AHashMap<u64, Order>,
}

impl OrderIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new live order.
    ///
    /// # Errors
    /// `DuplicateOrder` if `order_id` is already live; the index is unchanged.
    pub fn add(&mut self, order_id: u64, side: Side, price: i64, size: u32) -> Result<&Order> {
        use std::collections::hash_map::Entry;

        match self.orders.entry(order_id) {
            Entry::Occupied(_) => Err(BookError::DuplicateOrder(order_id)),
            Entry::Vacant(slot) => Ok(slot.insert(Order {
                order_id,
                side,
                price,
                size,
            })),
        }
    }

    /// Remove a live order, returning its attributes.
    ///
    /// # Errors
    /// `UnknownOrder` if `order_id` is not live. Callers treat this as a
    /// no-op: a cancel may reference an order that is already gone.
    pub fn remove(&mut self, order_id: u64) -> Result<Order> {
        self.orders
            .remove(&order_id)
            .ok_or(BookError::UnknownOrder(order_id))
    }

    /// Look up a live order.
    #[inline]
    pub fn get(&self, order_id: u64) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    /// Check whether an order is live.
    #[inline]
    pub fn contains(&self, order_id: u64) -> bool {
        self.orders.contains_key(&order_id)
    }

    /// Number of live orders.
    #[inline]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Drop every live order.
    pub fn clear(&mut self) {
        self.orders.clear();
    }

    /// Iterate over live orders in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut index = OrderIndex::new();
        let order = *index.add(7, Side::Bid, 100_000_000_000, 50).unwrap();

        assert_eq!(order.order_id, 7);
        assert_eq!(index.get(7), Some(&order));
        assert!(index.contains(7));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_duplicate_add_is_rejected_without_overwrite() {
        let mut index = OrderIndex::new();
        index.add(7, Side::Bid, 100_000_000_000, 50).unwrap();

        let result = index.add(7, Side::Ask, 101_000_000_000, 10);
        assert_eq!(result.unwrap_err(), BookError::DuplicateOrder(7));

        let kept = index.get(7).unwrap();
        assert_eq!(kept.side, Side::Bid);
        assert_eq!(kept.size, 50);
    }

    #[test]
    fn test_remove_unknown_order() {
        let mut index = OrderIndex::new();
        assert_eq!(index.remove(99), Err(BookError::UnknownOrder(99)));
    }

    #[test]
    fn test_remove_returns_order() {
        let mut index = OrderIndex::new();
        index.add(1, Side::Ask, 5_000_000_000, 3).unwrap();

        let removed = index.remove(1).unwrap();
        assert_eq!(removed.price, 5_000_000_000);
        assert!(index.is_empty());
        assert_eq!(index.remove(1), Err(BookError::UnknownOrder(1)));
    }

    #[test]
    fn test_clear() {
        let mut index = OrderIndex::new();
        index.add(1, Side::Ask, 5_000_000_000, 3).unwrap();
        index.add(2, Side::Bid, 4_000_000_000, 3).unwrap();
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.iter().count(), 0);
    }
}
