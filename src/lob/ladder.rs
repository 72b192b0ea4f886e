//! Per-side price ladder.
//!
//! Levels live in a `BTreeMap` keyed so that ascending key order is
//! "best first" for the side: asks key on the raw price, bids on
//! `Reverse(price)`. Rank 0 is therefore always the first map entry, and the
//! rank of any price is the number of keys strictly before it.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::price_level::PriceLevel;
use crate::error::{BookError, Result};
use crate::types::{Side, MBP_DEPTH};

/// Ordering policy for one side of the book.
pub trait BookSide: fmt::Debug + Clone + Copy + Default {
    /// Map key whose ascending order is best-to-worst for this side.
    type Key: Ord + Copy + fmt::Debug;

    /// Which side this is.
    const SIDE: Side;

    fn key(price: i64) -> Self::Key;
}

/// Bids: highest price first.
#[derive(Debug, Clone, Copy, Default)]
pub struct BidSide;

/// Asks: lowest price first.
#[derive(Debug, Clone, Copy, Default)]
pub struct AskSide;

impl BookSide for BidSide {
    type Key = Reverse<i64>;
    const SIDE: Side = Side::Bid;

    #[inline(always)]
    fn key(price: i64) -> Self::Key {
        Reverse(price)
    }
}

impl BookSide for AskSide {
    type Key = i64;
    const SIDE: Side = Side::Ask;

    #[inline(always)]
    fn key(price: i64) -> Self::Key {
        price
    }
}

/// Aggregated view of one level, as published in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Fixed-point price
    pub price: i64,
    /// Sum of member order sizes
    pub size: u64,
    /// Number of member orders
    pub count: u32,
}

impl From<&PriceLevel> for LevelSummary {
    fn from(level: &PriceLevel) -> Self {
        Self {
            price: level.price(),
            size: level.total_size(),
            count: u32::try_from(level.order_count()).unwrap_or(u32::MAX),
        }
    }
}

/// Ordered price levels for one side.
#[derive(Debug, Clone)]
pub struct PriceLadder<S: BookSide> {
    levels: BTreeMap<S::Key, PriceLevel>,
    /// Rank scans stop after this many levels
    scan_limit: usize,
    _side: PhantomData<S>,
}

impl<S: BookSide> Default for PriceLadder<S> {
    fn default() -> Self {
        Self::new(MBP_DEPTH)
    }
}

impl<S: BookSide> PriceLadder<S> {
    /// Create an empty ladder whose rank scans are bounded by `scan_limit`.
    pub fn new(scan_limit: usize) -> Self {
        Self {
            levels: BTreeMap::new(),
            scan_limit,
            _side: PhantomData,
        }
    }

    /// Side this ladder holds.
    #[inline]
    pub fn side(&self) -> Side {
        S::SIDE
    }

    /// Queue an order at `price`, creating the level if needed.
    ///
    /// Returns the level's rank after insertion (capped at the scan limit).
    ///
    /// # Errors
    /// `InconsistentState` if the order is already queued at that price.
    pub fn upsert(&mut self, price: i64, order_id: u64, size: u32) -> Result<usize> {
        let level = self
            .levels
            .entry(S::key(price))
            .or_insert_with(|| PriceLevel::new(price));

        if !level.push_back(order_id, size) {
            return Err(BookError::InconsistentState(format!(
                "order {order_id} already queued at {price} on {:?}",
                S::SIDE
            )));
        }

        Ok(self.rank(price))
    }

    /// Remove an order from the level at `price`, deleting the level if it
    /// empties.
    ///
    /// Returns the rank the level held before removal (capped at the scan
    /// limit).
    ///
    /// # Errors
    /// `InconsistentState` if there is no such level or the order is not in
    /// it. The ladder is left unchanged in that case.
    pub fn remove(&mut self, price: i64, order_id: u64) -> Result<usize> {
        let key = S::key(price);
        let rank = self.rank(price);

        let level = self.levels.get_mut(&key).ok_or_else(|| {
            BookError::InconsistentState(format!(
                "no {:?} level at {price} for order {order_id}",
                S::SIDE
            ))
        })?;

        if level.remove(order_id).is_none() {
            return Err(BookError::InconsistentState(format!(
                "order {order_id} not queued at {:?} level {price}",
                S::SIDE
            )));
        }

        if level.is_empty() {
            self.levels.remove(&key);
        }

        Ok(rank)
    }

    /// 0-based position of `price` from the top of the book.
    ///
    /// Counts the levels strictly better than `price`, so it is defined
    /// whether or not a level exists there. The scan stops at the scan limit;
    /// a result equal to the limit means "at or beyond the visible depth".
    #[inline]
    pub fn rank(&self, price: i64) -> usize {
        self.levels
            .range(..S::key(price))
            .take(self.scan_limit)
            .count()
    }

    /// Up to `n` levels from the top, best first.
    pub fn top_n(&self, n: usize) -> impl Iterator<Item = LevelSummary> + '_ {
        self.levels.values().take(n).map(LevelSummary::from)
    }

    /// Best price on this side.
    #[inline]
    pub fn best_price(&self) -> Option<i64> {
        self.levels.values().next().map(PriceLevel::price)
    }

    /// Level at an exact price.
    #[inline]
    pub fn level(&self, price: i64) -> Option<&PriceLevel> {
        self.levels.get(&S::key(price))
    }

    /// Iterate all levels, best first.
    pub fn iter(&self) -> impl Iterator<Item = &PriceLevel> {
        self.levels.values()
    }

    /// Number of levels.
    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Drop every level.
    pub fn clear(&mut self) {
        self.levels.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PX: i64 = 1_000_000_000;

    #[test]
    fn test_bid_ladder_descending() {
        let mut bids = PriceLadder::<BidSide>::default();
        bids.upsert(99 * PX, 1, 10).unwrap();
        bids.upsert(101 * PX, 2, 10).unwrap();
        bids.upsert(100 * PX, 3, 10).unwrap();

        let prices: Vec<i64> = bids.iter().map(PriceLevel::price).collect();
        assert_eq!(prices, vec![101 * PX, 100 * PX, 99 * PX]);
        assert_eq!(bids.best_price(), Some(101 * PX));
        assert_eq!(bids.side(), Side::Bid);
    }

    #[test]
    fn test_ask_ladder_ascending() {
        let mut asks = PriceLadder::<AskSide>::default();
        asks.upsert(101 * PX, 1, 10).unwrap();
        asks.upsert(99 * PX, 2, 10).unwrap();
        asks.upsert(100 * PX, 3, 10).unwrap();

        let prices: Vec<i64> = asks.iter().map(PriceLevel::price).collect();
        assert_eq!(prices, vec![99 * PX, 100 * PX, 101 * PX]);
        assert_eq!(asks.best_price(), Some(99 * PX));
    }

    #[test]
    fn test_upsert_returns_rank_after_insertion() {
        let mut bids = PriceLadder::<BidSide>::default();
        assert_eq!(bids.upsert(100 * PX, 1, 10).unwrap(), 0);
        assert_eq!(bids.upsert(99 * PX, 2, 10).unwrap(), 1);
        assert_eq!(bids.upsert(101 * PX, 3, 10).unwrap(), 0);
        // Existing level pushed down by the better price above
        assert_eq!(bids.upsert(100 * PX, 4, 10).unwrap(), 1);
    }

    #[test]
    fn test_remove_returns_rank_before_removal() {
        let mut asks = PriceLadder::<AskSide>::default();
        asks.upsert(10 * PX, 1, 5).unwrap();
        asks.upsert(11 * PX, 2, 5).unwrap();
        asks.upsert(12 * PX, 3, 5).unwrap();

        assert_eq!(asks.remove(11 * PX, 2).unwrap(), 1);
        assert!(asks.level(11 * PX).is_none());
        assert_eq!(asks.len(), 2);
        assert_eq!(asks.remove(12 * PX, 3).unwrap(), 1);
        assert_eq!(asks.remove(10 * PX, 1).unwrap(), 0);
        assert!(asks.is_empty());
    }

    #[test]
    fn test_remove_missing_order_is_inconsistent() {
        let mut bids = PriceLadder::<BidSide>::default();
        bids.upsert(100 * PX, 1, 10).unwrap();

        assert!(matches!(
            bids.remove(100 * PX, 2),
            Err(BookError::InconsistentState(_))
        ));
        assert!(matches!(
            bids.remove(90 * PX, 1),
            Err(BookError::InconsistentState(_))
        ));
        assert_eq!(bids.level(100 * PX).unwrap().order_count(), 1);
    }

    #[test]
    fn test_rank_scan_is_capped() {
        let mut asks = PriceLadder::<AskSide>::new(10);
        for i in 0..15 {
            asks.upsert((i + 1) * PX, i as u64, 1).unwrap();
        }
        assert_eq!(asks.rank(PX), 0);
        assert_eq!(asks.rank(10 * PX), 9);
        assert_eq!(asks.rank(11 * PX), 10);
        assert_eq!(asks.rank(15 * PX), 10);
        // Price with no level ranks where it would be inserted
        assert_eq!(asks.rank(PX / 2), 0);
    }

    #[test]
    fn test_top_n_aggregates() {
        let mut bids = PriceLadder::<BidSide>::default();
        bids.upsert(100 * PX, 1, 50).unwrap();
        bids.upsert(100 * PX, 2, 30).unwrap();
        bids.upsert(99 * PX, 3, 7).unwrap();

        let top: Vec<LevelSummary> = bids.top_n(10).collect();
        assert_eq!(
            top,
            vec![
                LevelSummary {
                    price: 100 * PX,
                    size: 80,
                    count: 2
                },
                LevelSummary {
                    price: 99 * PX,
                    size: 7,
                    count: 1
                },
            ]
        );
        assert_eq!(bids.top_n(1).count(), 1);
    }
}
