//! Order book engine: applies MBO events and emits MBP-10 snapshots.
//!
//! Per incoming event the engine:
//! 1. Runs it through the `SequencingBuffer` (trade triplets are coalesced)
//! 2. Applies each released event to the `OrderIndex` and the side's ladder
//! 3. Asks the `DepthTracker` whether the change is visible in the top 10
//! 4. Emits a snapshot through the `SnapshotEmitter` if it is
//!
//! State is exclusively owned by one engine for the lifetime of a run.

use serde::{Deserialize, Serialize};

use super::depth::{BookChange, DepthTracker};
use super::ladder::{AskSide, BidSide, LevelSummary, PriceLadder};
use super::observer::{BookObserver, NoopObserver};
use super::order_index::OrderIndex;
use super::sequencer::{Release, SequencingBuffer};
use crate::error::{BookError, Result};
use crate::snapshot::{SnapshotEmitter, SnapshotSink};
use crate::types::{Action, MboEvent, Side, MBP_DEPTH};

/// What a Reset action does to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResetPolicy {
    /// Publish one snapshot of the unchanged book (default)
    #[default]
    SnapshotOnly,

    /// Clear all orders and levels, then publish the empty book
    ClearBook,
}

/// What an Add for an already-live order id does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicateOrderPolicy {
    /// Abort with `BookError::DuplicateOrder` (default)
    #[default]
    Error,

    /// Keep the live order, ignore the Add, count and log it
    Skip,
}

/// Configuration for engine behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How to handle Reset actions
    pub reset_policy: ResetPolicy,

    /// How to handle duplicate Add ids
    pub duplicate_policy: DuplicateOrderPolicy,

    /// Whether to log warnings for recoverable anomalies
    pub log_warnings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reset_policy: ResetPolicy::SnapshotOnly,
            duplicate_policy: DuplicateOrderPolicy::Error,
            log_warnings: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set reset handling policy.
    pub fn with_reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }

    /// Set duplicate-id handling policy.
    pub fn with_duplicate_policy(mut self, policy: DuplicateOrderPolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Enable/disable warning logs.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }
}

/// Statistics for monitoring a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// Events pushed into the engine
    pub events_received: u64,

    /// Events applied to the book (after coalescing)
    pub events_applied: u64,

    /// Orders added
    pub adds: u64,

    /// Live orders cancelled (explicitly or via a trade triplet)
    pub cancels: u64,

    /// Cancels for ids that were not live
    pub unknown_cancels: u64,

    /// Adds skipped under `DuplicateOrderPolicy::Skip`
    pub duplicate_adds: u64,

    /// Adds with a neutral side, which cannot rest on the book
    pub neutral_adds: u64,

    /// Trade triplets reduced to their cancel
    pub triplets_coalesced: u64,

    /// Neutral-side trade triplets dropped
    pub triplets_suppressed: u64,

    /// Trade/Fill/unrecognized events applied on their own
    pub ignored_events: u64,

    /// Reset actions seen
    pub resets: u64,

    /// Snapshots handed to the sink
    pub snapshots_emitted: u64,

    /// Book changes below the visible depth
    pub hidden_changes: u64,

    /// Number of live orders
    pub active_orders: usize,

    /// Number of bid levels
    pub bid_levels: usize,

    /// Number of ask levels
    pub ask_levels: usize,
}

/// Single-book MBO → MBP-10 engine.
///
/// # Example
/// ```
/// use mbo_mbp_reconstructor::{Action, MboEvent, Mbp10Snapshot, OrderBookEngine, Side};
///
/// let mut engine = OrderBookEngine::new();
/// let mut out: Vec<Mbp10Snapshot> = Vec::new();
///
/// engine
///     .process_event(MboEvent::new(1, Action::Add, Side::Bid, 100_000_000_000, 50), &mut out)
///     .unwrap();
/// engine.finish(&mut out).unwrap();
///
/// assert_eq!(out.len(), 1);
/// assert_eq!(out[0].bids[0].unwrap().size, 50);
/// ```
#[derive(Debug, Clone)]
pub struct OrderBookEngine<O: BookObserver = NoopObserver> {
    config: EngineConfig,
    orders: OrderIndex,
    bids: PriceLadder<BidSide>,
    asks: PriceLadder<AskSide>,
    sequencer: SequencingBuffer,
    depth: DepthTracker,
    emitter: SnapshotEmitter,
    stats: EngineStats,
    observer: O,
}

impl Default for OrderBookEngine<NoopObserver> {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderBookEngine<NoopObserver> {
    /// Create an engine with default configuration and no tracing.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with custom configuration and no tracing.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_observer(config, NoopObserver)
    }
}

impl<O: BookObserver> OrderBookEngine<O> {
    /// Create an engine that reports to `observer`.
    pub fn with_observer(config: EngineConfig, observer: O) -> Self {
        Self {
            config,
            orders: OrderIndex::new(),
            bids: PriceLadder::new(MBP_DEPTH),
            asks: PriceLadder::new(MBP_DEPTH),
            sequencer: SequencingBuffer::new(),
            depth: DepthTracker::new(MBP_DEPTH),
            emitter: SnapshotEmitter::new(),
            stats: EngineStats::default(),
            observer,
        }
    }

    /// Feed the next input event.
    ///
    /// The event may be held back for trade-triplet lookahead; anything the
    /// sequencer releases is applied immediately and visible changes are
    /// written to `sink`.
    ///
    /// # Errors
    /// Fatal errors only: duplicate ids (under `DuplicateOrderPolicy::Error`),
    /// Adds without a price, index/ladder inconsistencies and sink failures.
    pub fn process_event<K>(&mut self, event: MboEvent, sink: &mut K) -> Result<()>
    where
        K: SnapshotSink + ?Sized,
    {
        self.stats.events_received += 1;
        self.sequencer.push(event);
        while let Some(release) = self.sequencer.poll() {
            self.apply_release(release, sink)?;
        }
        Ok(())
    }

    /// Signal end of input: flush held-back events and the sink.
    pub fn finish<K>(&mut self, sink: &mut K) -> Result<()>
    where
        K: SnapshotSink + ?Sized,
    {
        while let Some(event) = self.sequencer.drain_next() {
            self.observer.on_buffer_drained(&event);
            self.apply_event(&event, sink)?;
        }
        sink.flush()
    }

    /// Process a whole event stream, including the end-of-input flush.
    pub fn process_all<I, K>(&mut self, events: I, sink: &mut K) -> Result<()>
    where
        I: IntoIterator<Item = MboEvent>,
        K: SnapshotSink + ?Sized,
    {
        for event in events {
            self.process_event(event, sink)?;
        }
        self.finish(sink)
    }

    fn apply_release<K>(&mut self, release: Release, sink: &mut K) -> Result<()>
    where
        K: SnapshotSink + ?Sized,
    {
        match release {
            Release::Apply(event) => self.apply_event(&event, sink),
            Release::Coalesced { trade_side, cancel } => {
                self.stats.triplets_coalesced += 1;
                self.observer.on_trade_coalesced(trade_side, &cancel);
                self.apply_event(&cancel, sink)
            }
            Release::Suppressed { trade } => {
                self.stats.triplets_suppressed += 1;
                self.observer.on_trade_suppressed(&trade);
                Ok(())
            }
        }
    }

    /// Apply one event directly, bypassing trade-triplet coalescing.
    pub fn apply_event<K>(&mut self, event: &MboEvent, sink: &mut K) -> Result<()>
    where
        K: SnapshotSink + ?Sized,
    {
        let change = match event.action {
            Some(Action::Add) => self.add_order(event)?,
            Some(Action::Cancel) => self.cancel_order(event)?,
            Some(Action::Reset) => self.reset_book(),
            Some(Action::Trade | Action::Fill) | None => {
                self.stats.ignored_events += 1;
                BookChange::Unchanged
            }
        };

        self.stats.events_applied += 1;
        self.stats.active_orders = self.orders.len();
        self.stats.bid_levels = self.bids.len();
        self.stats.ask_levels = self.asks.len();

        let action = match change {
            BookChange::Added { .. } => Action::Add,
            BookChange::Cancelled { .. } => Action::Cancel,
            BookChange::Reset => Action::Reset,
            BookChange::Unchanged => return Ok(()),
        };

        match self.depth.visible_depth(change) {
            Some(depth) => self.emit(event, action, depth, sink),
            None => {
                self.stats.hidden_changes += 1;
                Ok(())
            }
        }
    }

    fn add_order(&mut self, event: &MboEvent) -> Result<BookChange> {
        if event.side == Side::None {
            self.stats.neutral_adds += 1;
            if self.config.log_warnings {
                log::warn!(
                    "Ignoring add for order {} with neutral side (seq {})",
                    event.order_id,
                    event.meta.sequence
                );
            }
            return Ok(BookChange::Unchanged);
        }

        let price = event
            .price
            .ok_or_else(|| BookError::parse("price", ""))?;

        match self
            .orders
            .add(event.order_id, event.side, price, event.size)
        {
            Ok(_) => {}
            Err(BookError::DuplicateOrder(id))
                if self.config.duplicate_policy == DuplicateOrderPolicy::Skip =>
            {
                self.stats.duplicate_adds += 1;
                if self.config.log_warnings {
                    log::warn!(
                        "Skipping add for live order {id} (seq {})",
                        event.meta.sequence
                    );
                }
                return Ok(BookChange::Unchanged);
            }
            Err(e) => return Err(e),
        }

        let rank = match event.side {
            Side::Bid => self.bids.upsert(price, event.order_id, event.size)?,
            Side::Ask => self.asks.upsert(price, event.order_id, event.size)?,
            Side::None => {
                return Err(BookError::InconsistentState(format!(
                    "neutral order {} reached the ladder",
                    event.order_id
                )))
            }
        };

        self.stats.adds += 1;
        self.observer.on_add(event, rank);
        Ok(BookChange::Added { rank })
    }

    fn cancel_order(&mut self, event: &MboEvent) -> Result<BookChange> {
        let order = match self.orders.remove(event.order_id) {
            Ok(order) => order,
            Err(BookError::UnknownOrder(_)) => {
                // Already gone (e.g. filled); not an error in real feeds
                self.stats.unknown_cancels += 1;
                self.observer.on_unknown_cancel(event);
                return Ok(BookChange::Unchanged);
            }
            Err(e) => return Err(e),
        };

        let rank = match order.side {
            Side::Bid => self.bids.remove(order.price, order.order_id)?,
            Side::Ask => self.asks.remove(order.price, order.order_id)?,
            Side::None => {
                return Err(BookError::InconsistentState(format!(
                    "live order {} has neutral side",
                    order.order_id
                )))
            }
        };

        self.stats.cancels += 1;
        self.observer.on_cancel(event, &order, rank);
        Ok(BookChange::Cancelled { rank })
    }

    fn reset_book(&mut self) -> BookChange {
        self.stats.resets += 1;
        if self.config.reset_policy == ResetPolicy::ClearBook {
            if self.config.log_warnings && !self.orders.is_empty() {
                log::info!("Reset: clearing {} live orders", self.orders.len());
            }
            self.orders.clear();
            self.bids.clear();
            self.asks.clear();
        }
        BookChange::Reset
    }

    fn emit<K>(&mut self, event: &MboEvent, action: Action, depth: usize, sink: &mut K) -> Result<()>
    where
        K: SnapshotSink + ?Sized,
    {
        let snapshot = self.emitter.emit(
            event,
            action,
            depth,
            self.bids.top_n(MBP_DEPTH),
            self.asks.top_n(MBP_DEPTH),
            sink,
        )?;
        self.stats.snapshots_emitted += 1;
        self.observer.on_snapshot(&snapshot);
        Ok(())
    }

    /// Check that the index and both ladders agree.
    ///
    /// Every queued id must be live with a matching side and price, every
    /// live order must be queued exactly once, and every level's cached
    /// aggregate must match its members.
    pub fn verify_consistency(&self) -> Result<()> {
        let mut queued = 0usize;
        let levels = self
            .bids
            .iter()
            .map(|level| (Side::Bid, level))
            .chain(self.asks.iter().map(|level| (Side::Ask, level)));

        for (side, level) in levels {
            if level.is_empty() {
                return Err(BookError::InconsistentState(format!(
                    "empty {side:?} level at {}",
                    level.price()
                )));
            }
            if level.compute_actual_total() != level.total_size() {
                return Err(BookError::InconsistentState(format!(
                    "{side:?} level {} aggregate drifted",
                    level.price()
                )));
            }
            for order_id in level.order_ids() {
                match self.orders.get(order_id) {
                    Some(order) if order.side == side && order.price == level.price() => {
                        queued += 1;
                    }
                    _ => {
                        return Err(BookError::InconsistentState(format!(
                            "order {order_id} queued at {side:?} {} but not live there",
                            level.price()
                        )))
                    }
                }
            }
        }

        if queued != self.orders.len() {
            return Err(BookError::InconsistentState(format!(
                "{} live orders but {queued} queued",
                self.orders.len()
            )));
        }
        Ok(())
    }

    /// Up to `n` levels of one side, best first.
    pub fn top_levels(&self, side: Side, n: usize) -> Vec<LevelSummary> {
        match side {
            Side::Bid => self.bids.top_n(n).collect(),
            Side::Ask => self.asks.top_n(n).collect(),
            Side::None => Vec::new(),
        }
    }

    /// Best (highest) bid price.
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.best_price()
    }

    /// Best (lowest) ask price.
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.best_price()
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get current statistics.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Live order index.
    pub fn orders(&self) -> &OrderIndex {
        &self.orders
    }

    /// Bid ladder.
    pub fn bids(&self) -> &PriceLadder<BidSide> {
        &self.bids
    }

    /// Ask ladder.
    pub fn asks(&self) -> &PriceLadder<AskSide> {
        &self.asks
    }

    /// Get number of active orders.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Events held back waiting for trade-triplet lookahead.
    pub fn pending_events(&self) -> usize {
        self.sequencer.len()
    }

    /// Snapshots emitted so far (= next row index).
    pub fn rows_emitted(&self) -> u64 {
        self.emitter.next_row()
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Consume the engine, returning its observer.
    pub fn into_observer(self) -> O {
        self.observer
    }
}
