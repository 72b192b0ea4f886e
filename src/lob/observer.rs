//! Hooks for tracing what the engine does with each event.
//!
//! The engine calls every hook unconditionally; tracing is switched off by
//! plugging in `NoopObserver` rather than by conditional compilation. An
//! observer is built once per run and owned by the engine (or borrowed, via
//! the `&mut T` impl).

use crate::snapshot::Mbp10Snapshot;
use crate::types::{price_to_f64, MboEvent, Order, Side};

/// Callbacks for book-level events. All methods default to no-ops.
pub trait BookObserver {
    /// An order was added; `rank` is its level's rank after insertion.
    fn on_add(&mut self, _event: &MboEvent, _rank: usize) {}

    /// A live order was cancelled; `rank` is its level's rank before removal.
    fn on_cancel(&mut self, _event: &MboEvent, _order: &Order, _rank: usize) {}

    /// A cancel referenced an order that is not live.
    fn on_unknown_cancel(&mut self, _event: &MboEvent) {}

    /// A Trade-Fill-Cancel triplet was reduced to its cancel.
    fn on_trade_coalesced(&mut self, _trade_side: Side, _cancel: &MboEvent) {}

    /// A neutral-side Trade-Fill-Cancel triplet was dropped.
    fn on_trade_suppressed(&mut self, _trade: &MboEvent) {}

    /// A held-back event was flushed at end of input.
    fn on_buffer_drained(&mut self, _event: &MboEvent) {}

    /// A snapshot was handed to the sink.
    fn on_snapshot(&mut self, _snapshot: &Mbp10Snapshot) {}
}

/// Observer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BookObserver for NoopObserver {}

impl<T: BookObserver + ?Sized> BookObserver for &mut T {
    fn on_add(&mut self, event: &MboEvent, rank: usize) {
        (**self).on_add(event, rank)
    }

    fn on_cancel(&mut self, event: &MboEvent, order: &Order, rank: usize) {
        (**self).on_cancel(event, order, rank)
    }

    fn on_unknown_cancel(&mut self, event: &MboEvent) {
        (**self).on_unknown_cancel(event)
    }

    fn on_trade_coalesced(&mut self, trade_side: Side, cancel: &MboEvent) {
        (**self).on_trade_coalesced(trade_side, cancel)
    }

    fn on_trade_suppressed(&mut self, trade: &MboEvent) {
        (**self).on_trade_suppressed(trade)
    }

    fn on_buffer_drained(&mut self, event: &MboEvent) {
        (**self).on_buffer_drained(event)
    }

    fn on_snapshot(&mut self, snapshot: &Mbp10Snapshot) {
        (**self).on_snapshot(snapshot)
    }
}

/// Observer that writes a debug trace through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl BookObserver for LogObserver {
    fn on_add(&mut self, event: &MboEvent, rank: usize) {
        log::debug!(
            "[ADD] order {}: {:?} {} @ {:.4} (rank {rank})",
            event.order_id,
            event.side,
            event.size,
            event.price_as_f64().unwrap_or_default()
        );
    }

    fn on_cancel(&mut self, _event: &MboEvent, order: &Order, rank: usize) {
        log::debug!(
            "[CANCEL] order {}: {:?} {} @ {:.4} (rank {rank})",
            order.order_id,
            order.side,
            order.size,
            price_to_f64(order.price)
        );
    }

    fn on_unknown_cancel(&mut self, event: &MboEvent) {
        log::debug!("[CANCEL] order {} not live, ignored", event.order_id);
    }

    fn on_trade_coalesced(&mut self, trade_side: Side, cancel: &MboEvent) {
        log::debug!(
            "T-F-C: trade on {:?}, cancelling order {}",
            trade_side,
            cancel.order_id
        );
    }

    fn on_trade_suppressed(&mut self, trade: &MboEvent) {
        log::debug!(
            "T-F-C: skipping neutral-side trade (seq {})",
            trade.meta.sequence
        );
    }

    fn on_buffer_drained(&mut self, event: &MboEvent) {
        log::debug!(
            "EOF: applying buffered {:?} for order {}",
            event.action,
            event.order_id
        );
    }

    fn on_snapshot(&mut self, snapshot: &Mbp10Snapshot) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let top = |level: Option<crate::lob::ladder::LevelSummary>| match level {
            Some(l) => format!("{:.2} x {} ({})", price_to_f64(l.price), l.size, l.count),
            None => "-".to_string(),
        };
        log::trace!(
            "row {}: top bid {} | top ask {}",
            snapshot.row_index,
            top(snapshot.best_bid()),
            top(snapshot.best_ask())
        );
    }
}
