//! Integration tests for the order book engine through its public API.
//!
//! Covers book-level properties (top of book, level aggregates, trade
//! coalescing, depth-limited emission, row numbering) and the two reference
//! scenarios.
//!
//! Run with:
//! ```bash
//! cargo test --test integration_test
//! ```

use std::collections::BTreeMap;

use mbo_mbp_reconstructor::{
    Action, BookError, LevelSummary, MboEvent, Mbp10Snapshot, OrderBookEngine, Side,
};

const PX: i64 = 1_000_000_000;

fn add(order_id: u64, side: Side, price: i64, size: u32) -> MboEvent {
    MboEvent::new(order_id, Action::Add, side, price, size)
}

fn cancel(order_id: u64, side: Side, price: i64, size: u32) -> MboEvent {
    MboEvent::new(order_id, Action::Cancel, side, price, size)
}

fn trade(side: Side, price: i64, size: u32) -> MboEvent {
    MboEvent::new(0, Action::Trade, side, price, size)
}

fn fill(side: Side, price: i64, size: u32) -> MboEvent {
    MboEvent::new(0, Action::Fill, side, price, size)
}

fn run(events: Vec<MboEvent>) -> (OrderBookEngine, Vec<Mbp10Snapshot>) {
    let mut engine = OrderBookEngine::new();
    let mut out = Vec::new();
    engine.process_all(events, &mut out).unwrap();
    engine.verify_consistency().unwrap();
    (engine, out)
}

/// Minimal deterministic generator (64-bit LCG).
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn test_same_level_add_and_cancel_scenario() {
    let price = 100 * PX;
    let (engine, out) = run(vec![
        add(1, Side::Bid, price, 50),
        add(2, Side::Bid, price, 30),
        cancel(1, Side::Bid, price, 50),
        cancel(2, Side::Bid, price, 30),
    ]);

    assert_eq!(out.len(), 4);

    assert_eq!(out[1].depth, 0);
    assert_eq!(
        out[1].bids[0],
        Some(LevelSummary {
            price,
            size: 80,
            count: 2
        })
    );

    assert_eq!(out[2].action, Action::Cancel);
    assert_eq!(
        out[2].bids[0],
        Some(LevelSummary {
            price,
            size: 30,
            count: 1
        })
    );

    assert_eq!(out[3].depth, 0);
    assert_eq!(out[3].bids[0], None);
    assert!(engine.bids().is_empty());
}

#[test]
fn test_add_below_visible_depth_is_silent() {
    // Ten better ask levels: 40.00 .. 49.00
    let mut events: Vec<MboEvent> = (0..10)
        .map(|i| add(100 + i, Side::Ask, (40 + i as i64) * PX, 1))
        .collect();
    events.push(add(10, Side::Ask, 50 * PX, 5));

    let (engine, out) = run(events);

    assert_eq!(out.len(), 10);
    assert!(out.iter().all(|snap| snap.order_id != 10));
    assert_eq!(engine.asks().len(), 11);
    assert_eq!(engine.asks().rank(50 * PX), 10);
    assert_eq!(engine.stats().hidden_changes, 1);
}

// ============================================================================
// Book properties
// ============================================================================

#[test]
fn test_top_of_book_tracks_best_live_price() {
    let mut rng = Lcg(0x5eed);
    let mut engine = OrderBookEngine::new();
    let mut out: Vec<Mbp10Snapshot> = Vec::new();

    // Reference model: order id -> (side, price)
    let mut live: BTreeMap<u64, (Side, i64)> = BTreeMap::new();
    let mut next_id = 1u64;

    for _ in 0..2_000 {
        let event = if live.is_empty() || rng.below(3) != 0 {
            let side = if rng.below(2) == 0 { Side::Bid } else { Side::Ask };
            let ticks = rng.below(40) as i64;
            let price = match side {
                Side::Bid => 90 * PX + ticks * (PX / 100),
                _ => 100 * PX + ticks * (PX / 100),
            };
            let id = next_id;
            next_id += 1;
            live.insert(id, (side, price));
            add(id, side, price, 1 + rng.below(100) as u32)
        } else {
            let pick = rng.below(live.len() as u64) as usize;
            let id = *live.keys().nth(pick).unwrap();
            let (side, price) = live.remove(&id).unwrap();
            cancel(id, side, price, 1)
        };

        engine.process_event(event, &mut out).unwrap();

        let best_bid = live
            .values()
            .filter(|(side, _)| *side == Side::Bid)
            .map(|(_, price)| *price)
            .max();
        let best_ask = live
            .values()
            .filter(|(side, _)| *side == Side::Ask)
            .map(|(_, price)| *price)
            .min();

        assert_eq!(engine.best_bid(), best_bid);
        assert_eq!(engine.best_ask(), best_ask);
        assert_eq!(engine.order_count(), live.len());
    }

    engine.finish(&mut out).unwrap();
    engine.verify_consistency().unwrap();

    let last = out.last().unwrap();
    assert_eq!(last.best_bid().map(|l| l.price), engine.best_bid());
    assert_eq!(last.best_ask().map(|l| l.price), engine.best_ask());
}

#[test]
fn test_cancel_then_readd_restores_level() {
    let price = 25 * PX;
    let (engine, out) = run(vec![
        add(1, Side::Ask, price, 10),
        add(2, Side::Ask, price, 15),
        cancel(1, Side::Ask, price, 10),
        add(1, Side::Ask, price, 10),
    ]);

    assert_eq!(out[1].asks[0], out[3].asks[0]);
    let level = engine.asks().level(price).unwrap();
    assert_eq!(level.total_size(), 25);
    assert_eq!(level.order_count(), 2);
    // Re-added order goes to the back of the queue
    assert_eq!(level.position(1), Some(1));
}

#[test]
fn test_trade_triplet_equals_cancel_alone() {
    let price = 10 * PX;
    let base = vec![add(1, Side::Ask, price, 5), add(2, Side::Bid, 9 * PX, 3)];

    let mut with_triplet = base.clone();
    with_triplet.extend([
        trade(Side::Bid, price, 5),
        fill(Side::Ask, price, 5),
        cancel(1, Side::Ask, price, 5),
    ]);

    let mut cancel_only = base;
    cancel_only.push(cancel(1, Side::Ask, price, 5));

    let (a, out_a) = run(with_triplet);
    let (b, out_b) = run(cancel_only);

    assert_eq!(out_a, out_b);
    assert_eq!(a.order_count(), b.order_count());
    assert_eq!(a.stats().triplets_coalesced, 1);
}

#[test]
fn test_neutral_triplet_has_no_effect() {
    let price = 10 * PX;
    let (engine, out) = run(vec![
        add(1, Side::Ask, price, 5),
        trade(Side::None, price, 5),
        fill(Side::Ask, price, 5),
        cancel(1, Side::Ask, price, 5),
    ]);

    assert_eq!(out.len(), 1);
    assert_eq!(engine.order_count(), 1);
    assert_eq!(engine.best_ask(), Some(price));
}

#[test]
fn test_trade_add_cancel_applies_all_three() {
    let price = 10 * PX;
    let (engine, out) = run(vec![
        trade(Side::Bid, price, 5),
        add(7, Side::Bid, price, 5),
        cancel(7, Side::Bid, price, 5),
    ]);

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].action, Action::Add);
    assert_eq!(out[1].action, Action::Cancel);
    assert_eq!(engine.order_count(), 0);
    assert_eq!(engine.stats().ignored_events, 1);
    assert_eq!(engine.stats().triplets_coalesced, 0);
}

#[test]
fn test_emission_follows_rank() {
    // Bids 100.00 down to 89.00: ranks 0..11
    let adds: Vec<MboEvent> = (0..12)
        .map(|i| add(i + 1, Side::Bid, (100 - i as i64) * PX, 1))
        .collect();
    let (engine, out) = run(adds);

    assert_eq!(out.len(), 10);
    for (i, snap) in out.iter().enumerate() {
        assert_eq!(snap.depth, i);
    }

    // Cancelling rank 11, then rank 10, stays silent; rank 9 emits
    let mut engine = engine;
    let mut out: Vec<Mbp10Snapshot> = Vec::new();
    for id in [12, 11, 10] {
        let price = (100 - (id as i64 - 1)) * PX;
        engine
            .process_event(cancel(id, Side::Bid, price, 1), &mut out)
            .unwrap();
    }
    engine.finish(&mut out).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].order_id, 10);
    assert_eq!(out[0].depth, 9);
}

#[test]
fn test_cancel_of_top_level_reveals_next() {
    // Eleven levels; cancelling the best pulls the 11th into view
    let adds: Vec<MboEvent> = (0..11)
        .map(|i| add(i + 1, Side::Ask, (10 + i as i64) * PX, 1))
        .collect();
    let mut events = adds;
    events.push(cancel(1, Side::Ask, 10 * PX, 1));

    let (_, out) = run(events);
    let last = out.last().unwrap();
    assert_eq!(last.depth, 0);
    assert_eq!(last.asks[0].unwrap().price, 11 * PX);
    assert_eq!(last.asks[9].unwrap().price, 20 * PX);
}

#[test]
fn test_row_index_increments_by_one() {
    let mut rng = Lcg(42);
    let events: Vec<MboEvent> = (1..=300)
        .map(|id| {
            let side = if rng.below(2) == 0 { Side::Bid } else { Side::Ask };
            add(id, side, (50 + rng.below(30) as i64) * PX, 1)
        })
        .collect();

    let (engine, out) = run(events);

    assert!(!out.is_empty());
    for (i, snap) in out.iter().enumerate() {
        assert_eq!(snap.row_index, i as u64);
    }
    assert_eq!(engine.rows_emitted(), out.len() as u64);
}

#[test]
fn test_fatal_duplicate_stops_processing() {
    let mut engine = OrderBookEngine::new();
    let mut out: Vec<Mbp10Snapshot> = Vec::new();
    let result = engine.process_all(
        vec![
            add(1, Side::Bid, PX, 1),
            add(1, Side::Ask, 2 * PX, 1),
            add(2, Side::Bid, PX, 1),
        ],
        &mut out,
    );

    assert_eq!(result, Err(BookError::DuplicateOrder(1)));
    assert_eq!(out.len(), 1);
    assert_eq!(engine.order_count(), 1);
}
