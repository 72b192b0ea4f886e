//! # MBO-MBP-Reconstructor
//!
//! Market-by-order → MBP-10 book reconstruction.
//!
//! This library replays an ordered stream of order-level events (adds,
//! cancels, trades, fills, resets) and mirrors the resulting limit order book,
//! emitting a ten-level market-by-price snapshot every time a change touches
//! the visible top of the book.
//!
//! ## Features
//!
//! - **Order-level book**: O(1) order lookup, FIFO queues per price level,
//!   cached level aggregates
//! - **Trade coalescing**: Trade-Fill-Cancel triplets collapse into the single
//!   cancel that actually changes the book
//! - **Depth-limited output**: changes below the top ten levels update the
//!   book silently
//! - **Exact prices**: fixed-point `i64` at 1e-9, never parsed through floats
//! - **Pipelined replay**: decoding on a producer thread, bounded channel to
//!   the engine
//!
//! ## Quick Start
//!
//! ```rust
//! use mbo_mbp_reconstructor::{Action, MboEvent, Mbp10Snapshot, OrderBookEngine, Side};
//!
//! let mut engine = OrderBookEngine::new();
//! let mut snapshots: Vec<Mbp10Snapshot> = Vec::new();
//!
//! let events = vec![
//!     MboEvent::new(1, Action::Add, Side::Bid, 100_000_000_000, 50),
//!     MboEvent::new(2, Action::Add, Side::Bid, 100_000_000_000, 30),
//!     MboEvent::new(1, Action::Cancel, Side::Bid, 100_000_000_000, 50),
//! ];
//! engine.process_all(events, &mut snapshots).unwrap();
//!
//! let last = snapshots.last().unwrap();
//! assert_eq!(last.row_index, 2);
//! assert_eq!(last.bids[0].unwrap().size, 30);
//! assert_eq!(last.bids[0].unwrap().count, 1);
//! ```
//!
//! ### CSV in, CSV out
//!
//! ```ignore
//! use mbo_mbp_reconstructor::{replay_file, CsvSnapshotWriter, NoopObserver, ReplayConfig};
//!
//! let mut writer = CsvSnapshotWriter::new(std::io::stdout().lock())?;
//! let summary = replay_file("mbo.csv", &ReplayConfig::default(), NoopObserver, &mut writer)?;
//! log::info!("{}", summary.to_json()?);
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `MboEvent`, `Action`, `Side`, `Order`, price parsing/formatting |
//! | [`lob`] | Book reconstruction: `OrderBookEngine`, ladders, sequencer, observers |
//! | [`snapshot`] | `Mbp10Snapshot`, `SnapshotSink`, `CsvSnapshotWriter` |
//! | [`source`] | `MarketDataSource`, `CsvSource`, `VecSource` |
//! | [`replay`] | Sequential and pipelined replay drivers |
//! | [`error`] | `BookError` and `Result` |

pub mod error;
pub mod lob;
pub mod replay;
pub mod snapshot;
pub mod source;
pub mod types;

// Re-exports - Core types
pub use error::{BookError, Result};
pub use types::{
    format_price, parse_price, price_to_f64, Action, EventMetadata, MboEvent, Order, Side,
    MBP_DEPTH, PRICE_SCALE,
};

// Re-exports - Book reconstruction
pub use lob::{
    BookObserver, DuplicateOrderPolicy, EngineConfig, EngineStats, LevelSummary, LogObserver,
    NoopObserver, OrderBookEngine, ResetPolicy,
};

// Re-exports - Output
pub use snapshot::{mbp10_header, CsvSnapshotWriter, Mbp10Snapshot, SnapshotSink};

// Re-exports - Source abstraction
pub use source::{CsvSource, EventStream, MarketDataSource, SourceMetadata, SourceStats, VecSource};

// Re-exports - Replay
pub use replay::{replay, replay_file, replay_pipelined, ReplayConfig, ReplaySummary};
