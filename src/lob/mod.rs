//! Limit order book reconstruction.
//!
//! Leaf components (`order_index`, `price_level`, `ladder`, `sequencer`,
//! `depth`) hold no references to each other; `engine` owns one of each and
//! drives them per event.

pub mod depth;
pub mod engine;
pub mod ladder;
pub mod observer;
pub mod order_index;
pub mod price_level;
pub mod sequencer;

pub use depth::{BookChange, DepthTracker};
pub use engine::{DuplicateOrderPolicy, EngineConfig, EngineStats, OrderBookEngine, ResetPolicy};
pub use ladder::{AskSide, BidSide, BookSide, LevelSummary, PriceLadder};
pub use observer::{BookObserver, LogObserver, NoopObserver};
pub use order_index::OrderIndex;
pub use price_level::PriceLevel;
pub use sequencer::{Release, SequencingBuffer};
