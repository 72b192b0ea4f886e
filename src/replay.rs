//! Replay drivers: run a source through an engine into a sink.
//!
//! `replay` is the plain sequential loop. `replay_pipelined` moves decoding
//! onto a scoped producer thread that feeds the engine through a bounded
//! channel; the engine, its book and the sink stay on the calling thread.
//! Both apply events in input order and produce identical output.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver};
use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};
use crate::lob::{BookObserver, EngineConfig, EngineStats, OrderBookEngine};
use crate::snapshot::SnapshotSink;
use crate::source::{CsvSource, EventStream, MarketDataSource, SourceMetadata, SourceStats};
use crate::types::MboEvent;

/// Default number of decoded events buffered between the two stages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8192;

/// Configuration for a replay run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Engine behavior
    pub engine: EngineConfig,

    /// Skip undecodable rows instead of aborting
    pub skip_invalid: bool,

    /// Bounded channel capacity for the pipelined driver
    pub channel_capacity: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            skip_invalid: false,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl ReplayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set engine configuration.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Enable/disable skipping undecodable rows.
    pub fn with_skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    /// Set the producer/consumer channel capacity (minimum 1).
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }
}

/// End-of-run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaySummary {
    pub source: SourceMetadata,
    pub events_read: u64,
    pub events_skipped: u64,
    pub rows_written: u64,
    pub engine: EngineStats,
    pub elapsed_secs: f64,
    pub events_per_sec: f64,
}

impl ReplaySummary {
    fn new(
        source: SourceMetadata,
        source_stats: SourceStats,
        engine: EngineStats,
        elapsed: Duration,
    ) -> Self {
        let elapsed_secs = elapsed.as_secs_f64();
        let events_per_sec = if elapsed_secs > 0.0 {
            source_stats.events_read as f64 / elapsed_secs
        } else {
            0.0
        };
        Self {
            source,
            events_read: source_stats.events_read,
            events_skipped: source_stats.events_skipped,
            rows_written: engine.snapshots_emitted,
            engine,
            elapsed_secs,
            events_per_sec,
        }
    }

    /// Serialize to a single-line JSON object.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Replay `source` through `engine` on the current thread.
///
/// Stops at the first error; the end-of-input flush only runs on success.
pub fn replay<S, O, K>(
    source: S,
    engine: &mut OrderBookEngine<O>,
    sink: &mut K,
) -> Result<ReplaySummary>
where
    S: MarketDataSource,
    O: BookObserver,
    K: SnapshotSink + ?Sized,
{
    let start = Instant::now();
    let metadata = source.metadata().clone();
    log::info!("Replaying {}", metadata.describe());

    let mut events = source.events()?;
    for event in events.by_ref() {
        engine.process_event(event?, sink)?;
    }
    engine.finish(sink)?;

    Ok(ReplaySummary::new(
        metadata,
        events.stats(),
        engine.stats().clone(),
        start.elapsed(),
    ))
}

/// Replay with decoding on a producer thread.
///
/// The producer stops after forwarding the first decode error, or as soon as
/// the consumer hangs up. Consumer-side errors take precedence over
/// producer-side ones.
pub fn replay_pipelined<S, O, K>(
    source: S,
    engine: &mut OrderBookEngine<O>,
    sink: &mut K,
    channel_capacity: usize,
) -> Result<ReplaySummary>
where
    S: MarketDataSource + Send,
    O: BookObserver,
    K: SnapshotSink + ?Sized,
{
    let start = Instant::now();
    let metadata = source.metadata().clone();
    log::info!(
        "Replaying {} (pipelined, capacity {})",
        metadata.describe(),
        channel_capacity
    );

    let (tx, rx) = channel::bounded::<Result<MboEvent>>(channel_capacity.max(1));

    thread::scope(|scope| {
        let producer = scope.spawn(move || -> Result<SourceStats> {
            let mut events = source.events()?;
            for item in events.by_ref() {
                let failed = item.is_err();
                if tx.send(item).is_err() {
                    log::debug!("Consumer hung up, stopping producer");
                    break;
                }
                if failed {
                    break;
                }
            }
            Ok(events.stats())
        });

        let consumed = consume(&rx, engine, sink);
        drop(rx);

        let produced = producer
            .join()
            .map_err(|_| BookError::InconsistentState("source thread panicked".to_string()))?;

        consumed?;
        let source_stats = produced?;

        Ok(ReplaySummary::new(
            metadata,
            source_stats,
            engine.stats().clone(),
            start.elapsed(),
        ))
    })
}

fn consume<O, K>(
    rx: &Receiver<Result<MboEvent>>,
    engine: &mut OrderBookEngine<O>,
    sink: &mut K,
) -> Result<()>
where
    O: BookObserver,
    K: SnapshotSink + ?Sized,
{
    for item in rx.iter() {
        engine.process_event(item?, sink)?;
    }
    engine.finish(sink)
}

/// Open a CSV file and replay it with the pipelined driver.
pub fn replay_file<P, O, K>(
    path: P,
    config: &ReplayConfig,
    observer: O,
    sink: &mut K,
) -> Result<ReplaySummary>
where
    P: AsRef<Path>,
    O: BookObserver,
    K: SnapshotSink + ?Sized,
{
    let source = CsvSource::open(path)?.skip_invalid(config.skip_invalid);
    let mut engine = OrderBookEngine::with_observer(config.engine.clone(), observer);
    replay_pipelined(source, &mut engine, sink, config.channel_capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Mbp10Snapshot;
    use crate::source::VecSource;
    use crate::types::{Action, Side};

    const PX: i64 = 1_000_000_000;

    fn events() -> Vec<MboEvent> {
        vec![
            MboEvent::new(1, Action::Add, Side::Bid, 100 * PX, 50),
            MboEvent::new(2, Action::Add, Side::Ask, 101 * PX, 20),
            MboEvent::new(0, Action::Trade, Side::Bid, 101 * PX, 20),
            MboEvent::new(0, Action::Fill, Side::Ask, 101 * PX, 20),
            MboEvent::new(2, Action::Cancel, Side::Ask, 101 * PX, 20),
            MboEvent::new(1, Action::Cancel, Side::Bid, 100 * PX, 50),
        ]
    }

    #[test]
    fn test_config_builder() {
        let config = ReplayConfig::new()
            .with_skip_invalid(true)
            .with_channel_capacity(0);
        assert!(config.skip_invalid);
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(ReplayConfig::default().channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_sequential_replay() {
        let mut engine = OrderBookEngine::new();
        let mut out: Vec<Mbp10Snapshot> = Vec::new();
        let summary = replay(VecSource::new(events()), &mut engine, &mut out).unwrap();

        assert_eq!(summary.events_read, 6);
        assert_eq!(summary.rows_written, 4);
        assert_eq!(out.len(), 4);
        assert_eq!(summary.engine.triplets_coalesced, 1);
        assert_eq!(engine.order_count(), 0);
    }

    #[test]
    fn test_pipelined_matches_sequential() {
        let mut sequential: Vec<Mbp10Snapshot> = Vec::new();
        replay(
            VecSource::new(events()),
            &mut OrderBookEngine::new(),
            &mut sequential,
        )
        .unwrap();

        let mut pipelined: Vec<Mbp10Snapshot> = Vec::new();
        let summary = replay_pipelined(
            VecSource::new(events()),
            &mut OrderBookEngine::new(),
            &mut pipelined,
            2,
        )
        .unwrap();

        assert_eq!(sequential, pipelined);
        assert_eq!(summary.events_read, 6);
    }

    #[test]
    fn test_pipelined_consumer_error_stops_run() {
        let mut stream = events();
        stream.insert(1, MboEvent::new(1, Action::Add, Side::Bid, 99 * PX, 5));
        let mut out: Vec<Mbp10Snapshot> = Vec::new();

        let err = replay_pipelined(
            VecSource::new(stream),
            &mut OrderBookEngine::new(),
            &mut out,
            1,
        )
        .unwrap_err();

        assert_eq!(err, BookError::DuplicateOrder(1));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_summary_serializes() {
        let mut engine = OrderBookEngine::new();
        let mut out: Vec<Mbp10Snapshot> = Vec::new();
        let summary = replay(VecSource::new(events()), &mut engine, &mut out).unwrap();

        let json = summary.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["rows_written"], 4);
        assert_eq!(value["source"]["provider"], "memory");
        assert_eq!(value["engine"]["cancels"], 2);
    }
}
