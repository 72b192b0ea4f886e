//! Market data source abstraction for event ingestion.
//!
//! A source yields decoded `MboEvent`s in feed order. The engine never sees
//! the underlying format; tokenizing and field decoding live here.
//!
//! # Example
//!
//! ```
//! use mbo_mbp_reconstructor::source::{CsvSource, EventStream, MarketDataSource};
//!
//! let csv = "\
//! ts_recv,ts_event,rtype,publisher_id,instrument_id,action,side,price,size,channel_id,order_id,flags,ts_in_delta,sequence,symbol
//! t0,t0,160,2,1108,A,B,5.51,100,0,817593,130,165200,851012,ARL
//! ";
//!
//! let mut events = CsvSource::from_reader(csv.as_bytes()).events().unwrap();
//! let event = events.next().unwrap().unwrap();
//! assert_eq!(event.order_id, 817593);
//! assert!(events.next().is_none());
//! assert_eq!(events.stats().events_read, 1);
//! ```
//!
//! # Implementing Custom Sources
//!
//! ```ignore
//! use mbo_mbp_reconstructor::source::{EventStream, MarketDataSource, SourceMetadata};
//!
//! impl MarketDataSource for MyFeed {
//!     type EventIter = MyFeedEvents;
//!
//!     fn events(self) -> Result<Self::EventIter> { ... }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};
use crate::types::MboEvent;

/// I/O buffer size for file-backed sources (1 MB).
pub const IO_BUFFER_SIZE: usize = 1024 * 1024;

// ============================================================================
// Source Metadata
// ============================================================================

/// Metadata about a market data source, for logging and summaries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Source kind (e.g., "csv", "memory")
    pub provider: Option<String>,

    /// Known event count (in-memory sources)
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    /// Create new empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the file path.
    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Set the estimated event count.
    pub fn with_estimated_events(mut self, count: u64) -> Self {
        self.estimated_events = Some(count);
        self
    }

    /// Short human-readable label for log lines.
    pub fn describe(&self) -> String {
        match (&self.file_path, &self.provider) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(provider)) => format!("<{provider}>"),
            (None, None) => "<unknown>".to_string(),
        }
    }
}

/// Counters kept by an event stream while it is consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    /// Events successfully decoded
    pub events_read: u64,

    /// Rows dropped in skip-invalid mode
    pub events_skipped: u64,
}

// ============================================================================
// Traits
// ============================================================================

/// Iterator over decoded events that can report its counters.
pub trait EventStream: Iterator<Item = Result<MboEvent>> {
    fn stats(&self) -> SourceStats;
}

/// Trait for market data sources.
///
/// `events()` consumes `self` for single-pass iteration. Metadata should be
/// populated before calling it.
pub trait MarketDataSource {
    /// The iterator type for events.
    type EventIter: EventStream;

    /// Consume the source and return a stream of events.
    ///
    /// # Errors
    /// Failing to open or prepare the underlying input. Per-row failures are
    /// reported as `Err` items by the stream instead.
    fn events(self) -> Result<Self::EventIter>;

    /// Get metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// CSV Source
// ============================================================================

/// MBO events from CSV text with the fixed 15-column row layout.
///
/// The first row is a header and is always skipped. Rows that fail to decode
/// abort the stream unless `skip_invalid(true)` is set, in which case they
/// are logged, counted and dropped.
pub struct CsvSource<R: Read> {
    reader: R,
    skip_invalid: bool,
    metadata: SourceMetadata,
}

impl CsvSource<File> {
    /// Open a CSV file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| BookError::Io(format!("failed to open {}: {e}", path.display())))?;

        let mut metadata = SourceMetadata::new()
            .with_file_path(path)
            .with_provider("csv");
        if let Ok(meta) = file.metadata() {
            metadata.file_size = Some(meta.len());
        }

        Ok(Self {
            reader: file,
            skip_invalid: false,
            metadata,
        })
    }
}

impl<R: Read> CsvSource<R> {
    /// Read CSV from any byte source (e.g. stdin or an in-memory buffer).
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            skip_invalid: false,
            metadata: SourceMetadata::new().with_provider("csv"),
        }
    }

    /// Enable skipping rows that fail to decode.
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl<R: Read> MarketDataSource for CsvSource<R> {
    type EventIter = CsvEvents<R>;

    fn events(self) -> Result<Self::EventIter> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(IO_BUFFER_SIZE)
            .from_reader(self.reader);

        Ok(CsvEvents {
            reader,
            record: csv::StringRecord::new(),
            skip_invalid: self.skip_invalid,
            stats: SourceStats::default(),
            done: false,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Event stream produced by `CsvSource`.
pub struct CsvEvents<R: Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
    skip_invalid: bool,
    stats: SourceStats,
    done: bool,
}

impl<R: Read> Iterator for CsvEvents<R> {
    type Item = Result<MboEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.reader.read_record(&mut self.record) {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    log::debug!(
                        "CSV source exhausted: {} events read, {} skipped",
                        self.stats.events_read,
                        self.stats.events_skipped
                    );
                    return None;
                }
                Err(e) => {
                    // Tokenizer/I/O failures leave the reader in an unknown state
                    self.done = true;
                    let line = self.reader.position().line();
                    return Some(Err(BookError::from(e).at_line(line)));
                }
            }

            let line = self.record.position().map_or(0, |p| p.line());
            let fields: Vec<&str> = self.record.iter().collect();

            match MboEvent::from_fields(&fields) {
                Ok(event) => {
                    self.stats.events_read += 1;
                    return Some(Ok(event));
                }
                Err(e) if self.skip_invalid && e.is_parse_error() => {
                    self.stats.events_skipped += 1;
                    log::warn!("Skipping line {line}: {e}");
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.at_line(line)));
                }
            }
        }
        None
    }
}

impl<R: Read> EventStream for CsvEvents<R> {
    fn stats(&self) -> SourceStats {
        self.stats
    }
}

// ============================================================================
// Vector Source (for testing)
// ============================================================================

/// A simple in-memory source for tests and simulations.
///
/// # Example
///
/// ```
/// use mbo_mbp_reconstructor::source::{MarketDataSource, VecSource};
/// use mbo_mbp_reconstructor::{Action, MboEvent, Side};
///
/// let source = VecSource::new(vec![
///     MboEvent::new(1, Action::Add, Side::Bid, 100_000_000_000, 100),
///     MboEvent::new(2, Action::Add, Side::Ask, 100_010_000_000, 100),
/// ]);
///
/// assert_eq!(source.events().unwrap().count(), 2);
/// ```
pub struct VecSource {
    events: Vec<MboEvent>,
    metadata: SourceMetadata,
}

impl VecSource {
    /// Create a new vector source.
    pub fn new(events: Vec<MboEvent>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_events(events.len() as u64),
            events,
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl MarketDataSource for VecSource {
    type EventIter = VecEvents;

    fn events(self) -> Result<Self::EventIter> {
        Ok(VecEvents {
            inner: self.events.into_iter(),
            read: 0,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Event stream produced by `VecSource`.
pub struct VecEvents {
    inner: std::vec::IntoIter<MboEvent>,
    read: u64,
}

impl Iterator for VecEvents {
    type Item = Result<MboEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.inner.next()?;
        self.read += 1;
        Some(Ok(event))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl EventStream for VecEvents {
    fn stats(&self) -> SourceStats {
        SourceStats {
            events_read: self.read,
            events_skipped: 0,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
