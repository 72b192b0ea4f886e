//! MBP-10 snapshot records and sinks.
//!
//! A snapshot is one output row: the event that caused a visible book change,
//! followed by the top ten levels of each side. The `SnapshotEmitter` numbers
//! rows and hands each record, fully formed, to a `SnapshotSink`.
//!
//! # Output format
//!
//! | Columns | Content |
//! |---------|---------|
//! | 1 | `row_index` |
//! | 2–14 | `ts_recv` … `sequence`, `rtype` fixed to `10` |
//! | 15–44 | `bid_px_00, bid_sz_00, bid_ct_00` … `bid_ct_09` |
//! | 45–74 | `ask_px_00, ask_sz_00, ask_ct_00` … `ask_ct_09` |
//! | 75–76 | `symbol`, `order_id` |
//!
//! Prices are printed with two decimals; absent levels print a blank price
//! and zero size/count.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};
use crate::lob::ladder::LevelSummary;
use crate::types::{format_price, Action, EventMetadata, MboEvent, Side, MBP_DEPTH};

/// Record type written in the `rtype` column.
pub const MBP10_RTYPE: &str = "10";

/// Leading metadata columns, after the row index.
const LEADING_COLUMNS: [&str; 13] = [
    "ts_recv",
    "ts_event",
    "rtype",
    "publisher_id",
    "instrument_id",
    "action",
    "side",
    "depth",
    "price",
    "size",
    "flags",
    "ts_in_delta",
    "sequence",
];

/// Build the MBP-10 header row.
pub fn mbp10_header() -> Vec<String> {
    let mut columns = Vec::with_capacity(1 + LEADING_COLUMNS.len() + 6 * MBP_DEPTH + 2);
    columns.push("row_index".to_string());
    columns.extend(LEADING_COLUMNS.iter().map(|c| c.to_string()));
    for side in ["bid", "ask"] {
        for level in 0..MBP_DEPTH {
            for field in ["px", "sz", "ct"] {
                columns.push(format!("{side}_{field}_{level:02}"));
            }
        }
    }
    columns.push("symbol".to_string());
    columns.push("order_id".to_string());
    columns
}

/// One MBP-10 output record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mbp10Snapshot {
    /// 0-based, +1 per emitted record
    pub row_index: u64,
    pub action: Action,
    pub side: Side,
    /// Rank of the affected level (0 for resets)
    pub depth: usize,
    pub price: Option<i64>,
    pub size: u32,
    pub order_id: u64,
    pub meta: EventMetadata,
    /// Bid levels, best first; `None` where the side has fewer levels
    pub bids: [Option<LevelSummary>; MBP_DEPTH],
    /// Ask levels, best first
    pub asks: [Option<LevelSummary>; MBP_DEPTH],
}

impl Mbp10Snapshot {
    /// Best bid level in this snapshot.
    pub fn best_bid(&self) -> Option<LevelSummary> {
        self.bids[0]
    }

    /// Best ask level in this snapshot.
    pub fn best_ask(&self) -> Option<LevelSummary> {
        self.asks[0]
    }

    /// Number of populated bid levels.
    pub fn bid_levels(&self) -> usize {
        self.bids.iter().flatten().count()
    }

    /// Number of populated ask levels.
    pub fn ask_levels(&self) -> usize {
        self.asks.iter().flatten().count()
    }

    /// Render the record as CSV fields, in header order.
    pub fn to_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(2 + LEADING_COLUMNS.len() + 6 * MBP_DEPTH + 2);
        fields.push(self.row_index.to_string());
        fields.push(self.meta.ts_recv.clone());
        fields.push(self.meta.ts_event.clone());
        fields.push(MBP10_RTYPE.to_string());
        fields.push(self.meta.publisher_id.clone());
        fields.push(self.meta.instrument_id.clone());
        fields.push(self.action.as_char().to_string());
        fields.push(self.side.as_char().to_string());
        fields.push(self.depth.to_string());
        fields.push(self.price.map(format_price).unwrap_or_default());
        fields.push(self.size.to_string());
        fields.push(self.meta.flags.clone());
        fields.push(self.meta.ts_in_delta.clone());
        fields.push(self.meta.sequence.clone());
        for level in self.bids.iter().chain(self.asks.iter()) {
            match level {
                Some(level) => {
                    fields.push(format_price(level.price));
                    fields.push(level.size.to_string());
                    fields.push(level.count.to_string());
                }
                None => {
                    fields.push(String::new());
                    fields.push("0".to_string());
                    fields.push("0".to_string());
                }
            }
        }
        fields.push(self.meta.symbol.clone());
        fields.push(self.order_id.to_string());
        fields
    }
}

/// Destination for emitted snapshots.
pub trait SnapshotSink {
    /// Accept the next record. Records arrive in row-index order.
    fn write_snapshot(&mut self, snapshot: &Mbp10Snapshot) -> Result<()>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl SnapshotSink for Vec<Mbp10Snapshot> {
    fn write_snapshot(&mut self, snapshot: &Mbp10Snapshot) -> Result<()> {
        self.push(snapshot.clone());
        Ok(())
    }
}

impl<S: SnapshotSink + ?Sized> SnapshotSink for &mut S {
    fn write_snapshot(&mut self, snapshot: &Mbp10Snapshot) -> Result<()> {
        (**self).write_snapshot(snapshot)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Writes snapshots as MBP-10 CSV.
///
/// The header row is written on construction, so an input with no visible
/// changes still yields a well-formed file.
pub struct CsvSnapshotWriter<W: Write> {
    writer: csv::Writer<W>,
    records_written: u64,
}

impl<W: Write> CsvSnapshotWriter<W> {
    /// Wrap `inner` and write the header row.
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(mbp10_header())?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Number of data records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| BookError::Io(e.error().to_string()))
    }
}

impl<W: Write> SnapshotSink for CsvSnapshotWriter<W> {
    fn write_snapshot(&mut self, snapshot: &Mbp10Snapshot) -> Result<()> {
        self.writer.write_record(snapshot.to_fields())?;
        self.records_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Assembles snapshots and owns the row counter.
#[derive(Debug, Clone, Default)]
pub struct SnapshotEmitter {
    next_row: u64,
}

impl SnapshotEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row index the next snapshot will carry (= records emitted so far).
    #[inline]
    pub fn next_row(&self) -> u64 {
        self.next_row
    }

    /// Assemble a snapshot for `event` and hand it to `sink`.
    ///
    /// The row counter only advances once the sink accepted the record.
    pub fn emit<K, B, A>(
        &mut self,
        event: &MboEvent,
        action: Action,
        depth: usize,
        bids: B,
        asks: A,
        sink: &mut K,
    ) -> Result<Mbp10Snapshot>
    where
        K: SnapshotSink + ?Sized,
        B: IntoIterator<Item = LevelSummary>,
        A: IntoIterator<Item = LevelSummary>,
    {
        let snapshot = Mbp10Snapshot {
            row_index: self.next_row,
            action,
            side: event.side,
            depth,
            price: event.price,
            size: event.size,
            order_id: event.order_id,
            meta: event.meta.clone(),
            bids: fill_levels(bids),
            asks: fill_levels(asks),
        };

        sink.write_snapshot(&snapshot)?;
        self.next_row += 1;
        Ok(snapshot)
    }
}

fn fill_levels<I: IntoIterator<Item = LevelSummary>>(levels: I) -> [Option<LevelSummary>; MBP_DEPTH] {
    let mut out = [None; MBP_DEPTH];
    for (slot, level) in out.iter_mut().zip(levels) {
        *slot = Some(level);
    }
    out
}
