//! Trade-Fill-Cancel coalescing.
//!
//! The feed reports one matched trade as three consecutive events: a Trade,
//! a Fill, and a Cancel that removes (or reduces) the filled resting order.
//! Only the Cancel changes the book. This buffer holds back a Trade until two
//! more events have arrived, then either:
//!
//! - releases the Cancel alone (`Release::Coalesced`) for a genuine
//!   `[Trade, Fill, Cancel]`,
//! - drops all three (`Release::Suppressed`) when the Trade's side is neutral,
//! - or releases the Trade on its own and slides the window forward.
//!
//! Events that cannot start a triplet are released as soon as they reach the
//! front of the window, so the window is always either empty or anchored on a
//! Trade and never holds more than three events.
//!
//! # Example
//!
//! ```
//! use mbo_mbp_reconstructor::lob::sequencer::{Release, SequencingBuffer};
//! use mbo_mbp_reconstructor::{Action, MboEvent, Side};
//!
//! let mut buffer = SequencingBuffer::new();
//! buffer.push(MboEvent::new(0, Action::Trade, Side::Ask, 10_000_000_000, 5));
//! assert!(buffer.poll().is_none());
//! buffer.push(MboEvent::new(0, Action::Fill, Side::Ask, 10_000_000_000, 5));
//! buffer.push(MboEvent::new(42, Action::Cancel, Side::Ask, 10_000_000_000, 5));
//!
//! match buffer.poll() {
//!     Some(Release::Coalesced { cancel, .. }) => assert_eq!(cancel.order_id, 42),
//!     other => panic!("unexpected release: {other:?}"),
//! }
//! assert!(buffer.is_empty());
//! ```

use std::collections::VecDeque;

use crate::types::{Action, MboEvent, Side};

/// Events inspected together when matching a triplet.
pub const TRIPLET_WIDTH: usize = 3;

/// What the buffer hands back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Release {
    /// Apply this event on its own.
    Apply(MboEvent),

    /// A `[Trade, Fill, Cancel]` triplet: apply only the cancel.
    Coalesced {
        /// Side reported on the Trade event
        trade_side: Side,
        cancel: MboEvent,
    },

    /// A triplet whose Trade had a neutral side: nothing to apply.
    Suppressed { trade: MboEvent },
}

/// Sliding window that coalesces trade triplets.
#[derive(Debug, Clone, Default)]
pub struct SequencingBuffer {
    window: VecDeque<MboEvent>,
}

impl SequencingBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(TRIPLET_WIDTH),
        }
    }

    /// Append the next input event.
    ///
    /// Callers must `poll()` until it returns `None` before pushing again.
    #[inline]
    pub fn push(&mut self, event: MboEvent) {
        debug_assert!(
            self.window.len() < TRIPLET_WIDTH,
            "push without draining releases"
        );
        self.window.push_back(event);
    }

    /// Take the next event (or coalesced effect) that is ready to apply.
    ///
    /// Returns `None` when the window is empty or a leading Trade is still
    /// waiting for lookahead.
    pub fn poll(&mut self) -> Option<Release> {
        let front = self.window.front()?;
        if !front.is(Action::Trade) {
            return self.window.pop_front().map(Release::Apply);
        }
        if self.window.len() < TRIPLET_WIDTH {
            return None;
        }

        if self.is_triplet() {
            let trade = self.window.pop_front()?;
            let _fill = self.window.pop_front()?;
            let cancel = self.window.pop_front()?;

            return Some(match trade.side {
                Side::None => Release::Suppressed { trade },
                trade_side @ (Side::Bid | Side::Ask) => Release::Coalesced { trade_side, cancel },
            });
        }

        // Not a triplet: the Trade stands alone, slide the window.
        self.window.pop_front().map(Release::Apply)
    }

    /// Pop the oldest buffered event without pattern matching.
    ///
    /// Used at end of input to flush whatever is still held back.
    #[inline]
    pub fn drain_next(&mut self) -> Option<MboEvent> {
        self.window.pop_front()
    }

    /// Number of events currently held back.
    #[inline]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    fn is_triplet(&self) -> bool {
        matches!(
            (
                self.window[0].action,
                self.window[1].action,
                self.window[2].action
            ),
            (Some(Action::Trade), Some(Action::Fill), Some(Action::Cancel))
        )
    }
}
