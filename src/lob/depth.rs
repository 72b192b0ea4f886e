//! Depth-limited visibility of book changes.
//!
//! Only changes that touch one of the top `depth` levels of a side show up in
//! an MBP-N view, so only those produce a snapshot. The rank used is the
//! level's rank after an add and before a cancel, since a cancel may remove
//! the level entirely.

use serde::{Deserialize, Serialize};

use crate::types::MBP_DEPTH;

/// Effect of applying one event to the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookChange {
    /// An order joined a level that now sits at `rank`.
    Added { rank: usize },
    /// An order left a level that sat at `rank` before removal.
    Cancelled { rank: usize },
    /// A reset was applied; always published.
    Reset,
    /// Nothing in the book changed.
    Unchanged,
}

/// Decides which book changes are visible at the configured depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthTracker {
    depth: usize,
}

impl Default for DepthTracker {
    fn default() -> Self {
        Self::new(MBP_DEPTH)
    }
}

impl DepthTracker {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    /// Visible depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Check whether a rank falls inside the visible depth.
    #[inline]
    pub fn is_visible(&self, rank: usize) -> bool {
        rank < self.depth
    }

    /// Depth value to publish for `change`, or `None` if it must not emit.
    ///
    /// Resets publish with depth 0.
    #[inline]
    pub fn visible_depth(&self, change: BookChange) -> Option<usize> {
        match change {
            BookChange::Added { rank } | BookChange::Cancelled { rank } => {
                self.is_visible(rank).then_some(rank)
            }
            BookChange::Reset => Some(0),
            BookChange::Unchanged => None,
        }
    }
}
