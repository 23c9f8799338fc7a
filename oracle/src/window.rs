//! Correlation Window
//!
//! Ordered history of per-block bundles. Detection passes only ever read the
//! newest few bundles through [`CorrelationWindow::recent`].

use std::collections::vec_deque;
use std::collections::VecDeque;
use std::num::NonZeroUsize;

use thiserror::Error;
use trap_types::BlockBundle;

/// Window errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("Block {got} does not follow newest block {last}")]
    OutOfOrder { last: u64, got: u64 },
}

/// Sliding history of block bundles, strictly ascending by block number
#[derive(Debug, Clone, Default)]
pub struct CorrelationWindow {
    bundles: VecDeque<BlockBundle>,
    capacity: Option<NonZeroUsize>,
}

impl CorrelationWindow {
    /// Unbounded window
    pub fn new() -> Self {
        Self::default()
    }

    /// Window retaining at most `capacity` of the newest bundles
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            bundles: VecDeque::with_capacity(capacity.get()),
            capacity: Some(capacity),
        }
    }

    /// Append the next block, evicting the oldest one when full
    pub fn push(&mut self, bundle: BlockBundle) -> Result<(), WindowError> {
        if let Some(last) = self.latest_block() {
            if bundle.block_number() <= last {
                return Err(WindowError::OutOfOrder {
                    last,
                    got: bundle.block_number(),
                });
            }
        }

        if let Some(capacity) = self.capacity {
            while self.bundles.len() >= capacity.get() {
                self.bundles.pop_front();
            }
        }

        self.bundles.push_back(bundle);
        Ok(())
    }

    /// The last `min(n, len)` bundles, oldest first
    pub fn recent(&self, n: usize) -> vec_deque::Iter<'_, BlockBundle> {
        let start = self.bundles.len().saturating_sub(n);
        self.bundles.range(start..)
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, BlockBundle> {
        self.bundles.iter()
    }

    pub fn latest(&self) -> Option<&BlockBundle> {
        self.bundles.back()
    }

    pub fn latest_block(&self) -> Option<u64> {
        self.latest().map(BlockBundle::block_number)
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }
}

impl FromIterator<BlockBundle> for CorrelationWindow {
    /// Collects an unbounded window; bundles out of order are skipped
    fn from_iter<I: IntoIterator<Item = BlockBundle>>(iter: I) -> Self {
        let mut window = Self::new();
        for bundle in iter {
            if let Err(e) = window.push(bundle) {
                tracing::warn!("Skipping bundle: {}", e);
            }
        }
        window
    }
}
