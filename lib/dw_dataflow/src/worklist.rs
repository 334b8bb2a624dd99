//! Queue of blocks pending (re)analysis.

use crate::controlflow::BlockId;
use fixedbitset::FixedBitSet;
use std::collections::VecDeque;

/// FIFO of blocks to visit.
///
/// A block is never queued twice at the same time, but there is no seen
/// set: once popped, a block can be queued again as many times as its
/// inputs change.
#[derive(Debug, Clone)]
pub struct Worklist<B> {
    queue: VecDeque<B>,
    pending: FixedBitSet,
}

impl<B: BlockId> Default for Worklist<B> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<B: BlockId> Worklist<B> {
    #[must_use]
    pub fn with_capacity(nb_blocks: usize) -> Self {
        Self {
            queue: VecDeque::with_capacity(nb_blocks),
            pending: FixedBitSet::with_capacity(nb_blocks),
        }
    }

    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.queue.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn contains(&self, block: B) -> bool {
        self.pending.contains(block.index())
    }

    /// Queues `block` even if it was already processed. Returns false if
    /// the block was already pending.
    pub fn add_ignoring_seen_set(&mut self, block: B) -> bool {
        let idx = block.index();
        if self.pending.contains(idx) {
            return false;
        }
        if idx >= self.pending.len() {
            self.pending.grow(idx + 1);
        }
        self.pending.insert(idx);
        self.queue.push_back(block);
        true
    }
}

impl<B: BlockId> Iterator for Worklist<B> {
    type Item = B;

    fn next(&mut self) -> Option<B> {
        let block = self.queue.pop_front()?;
        self.pending.set(block.index(), false);
        Some(block)
    }
}
