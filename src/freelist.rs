use std::collections::TryReserveError;

use crate::block::Block;

/// Stack of free blocks. The last element is the head of the list: blocks are
/// pushed there when released and popped from there when allocated, which
/// gives LIFO reuse. Freshly grown buffers push their slots in ascending
/// order, so the last slot of the newest buffer comes out first:
///
/// ```text
/// grow() with 4 blocks per buffer:
///
///   push 0, push 1, push 2, push 3
///
///   +---+---+---+---+
///   | 0 | 1 | 2 | 3 | <- head
///   +---+---+---+---+
///
/// allocate() -> slot 3, allocate() -> slot 2, release(slot 3):
///
///   +---+---+---+
///   | 0 | 1 | 3 | <- head
///   +---+---+---+
/// ```
///
/// The caller keeps the whole block, nothing of ours is stored inside it.
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    blocks: Vec<Block>,
}

impl FreeList {
    pub const fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Number of free blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Pushes `block` onto the head of the list.
    #[inline]
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Removes and returns the head of the list.
    #[inline]
    pub fn pop(&mut self) -> Option<Block> {
        self.blocks.pop()
    }

    /// Linear scan, O(n) in the number of free blocks.
    pub fn contains(&self, block: Block) -> bool {
        self.blocks.iter().any(|free| *free == block)
    }

    /// Makes room for `additional` pushes that cannot fail.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.blocks.try_reserve(additional)
    }
}
