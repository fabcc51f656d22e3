/// Location of one block inside a pool. Blocks are not linked through their
/// own memory, a free block is just this pair of indices sitting in the
/// pool's [`crate::freelist::FreeList`]:
///
/// ```text
/// buffers[0] -> +-------+-------+-------+-------+
///               | Block | Block | Block | Block |
///               +-------+-------+-------+-------+
///                                   ^
///                                   |
///                   Block { buffer: 0, slot: 2 }
/// ```
///
/// Buffers are never released one by one, so a `(buffer, slot)` pair stays
/// valid until the whole pool is torn down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Block {
    /// Index into the pool's buffer list, in growth order.
    pub buffer: usize,
    /// Index of the block within that buffer.
    pub slot: usize,
}

impl Block {
    #[inline]
    pub const fn new(buffer: usize, slot: usize) -> Self {
        Self { buffer, slot }
    }
}
