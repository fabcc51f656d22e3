use std::{marker::PhantomData, mem, ptr::NonNull};

use tracing::{debug, trace, warn};

use crate::{
    align::block_size_for,
    block::Block,
    buffer::Buffer,
    config::{PoolConfig, SizeClass},
    error::{fatal, AllocError},
    freelist::FreeList,
    platform::{Bootstrap, DefaultBootstrap},
    AllocResult, Pointer,
};

/// Allocator for one size class. A pool hands out blocks of exactly
/// [`Pool::block_size`] bytes and never anything else. Memory is requested
/// from the bootstrap provider `B` one buffer at a time:
///
/// ```text
///              +--------+--------+--------+--------+
/// buffers[1] ->| Block  | Free   | Block  | Free   |
///              +--------+--------+--------+--------+
///                            ^                 ^
///              +--------+----|---+--------+----|---+
/// buffers[0] ->| Free   | Block  | Block  | Block  |
///              +---^----+----|---+--------+----|---+
///                  |         |                 |
/// free list:  [ (0, 0), (1, 1), (1, 3) ] <- head
/// ```
///
/// Construction is free, no memory is requested until the first
/// [`Pool::allocate`]. Buffers are only given back all at once by
/// [`Pool::teardown`] (or when the pool is dropped), after which the pool
/// behaves as if it had just been constructed.
///
/// # Examples
///
/// ```rust
/// use slabloc::Pool;
///
/// let mut pool = Pool::new(16, 4);
/// assert_eq!(pool.num_buffers(), 0);
///
/// let block = pool.allocate(16).unwrap();
/// assert_eq!(block.len(), pool.block_size());
/// assert_eq!(pool.num_buffers(), 1);
///
/// pool.release(Some(block.cast())).unwrap();
/// assert_eq!(pool.blocks_in_use(), 0);
/// ```
pub struct Pool<B: Bootstrap = DefaultBootstrap> {
    /// Size of each block after alignment.
    block_size: usize,
    /// Number of blocks carved out of every buffer.
    blocks_per_buffer: usize,
    /// `block_size * blocks_per_buffer`, or `None` if that can't be
    /// represented or there are no blocks per buffer at all.
    buffer_size: Option<usize>,
    /// Whether [`Pool::try_release`] scans the free list for the address.
    detect_double_free: bool,
    /// Every buffer we own, in growth order. The last one is the newest.
    buffers: Vec<Buffer>,
    /// Blocks that can be handed out.
    free_blocks: FreeList,
    /// Bootstrap provider selected at the type level.
    marker: PhantomData<B>,
}

impl Pool {
    /// Builds a pool for blocks of at least `block_size` bytes, growing by
    /// `blocks_per_buffer` blocks at a time, backed by the
    /// [`DefaultBootstrap`] provider. Double free detection follows
    /// [`PoolConfig::DETECT_DOUBLE_FREE`].
    pub const fn new(block_size: usize, blocks_per_buffer: usize) -> Self {
        Self::with_config(PoolConfig::new(SizeClass::new(
            block_size,
            blocks_per_buffer,
        )))
    }
}

impl<B: Bootstrap> Pool<B> {
    /// Builds a pool from a full configuration. No allocations happen here.
    pub const fn with_config(config: PoolConfig) -> Self {
        let SizeClass {
            size,
            blocks_per_buffer,
        } = config.size_class;

        let (block_size, buffer_size) = match block_size_for(size) {
            Some(block_size) if blocks_per_buffer > 0 => {
                (block_size, block_size.checked_mul(blocks_per_buffer))
            }
            Some(block_size) => (block_size, None),
            None => (size, None),
        };

        Self {
            block_size,
            blocks_per_buffer,
            buffer_size,
            detect_double_free: config.detect_double_free,
            buffers: Vec::new(),
            free_blocks: FreeList::new(),
            marker: PhantomData,
        }
    }

    /// Size in bytes of every block handed out by this pool.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    #[inline]
    pub fn blocks_per_buffer(&self) -> usize {
        self.blocks_per_buffer
    }

    /// Length of every buffer requested from the bootstrap provider, or
    /// `None` if the geometry is invalid.
    #[inline]
    pub fn buffer_size(&self) -> Option<usize> {
        self.buffer_size
    }

    /// Number of buffers currently owned. Also the number of times the pool
    /// has grown since construction or the last teardown.
    #[inline]
    pub fn num_buffers(&self) -> usize {
        self.buffers.len()
    }

    #[inline]
    pub fn num_free_blocks(&self) -> usize {
        self.free_blocks.len()
    }

    /// Blocks currently on loan to callers.
    #[inline]
    pub fn blocks_in_use(&self) -> usize {
        (self.buffers.len() * self.blocks_per_buffer).saturating_sub(self.free_blocks.len())
    }

    #[inline]
    pub fn detects_double_free(&self) -> bool {
        self.detect_double_free
    }

    /// Returns a block where at least `size` bytes can be written, growing
    /// the pool if there are no free blocks left. The contents of the block
    /// are uninitialized and it belongs to the caller until it is released.
    ///
    /// Fails with [`AllocError::UnsupportedSize`] if `size` is larger than
    /// [`Pool::block_size`]. Sizes are never rounded to another class.
    pub fn allocate(&mut self, size: usize) -> AllocResult {
        if size > self.block_size {
            return Err(AllocError::UnsupportedSize { size });
        }

        if self.free_blocks.is_empty() {
            self.grow()?;
        }

        let Some(block) = self.free_blocks.pop() else {
            return Err(AllocError::OutOfMemory {
                requested: self.block_size,
            });
        };

        let address = self.address_of(block);
        trace!(?address, block_size = self.block_size, "allocated block");

        Ok(NonNull::slice_from_raw_parts(address, self.block_size))
    }

    /// Whether `address` is the first byte of a block carved out of one of
    /// our buffers, free or not.
    pub fn owns(&self, address: NonNull<u8>) -> bool {
        self.block_of(address).is_some()
    }

    /// Takes the block at `address` back. `None` is a no-op.
    ///
    /// A pointer that doesn't belong to this pool is reported as
    /// [`AllocError::NotOwned`] and nothing changes, so the caller can try a
    /// different pool. If double free detection is enabled and the block is
    /// already free the process is aborted.
    pub fn release(&mut self, address: Pointer<u8>) -> Result<(), AllocError> {
        match self.try_release(address) {
            Err(error) if error.is_fatal() => fatal(error),
            result => result,
        }
    }

    /// Same as [`Pool::release`] but a double free is returned as
    /// [`AllocError::DoubleFree`] instead of aborting.
    pub fn try_release(&mut self, address: Pointer<u8>) -> Result<(), AllocError> {
        let Some(address) = address else {
            return Ok(());
        };

        let Some(block) = self.block_of(address) else {
            return Err(AllocError::NotOwned {
                address: address.as_ptr() as usize,
            });
        };

        if self.detect_double_free && self.free_blocks.contains(block) {
            return Err(AllocError::DoubleFree {
                address: address.as_ptr() as usize,
            });
        }

        self.free_blocks.push(block);
        trace!(?address, block_size = self.block_size, "released block");

        Ok(())
    }

    /// Gives every buffer back to the bootstrap provider and empties both
    /// lists. Any pointer handed out before becomes dangling. The pool can be
    /// used again afterwards, the next allocation simply grows it.
    pub fn teardown(&mut self) {
        let buffers = mem::take(&mut self.buffers);
        self.free_blocks = FreeList::new();

        if buffers.is_empty() {
            return;
        }

        debug!(
            block_size = self.block_size,
            buffers = buffers.len(),
            "tearing down pool"
        );

        for buffer in buffers {
            // SAFETY: Every buffer was acquired with exactly this length in
            // `grow` and is released only once because we took the list.
            unsafe { B::release(buffer.start(), buffer.len()) }
        }
    }

    /// Requests one new buffer and pushes all of its blocks onto the free
    /// list. If the buffer can't be obtained, or there's no room to keep
    /// track of it, nothing changes and the pool stays as it was.
    fn grow(&mut self) -> Result<(), AllocError> {
        let Some(length) = self.buffer_size else {
            return Err(AllocError::InvalidGeometry {
                block_size: self.block_size,
                blocks_per_buffer: self.blocks_per_buffer,
            });
        };

        let Some(start) = B::acquire(length) else {
            warn!(length, block_size = self.block_size, "bootstrap exhausted");
            return Err(AllocError::OutOfMemory { requested: length });
        };

        // Descriptor space. The buffer is useless if we can't record it.
        if let Err(requested) = self.reserve_descriptors() {
            // SAFETY: We just acquired it with the same length and nobody
            // else has seen the address.
            unsafe { B::release(start, length) };
            warn!(length, requested, "no room for buffer descriptor");
            return Err(AllocError::OutOfMemory { requested });
        }

        let buffer = self.buffers.len();
        self.buffers.push(Buffer::new(start, length));

        for slot in 0..self.blocks_per_buffer {
            self.free_blocks.push(Block::new(buffer, slot));
        }

        debug!(
            ?start,
            length,
            block_size = self.block_size,
            buffers = self.buffers.len(),
            "pool grown"
        );

        Ok(())
    }

    /// Makes room for one more buffer and all of its free blocks. On failure
    /// returns the size in bytes of the reservation that couldn't be made.
    fn reserve_descriptors(&mut self) -> Result<(), usize> {
        if self.buffers.try_reserve(1).is_err() {
            return Err(mem::size_of::<Buffer>());
        }

        if self.free_blocks.try_reserve(self.blocks_per_buffer).is_err() {
            return Err(self
                .blocks_per_buffer
                .saturating_mul(mem::size_of::<Block>()));
        }

        Ok(())
    }

    /// Finds the block that starts at `address`. Newest buffers are checked
    /// first since that's where most recent allocations come from. Buffers
    /// don't overlap, so at most one of them can contain the address.
    fn block_of(&self, address: NonNull<u8>) -> Option<Block> {
        let address = address.as_ptr() as usize;

        self.buffers
            .iter()
            .enumerate()
            .rev()
            .find(|(_, buffer)| buffer.contains(address))
            .and_then(|(index, buffer)| {
                buffer
                    .slot_of(address, self.block_size)
                    .map(|slot| Block::new(index, slot))
            })
    }

    /// Address of the first byte of `block`.
    fn address_of(&self, block: Block) -> NonNull<u8> {
        // SAFETY: Blocks are only created by `grow` with slots smaller than
        // `blocks_per_buffer` and buffers are never removed individually.
        unsafe { self.buffers[block.buffer].block_address(block.slot, self.block_size) }
    }
}

impl<B: Bootstrap> Drop for Pool<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
