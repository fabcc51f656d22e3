use std::ptr::NonNull;

/// Contiguous span of raw memory obtained from a [`crate::Bootstrap`] and
/// sliced into equally sized blocks. Every buffer belongs to exactly one pool
/// and is only given back when that pool is torn down.
///
/// ```text
///  start                                                     end
///    |                                                        |
///    v                                                        v
///    +-------------+-------------+-------------+-------------+
///    |   slot 0    |   slot 1    |     ...     |  slot k-1   |
///    +-------------+-------------+-------------+-------------+
///    <-block_size->
/// ```
///
/// We never write anything inside the buffer ourselves, the descriptor lives
/// in the pool's buffer list so the memory is entirely the caller's.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Buffer {
    /// First byte of the region.
    start: NonNull<u8>,
    /// Length of the region in bytes, `end - start`.
    length: usize,
}

impl Buffer {
    pub fn new(start: NonNull<u8>, length: usize) -> Self {
        Self { start, length }
    }

    /// Address of the first byte.
    #[inline]
    pub fn start(&self) -> NonNull<u8> {
        self.start
    }

    /// Region length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// One past the last byte, exclusive.
    #[inline]
    pub fn end(&self) -> usize {
        self.start.as_ptr() as usize + self.length
    }

    /// Whether `address` falls in `[start, end)`.
    #[inline]
    pub fn contains(&self, address: usize) -> bool {
        address >= self.start.as_ptr() as usize && address < self.end()
    }

    /// Returns the slot that starts exactly at `address`, or `None` if the
    /// address lies outside the buffer or points into the middle of a block.
    pub fn slot_of(&self, address: usize, block_size: usize) -> Option<usize> {
        if !self.contains(address) {
            return None;
        }

        let offset = address - self.start.as_ptr() as usize;

        if offset % block_size != 0 {
            return None;
        }

        Some(offset / block_size)
    }

    /// Address of the first byte of `slot`.
    ///
    /// # Safety
    ///
    /// `slot * block_size` must be smaller than [`Self::len`]. Pools only
    /// call this with slots they carved out of this buffer.
    #[inline]
    pub unsafe fn block_address(&self, slot: usize, block_size: usize) -> NonNull<u8> {
        debug_assert!(slot * block_size < self.length);
        NonNull::new_unchecked(self.start.as_ptr().add(slot * block_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_lookup() {
        let mut memory = [0u8; 64];
        let buffer = Buffer::new(NonNull::new(memory.as_mut_ptr()).unwrap(), 64);
        let start = memory.as_ptr() as usize;

        assert_eq!(buffer.end(), start + 64);
        assert_eq!(buffer.slot_of(start, 16), Some(0));
        assert_eq!(buffer.slot_of(start + 16, 16), Some(1));
        assert_eq!(buffer.slot_of(start + 48, 16), Some(3));

        // Middle of a block.
        assert_eq!(buffer.slot_of(start + 8, 16), None);
        // End is exclusive.
        assert_eq!(buffer.slot_of(start + 64, 16), None);
        assert_eq!(buffer.slot_of(start.wrapping_sub(16), 16), None);
    }

    #[test]
    fn block_addresses_match_slots() {
        let mut memory = [0u8; 96];
        let buffer = Buffer::new(NonNull::new(memory.as_mut_ptr()).unwrap(), 96);

        for slot in 0..3 {
            let address = unsafe { buffer.block_address(slot, 32) };
            assert_eq!(address.as_ptr() as usize, memory.as_ptr() as usize + slot * 32);
            assert_eq!(buffer.slot_of(address.as_ptr() as usize, 32), Some(slot));
        }
    }
}
