use std::mem;

use crate::Pointer;

/// Union of the scalar types with the strictest alignment requirements. Its
/// alignment is our stand-in for C's `alignof(max_align_t)`: any block aligned
/// to it can hold any scalar the caller wants to put there.
#[allow(dead_code)]
#[repr(C)]
union MaxAlign {
    word: usize,
    long: u64,
    wide: u128,
    double: f64,
    pointer: *const u8,
}

/// Strictest scalar alignment on the current target. 16 bytes on most 64 bit
/// machines.
pub const MAX_ALIGN: usize = mem::align_of::<MaxAlign>();

/// A block must be able to hold one free list link, even though our free list
/// doesn't live inside the blocks. Keeping the lower bound means a pool
/// configured with tiny blocks has the same geometry no matter how the free
/// list is stored.
pub const MIN_BLOCK_SIZE: usize = mem::size_of::<Pointer<u8>>();

/// Rounds `value` up to the next multiple of `alignment`, which must be a
/// power of two. Returns `None` instead of wrapping around.
#[inline]
pub(crate) const fn align_up(value: usize, alignment: usize) -> Option<usize> {
    match value.checked_add(alignment - 1) {
        Some(padded) => Some(padded & !(alignment - 1)),
        None => None,
    }
}

/// Computes the real block size of a pool asked to serve `requested` bytes.
/// The size is first raised to [`MIN_BLOCK_SIZE`] and then rounded up (never
/// down) to [`MAX_ALIGN`].
///
/// ```rust
/// use slabloc::{block_size_for, MAX_ALIGN};
///
/// let size = block_size_for(15).unwrap();
/// assert!(size >= 15);
/// assert_eq!(size % MAX_ALIGN, 0);
/// ```
#[inline]
pub const fn block_size_for(requested: usize) -> Option<usize> {
    let size = if requested < MIN_BLOCK_SIZE {
        MIN_BLOCK_SIZE
    } else {
        requested
    };

    align_up(size, MAX_ALIGN)
}
