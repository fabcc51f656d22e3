use thiserror::Error;

/// Everything that can go wrong while allocating or releasing a block.
///
/// Most variants are recoverable and simply travel back to the caller.
/// [`AllocError::DoubleFree`] is never recoverable, and
/// [`AllocError::NotOwned`] is only recoverable while there is still another
/// pool that could claim the address. See [`AllocError::is_fatal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocError {
    /// No pool serves blocks of this size.
    #[error("unsupported allocation size: {size} bytes")]
    UnsupportedSize { size: usize },

    /// The bootstrap provider could not hand out more memory.
    #[error("out of memory: bootstrap could not provide {requested} bytes")]
    OutOfMemory { requested: usize },

    /// The address is not the start of a block in any buffer of this pool.
    #[error("address {address:#x} is not owned by this pool")]
    NotOwned { address: usize },

    /// The address is already sitting in the free list.
    #[error("double free of address {address:#x}")]
    DoubleFree { address: usize },

    /// Blocks per buffer is zero or the buffer size doesn't fit in `usize`.
    #[error("invalid pool geometry: {block_size} bytes x {blocks_per_buffer} blocks")]
    InvalidGeometry {
        block_size: usize,
        blocks_per_buffer: usize,
    },
}

impl AllocError {
    /// Whether this error means the free list can no longer be trusted.
    /// Only double frees qualify on their own, a foreign pointer becomes fatal
    /// when the router runs out of pools to offer it to.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DoubleFree { .. })
    }
}

/// Logs the error and aborts the process. Unwinding is not an option here:
/// the caller handed us a pointer that none of our structures recognize, so
/// something else already corrupted memory.
#[cold]
pub(crate) fn fatal(error: AllocError) -> ! {
    tracing::error!(%error, "allocator invariant violated, aborting");
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_double_free_is_fatal() {
        assert!(AllocError::DoubleFree { address: 0x10 }.is_fatal());
        assert!(!AllocError::NotOwned { address: 0x10 }.is_fatal());
        assert!(!AllocError::UnsupportedSize { size: 16 }.is_fatal());
        assert!(!AllocError::OutOfMemory { requested: 64 }.is_fatal());
    }

    #[test]
    fn display_includes_address_in_hex() {
        let error = AllocError::NotOwned { address: 0xdead0 };
        assert_eq!(error.to_string(), "address 0xdead0 is not owned by this pool");
    }
}
