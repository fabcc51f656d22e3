//! Pool and router configuration.

/// One size class served by the allocator: the exact size callers ask for and
/// how many blocks of that size are carved out of every buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeClass {
    /// Requested size in bytes. The router only matches this exact value, the
    /// pool itself rounds it up, see [`crate::block_size_for`].
    pub size: usize,
    /// Growth factor. Every time the pool runs dry it requests one buffer
    /// that holds this many blocks.
    pub blocks_per_buffer: usize,
}

impl SizeClass {
    /// Small objects, 15 bytes, 4 blocks per buffer.
    pub const SMALL: Self = Self::new(15, 4);

    /// Large objects, 180 bytes, 1 block per buffer.
    pub const LARGE: Self = Self::new(180, 1);

    /// Size classes used by [`crate::Router::with_default_config`].
    pub const DEFAULT_CLASSES: [Self; 2] = [Self::SMALL, Self::LARGE];

    pub const fn new(size: usize, blocks_per_buffer: usize) -> Self {
        Self {
            size,
            blocks_per_buffer,
        }
    }
}

/// Full configuration of a single [`crate::Pool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Size class served by the pool.
    pub size_class: SizeClass,
    /// Scan the free list on every release and treat a repeated address as a
    /// double free. Costs O(free blocks) per release.
    ///
    /// Default: enabled when the `double-free-aware` feature is on.
    pub detect_double_free: bool,
}

impl PoolConfig {
    /// Default for [`PoolConfig::detect_double_free`].
    pub const DETECT_DOUBLE_FREE: bool = cfg!(feature = "double-free-aware");

    pub const fn new(size_class: SizeClass) -> Self {
        Self {
            size_class,
            detect_double_free: Self::DETECT_DOUBLE_FREE,
        }
    }

    /// Overrides the double free detection policy.
    pub const fn detect_double_free(mut self, enabled: bool) -> Self {
        self.detect_double_free = enabled;
        self
    }
}

impl From<SizeClass> for PoolConfig {
    fn from(size_class: SizeClass) -> Self {
        Self::new(size_class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_classes() {
        assert_eq!(SizeClass::SMALL, SizeClass::new(15, 4));
        assert_eq!(SizeClass::LARGE, SizeClass::new(180, 1));
    }

    #[test]
    fn double_free_policy_follows_feature() {
        let config = PoolConfig::new(SizeClass::SMALL);
        assert_eq!(config.detect_double_free, cfg!(feature = "double-free-aware"));
        assert!(config.detect_double_free(true).detect_double_free);
        assert!(!config.detect_double_free(false).detect_double_free);
    }
}
