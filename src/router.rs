use std::ptr::NonNull;

use tracing::trace;

use crate::{
    config::{PoolConfig, SizeClass},
    error::{fatal, AllocError},
    platform::{Bootstrap, DefaultBootstrap},
    pool::Pool,
    AllocResult, Pointer,
};

/// Front end of the allocator. Holds one [`Pool`] per size class and sends
/// every request to the pool whose class matches the requested size
/// **exactly**:
///
/// ```text
///                  +--------+      +--------+      +--------+
/// pools[0] (15) -> | Buffer | ---> | Buffer | ---> | Buffer |
///                  +--------+      +--------+      +--------+
///
///                  +--------+      +--------+
/// pools[1] (180)-> | Buffer | ---> | Buffer |
///                  +--------+      +--------+
///
///     ...
///
///                  +--------+
/// pools[N-1]    -> | Buffer |
///                  +--------+
/// ```
///
/// Requests for any other size fail, there is no fallback pool for big or
/// odd sizes. Releasing doesn't need the size: the pointer is offered to each
/// pool in turn until one of them recognizes it. A pointer that no pool
/// recognizes aborts the process, see [`Router::release`].
///
/// Pools don't allocate anything until they are used, so building a router
/// is cheap. Build it once and pass it around by reference.
///
/// # Examples
///
/// ```rust
/// use slabloc::{AllocError, Router};
///
/// let mut router = Router::with_default_config();
///
/// let small = router.allocate(15).unwrap();
/// let large = router.allocate(180).unwrap();
/// assert_eq!(router.allocate(16), Err(AllocError::UnsupportedSize { size: 16 }));
///
/// router.release(Some(small.cast()));
/// router.release(Some(large.cast()));
/// router.release(None);
/// ```
pub struct Router<const N: usize = 2, B: Bootstrap = DefaultBootstrap> {
    /// Requested size served by each pool.
    sizes: [usize; N],
    /// One pool per size class, same order as `sizes`.
    pools: [Pool<B>; N],
}

impl Router {
    /// Two size classes: [`SizeClass::SMALL`] (15 bytes, 4 blocks per buffer)
    /// and [`SizeClass::LARGE`] (180 bytes, 1 block per buffer).
    pub fn with_default_config() -> Self {
        Self::with_size_classes(SizeClass::DEFAULT_CLASSES)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl<const N: usize> Router<N> {
    /// Builds a router with the given size classes backed by the
    /// [`DefaultBootstrap`] provider. If two classes share the same size the
    /// first one serves every allocation.
    ///
    /// ```rust
    /// use slabloc::{Router, SizeClass};
    ///
    /// let mut router = Router::with_size_classes([
    ///     SizeClass::new(8, 64),
    ///     SizeClass::new(64, 16),
    ///     SizeClass::new(512, 4),
    /// ]);
    ///
    /// assert!(router.allocate(64).is_ok());
    /// assert!(router.allocate(32).is_err());
    /// ```
    pub fn with_size_classes(classes: [SizeClass; N]) -> Self {
        Self::with_pool_configs(classes.map(PoolConfig::new))
    }
}

impl<const N: usize, B: Bootstrap> Router<N, B> {
    /// Builds a router from full pool configurations.
    pub fn with_pool_configs(configs: [PoolConfig; N]) -> Self {
        Self {
            sizes: configs.map(|config| config.size_class.size),
            pools: configs.map(Pool::with_config),
        }
    }

    /// Size classes served by this router, in configuration order.
    pub fn sizes(&self) -> &[usize; N] {
        &self.sizes
    }

    /// Every pool, same order as [`Router::sizes`].
    pub fn pools(&self) -> &[Pool<B>; N] {
        &self.pools
    }

    /// Pool that serves allocations of exactly `size` bytes.
    pub fn pool_for(&self, size: usize) -> Option<&Pool<B>> {
        self.pool_index_of(size).map(|index| &self.pools[index])
    }

    /// Returns a block of exactly `size` bytes (or more, after alignment).
    /// Fails with [`AllocError::UnsupportedSize`] unless `size` matches one of
    /// the configured classes, and with [`AllocError::OutOfMemory`] if the
    /// matching pool can't grow.
    pub fn allocate(&mut self, size: usize) -> AllocResult {
        let Some(index) = self.pool_index_of(size) else {
            trace!(size, "no size class for request");
            return Err(AllocError::UnsupportedSize { size });
        };

        self.pools[index].allocate(size)
    }

    /// Releases a block allocated by this router. `None` is a no-op.
    ///
    /// The pointer is offered to every pool in configuration order and the
    /// first one that owns it takes it back. If none of them does, or the
    /// block is already free and double free detection is on, the process
    /// aborts. Continuing would mean silently corrupting a free list.
    pub fn release(&mut self, address: Pointer<u8>) {
        if let Err(error) = self.try_release(address) {
            fatal(error);
        }
    }

    /// Same as [`Router::release`] but returns the error instead of aborting.
    /// A pointer that no pool recognizes is [`AllocError::NotOwned`].
    pub fn try_release(&mut self, address: Pointer<u8>) -> Result<(), AllocError> {
        let Some(pointer) = address else {
            return Ok(());
        };

        for pool in &mut self.pools {
            match pool.try_release(address) {
                Err(AllocError::NotOwned { .. }) => continue,
                result => return result,
            }
        }

        Err(AllocError::NotOwned {
            address: pointer.as_ptr() as usize,
        })
    }

    /// Whether some pool owns the block at `address`.
    pub fn owns(&self, address: NonNull<u8>) -> bool {
        self.pools.iter().any(|pool| pool.owns(address))
    }

    /// Tears down every pool. See [`Pool::teardown`].
    pub fn teardown(&mut self) {
        for pool in &mut self.pools {
            pool.teardown();
        }
    }

    /// Returns the index of the [`Pool`] configured for exactly `size`.
    fn pool_index_of(&self, size: usize) -> Option<usize> {
        self.sizes.iter().position(|class| *class == size)
    }
}
