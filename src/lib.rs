//! Fixed-size block allocator. Memory is handed out in blocks of a small set
//! of fixed sizes. Each size is served by a [`Pool`] that grows one buffer at
//! a time and validates ownership before taking a block back. A [`Router`]
//! dispatches requests to the pool whose size class matches exactly.
//!
//! ```text
//!              allocate(15)                       allocate(180)
//!                   |                                   |
//!                   v                                   v
//!          +-----------------+  Router  +-----------------+
//!          | Pool (16 bytes) |          | Pool (192 bytes)|
//!          +-----------------+          +-----------------+
//!             |            |                     |
//!             v            v                     v
//!         +--------+   +--------+            +--------+
//!         | Buffer |   | Buffer |            | Buffer |
//!         +--------+   +--------+            +--------+
//!                  \        |                 /
//!                   +-------+----------------+
//!                           |
//!                       Bootstrap (mmap / global allocator)
//! ```
//!
//! Nothing here is thread safe. Pools and routers hold raw pointers so the
//! compiler won't let them cross threads anyway.

mod align;
mod block;
mod buffer;
pub mod config;
mod error;
mod freelist;
pub mod platform;
mod pool;
mod router;

use std::ptr::NonNull;

/// Nullable pointer to `T`. `None` plays the role of the null pointer, so
/// releasing "null" is just releasing `None`.
pub type Pointer<T> = Option<NonNull<T>>;

/// Shorter syntax for allocation return types. The slice length is the usable
/// size of the block, which may be larger than what was requested.
pub type AllocResult = Result<NonNull<[u8]>, AllocError>;

pub use align::{block_size_for, MAX_ALIGN, MIN_BLOCK_SIZE};
pub use config::{PoolConfig, SizeClass};
pub use error::AllocError;
pub use platform::{Bootstrap, DefaultBootstrap, Heap};
#[cfg(any(unix, windows))]
pub use platform::Mmap;
pub use pool::Pool;
pub use router::Router;
