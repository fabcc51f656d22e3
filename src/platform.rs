//! Bootstrap providers. Pools only need to request buffers of raw memory and
//! hand them back on teardown, they don't care whether the memory comes from
//! the kernel or from another allocator.

use std::ptr::NonNull;

use crate::Pointer;

/// Source of the raw memory underlying every pool. Implementors are zero
/// sized types, the provider is selected at the type level with
/// [`crate::Pool<B>`] and is never chosen at runtime.
///
/// # Safety
///
/// A `Some` returned by [`Bootstrap::acquire`] must point to a region where
/// `length` bytes can be read and written, aligned to at least
/// [`crate::MAX_ALIGN`], and not handed out to anyone else until it is given
/// back through [`Bootstrap::release`]. Pools rely on this to hand block
/// pointers to their callers.
pub unsafe trait Bootstrap {
    /// Requests a region where `length` bytes can be written safely. Returns
    /// `None` on failure, never panics.
    fn acquire(length: usize) -> Pointer<u8>;

    /// Gives `length` bytes starting at `address` back to the provider.
    ///
    /// # Safety
    ///
    /// `address` and `length` must match a previous call to
    /// [`Bootstrap::acquire`] that has not been released yet. Nothing may
    /// access the region afterwards.
    unsafe fn release(address: NonNull<u8>, length: usize);
}

/// Maps anonymous pages straight from the kernel.
#[cfg(any(unix, windows))]
pub struct Mmap;

/// Delegates to the Rust global allocator. Handy for Miri, which can't run
/// `mmap`, and for spotting leaked buffers with the usual tooling.
pub struct Heap;

/// Provider used when none is named explicitly.
#[cfg(all(any(unix, windows), not(miri), not(feature = "naive-bootstrap")))]
pub type DefaultBootstrap = Mmap;

/// Provider used when none is named explicitly.
#[cfg(any(not(any(unix, windows)), miri, feature = "naive-bootstrap"))]
pub type DefaultBootstrap = Heap;

#[cfg(unix)]
mod unix {
    use std::ptr::{self, NonNull};

    use super::{Bootstrap, Mmap};
    use crate::Pointer;

    unsafe impl Bootstrap for Mmap {
        fn acquire(length: usize) -> Pointer<u8> {
            // Memory protection. Read-Write only.
            let protection = libc::PROT_READ | libc::PROT_WRITE;

            // Memory should be private to our process and not mapped to any file.
            let flags = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

            // For all the configuration options that `mmap` accepts see
            // https://man7.org/linux/man-pages/man2/mmap.2.html
            let address = unsafe { libc::mmap(ptr::null_mut(), length, protection, flags, -1, 0) };

            if address == libc::MAP_FAILED {
                return None;
            }

            NonNull::new(address.cast())
        }

        unsafe fn release(address: NonNull<u8>, length: usize) {
            if libc::munmap(address.as_ptr().cast(), length) != 0 {
                // The mapping is still valid, we just leak it.
                tracing::warn!(?address, length, "munmap failed");
            }
        }
    }
}

#[cfg(windows)]
mod windows {
    use std::ptr::NonNull;

    use windows::Win32::System::Memory;

    use super::{Bootstrap, Mmap};
    use crate::Pointer;

    unsafe impl Bootstrap for Mmap {
        fn acquire(length: usize) -> Pointer<u8> {
            // Similar to mmap on Linux, Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            // Memory has to be reserved first and then committed in order to
            // become usable. We can do both at the same time with one call.
            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            // For more detailed explanations of each parameter, see
            // https://learn.microsoft.com/en-us/windows/win32/api/memoryapi/nf-memoryapi-virtualalloc#parameters
            let address = unsafe { Memory::VirtualAlloc(None, length, flags, protection) };

            NonNull::new(address.cast())
        }

        unsafe fn release(address: NonNull<u8>, _length: usize) {
            // MEM_RELEASE requires a length of 0 and releases the whole
            // reservation made by VirtualAlloc.
            let flags = Memory::MEM_RELEASE;

            if !Memory::VirtualFree(address.as_ptr().cast(), 0, flags).as_bool() {
                tracing::warn!(?address, "VirtualFree failed");
            }
        }
    }
}

mod heap {
    use std::{
        alloc::{self, Layout},
        ptr::NonNull,
    };

    use super::{Bootstrap, Heap};
    use crate::{Pointer, MAX_ALIGN};

    fn to_layout(length: usize) -> Option<Layout> {
        Layout::from_size_align(length, MAX_ALIGN).ok()
    }

    unsafe impl Bootstrap for Heap {
        fn acquire(length: usize) -> Pointer<u8> {
            // Zero sized allocations are undefined behaviour for the global
            // allocator.
            if length == 0 {
                return None;
            }

            let layout = to_layout(length)?;
            NonNull::new(unsafe { alloc::alloc(layout) })
        }

        unsafe fn release(address: NonNull<u8>, length: usize) {
            if let Some(layout) = to_layout(length) {
                alloc::dealloc(address.as_ptr(), layout);
            }
        }
    }
}
