//! Anonymous memory mapping for the heap region.
//!
//! One private, read/write, anonymous mapping per heap, released on drop.
//! Platform specifics (mmap/VirtualAlloc) are confined to the `platform`
//! module.

use std::ptr::NonNull;

#[cfg(unix)]
mod platform {
    use std::ptr;

    /// Map `size` bytes of private anonymous read/write memory.
    pub unsafe fn map_rw(size: usize) -> *mut u8 {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            ptr::null_mut()
        } else {
            ptr as *mut u8
        }
    }

    /// Release a mapping created by [`map_rw`].
    pub unsafe fn unmap(ptr: *mut u8, size: usize) {
        unsafe {
            libc::munmap(ptr as *mut _, size);
        }
    }
}

#[cfg(windows)]
mod platform {
    use std::ptr;
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
    };

    /// Map `size` bytes of private read/write memory.
    pub unsafe fn map_rw(size: usize) -> *mut u8 {
        unsafe { VirtualAlloc(ptr::null(), size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) as *mut u8 }
    }

    /// Release a mapping created by [`map_rw`].
    pub unsafe fn unmap(ptr: *mut u8, _size: usize) {
        unsafe {
            VirtualFree(ptr as *mut _, 0, MEM_RELEASE);
        }
    }
}

/// An owned anonymous mapping.
///
/// Freshly mapped memory is zero-filled on every platform Ember targets,
/// which the collectors rely on for deterministic first-use scans.
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
}

impl Region {
    /// Map a new region of `len` bytes.
    ///
    /// Returns `None` if the OS refuses the mapping.
    pub fn map(len: usize) -> Option<Self> {
        let ptr = unsafe { platform::map_rw(len) };
        let ptr = NonNull::new(ptr)?;
        Some(Self { ptr, len })
    }

    /// Base address of the mapping.
    #[inline]
    pub fn base(&self) -> NonNull<u8> {
        self.ptr
    }

    /// Length of the mapping in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapping is empty (never true for a live region).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `addr` falls within the mapping.
    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        let base = self.ptr.as_ptr() as usize;
        addr >= base && addr < base + self.len
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        unsafe {
            platform::unmap(self.ptr.as_ptr(), self.len);
        }
    }
}

// Safety: the region is a plain slab of bytes; ownership is unique.
unsafe impl Send for Region {}
