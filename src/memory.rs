use std::ops::Deref;
use std::sync::Arc;
use std::{fmt, ptr, slice};

use log::{trace, warn};

use crate::device::Handle;
use crate::error::{Error, Result};
use crate::ioctl;

/// Memory-mapped driver buffer
///
/// The backing memory is usually located somewhere on the camera hardware itself. It is mapped
/// into the process as a shared, read-write region so captured frames can be read in place.
///
/// A mapping keeps its device handle alive. It is released exactly once: either explicitly via
/// [`Mmap::unmap`], which consumes it, or by the destructor.
pub struct Mmap {
    handle: Arc<Handle>,
    ptr: *mut u8,
    len: usize,
    index: u32,
}

impl Mmap {
    /// Maps driver buffer `index` into memory
    ///
    /// The buffer must have been granted by a prior buffer request.
    pub fn map(handle: Arc<Handle>, index: u32) -> Result<Self> {
        let placement = ioctl::query_buffer(&handle, index)?;
        let len = placement.length as usize;

        let ptr = unsafe {
            handle
                .backend()
                .mmap(handle.fd(), len, placement.offset as libc::off_t)
        }
        .map_err(|source| Error::Map { index, source })?;
        trace!(
            "mapped buffer {}: offset {:#x} length {}",
            index,
            placement.offset,
            len
        );

        Ok(Mmap {
            handle,
            ptr: ptr as *mut u8,
            len,
            index,
        })
    }

    /// Index of the driver buffer behind this mapping
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Size of the mapped region in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Releases the mapping, reporting failures to the caller
    pub fn unmap(mut self) -> Result<()> {
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        self.release(ptr)
    }

    fn release(&self, ptr: *mut u8) -> Result<()> {
        unsafe {
            self.handle
                .backend()
                .munmap(ptr as *mut std::os::raw::c_void, self.len)
        }
        .map_err(|source| Error::Map {
            index: self.index,
            source,
        })?;
        trace!("unmapped buffer {}", self.index);
        Ok(())
    }
}

impl Drop for Mmap {
    fn drop(&mut self) {
        if self.ptr.is_null() {
            return;
        }

        if let Err(e) = self.release(self.ptr) {
            warn!("{}", e);
        }
    }
}

impl Deref for Mmap {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl fmt::Debug for Mmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mmap")
            .field("index", &self.index)
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}
