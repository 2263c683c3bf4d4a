use std::sync::Arc;

use log::{debug, warn};

use crate::buffer::Metadata;
use crate::device::Handle;
use crate::error::{Error, Result};
use crate::ioctl;
use crate::memory::Mmap;

/// Ownership state of a buffer slot
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum State {
    /// Owned by the application and not lent out
    Idle,
    /// Owned by the driver, waiting to be filled
    Queued,
    /// Dequeued with captured data
    Filled,
}

pub(crate) struct Slot {
    pub mmap: Mmap,
    pub state: State,
    pub meta: Metadata,
}

/// Manage mapped buffers
///
/// Buffers are requested from the driver and mapped in one go. Every mapping is released
/// before the request itself is freed, the driver refuses to free mapped buffers.
pub struct Arena {
    handle: Arc<Handle>,
    pub(crate) slots: Vec<Slot>,
    requested: bool,
}

impl Arena {
    /// Returns a new buffer manager instance
    ///
    /// You usually do not need to use this directly.
    /// A [`crate::io::Stream`] creates its own manager instance.
    pub fn new(handle: Arc<Handle>) -> Self {
        Arena {
            handle,
            slots: Vec::new(),
            requested: false,
        }
    }

    /// Requests and maps buffers
    ///
    /// Returns the number of buffers as granted by the driver. If any mapping fails, the buffers
    /// mapped so far are released again and the mapping error is returned.
    ///
    /// # Arguments
    ///
    /// * `count` - Desired number of buffers
    pub fn allocate(&mut self, count: u32) -> Result<u32> {
        if self.requested {
            return Err(Error::State("buffers are already allocated"));
        }

        let granted = ioctl::request_buffers(&self.handle, count)?;
        self.requested = true;

        for index in 0..granted {
            match Mmap::map(self.handle.clone(), index) {
                Ok(mmap) => self.slots.push(Slot {
                    mmap,
                    state: State::Idle,
                    meta: Metadata::default(),
                }),
                Err(e) => {
                    if let Err(cleanup) = self.release() {
                        warn!("cleanup after failed allocation: {}", cleanup);
                    }
                    return Err(e);
                }
            }
        }

        debug!("mapped {} buffers on fd {}", granted, self.handle.fd());
        Ok(granted)
    }

    /// Unmaps every buffer and frees the driver's buffer request
    ///
    /// All mappings are released even if some of them fail; the first failure is returned.
    pub fn release(&mut self) -> Result<()> {
        if !self.requested {
            return Ok(());
        }

        let mut first = None;
        for slot in self.slots.drain(..) {
            if let Err(e) = slot.mmap.unmap() {
                warn!("{}", e);
                first.get_or_insert(e);
            }
        }

        let freed = ioctl::free_buffers(&self.handle);
        self.requested = false;

        match first {
            Some(e) => Err(e),
            None => freed,
        }
    }

    /// Number of mapped buffers
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Access the mapped region of a buffer
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index).map(|slot| slot.mmap.as_slice())
    }

    /// Metadata of the last time the buffer was dequeued
    pub fn meta(&self, index: usize) -> Option<&Metadata> {
        self.slots.get(index).map(|slot| &slot.meta)
    }

    pub fn state(&self, index: usize) -> Option<State> {
        self.slots.get(index).map(|slot| slot.state)
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("failed to release buffers: {}", e);
        }
    }
}
