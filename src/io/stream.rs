use std::sync::Arc;
use std::time::Duration;
use std::{cmp, fmt};

use log::{trace, warn};

use crate::buffer::Metadata;
use crate::device::{Device, Handle};
use crate::error::{Error, Result};
use crate::io::arena::{Arena, State};
use crate::io::Config;
use crate::ioctl;
use crate::pselect;

/// Stream of mapped capture buffers
///
/// An arena instance is used internally for buffer handling. Dropping the stream stops it and
/// releases all buffers.
pub struct Stream {
    handle: Arc<Handle>,
    arena: Arena,
    config: Config,
    active: bool,
}

impl Stream {
    /// Returns a stream for frame capturing with the default configuration
    ///
    /// # Example
    ///
    /// ```
    /// use v4l_stream::{Device, Stream};
    ///
    /// if let Ok(dev) = Device::new(0) {
    ///     let stream = Stream::new(&dev);
    /// }
    /// ```
    pub fn new(dev: &Device) -> Result<Self> {
        Self::with_config(dev, Config::default())
    }

    pub fn with_buffers(dev: &Device, count: u32) -> Result<Self> {
        Self::with_config(dev, Config::default().with_buffers(count))
    }

    /// Returns a stream for frame capturing
    ///
    /// The device must support video capture and streaming I/O. Buffers are requested and
    /// mapped right away, but nothing is queued before [`Stream::start`].
    pub fn with_config(dev: &Device, config: Config) -> Result<Self> {
        let caps = dev.caps();
        if !caps.supports_capture() {
            return Err(Error::Unsupported(format!(
                "{} cannot capture video",
                caps.card
            )));
        }
        if !caps.supports_streaming() {
            return Err(Error::Unsupported(format!(
                "{} does not support streaming I/O",
                caps.card
            )));
        }

        let mut arena = Arena::new(dev.handle());
        arena.allocate(config.buffer_count)?;

        Ok(Stream {
            handle: dev.handle(),
            arena,
            config,
            active: false,
        })
    }

    /// Returns the raw device handle
    pub fn handle(&self) -> Arc<Handle> {
        self.handle.clone()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the driver is currently streaming
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The mapped buffers of this stream
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Queues all idle buffers and starts streaming
    pub fn start(&mut self) -> Result<()> {
        if self.active {
            return Err(Error::State("stream is already started"));
        }

        for index in 0..self.arena.len() {
            if self.arena.slots[index].state == State::Idle {
                self.queue(index as u32)?;
            }
        }

        ioctl::stream_on(&self.handle)?;
        self.active = true;
        Ok(())
    }

    /// Stops streaming
    ///
    /// The driver drops all buffers it still holds, so every buffer becomes idle again.
    /// Stopping an inactive stream does nothing.
    pub fn stop(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }

        ioctl::stream_off(&self.handle)?;
        self.active = false;
        for slot in &mut self.arena.slots {
            slot.state = State::Idle;
        }
        Ok(())
    }

    /// Inserts a buffer into the driver's incoming queue
    pub fn queue(&mut self, index: u32) -> Result<()> {
        let slot = self
            .arena
            .slots
            .get_mut(index as usize)
            .ok_or(Error::State("buffer index out of range"))?;
        if slot.state == State::Queued {
            return Err(Error::State("buffer is already queued"));
        }

        ioctl::queue_buffer(&self.handle, index)?;
        slot.state = State::Queued;
        Ok(())
    }

    /// Removes a filled buffer from the driver's outgoing queue
    ///
    /// Blocks until a buffer is available, see [`Stream::wait`] for a bounded wait.
    pub fn dequeue(&mut self) -> Result<(u32, Metadata)> {
        let dequeued = ioctl::dequeue_buffer(&self.handle)?;
        let slot = self
            .arena
            .slots
            .get_mut(dequeued.index as usize)
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "driver returned unknown buffer {}",
                    dequeued.index
                ))
            })?;
        let was_queued = slot.state == State::Queued;
        // the application owns the buffer now either way, so it can be queued again
        slot.state = State::Filled;
        slot.meta = dequeued.meta;
        if !was_queued {
            return Err(Error::Protocol(format!(
                "driver returned buffer {} which was not queued",
                dequeued.index
            )));
        }

        Ok((dequeued.index, dequeued.meta))
    }

    /// Waits until a filled buffer can be dequeued
    ///
    /// Returns zero if `timeout` elapsed first.
    pub fn wait(&self, timeout: Duration) -> Result<usize> {
        pselect::wait_readable(&self.handle, timeout)
    }

    /// Fetches the next frame, starting the stream if necessary
    ///
    /// Returns `None` if no frame arrived within `timeout`.
    pub fn next_frame(&mut self, timeout: Duration) -> Result<Option<Frame<'_>>> {
        if !self.active {
            self.start()?;
        }

        if self.wait(timeout)? == 0 {
            trace!("no frame within {:?}", timeout);
            return Ok(None);
        }

        let (index, _) = self.dequeue()?;
        Ok(Some(Frame::new(self, index)))
    }

    /// Fetches the next frame using the configured timeout
    ///
    /// Without a timeout this blocks in the driver until a frame is ready.
    pub fn frame(&mut self) -> Result<Option<Frame<'_>>> {
        match self.config.timeout {
            Some(timeout) => self.next_frame(timeout),
            None => {
                if !self.active {
                    self.start()?;
                }
                let (index, _) = self.dequeue()?;
                Ok(Some(Frame::new(self, index)))
            }
        }
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            // ENODEV means the file descriptor wrapped in the handle became invalid, most
            // likely because the device was unplugged.
            if e.errno() != Some(libc::ENODEV) {
                warn!("failed to stop stream: {}", e);
            }
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("handle", &self.handle)
            .field("buffers", &self.arena.len())
            .field("active", &self.active)
            .finish()
    }
}

/// A captured frame lent out of a [`Stream`]
///
/// The stream cannot be used while a frame is alive. Releasing the frame, or dropping it,
/// hands the buffer back to the driver.
pub struct Frame<'a> {
    stream: &'a mut Stream,
    index: u32,
    released: bool,
}

impl<'a> Frame<'a> {
    fn new(stream: &'a mut Stream, index: u32) -> Self {
        Frame {
            stream,
            index,
            released: false,
        }
    }

    /// Index of the underlying buffer
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Captured bytes, bounded by the size of the mapping
    pub fn data(&self) -> &[u8] {
        let slot = &self.stream.arena.slots[self.index as usize];
        let used = cmp::min(slot.meta.bytesused as usize, slot.mmap.len());
        &slot.mmap.as_slice()[..used]
    }

    pub fn meta(&self) -> &Metadata {
        &self.stream.arena.slots[self.index as usize].meta
    }

    /// Re-queues the buffer, reporting failures
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.stream.queue(self.index)
    }
}

impl Drop for Frame<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(e) = self.stream.queue(self.index) {
            warn!("failed to re-queue buffer {}: {}", self.index, e);
        }
    }
}

impl fmt::Debug for Frame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("index", &self.index)
            .field("meta", self.meta())
            .finish()
    }
}
