//! Device control operations
//!
//! Every function issues exactly one ioctl request and translates the kernel structures into
//! the crate's types. Nothing is retried here.

use std::convert::TryFrom;
use std::mem;

use log::{debug, trace};

use crate::buffer::Metadata;
use crate::capability::Capabilities;
use crate::device::Handle;
use crate::error::{Error, Result};
use crate::format::{Description, Format, FourCC};
use crate::framesize::FrameSize;
use crate::v4l2::api::*;
use crate::v4l2::vidioc;

/// Location of a driver buffer inside the device's mmap space
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BufferPlacement {
    pub offset: u32,
    pub length: u32,
}

/// A buffer handed back by the driver
#[derive(Debug, Copy, Clone)]
pub struct Dequeued {
    pub index: u32,
    pub meta: Metadata,
}

// Enumerations end with EINVAL once the index runs past the last entry.
fn exhausted(err: Error) -> Error {
    match err.errno() {
        Some(libc::EINVAL) => Error::EnumerationExhausted,
        _ => err,
    }
}

pub fn query_caps(handle: &Handle) -> Result<Capabilities> {
    let mut caps: v4l2_capability = unsafe { mem::zeroed() };
    unsafe { handle.ioctl(vidioc::VIDIOC_QUERYCAP, &mut caps)? };
    Ok(Capabilities::from(caps))
}

/// Returns the pixel format at `index`, or [`Error::EnumerationExhausted`] past the last one
pub fn enum_format(handle: &Handle, index: u32) -> Result<Description> {
    let mut desc = v4l2_fmtdesc {
        index,
        type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
        ..unsafe { mem::zeroed() }
    };
    unsafe { handle.ioctl(vidioc::VIDIOC_ENUM_FMT, &mut desc) }.map_err(exhausted)?;
    Ok(Description::from(desc))
}

/// Returns the frame size at `index` for a pixel format
pub fn enum_framesize(handle: &Handle, index: u32, fourcc: FourCC) -> Result<FrameSize> {
    let mut desc = v4l2_frmsizeenum {
        index,
        pixel_format: fourcc.into(),
        ..unsafe { mem::zeroed() }
    };
    unsafe { handle.ioctl(vidioc::VIDIOC_ENUM_FRAMESIZES, &mut desc) }.map_err(exhausted)?;
    FrameSize::try_from(desc)
}

pub fn get_format(handle: &Handle) -> Result<Format> {
    let mut fmt = v4l2_format {
        type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
        fmt: v4l2_format_union::new([0; 200]),
    };
    unsafe { handle.ioctl(vidioc::VIDIOC_G_FMT, &mut fmt)? };
    Format::decode(&fmt)
}

/// Applies a format and returns the one the driver actually accepted
pub fn set_format(handle: &Handle, format: &Format) -> Result<Format> {
    let mut fmt = format.encode()?;
    unsafe { handle.ioctl(vidioc::VIDIOC_S_FMT, &mut fmt)? };
    let accepted = Format::decode(&fmt)?;
    debug!(
        "format accepted: {}x{} {} stride {} size {}",
        accepted.width, accepted.height, accepted.fourcc, accepted.stride, accepted.size
    );
    Ok(accepted)
}

fn reqbufs(handle: &Handle, count: u32) -> Result<u32> {
    let mut req = v4l2_requestbuffers {
        count,
        type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
        memory: V4L2_MEMORY_MMAP,
        ..Default::default()
    };
    unsafe { handle.ioctl(vidioc::VIDIOC_REQBUFS, &mut req)? };
    Ok(req.count)
}

/// Requests `count` mmap buffers and returns how many the driver granted
///
/// Drivers may grant more or fewer buffers than requested, but zero is an error.
pub fn request_buffers(handle: &Handle, count: u32) -> Result<u32> {
    let granted = reqbufs(handle, count)?;
    debug!("requested {} buffers, driver granted {}", count, granted);
    if granted == 0 {
        return Err(Error::InsufficientResources {
            requested: count,
            granted,
        });
    }
    Ok(granted)
}

/// Frees all buffers of the device by requesting zero of them
///
/// Fails with EBUSY while any buffer is still mapped.
pub fn free_buffers(handle: &Handle) -> Result<()> {
    reqbufs(handle, 0)?;
    debug!("freed buffers of fd {}", handle.fd());
    Ok(())
}

pub fn query_buffer(handle: &Handle, index: u32) -> Result<BufferPlacement> {
    let mut buf = v4l2_buffer::mmap(index);
    unsafe { handle.ioctl(vidioc::VIDIOC_QUERYBUF, &mut buf)? };
    Ok(BufferPlacement {
        offset: buf.m.offset()?,
        length: buf.length,
    })
}

/// Hands buffer `index` to the driver for filling
pub fn queue_buffer(handle: &Handle, index: u32) -> Result<()> {
    let mut buf = v4l2_buffer::mmap(index);
    unsafe { handle.ioctl(vidioc::VIDIOC_QBUF, &mut buf)? };
    trace!("queued buffer {}", index);
    Ok(())
}

/// Takes the oldest filled buffer back from the driver
///
/// Blocks on devices opened without `O_NONBLOCK` until a buffer is available.
pub fn dequeue_buffer(handle: &Handle) -> Result<Dequeued> {
    let mut buf = v4l2_buffer::mmap(0);
    unsafe { handle.ioctl(vidioc::VIDIOC_DQBUF, &mut buf)? };
    let meta = Metadata::from(&buf);
    trace!(
        "dequeued buffer {}: seq {} bytesused {}",
        buf.index,
        meta.sequence,
        meta.bytesused
    );
    Ok(Dequeued {
        index: buf.index,
        meta,
    })
}

pub fn stream_on(handle: &Handle) -> Result<()> {
    let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE as std::os::raw::c_int;
    unsafe { handle.ioctl(vidioc::VIDIOC_STREAMON, &mut typ)? };
    debug!("stream on, fd {}", handle.fd());
    Ok(())
}

/// Stops streaming; the driver drops all queued and filled buffers back to the application
pub fn stream_off(handle: &Handle) -> Result<()> {
    let mut typ = V4L2_BUF_TYPE_VIDEO_CAPTURE as std::os::raw::c_int;
    unsafe { handle.ioctl(vidioc::VIDIOC_STREAMOFF, &mut typ)? };
    debug!("stream off, fd {}", handle.fd());
    Ok(())
}
