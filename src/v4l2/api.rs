//! Kernel ABI structures used by the capture path.
//!
//! The layouts mirror `linux/videodev2.h`. Union members are kept as raw, suitably aligned byte
//! regions and are only ever interpreted through the typed decoders in this crate (see
//! [`crate::framesize`], [`crate::format`] and [`v4l2_buffer_union::offset`]).
//!
//! Padding follows the target's pointer width: the alignment marker fields (`[usize; 0]`) and
//! `libc::timeval` resolve at compile time, so the same declarations serve 32-bit and 64-bit
//! targets.

#![allow(non_camel_case_types)]

use std::mem;

use crate::error::Result;
use crate::v4l2::endian::{Reader, Writer};

pub const V4L2_BUF_TYPE_VIDEO_CAPTURE: u32 = 1;
pub const V4L2_MEMORY_MMAP: u32 = 1;
pub const V4L2_FIELD_ANY: u32 = 0;

pub const V4L2_FRMSIZE_TYPE_DISCRETE: u32 = 1;
pub const V4L2_FRMSIZE_TYPE_CONTINUOUS: u32 = 2;
pub const V4L2_FRMSIZE_TYPE_STEPWISE: u32 = 3;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct v4l2_capability {
    pub driver: [u8; 16],
    pub card: [u8; 32],
    pub bus_info: [u8; 32],
    pub version: u32,
    pub capabilities: u32,
    pub device_caps: u32,
    pub reserved: [u32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct v4l2_fmtdesc {
    pub index: u32,
    pub type_: u32,
    pub flags: u32,
    pub description: [u8; 32],
    pub pixelformat: u32,
    pub mbus_code: u32,
    pub reserved: [u32; 3],
}

/// Raw storage of the `discrete`/`stepwise` union in [`v4l2_frmsizeenum`]
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct v4l2_frmsize_union {
    pub bytes: [u8; 24],
    _align: [u32; 0],
}

impl v4l2_frmsize_union {
    pub fn new(bytes: [u8; 24]) -> Self {
        v4l2_frmsize_union { bytes, _align: [] }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct v4l2_frmsizeenum {
    pub index: u32,
    pub pixel_format: u32,
    pub type_: u32,
    pub un: v4l2_frmsize_union,
    pub reserved: [u32; 2],
}

/// Raw storage of the `fmt` union in [`v4l2_format`]
///
/// Some of the union members carry pointers, so the region is pointer aligned.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_format_union {
    pub bytes: [u8; 200],
    _align: [usize; 0],
}

impl v4l2_format_union {
    pub fn new(bytes: [u8; 200]) -> Self {
        v4l2_format_union { bytes, _align: [] }
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_format {
    pub type_: u32,
    pub fmt: v4l2_format_union,
}

/// Single-planar pixel format, stored inside [`v4l2_format_union`]
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct v4l2_pix_format {
    pub width: u32,
    pub height: u32,
    pub pixelformat: u32,
    pub field: u32,
    pub bytesperline: u32,
    pub sizeimage: u32,
    pub colorspace: u32,
    pub priv_: u32,
    pub flags: u32,
    pub ycbcr_enc: u32,
    pub quantization: u32,
    pub xfer_func: u32,
}

impl v4l2_pix_format {
    /// Decodes the pixel format member of a format union
    pub fn decode(un: &v4l2_format_union) -> Result<Self> {
        let mut r = Reader::new(&un.bytes);
        Ok(v4l2_pix_format {
            width: r.u32()?,
            height: r.u32()?,
            pixelformat: r.u32()?,
            field: r.u32()?,
            bytesperline: r.u32()?,
            sizeimage: r.u32()?,
            colorspace: r.u32()?,
            priv_: r.u32()?,
            flags: r.u32()?,
            ycbcr_enc: r.u32()?,
            quantization: r.u32()?,
            xfer_func: r.u32()?,
        })
    }

    /// Encodes this pixel format into a zero-filled format union
    pub fn encode(&self) -> Result<v4l2_format_union> {
        let mut un = v4l2_format_union::new([0; 200]);
        let mut w = Writer::new(&mut un.bytes);
        for value in [
            self.width,
            self.height,
            self.pixelformat,
            self.field,
            self.bytesperline,
            self.sizeimage,
            self.colorspace,
            self.priv_,
            self.flags,
            self.ycbcr_enc,
            self.quantization,
            self.xfer_func,
        ] {
            w.u32(value)?;
        }
        Ok(un)
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone)]
pub struct v4l2_requestbuffers {
    pub count: u32,
    pub type_: u32,
    pub memory: u32,
    pub capabilities: u32,
    pub flags: u8,
    pub reserved: [u8; 3],
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct v4l2_timecode {
    pub type_: u32,
    pub flags: u32,
    pub frames: u8,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub userbits: [u8; 4],
}

/// Raw storage of the `m` union in [`v4l2_buffer`]
///
/// The union holds an `unsigned long` and a pointer, hence it is exactly one pointer wide.
#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct v4l2_buffer_union {
    pub bytes: [u8; mem::size_of::<usize>()],
    _align: [usize; 0],
}

impl v4l2_buffer_union {
    /// Offset of an mmap buffer within the device's buffer pool
    pub fn offset(&self) -> Result<u32> {
        Reader::new(&self.bytes).u32()
    }

    /// Builds a union holding an mmap offset
    pub fn with_offset(offset: u32) -> Result<Self> {
        let mut un = v4l2_buffer_union {
            bytes: [0; mem::size_of::<usize>()],
            _align: [],
        };
        Writer::new(&mut un.bytes).u32(offset)?;
        Ok(un)
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct v4l2_buffer {
    pub index: u32,
    pub type_: u32,
    pub bytesused: u32,
    pub flags: u32,
    pub field: u32,
    pub timestamp: libc::timeval,
    pub timecode: v4l2_timecode,
    pub sequence: u32,
    pub memory: u32,
    pub m: v4l2_buffer_union,
    pub length: u32,
    pub reserved2: u32,
    pub request_fd: i32,
}

impl v4l2_buffer {
    /// Returns a capture buffer descriptor for mmap streaming
    pub fn mmap(index: u32) -> Self {
        v4l2_buffer {
            index,
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            memory: V4L2_MEMORY_MMAP,
            ..unsafe { mem::zeroed() }
        }
    }
}

// Sizes as seen by the kernel; the ioctl request codes embed them.
const _: () = {
    assert!(mem::size_of::<v4l2_capability>() == 104);
    assert!(mem::size_of::<v4l2_fmtdesc>() == 64);
    assert!(mem::size_of::<v4l2_frmsizeenum>() == 44);
    assert!(mem::size_of::<v4l2_pix_format>() == 48);
    assert!(mem::size_of::<v4l2_requestbuffers>() == 20);
    assert!(mem::size_of::<v4l2_timecode>() == 16);
};

#[cfg(target_pointer_width = "64")]
const _: () = {
    assert!(mem::size_of::<v4l2_format>() == 208);
    assert!(mem::size_of::<v4l2_buffer>() == 88);
};

#[cfg(target_pointer_width = "32")]
const _: () = {
    assert!(mem::size_of::<v4l2_format>() == 204);
    // legacy 32-bit time_t, then 64-bit time_t padded to the timeval alignment
    if mem::size_of::<libc::timeval>() == 8 {
        assert!(mem::size_of::<v4l2_buffer>() == 68);
    } else if mem::align_of::<libc::timeval>() == 8 {
        assert!(mem::size_of::<v4l2_buffer>() == 80);
    } else {
        assert!(mem::size_of::<v4l2_buffer>() == 76);
    }
};
