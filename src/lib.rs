//! This crate provides memory-mapped frame capture on Video4Linux2 devices.
//!
//! The device state protocol follows the kernel's streaming I/O model: query the capabilities,
//! negotiate a format, request and map buffers, start streaming and cycle buffers between the
//! application and the driver, then tear everything down in reverse order.
//!
//! The ABI structures and ioctl request codes are declared in [`v4l2`]; all system calls go
//! through the [`v4l2::Backend`] trait so a device can be driven by something other than the
//! kernel.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use v4l_stream::{Device, FourCC, Stream};
//!
//! let dev = Device::new(0).expect("Failed to open device");
//! let fmt = dev
//!     .negotiate(FourCC::new(b"YUYV"), 640, 480)
//!     .expect("Failed to set format");
//! println!("Capturing {}x{} {}", fmt.width, fmt.height, fmt.fourcc);
//!
//! let mut stream = Stream::with_buffers(&dev, 4).expect("Failed to create buffer stream");
//! for _ in 0..10 {
//!     if let Some(frame) = stream.next_frame(Duration::from_secs(2)).unwrap() {
//!         println!("seq {} bytes {}", frame.meta().sequence, frame.data().len());
//!     }
//! }
//! ```

pub mod v4l2;

pub mod buffer;
pub mod capability;
pub mod device;
pub mod error;
pub mod format;
pub mod framesize;
pub mod io;
pub mod ioctl;
pub mod memory;
pub mod pselect;
pub mod timestamp;

pub use {
    capability::Capabilities,
    device::{Device, Handle},
    error::{Error, Result},
    format::{Format, FourCC},
    framesize::FrameSize,
    io::{Config, Frame, Stream},
    timestamp::Timestamp,
};
