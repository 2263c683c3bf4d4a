use std::collections::HashSet;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;
use std::sync::Arc;
use std::{fmt, io};

use log::{debug, warn};

use crate::capability::Capabilities;
use crate::error::{Error, Result};
use crate::format::{Description as FormatDescription, Format, FourCC};
use crate::framesize::FrameSize;
use crate::ioctl;
use crate::v4l2::{self, Backend};

/// Raw device handle
///
/// Owns the file descriptor and the backend used to talk to it. The descriptor is closed when
/// the last reference is dropped; buffer mappings hold a reference, so the device node always
/// outlives them.
pub struct Handle {
    fd: RawFd,
    backend: Arc<dyn Backend>,
}

impl Handle {
    /// Wraps an already opened file descriptor, taking ownership of it
    pub fn new(fd: RawFd, backend: Arc<dyn Backend>) -> Self {
        Handle { fd, backend }
    }

    /// Returns the raw file descriptor
    pub fn fd(&self) -> RawFd {
        self.fd
    }

    /// Returns the system call backend of this handle
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Issues an ioctl request on this handle
    ///
    /// Errors are tagged with the symbolic request name.
    ///
    /// # Safety
    ///
    /// `arg` must be the structure type the `request` code was encoded for.
    pub unsafe fn ioctl<T>(&self, request: v4l2::vidioc::_IOC_TYPE, arg: &mut T) -> Result<()> {
        self.backend
            .ioctl(self.fd, request, arg as *mut T as *mut std::os::raw::c_void)
            .map_err(|e| Error::device(v4l2::vidioc::name(request), e))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Err(e) = self.backend.close(self.fd) {
            warn!("failed to close fd {}: {}", self.fd, e);
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("fd", &self.fd).finish()
    }
}

/// Linux capture device abstraction
pub struct Device {
    handle: Arc<Handle>,
    caps: Capabilities,
}

impl Device {
    /// Returns a capture device by index
    ///
    /// Devices are usually enumerated by the system.
    /// An index of zero thus represents the first device the system got to know about.
    ///
    /// # Arguments
    ///
    /// * `index` - Index (0: first, 1: second, ..)
    ///
    /// # Example
    ///
    /// ```
    /// use v4l_stream::Device;
    /// let dev = Device::new(0);
    /// ```
    pub fn new(index: usize) -> Result<Self> {
        Self::with_path(format!("/dev/video{}", index))
    }

    /// Returns a capture device by path
    ///
    /// Linux device nodes are usually found in /dev/videoX or /sys/class/video4linux/videoX.
    ///
    /// # Arguments
    ///
    /// * `path` - Path (e.g. "/dev/video0")
    ///
    /// # Example
    ///
    /// ```
    /// use v4l_stream::Device;
    /// let dev = Device::with_path("/dev/video0");
    /// ```
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_backend(path, Arc::new(v4l2::Kernel))
    }

    /// Opens a device node through a custom system call backend
    ///
    /// The capabilities of the device are queried right away; nodes which are not V4L2 devices
    /// fail here.
    pub fn with_backend<P: AsRef<Path>>(path: P, backend: Arc<dyn Backend>) -> Result<Self> {
        let path = path.as_ref();
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            Error::device(
                "open",
                io::Error::new(io::ErrorKind::InvalidInput, "path contains a nul byte"),
            )
        })?;

        let fd = backend
            .open(&c_path, libc::O_RDWR)
            .map_err(|e| Error::device("open", e))?;
        let handle = Arc::new(Handle::new(fd, backend));
        let caps = ioctl::query_caps(&handle)?;
        debug!(
            "opened {} ({}, {}): capture={} streaming={}",
            path.display(),
            caps.driver,
            caps.card,
            caps.supports_capture(),
            caps.supports_streaming()
        );

        Ok(Device { handle, caps })
    }

    /// Returns the raw device handle
    pub fn handle(&self) -> Arc<Handle> {
        self.handle.clone()
    }

    /// Capabilities as reported when the device was opened
    pub fn caps(&self) -> &Capabilities {
        &self.caps
    }

    /// Queries the device capabilities again
    pub fn query_caps(&self) -> Result<Capabilities> {
        ioctl::query_caps(&self.handle)
    }

    /// Returns a vector of valid formats for this device
    ///
    /// Indices are walked starting at zero until the driver reports the end of the list.
    /// Codes listed more than once are only reported on their first occurrence.
    pub fn enum_formats(&self) -> Result<Vec<FormatDescription>> {
        let mut formats = Vec::new();
        let mut seen = HashSet::new();

        for index in 0.. {
            match ioctl::enum_format(&self.handle, index) {
                Ok(desc) => {
                    if seen.insert(desc.fourcc) {
                        formats.push(desc);
                    } else {
                        warn!("driver listed format {} twice", desc.fourcc);
                    }
                }
                Err(Error::EnumerationExhausted) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(formats)
    }

    /// Returns a vector of valid framesizes that the device supports for the given pixel format
    pub fn enum_framesizes(&self, fourcc: FourCC) -> Result<Vec<FrameSize>> {
        let mut sizes = Vec::new();

        for index in 0.. {
            match ioctl::enum_framesize(&self.handle, index, fourcc) {
                Ok(size) => sizes.push(size),
                Err(Error::EnumerationExhausted) => break,
                Err(e) => return Err(e),
            }
        }

        Ok(sizes)
    }

    /// Returns the format currently in use
    pub fn format(&self) -> Result<Format> {
        ioctl::get_format(&self.handle)
    }

    /// Modifies the capture format and returns the actual format
    ///
    /// The driver tries to match the format parameters on a best effort basis.
    /// Thus, if the combination of format properties cannot be achieved, the closest possible
    /// settings are used and reported back.
    ///
    /// # Arguments
    ///
    /// * `fmt` - Desired format
    pub fn set_format(&self, fmt: &Format) -> Result<Format> {
        ioctl::set_format(&self.handle, fmt)
    }

    /// Requests a pixel format and resolution, returning what the driver accepted
    ///
    /// # Example
    ///
    /// ```
    /// use v4l_stream::{Device, FourCC};
    ///
    /// if let Ok(dev) = Device::new(0) {
    ///     if let Ok(fmt) = dev.negotiate(FourCC::new(b"YUYV"), 640, 480) {
    ///         println!("{}x{} {}", fmt.width, fmt.height, fmt.fourcc);
    ///     }
    /// }
    /// ```
    pub fn negotiate(&self, fourcc: FourCC, width: u32, height: u32) -> Result<Format> {
        let accepted = self.set_format(&Format::new(width, height, fourcc))?;
        if accepted.fourcc != fourcc || accepted.width != width || accepted.height != height {
            debug!(
                "requested {}x{} {}, driver chose {}x{} {}",
                width, height, fourcc, accepted.width, accepted.height, accepted.fourcc
            );
        }
        Ok(accepted)
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("handle", &self.handle)
            .field("card", &self.caps.card)
            .finish()
    }
}
