//! System call layer
//!
//! Everything the crate needs from the operating system goes through the [`Backend`] trait:
//! opening the device node, ioctl requests, buffer mappings and the readiness wait. [`Kernel`]
//! is the implementation talking to the real kernel.

use std::ffi::CStr;
use std::io;
use std::os::unix::io::RawFd;

use crate::pselect::{self, FdSet};

pub mod api;
pub mod endian;
pub mod vidioc;

/// Operating system interface used by device handles
pub trait Backend: Send + Sync {
    /// Opens a device node and returns its file descriptor
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the device node
    /// * `flags` - Open flags
    fn open(&self, path: &CStr, flags: i32) -> io::Result<RawFd>;

    /// Closes a file descriptor previously returned by [`Backend::open`]
    fn close(&self, fd: RawFd) -> io::Result<()>;

    /// Issues an ioctl request
    ///
    /// # Safety
    ///
    /// `argp` must point to a live, properly initialized instance of the structure the
    /// `request` code was encoded for.
    unsafe fn ioctl(
        &self,
        fd: RawFd,
        request: vidioc::_IOC_TYPE,
        argp: *mut std::os::raw::c_void,
    ) -> io::Result<()>;

    /// Maps `length` bytes at `offset` of the device's buffer pool as shared, read-write memory
    ///
    /// # Safety
    ///
    /// The returned region is only valid until it is passed to [`Backend::munmap`].
    unsafe fn mmap(
        &self,
        fd: RawFd,
        length: usize,
        offset: libc::off_t,
    ) -> io::Result<*mut std::os::raw::c_void>;

    /// Releases a mapping created by [`Backend::mmap`]
    ///
    /// # Safety
    ///
    /// `start` and `length` must describe exactly one live mapping, which must not be accessed
    /// afterwards.
    unsafe fn munmap(&self, start: *mut std::os::raw::c_void, length: usize) -> io::Result<()>;

    /// Waits until one of the descriptors in `readfds` becomes readable
    ///
    /// Returns the number of ready descriptors, zero on timeout.
    fn pselect(&self, nfds: i32, readfds: &mut FdSet, timeout: &libc::timespec)
        -> io::Result<usize>;
}

/// Direct system calls through libc
#[derive(Debug, Default, Clone, Copy)]
pub struct Kernel;

impl Backend for Kernel {
    fn open(&self, path: &CStr, flags: i32) -> io::Result<RawFd> {
        let fd = unsafe { libc::open(path.as_ptr(), flags) };
        if fd == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(fd)
        }
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        if unsafe { libc::close(fd) } == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    unsafe fn ioctl(
        &self,
        fd: RawFd,
        request: vidioc::_IOC_TYPE,
        argp: *mut std::os::raw::c_void,
    ) -> io::Result<()> {
        /*
         * The libc crate (and libc itself!) defines ioctl() with different, incompatible
         * argument types on different platforms. syscall() works as a drop-in replacement
         * without conditional compilation. Details:
         * https://github.com/rust-lang/libc/issues/1036
         */
        if libc::syscall(libc::SYS_ioctl, fd, request, argp) == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    unsafe fn mmap(
        &self,
        fd: RawFd,
        length: usize,
        offset: libc::off_t,
    ) -> io::Result<*mut std::os::raw::c_void> {
        let ptr = libc::mmap(
            std::ptr::null_mut(),
            length,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_SHARED,
            fd,
            offset,
        );
        if ptr == libc::MAP_FAILED {
            Err(io::Error::last_os_error())
        } else {
            Ok(ptr)
        }
    }

    unsafe fn munmap(&self, start: *mut std::os::raw::c_void, length: usize) -> io::Result<()> {
        if libc::munmap(start, length) == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn pselect(
        &self,
        nfds: i32,
        readfds: &mut FdSet,
        timeout: &libc::timespec,
    ) -> io::Result<usize> {
        pselect::pselect(nfds, Some(readfds), None, None, Some(timeout), None)
    }
}
