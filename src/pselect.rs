use std::convert::TryFrom;
use std::os::unix::io::RawFd;
use std::time::{Duration, Instant};
use std::{io, mem, ptr};

use log::trace;

use crate::device::Handle;
use crate::error::{Error, Result};

/// Fixed-capacity descriptor bitset as consumed by `select(2)` and `pselect(2)`
#[derive(Clone, Copy)]
pub struct FdSet(libc::fd_set);

impl FdSet {
    /// Number of descriptors a set can hold
    pub const CAPACITY: usize = libc::FD_SETSIZE as usize;

    pub fn new() -> FdSet {
        unsafe {
            let mut raw_fd_set = mem::MaybeUninit::<libc::fd_set>::uninit();
            libc::FD_ZERO(raw_fd_set.as_mut_ptr());
            FdSet(raw_fd_set.assume_init())
        }
    }

    /// Adds a descriptor to the set
    ///
    /// Descriptors outside of `0..CAPACITY` cannot be represented and are rejected.
    pub fn set(&mut self, fd: RawFd) -> io::Result<()> {
        if fd < 0 || fd as usize >= Self::CAPACITY {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("fd {} does not fit into an fd_set", fd),
            ));
        }

        unsafe {
            libc::FD_SET(fd, &mut self.0);
        }
        Ok(())
    }

    pub fn is_set(&self, fd: RawFd) -> bool {
        if fd < 0 || fd as usize >= Self::CAPACITY {
            return false;
        }

        unsafe { libc::FD_ISSET(fd, &self.0) }
    }
}

impl Default for FdSet {
    fn default() -> Self {
        FdSet::new()
    }
}

fn to_fdset_ptr(opt: Option<&mut FdSet>) -> *mut libc::fd_set {
    match opt {
        None => ptr::null_mut(),
        Some(&mut FdSet(ref mut raw_fd_set)) => raw_fd_set,
    }
}
fn to_ptr<T>(opt: Option<&T>) -> *const T {
    match opt {
        None => ptr::null::<T>(),
        Some(p) => p,
    }
}

pub fn pselect(
    nfds: libc::c_int,
    readfds: Option<&mut FdSet>,
    writefds: Option<&mut FdSet>,
    errorfds: Option<&mut FdSet>,
    timeout: Option<&libc::timespec>,
    sigmask: Option<&libc::sigset_t>,
) -> io::Result<usize> {
    match unsafe {
        libc::pselect(
            nfds,
            to_fdset_ptr(readfds),
            to_fdset_ptr(writefds),
            to_fdset_ptr(errorfds),
            to_ptr(timeout),
            to_ptr(sigmask),
        )
    } {
        -1 => Err(io::Error::last_os_error()),
        res => Ok(res as usize),
    }
}

/// Converts a duration, saturating seconds that do not fit into `time_t`
pub fn make_timespec(duration: Duration) -> libc::timespec {
    libc::timespec {
        tv_sec: libc::time_t::try_from(duration.as_secs()).unwrap_or(libc::time_t::MAX),
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    }
}

/// Blocks until the device has a buffer ready or `timeout` elapses
///
/// Returns the number of ready descriptors, which is zero on timeout.
/// A wait interrupted by a signal is resumed with whatever is left of the original timeout, so
/// interruptions never surface as errors. Timeouts too large to form a deadline, such as
/// `Duration::MAX`, are resumed with the full timeout.
///
/// # Arguments
///
/// * `handle` - Device handle to wait on
/// * `timeout` - Upper bound for the wait
pub fn wait_readable(handle: &Handle, timeout: Duration) -> Result<usize> {
    let deadline = Instant::now().checked_add(timeout);
    let mut remaining = timeout;

    loop {
        let mut fds = FdSet::new();
        fds.set(handle.fd())
            .map_err(|e| Error::device("pselect", e))?;
        let ts = make_timespec(remaining);

        match handle.backend().pselect(handle.fd() + 1, &mut fds, &ts) {
            Ok(count) => return Ok(count),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                remaining = match deadline {
                    Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                    None => timeout,
                };
                trace!(
                    "pselect interrupted on fd {}, {:?} left",
                    handle.fd(),
                    remaining
                );
            }
            Err(e) => return Err(Error::device("pselect", e)),
        }
    }
}
