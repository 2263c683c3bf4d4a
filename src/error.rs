use std::io;

use thiserror::Error;

/// Errors reported by device, buffer and stream operations
#[derive(Debug, Error)]
pub enum Error {
    /// An ioctl or another system call failed, the OS error code is kept in `source`
    #[error("{request} failed: {source}")]
    Device {
        request: &'static str,
        #[source]
        source: io::Error,
    },

    /// The device has no more items for an enumerate-by-index request
    #[error("enumeration exhausted")]
    EnumerationExhausted,

    /// The driver handed back a structure we cannot interpret
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The driver granted fewer buffers than streaming needs
    #[error("insufficient resources: requested {requested} buffers, driver granted {granted}")]
    InsufficientResources { requested: u32, granted: u32 },

    /// Mapping or unmapping a buffer failed
    #[error("failed to (un)map buffer {index}: {source}")]
    Map {
        index: u32,
        #[source]
        source: io::Error,
    },

    /// The operation is not valid in the current stream or buffer state
    #[error("invalid state: {0}")]
    State(&'static str),

    /// The device lacks a capability required for the operation
    #[error("unsupported device: {0}")]
    Unsupported(String),
}

impl Error {
    pub(crate) fn device(request: &'static str, source: io::Error) -> Self {
        Error::Device { request, source }
    }

    /// Returns the raw OS error code if this error originated from a system call
    pub fn errno(&self) -> Option<i32> {
        match self {
            Error::Device { source, .. } | Error::Map { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }

    /// Whether this is the end-of-sequence marker of an enumeration
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Error::EnumerationExhausted)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_is_exposed_for_os_errors() {
        let err = Error::device("VIDIOC_DQBUF", io::Error::from_raw_os_error(libc::EAGAIN));
        assert_eq!(err.errno(), Some(libc::EAGAIN));
        assert!(err.to_string().starts_with("VIDIOC_DQBUF failed"));

        assert_eq!(Error::EnumerationExhausted.errno(), None);
        assert!(Error::EnumerationExhausted.is_exhausted());
    }
}
