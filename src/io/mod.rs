//! Streaming I/O with memory-mapped buffers

use std::time::Duration;

pub mod arena;
pub use arena::{Arena, State};

pub mod stream;
pub use stream::{Frame, Stream};

/// Number of buffers a stream requests unless configured otherwise
pub const DEFAULT_BUFFER_COUNT: u32 = 4;

/// Stream configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of buffers to request, the driver may grant a different amount
    pub buffer_count: u32,
    /// Upper bound for waiting on a frame in [`Stream::frame`], `None` waits forever
    pub timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_count: DEFAULT_BUFFER_COUNT,
            timeout: None,
        }
    }
}

impl Config {
    /// Set the number of buffers
    pub fn with_buffers(mut self, count: u32) -> Self {
        self.buffer_count = count;
        self
    }

    /// Set the frame timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = Config::default();
        assert_eq!(config.buffer_count, 4);
        assert_eq!(config.timeout, None);

        let config = config
            .with_buffers(2)
            .with_timeout(Duration::from_millis(250));
        assert_eq!(config.buffer_count, 2);
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
    }
}
