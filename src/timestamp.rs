use std::{fmt, time};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
/// Capture time consisting of a seconds and a microseconds component
///
/// Drivers usually sample `CLOCK_MONOTONIC`, see [`crate::buffer::Flags::TIMESTAMP_MONOTONIC`].
pub struct Timestamp {
    pub sec: i64,
    pub usec: i64,
}

impl Timestamp {
    /// Returns a timestamp representation
    ///
    /// # Example
    ///
    /// ```
    /// use v4l_stream::Timestamp;
    /// let ts = Timestamp::new(5, 5);
    /// ```
    pub fn new(sec: i64, usec: i64) -> Self {
        Timestamp { sec, usec }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let floating: f64 = self.sec as f64 + self.usec as f64 / 1_000_000.0;
        write!(f, "{} [s]", floating)
    }
}

impl From<libc::timeval> for Timestamp {
    fn from(tv: libc::timeval) -> Self {
        Timestamp {
            sec: tv.tv_sec as i64,
            usec: tv.tv_usec as i64,
        }
    }
}

impl From<Timestamp> for libc::timeval {
    fn from(ts: Timestamp) -> Self {
        libc::timeval {
            tv_sec: ts.sec as libc::time_t,
            tv_usec: ts.usec as libc::suseconds_t,
        }
    }
}

impl From<Timestamp> for time::Duration {
    fn from(ts: Timestamp) -> Self {
        time::Duration::new(ts.sec.max(0) as u64, (ts.usec.clamp(0, 999_999) * 1000) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeval_conversion() {
        let ts = Timestamp::from(libc::timeval {
            tv_sec: 12,
            tv_usec: 250_000,
        });
        assert_eq!(ts, Timestamp::new(12, 250_000));
        assert_eq!(time::Duration::from(ts), time::Duration::from_millis(12_250));

        let tv: libc::timeval = ts.into();
        assert_eq!(tv.tv_sec, 12);
        assert_eq!(tv.tv_usec, 250_000);
    }
}
