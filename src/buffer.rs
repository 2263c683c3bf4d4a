use bitflags::bitflags;
use std::convert::TryFrom;
use std::fmt;

use crate::format::FieldOrder;
use crate::timestamp::Timestamp;
use crate::v4l2::api::{v4l2_buffer, v4l2_timecode};

bitflags! {
    #[allow(clippy::unreadable_literal)]
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Flags: u32 {
        /// Buffer is mapped
        const MAPPED                = 0x00000001;
        /// Buffer is queued for processing
        const QUEUED                = 0x00000002;
        /// Buffer is ready
        const DONE                  = 0x00000004;
        /// Image is a keyframe (I-frame)
        const KEYFRAME              = 0x00000008;
        /// Image is a P-frame
        const PFRAME                = 0x00000010;
        /// Image is a B-frame
        const BFRAME                = 0x00000020;
        /// Buffer is ready, but the data contained within is corrupted
        const ERROR                 = 0x00000040;
        /// Buffer is added to an unqueued request
        const IN_REQUEST            = 0x00000080;
        /// Timecode field is valid
        const TIMECODE              = 0x00000100;
        /// Don't return the capture buffer until OUTPUT timestamp changes
        const M2M_HOLD_CAPTURE_BUF  = 0x00000200;
        /// Buffer is prepared for queuing
        const PREPARED              = 0x00000400;
        /// Cache handling flags
        const NO_CACHE_INVALIDATE   = 0x00000800;
        const NO_CACHE_CLEAN        = 0x00001000;
        /// Timestamp type
        const TIMESTAMP_MASK        = 0x0000e000;
        const TIMESTAMP_MONOTONIC   = 0x00002000;
        const TIMESTAMP_COPY        = 0x00004000;
        /// Timestamp sources
        const TSTAMP_SRC_MASK       = 0x00070000;
        const TSTAMP_SRC_SOE        = 0x00010000;
        /// mem2mem encoder/decoder
        const LAST                  = 0x00100000;
        /// request_fd is valid
        const REQUEST_FD            = 0x00800000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Flags {
        Flags::from_bits_truncate(flags)
    }
}

impl From<Flags> for u32 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// SMPTE timecode attached to a buffer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timecode {
    pub typ: u32,
    pub flags: u32,
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
    pub userbits: [u8; 4],
}

impl From<v4l2_timecode> for Timecode {
    fn from(tc: v4l2_timecode) -> Self {
        Timecode {
            typ: tc.type_,
            flags: tc.flags,
            hours: tc.hours,
            minutes: tc.minutes,
            seconds: tc.seconds,
            frames: tc.frames,
            userbits: tc.userbits,
        }
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

/// Buffer metadata as reported by the driver when a buffer is dequeued
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Number of bytes occupied by the data in the buffer
    pub bytesused: u32,
    /// Buffer flags
    pub flags: Flags,
    /// Field of the image, `None` if the driver reported an unknown value
    pub field: Option<FieldOrder>,
    /// Time of capture (usually set by the driver)
    pub timestamp: Timestamp,
    /// Sequence number, counting the frames
    pub sequence: u32,
    /// Only present when the driver sets [`Flags::TIMECODE`]
    pub timecode: Option<Timecode>,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            bytesused: 0,
            flags: Flags::empty(),
            field: None,
            timestamp: Timestamp::default(),
            sequence: 0,
            timecode: None,
        }
    }
}

impl From<&v4l2_buffer> for Metadata {
    fn from(buf: &v4l2_buffer) -> Self {
        let flags = Flags::from(buf.flags);
        Metadata {
            bytesused: buf.bytesused,
            flags,
            field: FieldOrder::try_from(buf.field).ok(),
            timestamp: buf.timestamp.into(),
            sequence: buf.sequence,
            timecode: if flags.contains(Flags::TIMECODE) {
                Some(buf.timecode.into())
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_descriptor() {
        let mut buf = v4l2_buffer::mmap(1);
        buf.bytesused = 4096;
        buf.flags = 0x0000_2001;
        buf.field = 1;
        buf.sequence = 7;
        buf.timestamp.tv_sec = 3;
        buf.timecode.hours = 10;

        let meta = Metadata::from(&buf);
        assert_eq!(meta.bytesused, 4096);
        assert_eq!(meta.flags, Flags::MAPPED | Flags::TIMESTAMP_MONOTONIC);
        assert_eq!(meta.field, Some(FieldOrder::Progressive));
        assert_eq!(meta.sequence, 7);
        assert_eq!(meta.timestamp.sec, 3);
        // the timecode is ignored unless flagged valid
        assert_eq!(meta.timecode, None);

        buf.flags |= 0x0100;
        buf.field = 99;
        let meta = Metadata::from(&buf);
        assert_eq!(meta.timecode.map(|tc| tc.hours), Some(10));
        assert_eq!(meta.field, None);
    }
}
