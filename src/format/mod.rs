use std::convert::TryFrom;
use std::fmt;

use crate::error::{Error, Result};
use crate::v4l2::api::{v4l2_format, v4l2_pix_format, V4L2_BUF_TYPE_VIDEO_CAPTURE};

pub mod description;
pub use description::Description;

pub mod fourcc;
pub use fourcc::FourCC;

/// Field order of interlaced video, `enum v4l2_field`
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum FieldOrder {
    /// Let the driver pick
    Any = 0,
    Progressive = 1,
    Top = 2,
    Bottom = 3,
    Interlaced = 4,
    SequentialTB = 5,
    SequentialBT = 6,
    Alternate = 7,
    InterlacedTB = 8,
    InterlacedBT = 9,
}

impl fmt::Display for FieldOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Any => "any",
            Self::Progressive => "progressive",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Interlaced => "interlaced",
            Self::SequentialTB => "sequential, top then bottom",
            Self::SequentialBT => "sequential, bottom then top",
            Self::Alternate => "alternate between fields",
            Self::InterlacedTB => "interlaced, starting with top",
            Self::InterlacedBT => "interlaced, starting with bottom",
        };
        write!(f, "{}", name)
    }
}

impl TryFrom<u32> for FieldOrder {
    type Error = Error;

    fn try_from(code: u32) -> Result<Self> {
        Ok(match code {
            0 => Self::Any,
            1 => Self::Progressive,
            2 => Self::Top,
            3 => Self::Bottom,
            4 => Self::Interlaced,
            5 => Self::SequentialTB,
            6 => Self::SequentialBT,
            7 => Self::Alternate,
            8 => Self::InterlacedTB,
            9 => Self::InterlacedBT,
            _ => return Err(Error::Protocol(format!("unknown field order {}", code))),
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
/// Single-planar capture format
///
/// When passed to the driver only `width`, `height`, `fourcc` and `field_order` are
/// meaningful; the driver fills in `stride` and `size` of the format it accepted.
pub struct Format {
    /// width in pixels
    pub width: u32,
    /// height in pixels
    pub height: u32,
    /// pixelformat code
    pub fourcc: FourCC,
    /// field order for interlacing
    pub field_order: FieldOrder,

    /// bytes per line
    pub stride: u32,
    /// maximum number of bytes required to store an image
    pub size: u32,
}

impl Format {
    /// Returns a capture format
    ///
    /// # Arguments
    ///
    /// * `width` - Width in pixels
    /// * `height` - Height in pixels
    /// * `fourcc` - Four character code (pixelformat)
    ///
    /// # Example
    ///
    /// ```
    /// use v4l_stream::{Format, FourCC};
    /// let fmt = Format::new(640, 480, FourCC::new(b"YUYV"));
    /// ```
    pub const fn new(width: u32, height: u32, fourcc: FourCC) -> Self {
        Format {
            width,
            height,
            fourcc,
            field_order: FieldOrder::Any,
            stride: 0,
            size: 0,
        }
    }

    /// Decodes the pixel format member of a `v4l2_format` filled in by the driver
    pub fn decode(raw: &v4l2_format) -> Result<Self> {
        if raw.type_ != V4L2_BUF_TYPE_VIDEO_CAPTURE {
            return Err(Error::Protocol(format!(
                "expected a video capture format, got buffer type {}",
                raw.type_
            )));
        }

        let pix = v4l2_pix_format::decode(&raw.fmt)?;
        Ok(Format {
            width: pix.width,
            height: pix.height,
            fourcc: FourCC::from(pix.pixelformat),
            field_order: FieldOrder::try_from(pix.field)?,
            stride: pix.bytesperline,
            size: pix.sizeimage,
        })
    }

    /// Encodes this format as a capture `v4l2_format` request
    pub fn encode(&self) -> Result<v4l2_format> {
        let pix = v4l2_pix_format {
            width: self.width,
            height: self.height,
            pixelformat: self.fourcc.into(),
            field: self.field_order as u32,
            bytesperline: self.stride,
            sizeimage: self.size,
            ..Default::default()
        };

        Ok(v4l2_format {
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            fmt: pix.encode()?,
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "width          : {}", self.width)?;
        writeln!(f, "height         : {}", self.height)?;
        writeln!(f, "fourcc         : {}", self.fourcc)?;
        writeln!(f, "field          : {}", self.field_order)?;
        writeln!(f, "stride         : {}", self.stride)?;
        writeln!(f, "size           : {}", self.size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_request_layout() {
        let fmt = Format::new(640, 480, FourCC::new(b"YUYV"));
        let raw = fmt.encode().unwrap();
        assert_eq!(raw.type_, V4L2_BUF_TYPE_VIDEO_CAPTURE);

        let pix = v4l2_pix_format::decode(&raw.fmt).unwrap();
        assert_eq!(pix.width, 640);
        assert_eq!(pix.height, 480);
        assert_eq!(pix.pixelformat, u32::from_le_bytes(*b"YUYV"));
        assert_eq!(pix.field, 0);

        assert_eq!(Format::decode(&raw).unwrap(), fmt);
    }

    #[test]
    fn decode_rejects_garbage() {
        let mut raw = Format::new(1, 1, FourCC::new(b"GREY")).encode().unwrap();
        raw.type_ = 2;
        assert!(matches!(Format::decode(&raw), Err(Error::Protocol(_))));

        let pix = v4l2_pix_format {
            field: 42,
            ..Default::default()
        };
        let raw = v4l2_format {
            type_: V4L2_BUF_TYPE_VIDEO_CAPTURE,
            fmt: pix.encode().unwrap(),
        };
        assert!(matches!(Format::decode(&raw), Err(Error::Protocol(_))));
    }
}
