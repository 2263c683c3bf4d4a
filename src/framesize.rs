use std::convert::TryFrom;
use std::fmt;

use log::warn;

use crate::error::{Error, Result};
use crate::format::FourCC;
use crate::v4l2::api::{
    v4l2_frmsize_union, v4l2_frmsizeenum, V4L2_FRMSIZE_TYPE_CONTINUOUS,
    V4L2_FRMSIZE_TYPE_DISCRETE, V4L2_FRMSIZE_TYPE_STEPWISE,
};
use crate::v4l2::endian::{Reader, Writer};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Frame size entry as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FRAMESIZES`]
pub struct FrameSize {
    pub index: u32,
    pub fourcc: FourCC,
    pub size: FrameSizeEnum,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.size.fmt(f)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameSizeEnum {
    Discrete(Discrete),
    Stepwise(Stepwise),
    /// Any size within the bounds, the step is usually one pixel
    Continuous(Stepwise),
}

impl FrameSizeEnum {
    /// Decodes the size union according to the kernel's type discriminator
    ///
    /// Unknown discriminators and ranges that contradict themselves are protocol errors.
    pub fn decode(typ: u32, un: &v4l2_frmsize_union) -> Result<Self> {
        let mut r = Reader::new(&un.bytes);
        let size = match typ {
            V4L2_FRMSIZE_TYPE_DISCRETE => FrameSizeEnum::Discrete(Discrete {
                width: r.u32()?,
                height: r.u32()?,
            }),
            V4L2_FRMSIZE_TYPE_CONTINUOUS => FrameSizeEnum::Continuous(Stepwise::read(&mut r)?),
            V4L2_FRMSIZE_TYPE_STEPWISE => FrameSizeEnum::Stepwise(Stepwise::read(&mut r)?),
            typ => return Err(Error::Protocol(format!("unknown frame size type {}", typ))),
        };

        size.range().validate()?;
        Ok(size)
    }

    /// Encodes the size into its discriminator and raw union, the inverse of [`Self::decode`]
    pub fn encode(&self) -> Result<(u32, v4l2_frmsize_union)> {
        let mut un = v4l2_frmsize_union::new([0; 24]);
        let mut w = Writer::new(&mut un.bytes);
        let typ = match self {
            FrameSizeEnum::Discrete(discrete) => {
                w.u32(discrete.width)?;
                w.u32(discrete.height)?;
                V4L2_FRMSIZE_TYPE_DISCRETE
            }
            FrameSizeEnum::Continuous(range) => {
                range.write(&mut w)?;
                V4L2_FRMSIZE_TYPE_CONTINUOUS
            }
            FrameSizeEnum::Stepwise(range) => {
                range.write(&mut w)?;
                V4L2_FRMSIZE_TYPE_STEPWISE
            }
        };
        Ok((typ, un))
    }

    /// Returns the size as a `{min, max, step}` range
    ///
    /// A discrete size is a single-value range with a step of zero.
    pub fn range(&self) -> Stepwise {
        match self {
            FrameSizeEnum::Discrete(discrete) => Stepwise {
                min_width: discrete.width,
                max_width: discrete.width,
                step_width: 0,
                min_height: discrete.height,
                max_height: discrete.height,
                step_height: 0,
            },
            FrameSizeEnum::Stepwise(range) | FrameSizeEnum::Continuous(range) => *range,
        }
    }

    /// Lists every size covered by this entry
    ///
    /// Continuous ranges can expand into a very large number of sizes.
    pub fn to_discrete(self) -> impl IntoIterator<Item = Discrete> {
        match self {
            Self::Discrete(discrete) => vec![discrete],
            Self::Stepwise(range) | Self::Continuous(range) => {
                let mut discrete = Vec::new();

                for width in axis(range.min_width, range.max_width, range.step_width) {
                    for height in axis(range.min_height, range.max_height, range.step_height) {
                        discrete.push(Discrete { width, height });
                    }
                }

                discrete
            }
        }
    }
}

fn axis(min: u32, max: u32, step: u32) -> impl Iterator<Item = u32> {
    (min..=max).step_by(step.max(1) as usize)
}

impl fmt::Display for FrameSizeEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSizeEnum::Discrete(val) => write!(f, "Discrete({})", val)?,
            FrameSizeEnum::Stepwise(val) => write!(f, "Stepwise({})", val)?,
            FrameSizeEnum::Continuous(val) => write!(f, "Continuous({})", val)?,
        }

        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Discrete {
    /// Width of the frame (in pixels).
    pub width: u32,
    /// Height of the frame (in pixels).
    pub height: u32,
}

impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Stepwise {
    /// Minimum frame width (in pixels).
    pub min_width: u32,
    /// Maximum frame width (in pixels).
    pub max_width: u32,
    /// Frame width step size (in pixels).
    pub step_width: u32,
    /// Minimum frame height (in pixels).
    pub min_height: u32,
    /// Maximum frame height (in pixels).
    pub max_height: u32,
    /// Frame height step size (in pixels).
    pub step_height: u32,
}

impl Stepwise {
    // Field order of struct v4l2_frmsize_stepwise.
    fn read(r: &mut Reader<'_>) -> Result<Self> {
        Ok(Stepwise {
            min_width: r.u32()?,
            max_width: r.u32()?,
            step_width: r.u32()?,
            min_height: r.u32()?,
            max_height: r.u32()?,
            step_height: r.u32()?,
        })
    }

    fn write(&self, w: &mut Writer<'_>) -> Result<()> {
        w.u32(self.min_width)?;
        w.u32(self.max_width)?;
        w.u32(self.step_width)?;
        w.u32(self.min_height)?;
        w.u32(self.max_height)?;
        w.u32(self.step_height)
    }

    fn validate(&self) -> Result<()> {
        check_axis("width", self.min_width, self.max_width, self.step_width)?;
        check_axis("height", self.min_height, self.max_height, self.step_height)
    }
}

fn check_axis(axis: &str, min: u32, max: u32, step: u32) -> Result<()> {
    if max < min {
        return Err(Error::Protocol(format!(
            "frame {} range is inverted: min {} > max {}",
            axis, min, max
        )));
    }
    if step == 0 {
        if min != max {
            return Err(Error::Protocol(format!(
                "frame {} range {}..{} has a step of zero",
                axis, min, max
            )));
        }
    } else if (max - min) % step != 0 {
        warn!(
            "frame {} step {} does not divide the range {}..{}",
            axis, step, min, max
        );
    }
    Ok(())
}

impl fmt::Display for Stepwise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} - {}x{} with step {}/{}",
            self.min_width,
            self.min_height,
            self.max_width,
            self.max_height,
            self.step_width,
            self.step_height,
        )
    }
}

impl TryFrom<v4l2_frmsizeenum> for FrameSize {
    type Error = Error;

    fn try_from(desc: v4l2_frmsizeenum) -> Result<Self> {
        Ok(FrameSize {
            index: desc.index,
            fourcc: FourCC::from(desc.pixel_format),
            size: FrameSizeEnum::decode(desc.type_, &desc.un)?,
        })
    }
}
