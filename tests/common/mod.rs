//! In-memory capture driver implementing the system call backend
//!
//! It behaves like a simple single-planar webcam: buffers live in heap memory, "mapping" hands
//! out pointers into them and every dequeue fills the buffer with a recognizable pattern.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::ffi::CStr;
use std::io;
use std::os::raw::c_void;
use std::os::unix::io::RawFd;
use std::sync::{Arc, Mutex, MutexGuard};

use v4l_stream::framesize::{Discrete, FrameSizeEnum, Stepwise};
use v4l_stream::pselect::FdSet;
use v4l_stream::v4l2::api::*;
use v4l_stream::v4l2::{vidioc, Backend};
use v4l_stream::{Device, FourCC};

pub const CAP_VIDEO_CAPTURE: u32 = 0x0000_0001;
pub const CAP_STREAMING: u32 = 0x0400_0000;
pub const CAP_DEVICE_CAPS: u32 = 0x8000_0000;

const MAX_WIDTH: u32 = 1920;
const MAX_HEIGHT: u32 = 1080;
const OFFSET_SHIFT: u32 = 16;

pub struct State {
    pub capabilities: u32,
    pub formats: Vec<(&'static [u8; 4], &'static str)>,
    pub framesizes: Vec<(u32, u32, v4l2_frmsize_union)>,
    pub pix: v4l2_pix_format,
    pub max_buffers: u32,
    pub fail_mmap_at: Option<u32>,
    pub fail_munmap: bool,
    pub interrupts: u32,
    pub unplugged: bool,
    /// Index handed out by the next DQBUF regardless of the queue
    pub dequeue_override: Option<u32>,

    pub open_fds: Vec<RawFd>,
    next_fd: RawFd,
    pub buffers: Vec<Box<[u8]>>,
    pub mapped: HashMap<usize, u32>,
    pub queued: VecDeque<u32>,
    pub streaming: bool,
    pub sequence: u32,
    pub log: Vec<&'static str>,
}

pub struct FakeDevice {
    state: Mutex<State>,
}

fn err(code: i32) -> io::Error {
    io::Error::from_raw_os_error(code)
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        let mut framesizes = Vec::new();
        let yuyv = u32::from(FourCC::new(b"YUYV"));
        let mjpg = u32::from(FourCC::new(b"MJPG"));
        for size in [
            FrameSizeEnum::Discrete(Discrete {
                width: 640,
                height: 480,
            }),
            FrameSizeEnum::Discrete(Discrete {
                width: 1280,
                height: 720,
            }),
        ] {
            let (typ, un) = size.encode().unwrap();
            framesizes.push((yuyv, typ, un));
        }
        let (typ, un) = FrameSizeEnum::Stepwise(Stepwise {
            min_width: 160,
            max_width: 1920,
            step_width: 16,
            min_height: 120,
            max_height: 1080,
            step_height: 8,
        })
        .encode()
        .unwrap();
        framesizes.push((mjpg, typ, un));

        Arc::new(FakeDevice {
            state: Mutex::new(State {
                capabilities: CAP_VIDEO_CAPTURE | CAP_STREAMING,
                formats: vec![
                    (b"YUYV", "YUYV 4:2:2"),
                    (b"MJPG", "Motion-JPEG"),
                    (b"YUYV", "YUYV 4:2:2 (again)"),
                    (b"GREY", "8-bit Greyscale"),
                ],
                framesizes,
                pix: v4l2_pix_format {
                    width: 320,
                    height: 240,
                    pixelformat: yuyv,
                    field: 1,
                    bytesperline: 640,
                    sizeimage: 320 * 240 * 2,
                    ..Default::default()
                },
                max_buffers: 8,
                fail_mmap_at: None,
                fail_munmap: false,
                interrupts: 0,
                unplugged: false,
                dequeue_override: None,
                open_fds: Vec::new(),
                next_fd: 100,
                buffers: Vec::new(),
                mapped: HashMap::new(),
                queued: VecDeque::new(),
                streaming: false,
                sequence: 0,
                log: Vec::new(),
            }),
        })
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn live_mappings(&self) -> usize {
        self.state().mapped.len()
    }

    pub fn open_device(self: &Arc<Self>) -> Device {
        let backend: Arc<dyn Backend> = self.clone();
        Device::with_backend("/dev/video0", backend).unwrap()
    }

    unsafe fn dispatch(state: &mut State, request: vidioc::_IOC_TYPE, argp: *mut c_void) -> io::Result<()> {
        match request {
            vidioc::VIDIOC_QUERYCAP => {
                let caps = &mut *(argp as *mut v4l2_capability);
                caps.driver[..4].copy_from_slice(b"fake");
                caps.card[..11].copy_from_slice(b"Fake Camera");
                caps.bus_info[..8].copy_from_slice(b"platform");
                caps.version = 0x0006_0100;
                caps.capabilities = state.capabilities;
                caps.device_caps = state.capabilities & !CAP_DEVICE_CAPS;
                Ok(())
            }
            vidioc::VIDIOC_ENUM_FMT => {
                let desc = &mut *(argp as *mut v4l2_fmtdesc);
                let (code, name) = state.formats.get(desc.index as usize).ok_or(err(libc::EINVAL))?;
                desc.pixelformat = u32::from(FourCC::new(code));
                desc.flags = if *code == b"MJPG" { 1 } else { 0 };
                desc.description = [0; 32];
                desc.description[..name.len()].copy_from_slice(name.as_bytes());
                Ok(())
            }
            vidioc::VIDIOC_ENUM_FRAMESIZES => {
                let desc = &mut *(argp as *mut v4l2_frmsizeenum);
                let (_, typ, un) = state
                    .framesizes
                    .iter()
                    .filter(|(code, _, _)| *code == desc.pixel_format)
                    .nth(desc.index as usize)
                    .ok_or(err(libc::EINVAL))?;
                desc.type_ = *typ;
                desc.un = *un;
                Ok(())
            }
            vidioc::VIDIOC_G_FMT => {
                let fmt = &mut *(argp as *mut v4l2_format);
                if fmt.type_ != V4L2_BUF_TYPE_VIDEO_CAPTURE {
                    return Err(err(libc::EINVAL));
                }
                fmt.fmt = state.pix.encode().unwrap();
                Ok(())
            }
            vidioc::VIDIOC_S_FMT => {
                let fmt = &mut *(argp as *mut v4l2_format);
                if fmt.type_ != V4L2_BUF_TYPE_VIDEO_CAPTURE {
                    return Err(err(libc::EINVAL));
                }
                if !state.buffers.is_empty() {
                    return Err(err(libc::EBUSY));
                }
                let requested = v4l2_pix_format::decode(&fmt.fmt).unwrap();
                let known = state
                    .formats
                    .iter()
                    .any(|(code, _)| u32::from(FourCC::new(code)) == requested.pixelformat);
                let pixelformat = if known {
                    requested.pixelformat
                } else {
                    state.pix.pixelformat
                };
                let width = requested.width.clamp(16, MAX_WIDTH);
                let height = requested.height.clamp(16, MAX_HEIGHT);
                state.pix = v4l2_pix_format {
                    width,
                    height,
                    pixelformat,
                    field: 1,
                    bytesperline: width * 2,
                    sizeimage: width * height * 2,
                    ..Default::default()
                };
                fmt.fmt = state.pix.encode().unwrap();
                Ok(())
            }
            vidioc::VIDIOC_REQBUFS => {
                let req = &mut *(argp as *mut v4l2_requestbuffers);
                if req.memory != V4L2_MEMORY_MMAP {
                    return Err(err(libc::EINVAL));
                }
                if !state.mapped.is_empty() || state.streaming {
                    return Err(err(libc::EBUSY));
                }
                state.buffers.clear();
                state.queued.clear();
                let granted = req.count.min(state.max_buffers);
                for _ in 0..granted {
                    state
                        .buffers
                        .push(vec![0u8; state.pix.sizeimage as usize].into_boxed_slice());
                }
                req.count = granted;
                Ok(())
            }
            vidioc::VIDIOC_QUERYBUF => {
                let buf = &mut *(argp as *mut v4l2_buffer);
                let storage = state.buffers.get(buf.index as usize).ok_or(err(libc::EINVAL))?;
                buf.length = storage.len() as u32;
                buf.m = v4l2_buffer_union::with_offset(buf.index << OFFSET_SHIFT).unwrap();
                Ok(())
            }
            vidioc::VIDIOC_QBUF => {
                let buf = &mut *(argp as *mut v4l2_buffer);
                if buf.index as usize >= state.buffers.len() || state.queued.contains(&buf.index) {
                    return Err(err(libc::EINVAL));
                }
                state.queued.push_back(buf.index);
                state.log.push("QBUF");
                Ok(())
            }
            vidioc::VIDIOC_DQBUF => {
                let buf = &mut *(argp as *mut v4l2_buffer);
                if !state.streaming {
                    return Err(err(libc::EINVAL));
                }
                let index = match state.dequeue_override.take() {
                    Some(index) => index,
                    None => state.queued.pop_front().ok_or(err(libc::EAGAIN))?,
                };
                let sequence = state.sequence;
                state.sequence += 1;

                let storage = &mut state.buffers[index as usize];
                for (i, byte) in storage.iter_mut().enumerate() {
                    *byte = (sequence as usize + i) as u8;
                }

                buf.index = index;
                buf.bytesused = storage.len() as u32;
                buf.flags = 0x0000_2001;
                buf.field = 1;
                buf.sequence = sequence;
                buf.timestamp.tv_sec = 1;
                buf.timestamp.tv_usec = sequence as _;
                buf.length = storage.len() as u32;
                state.log.push("DQBUF");
                Ok(())
            }
            vidioc::VIDIOC_STREAMON => {
                if state.buffers.is_empty() {
                    return Err(err(libc::EINVAL));
                }
                state.streaming = true;
                state.log.push("STREAMON");
                Ok(())
            }
            vidioc::VIDIOC_STREAMOFF => {
                state.streaming = false;
                state.queued.clear();
                state.log.push("STREAMOFF");
                Ok(())
            }
            _ => Err(err(libc::ENOTTY)),
        }
    }
}

impl Backend for FakeDevice {
    fn open(&self, _path: &CStr, _flags: i32) -> io::Result<RawFd> {
        let mut state = self.state();
        let fd = state.next_fd;
        state.next_fd += 1;
        state.open_fds.push(fd);
        Ok(fd)
    }

    fn close(&self, fd: RawFd) -> io::Result<()> {
        let mut state = self.state();
        let pos = state
            .open_fds
            .iter()
            .position(|open| *open == fd)
            .ok_or(err(libc::EBADF))?;
        state.open_fds.remove(pos);
        Ok(())
    }

    unsafe fn ioctl(
        &self,
        fd: RawFd,
        request: vidioc::_IOC_TYPE,
        argp: *mut c_void,
    ) -> io::Result<()> {
        let mut state = self.state();
        if !state.open_fds.contains(&fd) {
            return Err(err(libc::EBADF));
        }
        if state.unplugged {
            return Err(err(libc::ENODEV));
        }
        Self::dispatch(&mut state, request, argp)
    }

    unsafe fn mmap(&self, _fd: RawFd, length: usize, offset: libc::off_t) -> io::Result<*mut c_void> {
        let mut state = self.state();
        let index = (offset as u32) >> OFFSET_SHIFT;
        if state.fail_mmap_at == Some(index) {
            return Err(err(libc::ENOMEM));
        }
        let storage = state
            .buffers
            .get_mut(index as usize)
            .ok_or(err(libc::EINVAL))?;
        if length > storage.len() {
            return Err(err(libc::EINVAL));
        }
        let ptr = storage.as_mut_ptr();
        state.mapped.insert(ptr as usize, index);
        Ok(ptr as *mut c_void)
    }

    unsafe fn munmap(&self, start: *mut c_void, _length: usize) -> io::Result<()> {
        let mut state = self.state();
        if state.fail_munmap {
            return Err(err(libc::EINVAL));
        }
        state
            .mapped
            .remove(&(start as usize))
            .map(|_| ())
            .ok_or(err(libc::EINVAL))
    }

    fn pselect(&self, _nfds: i32, _readfds: &mut FdSet, _timeout: &libc::timespec) -> io::Result<usize> {
        let mut state = self.state();
        if state.interrupts > 0 {
            state.interrupts -= 1;
            return Err(err(libc::EINTR));
        }
        if state.streaming && !state.queued.is_empty() {
            Ok(1)
        } else {
            Ok(0)
        }
    }
}
