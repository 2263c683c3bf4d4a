//! Native byte order handling for the raw union regions of the kernel ABI.
//!
//! Kernel structures are laid out in the host's native byte order. Regular struct fields are
//! read by the compiler directly, but the union regions are carried around as plain bytes and
//! must be decoded by hand. The byte order is detected once per process and reused afterwards.

use std::sync::OnceLock;

use crate::error::{Error, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ByteOrder {
    Little,
    Big,
}

static NATIVE: OnceLock<ByteOrder> = OnceLock::new();

impl ByteOrder {
    /// Returns the byte order of the host, detecting it on first use
    pub fn native() -> ByteOrder {
        *NATIVE.get_or_init(detect)
    }

    fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Little => u32::from_le_bytes(bytes),
            ByteOrder::Big => u32::from_be_bytes(bytes),
        }
    }

    fn u32_to(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        }
    }
}

fn detect() -> ByteOrder {
    let probe: u32 = 0x0102_0304;
    if probe.to_ne_bytes()[0] == 0x04 {
        ByteOrder::Little
    } else {
        ByteOrder::Big
    }
}

/// Sequential decoder over a raw union region
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader {
            bytes,
            pos: 0,
            order: ByteOrder::native(),
        }
    }

    pub fn u32(&mut self) -> Result<u32> {
        let end = self.pos + 4;
        let chunk = self.bytes.get(self.pos..end).ok_or_else(|| {
            Error::Protocol(format!(
                "union region too short: need {} bytes, have {}",
                end,
                self.bytes.len()
            ))
        })?;
        self.pos = end;

        let mut raw = [0u8; 4];
        raw.copy_from_slice(chunk);
        Ok(self.order.u32_from(raw))
    }
}

/// Sequential encoder into a raw union region
pub struct Writer<'a> {
    bytes: &'a mut [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> Writer<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Writer {
            bytes,
            pos: 0,
            order: ByteOrder::native(),
        }
    }

    pub fn u32(&mut self, value: u32) -> Result<()> {
        let end = self.pos + 4;
        let len = self.bytes.len();
        let chunk = self.bytes.get_mut(self.pos..end).ok_or_else(|| {
            Error::Protocol(format!(
                "union region too short: need {} bytes, have {}",
                end, len
            ))
        })?;
        chunk.copy_from_slice(&self.order.u32_to(value));
        self.pos = end;
        Ok(())
    }
}
