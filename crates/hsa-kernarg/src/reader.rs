//! Typed reads from filled kernarg buffers

use crate::error::{MarshalError, Result};

/// Reads typed values back out of a filled kernarg buffer
///
/// Values are read in native byte order at explicit offsets or
/// sequentially, with each sequential read aligned to its own width.
pub struct ByteReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

macro_rules! read_fns {
    ($($name:ident => $ty:ty),+ $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty> {
                const SIZE: usize = std::mem::size_of::<$ty>();
                self.align(SIZE);
                let bytes = self.take(SIZE)?;
                let mut raw = [0u8; SIZE];
                raw.copy_from_slice(bytes);
                Ok(<$ty>::from_ne_bytes(raw))
            }
        )+
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    /// Reader positioned at `offset`
    pub fn at(buffer: &'a [u8], offset: usize) -> Self {
        Self { buffer, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn seek(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Align offset to specified alignment boundary
    fn align(&mut self, alignment: usize) {
        let misalignment = self.offset % alignment;
        if misalignment != 0 {
            self.offset += alignment - misalignment;
        }
    }

    fn take(&mut self, size: usize) -> Result<&'a [u8]> {
        if self.offset + size > self.buffer.len() {
            return Err(MarshalError::BufferTooSmall {
                offset: self.offset,
                size,
                len: self.buffer.len(),
            });
        }
        let bytes = &self.buffer[self.offset..self.offset + size];
        self.offset += size;
        Ok(bytes)
    }

    read_fns! {
        read_u8 => u8,
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_i8 => i8,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }

    /// Read a device address slot
    pub fn read_address(&mut self) -> Result<u64> {
        self.read_u64()
    }

    /// Read `len` raw bytes without alignment
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }
}
