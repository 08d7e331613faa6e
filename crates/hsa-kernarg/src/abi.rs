//! Kernarg buffer ABI: implicit slots, slot sizes and the buffer layout
//!
//! ```text
//! offset 0                         injected_args * SLOT_SIZE
//! ┌─────┬─────┬─────┬─────┬─────┬─────┬────────┬──────────────┬─────┐
//! │ imp │ imp │ imp │ imp │ imp │ imp │ arg 0  │ arg 1 (c128) │ ... │
//! └─────┴─────┴─────┴─────┴─────┴─────┴────────┴──────────────┴─────┘
//!   zero-filled, reserved by the       one slot   two slots
//!   device runtime
//! ```

use std::alloc::Layout;
use std::env;

use tracing::warn;

use crate::error::{MarshalError, Result};
use crate::slot::NativeSlot;
use crate::types::ArgType;

/// Size of one kernarg slot (a device pointer)
pub const SLOT_SIZE: usize = std::mem::size_of::<u64>();

/// Minimum alignment of a kernarg buffer
pub const KERNARG_ALIGNMENT: usize = 16;

/// Implicit slots the device runtime reserves ahead of user arguments
pub const DEFAULT_INJECTED_ARGS: usize = 6;

/// Device ABI parameters for kernarg buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernargAbi {
    /// Number of zero-filled implicit slots preceding the user arguments
    pub injected_args: usize,
}

impl Default for KernargAbi {
    fn default() -> Self {
        Self {
            injected_args: DEFAULT_INJECTED_ARGS,
        }
    }
}

impl KernargAbi {
    pub const fn new(injected_args: usize) -> Self {
        Self { injected_args }
    }

    /// Defaults, overridden by `HSA_LAUNCH_INJECTED_ARGS` when it parses.
    pub fn from_env() -> Self {
        let mut abi = Self::default();
        if let Ok(raw) = env::var("HSA_LAUNCH_INJECTED_ARGS") {
            match raw.trim().parse::<usize>() {
                Ok(count) => abi.injected_args = count,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid HSA_LAUNCH_INJECTED_ARGS"),
            }
        }
        abi
    }
}

/// Number of pointer-sized slots an argument of this type occupies.
///
/// Types without a native mapping still reserve one slot; marshaling them
/// fails before anything is written.
pub fn slot_count(ty: &ArgType) -> usize {
    ty.native_size().map_or(1, |size| size.div_ceil(SLOT_SIZE).max(1))
}

/// Byte layout of a kernarg buffer for one formal signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernargLayout {
    injected_args: usize,
    offsets: Vec<usize>,
    sizes: Vec<usize>,
    size: usize,
}

impl KernargLayout {
    pub fn new(abi: &KernargAbi, formal: &[ArgType]) -> Self {
        let mut offset = abi.injected_args * SLOT_SIZE;
        let mut offsets = Vec::with_capacity(formal.len());
        let mut sizes = Vec::with_capacity(formal.len());

        for ty in formal {
            let size = slot_count(ty) * SLOT_SIZE;
            offsets.push(offset);
            sizes.push(size);
            offset += size;
        }

        Self {
            injected_args: abi.injected_args,
            offsets,
            sizes,
            size: offset,
        }
    }

    pub fn injected_args(&self) -> usize {
        self.injected_args
    }

    /// Byte length of the implicit prefix
    pub fn injected_bytes(&self) -> usize {
        self.injected_args * SLOT_SIZE
    }

    pub fn arg_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte offset of argument `index`
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied()
    }

    /// Total buffer size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Allocation layout for the buffer. Zero-argument kernels with no
    /// injected slots still get one slot so the allocation is never empty.
    pub fn alloc_layout(&self) -> Result<Layout> {
        Layout::from_size_align(self.size.max(SLOT_SIZE), KERNARG_ALIGNMENT)
            .map_err(|err| MarshalError::InvalidLayout(err.to_string()))
    }

    /// Zero the implicit prefix.
    pub fn write_injected(&self, buffer: &mut [u8]) -> Result<()> {
        let len = self.injected_bytes();
        check_bounds(buffer, 0, len)?;
        buffer[..len].fill(0);
        Ok(())
    }

    /// Write `slot`'s cell into the slot range of argument `index`,
    /// zero-filling the remainder of the range.
    pub fn write_slot(&self, buffer: &mut [u8], index: usize, slot: &NativeSlot) -> Result<()> {
        let (offset, size) = match (self.offsets.get(index), self.sizes.get(index)) {
            (Some(&offset), Some(&size)) => (offset, size),
            _ => {
                return Err(MarshalError::InvalidLayout(format!(
                    "argument index {index} out of range for {} arguments",
                    self.arg_count()
                )))
            }
        };

        let bytes = slot.cell().as_bytes();
        if bytes.len() > size {
            return Err(MarshalError::InvalidLayout(format!(
                "{}-byte cell does not fit {}-byte slot range of argument {index}",
                bytes.len(),
                size
            )));
        }

        check_bounds(buffer, offset, size)?;
        let range = &mut buffer[offset..offset + size];
        range[..bytes.len()].copy_from_slice(bytes);
        range[bytes.len()..].fill(0);
        Ok(())
    }
}

fn check_bounds(buffer: &[u8], offset: usize, size: usize) -> Result<()> {
    if offset + size > buffer.len() {
        return Err(MarshalError::BufferTooSmall {
            offset,
            size,
            len: buffer.len(),
        });
    }
    Ok(())
}
