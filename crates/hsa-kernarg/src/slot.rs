//! Native argument cells

use num_complex::{Complex32, Complex64};

use crate::descriptor::ArrayDescriptor;
use crate::types::ScalarType;

/// The raw value written into a kernarg slot.
///
/// Each variant holds exactly the declared native width; complex variants
/// are `{ re, im }` pairs in that order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NativeCell {
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    C64(Complex32),
    C128(Complex64),
    /// Address of an auxiliary structure, such as an [`ArrayDescriptor`]
    Address(u64),
}

impl NativeCell {
    /// Bytes of the cell in native byte order
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::I8(v) => bytemuck::bytes_of(v),
            Self::I16(v) => bytemuck::bytes_of(v),
            Self::I32(v) => bytemuck::bytes_of(v),
            Self::I64(v) => bytemuck::bytes_of(v),
            Self::U8(v) => bytemuck::bytes_of(v),
            Self::U16(v) => bytemuck::bytes_of(v),
            Self::U32(v) => bytemuck::bytes_of(v),
            Self::U64(v) => bytemuck::bytes_of(v),
            Self::F32(v) => bytemuck::bytes_of(v),
            Self::F64(v) => bytemuck::bytes_of(v),
            Self::C64(v) => bytemuck::bytes_of(v),
            Self::C128(v) => bytemuck::bytes_of(v),
            Self::Address(v) => bytemuck::bytes_of(v),
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.as_bytes().len()
    }

    /// Scalar type of the cell, `None` for addresses
    pub fn scalar_type(&self) -> Option<ScalarType> {
        let ty = match self {
            Self::I8(_) => ScalarType::I8,
            Self::I16(_) => ScalarType::I16,
            Self::I32(_) => ScalarType::I32,
            Self::I64(_) => ScalarType::I64,
            Self::U8(_) => ScalarType::U8,
            Self::U16(_) => ScalarType::U16,
            Self::U32(_) => ScalarType::U32,
            Self::U64(_) => ScalarType::U64,
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
            Self::C64(_) => ScalarType::C64,
            Self::C128(_) => ScalarType::C128,
            Self::Address(_) => return None,
        };
        Some(ty)
    }
}

/// A marshaled argument: the cell for the kernarg buffer plus whatever
/// auxiliary structure the cell points into.
///
/// Dropping a slot releases its keep-alive payload, so slots must be held
/// until the dispatch that reads them has been submitted.
#[derive(Debug)]
pub struct NativeSlot {
    cell: NativeCell,
    keep_alive: Option<ArrayDescriptor>,
}

impl NativeSlot {
    /// Slot holding a value cell with no auxiliary structure
    pub fn value(cell: NativeCell) -> Self {
        Self { cell, keep_alive: None }
    }

    /// Slot pointing at an array descriptor it owns
    pub fn array(descriptor: ArrayDescriptor) -> Self {
        Self {
            cell: NativeCell::Address(descriptor.address()),
            keep_alive: Some(descriptor),
        }
    }

    pub fn cell(&self) -> &NativeCell {
        &self.cell
    }

    pub fn descriptor(&self) -> Option<&ArrayDescriptor> {
        self.keep_alive.as_ref()
    }
}
