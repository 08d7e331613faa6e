//! Host-side argument values

use std::fmt;
use std::marker::PhantomData;

use num_complex::{Complex32, Complex64};

use crate::error::{MarshalError, Result};
use crate::types::ScalarType;

/// Element types a [`HostArray`] can view
pub trait Element: bytemuck::Pod {
    const DTYPE: ScalarType;
}

macro_rules! impl_element {
    ($($ty:ty => $dtype:ident),+ $(,)?) => {
        $(impl Element for $ty {
            const DTYPE: ScalarType = ScalarType::$dtype;
        })+
    };
}

impl_element! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Complex32 => C64,
    Complex64 => C128,
}

/// A strided view over host-resident array data.
///
/// The view borrows the data for `'a`, which keeps the base address valid
/// for as long as any launch holding this value is in flight.
#[derive(Clone)]
pub struct HostArray<'a> {
    data: *const u8,
    len_bytes: usize,
    dtype: ScalarType,
    shape: Vec<usize>,
    strides: Vec<isize>,
    len: usize,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> HostArray<'a> {
    /// View `data` as a C-contiguous array of the given shape.
    pub fn from_slice<T: Element>(data: &'a [T], shape: &[usize]) -> Result<Self> {
        let strides = contiguous_strides(shape, std::mem::size_of::<T>())?;
        Self::with_strides(data, shape, &strides)
    }

    /// View `data` as a C-contiguous array that the kernel may write to.
    pub fn from_mut_slice<T: Element>(data: &'a mut [T], shape: &[usize]) -> Result<Self> {
        let strides = contiguous_strides(shape, std::mem::size_of::<T>())?;
        Self::build(data.as_ptr().cast(), std::mem::size_of_val(data), T::DTYPE, shape, &strides)
    }

    /// View `data` with explicit byte strides.
    pub fn with_strides<T: Element>(data: &'a [T], shape: &[usize], strides: &[isize]) -> Result<Self> {
        Self::build(data.as_ptr().cast(), std::mem::size_of_val(data), T::DTYPE, shape, strides)
    }

    fn build(
        data: *const u8,
        len_bytes: usize,
        dtype: ScalarType,
        shape: &[usize],
        strides: &[isize],
    ) -> Result<Self> {
        if shape.len() != strides.len() {
            return Err(MarshalError::InvalidStrides(format!(
                "{} strides for a {}d shape",
                strides.len(),
                shape.len()
            )));
        }

        let len = element_count(shape)?;
        let required = required_bytes(shape, strides, dtype.size_bytes())?;
        if required > len_bytes {
            return Err(MarshalError::ArrayExtentMismatch {
                required,
                available: len_bytes,
            });
        }

        Ok(Self {
            data,
            len_bytes,
            dtype,
            shape: shape.to_vec(),
            strides: strides.to_vec(),
            len,
            _marker: PhantomData,
        })
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> ScalarType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Byte strides per dimension
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Total number of elements addressed by the shape
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn itemsize(&self) -> usize {
        self.dtype.size_bytes()
    }

    /// Size of the borrowed data in bytes
    pub fn len_bytes(&self) -> usize {
        self.len_bytes
    }

    /// Raw base address of the array data
    pub fn data_ptr(&self) -> *const u8 {
        self.data
    }
}

impl fmt::Debug for HostArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArray")
            .field("data", &self.data)
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .finish()
    }
}

fn overflow(shape: &[usize]) -> MarshalError {
    MarshalError::InvalidStrides(format!("shape {shape:?} overflows the address space"))
}

fn contiguous_strides(shape: &[usize], itemsize: usize) -> Result<Vec<isize>> {
    let mut strides = vec![0isize; shape.len()];
    let mut stride = isize::try_from(itemsize).map_err(|_| overflow(shape))?;
    for (dim, &extent) in shape.iter().enumerate().rev() {
        strides[dim] = stride;
        let extent = isize::try_from(extent.max(1)).map_err(|_| overflow(shape))?;
        stride = stride.checked_mul(extent).ok_or_else(|| overflow(shape))?;
    }
    Ok(strides)
}

/// Number of addressed elements; every extent and the product must fit `isize`.
fn element_count(shape: &[usize]) -> Result<usize> {
    let limit = isize::MAX as usize;
    if shape.iter().any(|&extent| extent > limit) {
        return Err(overflow(shape));
    }
    shape
        .iter()
        .try_fold(1usize, |count, &extent| count.checked_mul(extent))
        .filter(|&count| count <= limit)
        .ok_or_else(|| overflow(shape))
}

/// Bytes between the base address and the end of the last addressed element.
fn required_bytes(shape: &[usize], strides: &[isize], itemsize: usize) -> Result<usize> {
    if shape.contains(&0) {
        return Ok(0);
    }

    let mut last = 0usize;
    for (&extent, &stride) in shape.iter().zip(strides) {
        if stride < 0 {
            return Err(MarshalError::InvalidStrides(format!("negative stride {stride}")));
        }
        last = (extent - 1)
            .checked_mul(stride as usize)
            .and_then(|span| last.checked_add(span))
            .ok_or_else(|| overflow(shape))?;
    }
    last.checked_add(itemsize).ok_or_else(|| overflow(shape))
}

/// One concrete argument value supplied at launch time
#[derive(Debug, Clone)]
pub enum ArgValue<'a> {
    Int(i64),
    UInt(u64),
    Float(f64),
    Complex(Complex64),
    Bool(bool),
    Array(HostArray<'a>),
}

impl ArgValue<'_> {
    /// Short description of the value's kind for diagnostics
    pub fn kind(&self) -> String {
        match self {
            Self::Int(_) => "int".to_string(),
            Self::UInt(_) => "uint".to_string(),
            Self::Float(_) => "float".to_string(),
            Self::Complex(_) => "complex".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::Array(array) => format!("array({}, {}d)", array.dtype(), array.ndim()),
        }
    }
}

macro_rules! impl_from_for_arg_value {
    ($($ty:ty => $variant:ident as $target:ty),+ $(,)?) => {
        $(impl From<$ty> for ArgValue<'_> {
            fn from(value: $ty) -> Self {
                Self::$variant(value as $target)
            }
        })+
    };
}

impl_from_for_arg_value! {
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
}

impl From<bool> for ArgValue<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Complex64> for ArgValue<'_> {
    fn from(value: Complex64) -> Self {
        Self::Complex(value)
    }
}

impl From<Complex32> for ArgValue<'_> {
    fn from(value: Complex32) -> Self {
        Self::Complex(Complex64::new(value.re as f64, value.im as f64))
    }
}

impl<'a> From<HostArray<'a>> for ArgValue<'a> {
    fn from(value: HostArray<'a>) -> Self {
        Self::Array(value)
    }
}
