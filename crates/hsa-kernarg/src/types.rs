//! Argument type tags as declared in a kernel's formal signature

use std::fmt;

/// Fixed-width numeric element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    /// Two `f32` components, real first
    C64,
    /// Two `f64` components, real first
    C128,
}

impl ScalarType {
    /// Size of one native value in bytes
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 | Self::C64 => 8,
            Self::C128 => 16,
        }
    }

    pub const fn is_signed_integer(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub const fn is_unsigned_integer(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    pub const fn is_real(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, Self::C64 | Self::C128)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "int8",
            Self::I16 => "int16",
            Self::I32 => "int32",
            Self::I64 => "int64",
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::U32 => "uint32",
            Self::U64 => "uint64",
            Self::F32 => "float32",
            Self::F64 => "float64",
            Self::C64 => "complex64",
            Self::C128 => "complex128",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of one formal kernel argument
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// Fixed-width number passed by value
    Scalar(ScalarType),

    /// N-dimensional array passed by descriptor address
    Array { dtype: ScalarType, ndim: usize },

    /// Boolean flag; the front end produces it but no native mapping exists
    Boolean,

    /// Any other front-end type, identified by name
    Opaque(String),
}

impl ArgType {
    pub const fn array(dtype: ScalarType, ndim: usize) -> Self {
        Self::Array { dtype, ndim }
    }

    /// Size of the native cell this type occupies in the kernarg buffer,
    /// or `None` when the type has no native mapping.
    pub const fn native_size(&self) -> Option<usize> {
        match self {
            Self::Scalar(ty) => Some(ty.size_bytes()),
            Self::Array { .. } => Some(std::mem::size_of::<u64>()),
            Self::Boolean | Self::Opaque(_) => None,
        }
    }
}

impl From<ScalarType> for ArgType {
    fn from(ty: ScalarType) -> Self {
        Self::Scalar(ty)
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(ty) => write!(f, "{ty}"),
            Self::Array { dtype, ndim } => write!(f, "array({dtype}, {ndim}d)"),
            Self::Boolean => f.write_str("bool"),
            Self::Opaque(name) => f.write_str(name),
        }
    }
}
