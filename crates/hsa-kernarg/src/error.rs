//! Error types for argument marshaling

use crate::types::ScalarType;

/// Result type for marshaling operations
pub type Result<T> = std::result::Result<T, MarshalError>;

/// Errors that can occur while converting host values into kernel arguments
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MarshalError {
    /// Array rank disagrees with the declared rank
    #[error("array rank mismatch: declared {declared}d, observed {observed}d")]
    ShapeRankMismatch { declared: usize, observed: usize },

    /// No native representation exists for the declared type
    #[error("unsupported argument type: {0}")]
    UnsupportedArgumentType(String),

    /// Value kind does not match the declared type
    #[error("argument type mismatch: expected {expected}, got {actual}")]
    ArgumentTypeMismatch { expected: String, actual: String },

    /// Integer value does not fit the declared width
    #[error("value {value} out of range for {ty}")]
    ValueOutOfRange { ty: ScalarType, value: String },

    /// Array shape addresses more elements than the backing data holds
    #[error("array extent mismatch: shape requires {required} bytes, data holds {available} bytes")]
    ArrayExtentMismatch { required: usize, available: usize },

    /// Stride vector cannot describe the given data
    #[error("invalid strides: {0}")]
    InvalidStrides(String),

    /// Access past the end of a kernarg buffer
    #[error("kernarg buffer too small: offset {offset} + size {size} > length {len}")]
    BufferTooSmall { offset: usize, size: usize, len: usize },

    /// Size or alignment cannot form a valid allocation layout
    #[error("invalid kernarg layout: {0}")]
    InvalidLayout(String),
}

impl MarshalError {
    /// Create a type mismatch error
    pub fn type_mismatch(expected: impl std::fmt::Display, actual: impl std::fmt::Display) -> Self {
        Self::ArgumentTypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create an out-of-range error
    pub fn out_of_range(ty: ScalarType, value: impl std::fmt::Display) -> Self {
        Self::ValueOutOfRange {
            ty,
            value: value.to_string(),
        }
    }
}
