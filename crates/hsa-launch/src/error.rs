//! Error types for kernel launches

use hsa_driver::{DriverError, StreamHandle};
use hsa_kernarg::MarshalError;

/// Result type for launch operations
pub type Result<T> = std::result::Result<T, LaunchError>;

/// Errors surfaced by a launch call
///
/// None of these are retried. Once an argument buffer has been allocated it
/// is released before the error is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LaunchError {
    /// Malformed global/local or grid/block size
    #[error("invalid launch geometry: {0}")]
    InvalidGeometry(String),

    /// An argument value could not be marshaled against its formal type
    #[error("argument {index}: {source}")]
    Argument {
        index: usize,
        #[source]
        source: MarshalError,
    },

    /// Caller supplied a different number of values than the kernel declares
    #[error("{symbol} takes {expected} arguments, {actual} supplied")]
    ArityMismatch {
        symbol: String,
        expected: usize,
        actual: usize,
    },

    /// Entry symbol missing from the native image
    #[error("symbol not found in native image: {symbol}")]
    SymbolNotFound { symbol: String },

    /// Native image could not be loaded by the driver
    #[error("native image rejected by driver: {0}")]
    InvalidImage(#[source] DriverError),

    /// Program creation or finalization failed
    #[error("finalization of {symbol} failed: {source}")]
    DeviceFinalizationError {
        symbol: String,
        #[source]
        source: DriverError,
    },

    /// The agent exposes no region usable for kernel arguments
    #[error("agent {agent} has no kernarg region")]
    NoKernargRegion { agent: String },

    /// Buffer size or alignment cannot be expressed as a layout
    #[error("kernarg layout: {0}")]
    KernargLayout(#[source] MarshalError),

    /// The kernarg region refused the allocation
    #[error("kernarg allocation of {size} bytes failed: {source}")]
    KernargAllocation {
        size: usize,
        #[source]
        source: DriverError,
    },

    /// Configuration names a stream the context does not know
    #[error("unknown stream: {0}")]
    UnknownStream(StreamHandle),

    /// The queue rejected the dispatch; the buffer was still released
    #[error("dispatch of {symbol} failed: {source}")]
    DispatchError {
        symbol: String,
        #[source]
        source: DriverError,
    },

    /// Returning the kernarg buffer to its region failed
    #[error("kernarg release failed: {0}")]
    ReleaseError(#[source] DriverError),
}

impl LaunchError {
    /// Index of the offending argument, for marshaling failures
    pub fn argument_index(&self) -> Option<usize> {
        match self {
            Self::Argument { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub(crate) fn geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry(message.into())
    }
}
