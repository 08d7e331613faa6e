//! Error types for driver operations

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;

/// Errors reported by a driver implementation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    /// Region could not satisfy an allocation
    #[error("allocation of {size} bytes (align {align}) failed: {reason}")]
    AllocationFailed { size: usize, align: usize, reason: String },

    /// Buffer was not allocated by this region or was already freed
    #[error("unknown kernarg buffer: {0}")]
    UnknownBuffer(u64),

    /// Native image could not be loaded
    #[error("invalid native image: {0}")]
    InvalidImage(String),

    /// Module handle does not belong to this program
    #[error("unknown module handle: {0}")]
    UnknownModule(u64),

    /// Program finalization failed
    #[error("finalization failed: {0}")]
    FinalizationFailed(String),

    /// Queue rejected the dispatch
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
