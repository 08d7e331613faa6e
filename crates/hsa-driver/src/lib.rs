//! Driver collaborator interface for the HSA launch pipeline
//!
//! The launch pipeline never talks to a runtime directly. It receives a
//! [`DeviceContext`] and works through the capability handles the context
//! hands out:
//!
//! ```text
//! DeviceContext
//! ├── Agent            - execution agent owning memory regions
//! │   └── Region       - allocate/free kernarg buffers
//! ├── Queue            - default queue plus per-stream queues
//! ├── BinaryModule     - loaded native image, symbol lookup
//! └── Program          - add modules, finalize to a CodeDescriptor
//! ```
//!
//! The [`host`] module implements every trait in-process. It performs no
//! device work; it records what it was asked to do so callers can verify
//! buffer contents and allocation pairing.

pub mod error;
pub mod host;
pub mod traits;
pub mod types;

pub use error::{DriverError, Result};
pub use host::{
    DispatchRecord, FreedBuffer, HostAgent, HostContext, HostModule, HostProgram, HostQueue, HostRegion,
    ImageBuilder, RegionStats,
};
pub use traits::{Agent, BinaryModule, DeviceContext, Program, Queue, Region};
pub use types::{CodeDescriptor, KernargBuffer, ModuleHandle, StreamHandle};
