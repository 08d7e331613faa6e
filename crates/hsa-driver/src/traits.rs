//! Driver traits consumed by the launch pipeline
//!
//! Every handle is obtained from a [`DeviceContext`] and borrowed for the
//! duration of one launch. Nothing here is cached globally; a caller that
//! wants a different device passes a different context.

use std::alloc::Layout;
use std::any::Any;

use crate::error::Result;
use crate::types::{CodeDescriptor, KernargBuffer, ModuleHandle, StreamHandle};

/// Active device context: one agent, its queues, and module/program factories.
pub trait DeviceContext: Send + Sync {
    /// The execution agent kernels are finalized for
    fn agent(&self) -> &dyn Agent;

    /// Queue used when a launch names no stream
    fn default_queue(&self) -> &dyn Queue;

    /// Queue bound to `stream`, if the context knows it
    fn queue(&self, stream: StreamHandle) -> Option<&dyn Queue>;

    /// Load a native image so its symbols can be located.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DriverError::InvalidImage`] when the bytes are not a
    /// loadable image.
    fn load_module(&self, image: &[u8]) -> Result<Box<dyn BinaryModule>>;

    /// Create an empty program scoped to `agents`.
    fn create_program(&self, agents: &[&dyn Agent]) -> Result<Box<dyn Program>>;
}

/// An execution agent and the memory regions it can see
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    /// Regions in driver enumeration order
    fn regions(&self) -> Vec<&dyn Region>;
}

/// A device memory region
pub trait Region: Send + Sync {
    fn name(&self) -> &str;

    /// Whether kernel argument buffers may be placed in this region
    fn supports_kernargs(&self) -> bool;

    /// Allocate zero-initialized memory for `layout`.
    fn allocate(&self, layout: Layout) -> Result<KernargBuffer>;

    /// Return a buffer previously allocated by this region.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DriverError::UnknownBuffer`] if the buffer did not
    /// come from this region.
    fn free(&self, buffer: KernargBuffer) -> Result<()>;
}

/// An ordered submission channel
pub trait Queue: Send + Sync {
    fn name(&self) -> &str;

    /// Submit one kernel dispatch.
    ///
    /// Returns once the packet is submitted; device execution continues
    /// asynchronously. `workgroup_size` is `None` when the launch leaves the
    /// workgroup shape to the runtime.
    fn dispatch(
        &self,
        code: &CodeDescriptor,
        kernargs: &KernargBuffer,
        workgroup_size: Option<&[u32]>,
        grid_size: &[u32],
    ) -> Result<()>;
}

/// A loaded native image
pub trait BinaryModule: Send + Sync {
    /// Byte offset of `symbol`'s code object, if present
    fn find_symbol_offset(&self, symbol: &str) -> Option<u64>;

    /// Downcast for drivers that need their concrete module type back
    fn as_any(&self) -> &dyn Any;
}

/// A program being assembled from modules and finalized per agent
pub trait Program: Send {
    fn add_module(&mut self, module: &dyn BinaryModule) -> Result<ModuleHandle>;

    /// Finalize the code object at `symbol_offset` inside `module` for `agent`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DriverError::FinalizationFailed`] on any driver
    /// failure. Partial state is left to the driver; callers do not retry.
    fn finalize(&mut self, agent: &dyn Agent, module: ModuleHandle, symbol_offset: u64) -> Result<CodeDescriptor>;
}
