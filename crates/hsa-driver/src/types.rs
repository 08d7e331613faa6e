//! Handles exchanged between the launch pipeline and a driver

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

/// Identifies an alternate submission queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamHandle(pub u64);

impl StreamHandle {
    pub const fn new(id: u64) -> Self {
        StreamHandle(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream{}", self.0)
    }
}

/// Handle to a module added to a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleHandle(pub u64);

impl ModuleHandle {
    pub const fn new(id: u64) -> Self {
        ModuleHandle(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module{}", self.0)
    }
}

/// Finalized, dispatch-ready entry point bound to one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeDescriptor {
    handle: u64,
    symbol_offset: u64,
    agent: String,
}

impl CodeDescriptor {
    pub fn new(handle: u64, symbol_offset: u64, agent: impl Into<String>) -> Self {
        Self {
            handle,
            symbol_offset,
            agent: agent.into(),
        }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn symbol_offset(&self) -> u64 {
        self.symbol_offset
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }
}

impl fmt::Display for CodeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code{}@{:#x} on {}", self.handle, self.symbol_offset, self.agent)
    }
}

/// Host-accessible kernarg memory handed out by a [`crate::Region`].
///
/// The buffer has no destructor: it must be returned to the region that
/// allocated it through [`crate::Region::free`]. Taking `self` by value
/// there makes a second free of the same handle impossible.
#[must_use = "kernarg buffers must be returned to their region"]
#[derive(Debug)]
pub struct KernargBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
    id: u64,
}

// The buffer is plain memory with a single owner.
unsafe impl Send for KernargBuffer {}

impl KernargBuffer {
    /// Wrap memory allocated by a region.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `layout.size()` bytes
    /// and stay valid until the buffer is passed back to its region.
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, layout: Layout, id: u64) -> Self {
        Self { ptr, layout, id }
    }

    /// Give the raw parts back to the region that owns the memory.
    pub fn into_raw_parts(self) -> (NonNull<u8>, Layout, u64) {
        (self.ptr, self.layout, self.id)
    }

    /// Region-assigned identifier
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.size() == 0
    }

    /// Address the device reads the arguments from
    pub fn address(&self) -> u64 {
        self.ptr.as_ptr() as usize as u64
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: guaranteed by `from_raw_parts`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.layout.size()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: guaranteed by `from_raw_parts`; `&mut self` is exclusive.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.layout.size()) }
    }
}
