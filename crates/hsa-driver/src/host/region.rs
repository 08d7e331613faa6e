//! Host memory region with allocation accounting

use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::ptr::NonNull;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{DriverError, Result};
use crate::traits::Region;
use crate::types::KernargBuffer;

/// Allocation counters for one region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionStats {
    pub allocations: u64,
    pub frees: u64,
    /// Frees of buffers this region did not hand out
    pub rejected_frees: u64,
}

impl RegionStats {
    /// Buffers allocated and not yet freed
    pub fn live(&self) -> u64 {
        self.allocations - self.frees
    }
}

/// Contents of a buffer captured when it was freed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreedBuffer {
    pub id: u64,
    pub bytes: Vec<u8>,
}

struct LiveBuffer {
    address: usize,
    layout: Layout,
}

#[derive(Default)]
struct RegionState {
    live: HashMap<u64, LiveBuffer>,
    next_id: u64,
    stats: RegionStats,
    freed: Vec<FreedBuffer>,
}

/// Region backed by the process heap
pub struct HostRegion {
    name: String,
    kernargs: bool,
    state: Mutex<RegionState>,
}

impl HostRegion {
    pub fn new(name: impl Into<String>, kernargs: bool) -> Self {
        Self {
            name: name.into(),
            kernargs,
            state: Mutex::new(RegionState {
                next_id: 1,
                ..RegionState::default()
            }),
        }
    }

    /// Region usable for kernel arguments
    pub fn kernarg(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    /// General-purpose region that rejects kernarg placement
    pub fn global(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    pub fn stats(&self) -> RegionStats {
        self.state.lock().stats
    }

    /// Snapshots of every buffer freed so far, oldest first
    pub fn freed(&self) -> Vec<FreedBuffer> {
        self.state.lock().freed.clone()
    }

    /// Drop the freed-buffer snapshots; counters are kept.
    pub fn clear_freed(&self) {
        self.state.lock().freed.clear();
    }
}

impl Region for HostRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports_kernargs(&self) -> bool {
        self.kernargs
    }

    fn allocate(&self, layout: Layout) -> Result<KernargBuffer> {
        if layout.size() == 0 {
            return Err(DriverError::AllocationFailed {
                size: 0,
                align: layout.align(),
                reason: "zero-sized allocation".to_string(),
            });
        }

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| DriverError::AllocationFailed {
            size: layout.size(),
            align: layout.align(),
            reason: "host allocator returned null".to_string(),
        })?;

        let mut state = self.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.stats.allocations += 1;
        state.live.insert(
            id,
            LiveBuffer {
                address: ptr.as_ptr() as usize,
                layout,
            },
        );

        debug!(region = %self.name, id, size = layout.size(), "allocated kernarg buffer");
        // SAFETY: freshly allocated for `layout`, released only in `free` or `drop`.
        Ok(unsafe { KernargBuffer::from_raw_parts(ptr, layout, id) })
    }

    fn free(&self, buffer: KernargBuffer) -> Result<()> {
        let (ptr, layout, id) = buffer.into_raw_parts();
        let mut state = self.state.lock();

        let owned = matches!(
            state.live.get(&id),
            Some(live) if live.address == ptr.as_ptr() as usize && live.layout == layout
        );
        if !owned {
            state.stats.rejected_frees += 1;
            warn!(region = %self.name, id, "rejected free of foreign kernarg buffer");
            return Err(DriverError::UnknownBuffer(id));
        }

        state.live.remove(&id);
        // SAFETY: the pointer and layout match a live allocation of this region.
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), layout.size()) }.to_vec();
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };

        state.stats.frees += 1;
        state.freed.push(FreedBuffer { id, bytes });
        debug!(region = %self.name, id, "freed kernarg buffer");
        Ok(())
    }
}

impl Drop for HostRegion {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (id, live) in state.live.drain() {
            warn!(region = %self.name, id, "kernarg buffer leaked until region drop");
            // SAFETY: every live entry was allocated with this layout and not yet freed.
            unsafe { alloc::dealloc(live.address as *mut u8, live.layout) };
        }
    }
}
