//! In-process host driver
//!
//! Implements every driver trait without a device. Regions hand out real
//! heap memory, queues record what they were asked to dispatch, and the
//! context exposes counters plus failure switches so callers can exercise
//! every error path of a launch.
//!
//! ```rust
//! use hsa_driver::{BinaryModule, DeviceContext, HostContext, ImageBuilder};
//!
//! let ctx = HostContext::new();
//! let image = ImageBuilder::new().symbol("&vadd", 0x40).build();
//! let module = ctx.load_module(&image).unwrap();
//! assert_eq!(module.find_symbol_offset("&vadd"), Some(0x40));
//! ```

mod image;
mod program;
mod queue;
mod region;

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub use image::{HostModule, ImageBuilder, IMAGE_MAGIC};
pub use program::HostProgram;
pub use queue::{DispatchRecord, HostQueue, MAX_DISPATCH_RANK};
pub use region::{FreedBuffer, HostRegion, RegionStats};

use crate::error::Result;
use crate::traits::{Agent, BinaryModule, DeviceContext, Program, Queue, Region};
use crate::types::StreamHandle;
use program::ProgramControl;

/// Host agent with an ordered list of regions
pub struct HostAgent {
    name: String,
    regions: Vec<HostRegion>,
}

impl HostAgent {
    pub fn new(name: impl Into<String>, regions: Vec<HostRegion>) -> Self {
        Self {
            name: name.into(),
            regions,
        }
    }

    /// Concrete access to a region for inspection
    pub fn region(&self, name: &str) -> Option<&HostRegion> {
        self.regions.iter().find(|region| region.name() == name)
    }
}

impl Agent for HostAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn regions(&self) -> Vec<&dyn Region> {
        self.regions.iter().map(|region| region as &dyn Region).collect()
    }
}

/// Device context backed by the host driver
pub struct HostContext {
    agent: HostAgent,
    default_queue: HostQueue,
    streams: BTreeMap<StreamHandle, HostQueue>,
    control: Arc<ProgramControl>,
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HostContext {
    /// Name of the kernarg region created by [`HostContext::new`]
    pub const KERNARG_REGION: &'static str = "kernarg";

    /// Context whose agent has a global region followed by a kernarg region.
    pub fn new() -> Self {
        Self::with_regions(vec![
            HostRegion::global("global"),
            HostRegion::kernarg(Self::KERNARG_REGION),
        ])
    }

    /// Context whose agent exposes exactly `regions`, in order.
    pub fn with_regions(regions: Vec<HostRegion>) -> Self {
        Self {
            agent: HostAgent::new("host-agent", regions),
            default_queue: HostQueue::new("default"),
            streams: BTreeMap::new(),
            control: Arc::new(ProgramControl::default()),
        }
    }

    /// Register an extra queue and return the stream that selects it.
    pub fn add_stream(&mut self, name: impl Into<String>) -> StreamHandle {
        let stream = StreamHandle::new(self.streams.len() as u64 + 1);
        self.streams.insert(stream, HostQueue::new(name));
        stream
    }

    pub fn host_agent(&self) -> &HostAgent {
        &self.agent
    }

    /// The region named [`Self::KERNARG_REGION`], if present
    pub fn kernarg_region(&self) -> Option<&HostRegion> {
        self.agent.region(Self::KERNARG_REGION)
    }

    pub fn host_queue(&self) -> &HostQueue {
        &self.default_queue
    }

    pub fn stream_queue(&self, stream: StreamHandle) -> Option<&HostQueue> {
        self.streams.get(&stream)
    }

    /// Make every following finalization fail with `reason`.
    pub fn fail_finalization(&self, reason: impl Into<String>) {
        *self.control.finalize_failure.lock() = Some(reason.into());
    }

    pub fn programs_created(&self) -> u64 {
        self.control.programs_created.load(Ordering::Relaxed)
    }

    pub fn finalizations(&self) -> u64 {
        self.control.finalizations.load(Ordering::Relaxed)
    }
}

impl DeviceContext for HostContext {
    fn agent(&self) -> &dyn Agent {
        &self.agent
    }

    fn default_queue(&self) -> &dyn Queue {
        &self.default_queue
    }

    fn queue(&self, stream: StreamHandle) -> Option<&dyn Queue> {
        self.streams.get(&stream).map(|queue| queue as &dyn Queue)
    }

    fn load_module(&self, image: &[u8]) -> Result<Box<dyn BinaryModule>> {
        Ok(Box::new(HostModule::from_memory(image)?))
    }

    fn create_program(&self, agents: &[&dyn Agent]) -> Result<Box<dyn Program>> {
        let names = agents.iter().map(|agent| agent.name().to_string()).collect();
        Ok(Box::new(HostProgram::new(names, Arc::clone(&self.control))))
    }
}
