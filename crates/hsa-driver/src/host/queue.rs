//! Recording host queue

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{DriverError, Result};
use crate::traits::Queue;
use crate::types::{CodeDescriptor, KernargBuffer};

/// Highest dispatch rank an AQL packet can express
pub const MAX_DISPATCH_RANK: usize = 3;

/// One submitted dispatch, with the kernarg bytes as they were at submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRecord {
    pub code: CodeDescriptor,
    pub kernarg_address: u64,
    pub kernargs: Vec<u8>,
    pub workgroup_size: Option<Vec<u32>>,
    pub grid_size: Vec<u32>,
}

/// Queue that validates and records dispatches instead of executing them
pub struct HostQueue {
    name: String,
    records: Mutex<Vec<DispatchRecord>>,
    failure: Mutex<Option<String>>,
}

impl HostQueue {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        }
    }

    /// Make every following dispatch fail with `reason` until cleared.
    pub fn fail_dispatches(&self, reason: impl Into<String>) {
        *self.failure.lock() = Some(reason.into());
    }

    pub fn clear_failure(&self) {
        *self.failure.lock() = None;
    }

    pub fn records(&self) -> Vec<DispatchRecord> {
        self.records.lock().clone()
    }

    /// Forget every recorded dispatch.
    pub fn clear_records(&self) {
        self.records.lock().clear();
    }

    pub fn dispatch_count(&self) -> usize {
        self.records.lock().len()
    }
}

impl Queue for HostQueue {
    fn name(&self) -> &str {
        &self.name
    }

    fn dispatch(
        &self,
        code: &CodeDescriptor,
        kernargs: &KernargBuffer,
        workgroup_size: Option<&[u32]>,
        grid_size: &[u32],
    ) -> Result<()> {
        if let Some(reason) = self.failure.lock().clone() {
            return Err(DriverError::DispatchFailed(reason));
        }
        if grid_size.is_empty() || grid_size.len() > MAX_DISPATCH_RANK {
            return Err(DriverError::DispatchFailed(format!(
                "grid rank {} outside 1..={MAX_DISPATCH_RANK}",
                grid_size.len()
            )));
        }
        if let Some(workgroup) = workgroup_size {
            if workgroup.len() != grid_size.len() {
                return Err(DriverError::DispatchFailed(format!(
                    "workgroup rank {} does not match grid rank {}",
                    workgroup.len(),
                    grid_size.len()
                )));
            }
        }

        debug!(queue = %self.name, code = %code, grid = ?grid_size, workgroup = ?workgroup_size, "dispatch submitted");
        self.records.lock().push(DispatchRecord {
            code: code.clone(),
            kernarg_address: kernargs.address(),
            kernargs: kernargs.as_slice().to_vec(),
            workgroup_size: workgroup_size.map(<[u32]>::to_vec),
            grid_size: grid_size.to_vec(),
        });
        Ok(())
    }
}
