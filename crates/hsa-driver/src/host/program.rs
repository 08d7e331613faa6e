//! Host program: module bookkeeping and finalization

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{DriverError, Result};
use crate::host::image::HostModule;
use crate::traits::{Agent, BinaryModule, Program};
use crate::types::{CodeDescriptor, ModuleHandle};

/// Knobs shared between a context and the programs it creates
#[derive(Debug, Default)]
pub(crate) struct ProgramControl {
    pub(crate) finalize_failure: Mutex<Option<String>>,
    pub(crate) programs_created: AtomicU64,
    pub(crate) finalizations: AtomicU64,
    next_code_handle: AtomicU64,
}

impl ProgramControl {
    fn next_code_handle(&self) -> u64 {
        self.next_code_handle.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Program scoped to a fixed set of agents
pub struct HostProgram {
    agents: Vec<String>,
    modules: Vec<HostModule>,
    control: Arc<ProgramControl>,
}

impl HostProgram {
    pub(crate) fn new(agents: Vec<String>, control: Arc<ProgramControl>) -> Self {
        control.programs_created.fetch_add(1, Ordering::Relaxed);
        Self {
            agents,
            modules: Vec::new(),
            control,
        }
    }

    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

impl Program for HostProgram {
    fn add_module(&mut self, module: &dyn BinaryModule) -> Result<ModuleHandle> {
        let module = module
            .as_any()
            .downcast_ref::<HostModule>()
            .ok_or_else(|| DriverError::InvalidImage("module was not loaded by the host driver".to_string()))?;

        self.modules.push(module.clone());
        Ok(ModuleHandle::new(self.modules.len() as u64 - 1))
    }

    fn finalize(&mut self, agent: &dyn Agent, module: ModuleHandle, symbol_offset: u64) -> Result<CodeDescriptor> {
        if let Some(reason) = self.control.finalize_failure.lock().clone() {
            return Err(DriverError::FinalizationFailed(reason));
        }
        if !self.agents.iter().any(|name| name == agent.name()) {
            return Err(DriverError::FinalizationFailed(format!(
                "agent {} is not part of this program",
                agent.name()
            )));
        }

        let loaded = self
            .modules
            .get(module.id() as usize)
            .ok_or(DriverError::UnknownModule(module.id()))?;
        if !loaded.has_code_at(symbol_offset) {
            return Err(DriverError::FinalizationFailed(format!(
                "no code object at offset {symbol_offset:#x} in {module}"
            )));
        }

        self.control.finalizations.fetch_add(1, Ordering::Relaxed);
        let code = CodeDescriptor::new(self.control.next_code_handle(), symbol_offset, agent.name());
        debug!(code = %code, "finalized code object");
        Ok(code)
    }
}
