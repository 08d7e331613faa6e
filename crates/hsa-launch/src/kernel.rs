//! Compiled kernel handles and configured kernels

use std::sync::Arc;

use hsa_driver::{DeviceContext, StreamHandle};
use hsa_kernarg::{ArgType, ArgValue};

use crate::config::KernelConfiguration;
use crate::dispatch;
use crate::error::Result;
use crate::geometry::Dims;
use crate::options::LaunchOptions;

/// Finalizer output: the loadable binary plus its textual assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeImage {
    assembly: String,
    binary: Vec<u8>,
}

impl NativeImage {
    pub fn new(assembly: impl Into<String>, binary: impl Into<Vec<u8>>) -> Self {
        Self {
            assembly: assembly.into(),
            binary: binary.into(),
        }
    }

    pub fn assembly(&self) -> &str {
        &self.assembly
    }

    pub fn binary(&self) -> &[u8] {
        &self.binary
    }
}

/// Immutable result of compiling one kernel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelHandle {
    image: NativeImage,
    entry_name: String,
    argument_types: Vec<ArgType>,
}

impl KernelHandle {
    pub fn new(image: NativeImage, entry_name: impl Into<String>, argument_types: Vec<ArgType>) -> Self {
        Self {
            image,
            entry_name: entry_name.into(),
            argument_types,
        }
    }

    pub fn image(&self) -> &NativeImage {
        &self.image
    }

    /// Kernel name without the linkage prefix
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Formal argument types in declared order
    pub fn argument_types(&self) -> &[ArgType] {
        &self.argument_types
    }
}

/// A shared [`KernelHandle`] with its launch configuration.
///
/// Cloning is cheap and shares the handle. Configuring returns a new
/// `Kernel`, so one compiled kernel can be launched with many geometries
/// from many threads.
#[derive(Debug, Clone)]
pub struct Kernel {
    handle: Arc<KernelHandle>,
    config: KernelConfiguration,
    options: LaunchOptions,
}

impl Kernel {
    pub fn new(handle: KernelHandle) -> Self {
        Self::from_shared(Arc::new(handle))
    }

    pub fn from_shared(handle: Arc<KernelHandle>) -> Self {
        Self {
            handle,
            config: KernelConfiguration::default(),
            options: LaunchOptions::default(),
        }
    }

    pub fn with_options(&self, options: LaunchOptions) -> Self {
        Self {
            options,
            ..self.clone()
        }
    }

    pub fn with_config(&self, config: KernelConfiguration) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }

    /// Copy configured for `global`/`local` sizes on `stream`.
    pub fn configure(&self, global: impl Into<Dims>, local: Option<Dims>, stream: Option<StreamHandle>) -> Result<Self> {
        let config = self.config.configure(global, local, stream)?;
        Ok(self.with_config(config))
    }

    /// Copy configured with `[grid, block, stream]` launch notation.
    ///
    /// ```rust
    /// # use hsa_launch::{Dims, Kernel, KernelHandle, NativeImage};
    /// let kernel = Kernel::new(KernelHandle::new(NativeImage::new("", Vec::new()), "k", Vec::new()));
    /// let kernel = kernel.grid((2, 3), (4, 5), None)?;
    /// assert_eq!(kernel.config().global_size(), &Dims::from((8, 15)));
    /// # Ok::<(), hsa_launch::LaunchError>(())
    /// ```
    pub fn grid(&self, grid: impl Into<Dims>, block: impl Into<Dims>, stream: Option<StreamHandle>) -> Result<Self> {
        let config = self.config.configure_grid(grid, block, stream)?;
        Ok(self.with_config(config))
    }

    pub fn handle(&self) -> &Arc<KernelHandle> {
        &self.handle
    }

    pub fn config(&self) -> &KernelConfiguration {
        &self.config
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    /// Launch on `ctx` with `args` bound to the formal arguments in order.
    ///
    /// Returns once the dispatch is submitted.
    pub fn launch(&self, ctx: &dyn DeviceContext, args: &[ArgValue<'_>]) -> Result<()> {
        dispatch::launch(ctx, &self.handle, &self.config, args, &self.options)
    }
}
