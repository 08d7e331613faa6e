//! Kernel binder
//!
//! One launch walks a fixed sequence of steps:
//!
//! ```text
//! Resolve ─▶ Finalize ─▶ Allocate ─▶ Marshal ─▶ Dispatch ─▶ Release
//!    │           │           │           │           │
//!    └───────────┴───────────┴─ fail ────┴───────────┴──▶ Failed
//! ```
//!
//! Anything before Allocate fails without touching device memory. From
//! Allocate on, the kernarg buffer is held by a [`BoundDispatch`] that
//! returns it to its region on every exit path, and array descriptors are
//! kept alive until after that release.

use std::time::Instant;

use hsa_driver::{Agent, BinaryModule, CodeDescriptor, DeviceContext, DriverError, KernargBuffer, Queue, Region, StreamHandle};
use hsa_kernarg::{marshal_all, ArgValue, KernargLayout, NativeSlot};
use hsa_launch_tracing::perf_span_threshold;
use hsa_launch_tracing::performance::{record_dispatch, record_kernarg_allocation};
use tracing::{debug, warn};

use crate::config::KernelConfiguration;
use crate::error::{LaunchError, Result};
use crate::geometry::LaunchGeometry;
use crate::kernel::KernelHandle;
use crate::options::LaunchOptions;

/// Launch `handle` on `ctx` with `config`'s geometry and stream.
///
/// # Errors
///
/// Arity and stream checks run first. Resolve, finalize and allocation
/// failures end the call before anything is dispatched. A marshaling or
/// dispatch failure is reported after the kernarg buffer has been freed.
pub fn launch(
    ctx: &dyn DeviceContext,
    handle: &KernelHandle,
    config: &KernelConfiguration,
    args: &[ArgValue<'_>],
    options: &LaunchOptions,
) -> Result<()> {
    let symbol = options.entry_symbol(handle.entry_name());
    let formal = handle.argument_types();
    if args.len() != formal.len() {
        return Err(LaunchError::ArityMismatch {
            symbol,
            expected: formal.len(),
            actual: args.len(),
        });
    }
    let queue = select_queue(ctx, config.stream())?;

    let _perf = options.perf_tracing.then(|| {
        perf_span_threshold!(
            "kernel_launch",
            options.perf_threshold_us,
            symbol = symbol.as_str(),
            nargs = args.len()
        )
    });

    let (module, offset) = resolve(ctx, handle, &symbol)?;
    let agent = ctx.agent();
    let code = finalize(ctx, agent, module.as_ref(), offset).map_err(|source| LaunchError::DeviceFinalizationError {
        symbol: symbol.clone(),
        source,
    })?;
    debug!(symbol = %symbol, code = %code, "finalized kernel");

    let layout = KernargLayout::new(&options.abi, formal);
    let mut bound = BoundDispatch::allocate(agent, &layout)?;

    let slots = marshal_all(args, formal).map_err(|(index, source)| {
        warn!(symbol = %symbol, index, error = %source, "argument marshaling failed");
        LaunchError::Argument { index, source }
    })?;
    bound.fill(&layout, slots)?;

    let started = Instant::now();
    let submitted = bound.dispatch(queue, &code, config.geometry());
    let released = bound.release();

    match (submitted, released) {
        (Err(source), released) => {
            if let Err(err) = released {
                warn!(symbol = %symbol, error = %err, "kernarg release failed after dispatch failure");
            }
            Err(LaunchError::DispatchError { symbol, source })
        }
        (Ok(()), Err(source)) => Err(LaunchError::ReleaseError(source)),
        (Ok(()), Ok(())) => {
            record_dispatch(&symbol, config.geometry().work_items(), started.elapsed().as_micros() as u64);
            Ok(())
        }
    }
}

fn select_queue(ctx: &dyn DeviceContext, stream: Option<StreamHandle>) -> Result<&dyn Queue> {
    match stream {
        None => Ok(ctx.default_queue()),
        Some(stream) => ctx.queue(stream).ok_or(LaunchError::UnknownStream(stream)),
    }
}

/// Load the kernel's native image and locate `symbol` in it.
fn resolve(ctx: &dyn DeviceContext, handle: &KernelHandle, symbol: &str) -> Result<(Box<dyn BinaryModule>, u64)> {
    let module = ctx.load_module(handle.image().binary()).map_err(LaunchError::InvalidImage)?;
    let offset = module
        .find_symbol_offset(symbol)
        .ok_or_else(|| LaunchError::SymbolNotFound {
            symbol: symbol.to_string(),
        })?;
    debug!(symbol, offset, "resolved entry symbol");
    Ok((module, offset))
}

/// Build a program for `agent` and finalize the code at `offset`.
fn finalize(
    ctx: &dyn DeviceContext,
    agent: &dyn Agent,
    module: &dyn BinaryModule,
    offset: u64,
) -> std::result::Result<CodeDescriptor, DriverError> {
    let mut program = ctx.create_program(&[agent])?;
    let module_handle = program.add_module(module)?;
    program.finalize(agent, module_handle, offset)
}

/// Kernarg buffer bound to its region for the rest of one launch
struct BoundDispatch<'a> {
    region: &'a dyn Region,
    buffer: Option<KernargBuffer>,
    keep_alive: Vec<NativeSlot>,
}

impl<'a> BoundDispatch<'a> {
    /// Allocate from the first region that accepts kernel arguments.
    fn allocate(agent: &'a dyn Agent, layout: &KernargLayout) -> Result<Self> {
        let region = agent
            .regions()
            .into_iter()
            .find(|region| region.supports_kernargs())
            .ok_or_else(|| LaunchError::NoKernargRegion {
                agent: agent.name().to_string(),
            })?;

        let alloc_layout = layout.alloc_layout().map_err(LaunchError::KernargLayout)?;
        let started = Instant::now();
        let buffer = region
            .allocate(alloc_layout)
            .map_err(|source| LaunchError::KernargAllocation {
                size: alloc_layout.size(),
                source,
            })?;
        record_kernarg_allocation(
            alloc_layout.size(),
            alloc_layout.align(),
            started.elapsed().as_micros() as u64,
        );

        Ok(Self {
            region,
            buffer: Some(buffer),
            keep_alive: Vec::new(),
        })
    }

    /// Zero the injected prefix and write every slot. Takes ownership of the
    /// slots so their descriptors outlive the dispatch.
    fn fill(&mut self, layout: &KernargLayout, slots: Vec<NativeSlot>) -> Result<()> {
        if let Some(buffer) = self.buffer.as_mut() {
            let bytes = buffer.as_mut_slice();
            layout.write_injected(bytes).map_err(LaunchError::KernargLayout)?;
            for (index, slot) in slots.iter().enumerate() {
                layout
                    .write_slot(bytes, index, slot)
                    .map_err(|source| LaunchError::Argument { index, source })?;
            }
        }
        self.keep_alive = slots;
        Ok(())
    }

    fn dispatch(
        &self,
        queue: &dyn Queue,
        code: &CodeDescriptor,
        geometry: &LaunchGeometry,
    ) -> std::result::Result<(), DriverError> {
        let Some(buffer) = self.buffer.as_ref() else {
            return Err(DriverError::Other("kernarg buffer already released".to_string()));
        };
        debug!(
            queue = queue.name(),
            geometry = %geometry,
            kernargs = buffer.len(),
            "submitting dispatch"
        );
        queue.dispatch(
            code,
            buffer,
            geometry.local().map(|local| local.as_slice()),
            geometry.global().as_slice(),
        )
    }

    /// Free the buffer, then drop the keep-alive payloads.
    fn release(mut self) -> std::result::Result<(), DriverError> {
        let released = match self.buffer.take() {
            Some(buffer) => self.region.free(buffer),
            None => Ok(()),
        };
        self.keep_alive.clear();
        released
    }
}

impl Drop for BoundDispatch<'_> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            if let Err(err) = self.region.free(buffer) {
                warn!(region = self.region.name(), error = %err, "kernarg release failed on error path");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsa_driver::{HostContext, HostRegion, ImageBuilder};
    use hsa_kernarg::{ArgType, ByteReader, HostArray, ScalarType, DEFAULT_INJECTED_ARGS, SLOT_SIZE};

    use crate::kernel::NativeImage;

    fn handle(types: Vec<ArgType>) -> KernelHandle {
        let image = ImageBuilder::new().symbol("&kernel", 0x40).build();
        KernelHandle::new(NativeImage::new("", image), "kernel", types)
    }

    fn run(ctx: &HostContext, handle: &KernelHandle, args: &[ArgValue<'_>]) -> Result<()> {
        launch(ctx, handle, &KernelConfiguration::new(), args, &LaunchOptions::default())
    }

    #[test]
    fn test_scalar_slots_follow_injected_prefix() {
        let ctx = HostContext::new();
        let handle = handle(vec![ScalarType::I32.into(), ScalarType::F64.into()]);

        run(&ctx, &handle, &[ArgValue::from(-7i32), ArgValue::from(2.5f64)]).unwrap();

        let record = &ctx.host_queue().records()[0];
        let prefix = DEFAULT_INJECTED_ARGS * SLOT_SIZE;
        assert_eq!(record.kernargs.len(), prefix + 2 * SLOT_SIZE);
        assert!(record.kernargs[..prefix].iter().all(|&b| b == 0));

        let mut reader = ByteReader::at(&record.kernargs, prefix);
        assert_eq!(reader.read_i32().unwrap(), -7);
        reader.seek(prefix + SLOT_SIZE);
        assert_eq!(reader.read_f64().unwrap(), 2.5);
    }

    #[test]
    fn test_array_descriptor_address_written() {
        let ctx = HostContext::new();
        let handle = handle(vec![ArgType::array(ScalarType::F32, 1)]);
        let data = [1.0f32, 2.0, 3.0];
        let array = HostArray::from_slice(&data, &[3]).unwrap();

        run(&ctx, &handle, &[ArgValue::from(array)]).unwrap();

        let record = &ctx.host_queue().records()[0];
        let mut reader = ByteReader::at(&record.kernargs, DEFAULT_INJECTED_ARGS * SLOT_SIZE);
        assert_ne!(reader.read_address().unwrap(), 0);
    }

    #[test]
    fn test_zero_argument_kernel_without_injected_slots() {
        let ctx = HostContext::new();
        let options = LaunchOptions::default().with_abi(hsa_kernarg::KernargAbi::new(0));

        launch(&ctx, &handle(Vec::new()), &KernelConfiguration::new(), &[], &options).unwrap();

        assert_eq!(ctx.host_queue().records()[0].kernargs, vec![0u8; SLOT_SIZE]);
        assert_eq!(ctx.kernarg_region().unwrap().stats().live(), 0);
    }

    #[test]
    fn test_arity_checked_before_allocation() {
        let ctx = HostContext::new();
        let handle = handle(vec![ScalarType::I32.into()]);

        let err = run(&ctx, &handle, &[]).unwrap_err();
        assert_eq!(
            err,
            LaunchError::ArityMismatch {
                symbol: "&kernel".to_string(),
                expected: 1,
                actual: 0,
            }
        );
        assert_eq!(ctx.kernarg_region().unwrap().stats().allocations, 0);
    }

    #[test]
    fn test_missing_symbol() {
        let ctx = HostContext::new();
        let image = ImageBuilder::new().symbol("&other", 0).build();
        let handle = KernelHandle::new(NativeImage::new("", image), "kernel", Vec::new());

        let err = run(&ctx, &handle, &[]).unwrap_err();
        assert_eq!(
            err,
            LaunchError::SymbolNotFound {
                symbol: "&kernel".to_string()
            }
        );
        assert_eq!(ctx.programs_created(), 0);
    }

    #[test]
    fn test_invalid_image() {
        let ctx = HostContext::new();
        let handle = KernelHandle::new(NativeImage::new("", b"\x7fELF".to_vec()), "kernel", Vec::new());
        assert!(matches!(run(&ctx, &handle, &[]), Err(LaunchError::InvalidImage(_))));
    }

    #[test]
    fn test_no_kernarg_region() {
        let ctx = HostContext::with_regions(vec![HostRegion::global("global")]);
        let err = run(&ctx, &handle(Vec::new()), &[]).unwrap_err();
        assert_eq!(
            err,
            LaunchError::NoKernargRegion {
                agent: "host-agent".to_string()
            }
        );
        assert_eq!(ctx.host_queue().dispatch_count(), 0);
    }

    #[test]
    fn test_first_kernarg_region_wins() {
        let ctx = HostContext::with_regions(vec![
            HostRegion::global("global"),
            HostRegion::kernarg("first"),
            HostRegion::kernarg("second"),
        ]);
        run(&ctx, &handle(Vec::new()), &[]).unwrap();

        let agent = ctx.host_agent();
        assert_eq!(agent.region("first").unwrap().stats().allocations, 1);
        assert_eq!(agent.region("second").unwrap().stats().allocations, 0);
    }

    #[test]
    fn test_finalization_failure_not_retried() {
        let ctx = HostContext::new();
        ctx.fail_finalization("isa mismatch");

        let err = run(&ctx, &handle(Vec::new()), &[]).unwrap_err();
        assert!(matches!(err, LaunchError::DeviceFinalizationError { ref symbol, .. } if symbol == "&kernel"));
        assert_eq!(ctx.programs_created(), 1);
        assert_eq!(ctx.kernarg_region().unwrap().stats().allocations, 0);
    }

    #[test]
    fn test_unknown_stream() {
        let ctx = HostContext::new();
        let config = KernelConfiguration::new().with_stream(Some(StreamHandle::new(42)));

        let err = launch(&ctx, &handle(Vec::new()), &config, &[], &LaunchOptions::default()).unwrap_err();
        assert_eq!(err, LaunchError::UnknownStream(StreamHandle::new(42)));
        assert_eq!(ctx.kernarg_region().unwrap().stats().allocations, 0);
    }

    #[test]
    fn test_stream_selects_queue() {
        let mut ctx = HostContext::new();
        let stream = ctx.add_stream("async");
        let config = KernelConfiguration::new()
            .configure((4, 2), Some(crate::geometry::Dims::from(2)), Some(stream))
            .unwrap();

        launch(&ctx, &handle(Vec::new()), &config, &[], &LaunchOptions::default()).unwrap();

        assert_eq!(ctx.host_queue().dispatch_count(), 0);
        let record = &ctx.stream_queue(stream).unwrap().records()[0];
        assert_eq!(record.grid_size, vec![4, 2]);
        assert_eq!(record.workgroup_size, Some(vec![2, 1]));
    }

    #[test]
    fn test_release_after_dispatch_failure() {
        let ctx = HostContext::new();
        ctx.host_queue().fail_dispatches("queue full");
        let handle = handle(vec![ScalarType::U64.into()]);

        let err = run(&ctx, &handle, &[ArgValue::from(9u64)]).unwrap_err();
        assert!(matches!(err, LaunchError::DispatchError { .. }));

        let stats = ctx.kernarg_region().unwrap().stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.frees, 1);
        assert_eq!(stats.rejected_frees, 0);
    }
}
