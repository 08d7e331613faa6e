//! Full launches against the host driver

use std::sync::Arc;

use hsa_driver::{HostContext, ImageBuilder};
use hsa_kernarg::{ByteReader, MarshalError, DEFAULT_INJECTED_ARGS, SLOT_SIZE};
use hsa_launch::{
    ArgType, ArgValue, Complex64, Dims, HostArray, Kernel, KernelHandle, LaunchError, NativeImage, ScalarType,
};

const PREFIX: usize = DEFAULT_INJECTED_ARGS * SLOT_SIZE;

fn kernel(name: &str, types: Vec<ArgType>) -> Kernel {
    let image = ImageBuilder::new()
        .symbol(format!("&{name}"), 0x200)
        .symbol("&unrelated", 0x400)
        .build();
    Kernel::new(KernelHandle::new(NativeImage::new("; amdgcn", image), name, types))
}

#[test]
fn test_configure_examples_reach_queue() {
    let ctx = HostContext::new();
    let k = kernel("k", Vec::new());

    k.configure((4,), Some(Dims::from((2,))), None).unwrap().launch(&ctx, &[]).unwrap();
    k.configure((4, 2), Some(Dims::from((2,))), None).unwrap().launch(&ctx, &[]).unwrap();
    k.grid((2, 3), (4, 5), None).unwrap().launch(&ctx, &[]).unwrap();
    k.launch(&ctx, &[]).unwrap();

    let records = ctx.host_queue().records();
    assert_eq!(records[0].grid_size, vec![4]);
    assert_eq!(records[0].workgroup_size, Some(vec![2]));
    assert_eq!(records[1].grid_size, vec![4, 2]);
    assert_eq!(records[1].workgroup_size, Some(vec![2, 1]));
    assert_eq!(records[2].grid_size, vec![8, 15]);
    assert_eq!(records[2].workgroup_size, Some(vec![4, 5]));
    assert_eq!(records[3].grid_size, vec![1]);
    assert_eq!(records[3].workgroup_size, None);
    assert!(records.iter().all(|record| record.code.symbol_offset() == 0x200));
}

#[test]
fn test_complex_arguments_byte_exact() {
    let ctx = HostContext::new();
    let k = kernel(
        "cplx",
        vec![ScalarType::C128.into(), ScalarType::C128.into(), ScalarType::C64.into()],
    );

    k.launch(
        &ctx,
        &[
            ArgValue::from(3.0f64),
            ArgValue::from(Complex64::new(1.0, 2.0)),
            ArgValue::from(Complex64::new(-1.5, 0.25)),
        ],
    )
    .unwrap();

    let record = &ctx.host_queue().records()[0];
    // complex128 spans two slots
    assert_eq!(record.kernargs.len(), PREFIX + 5 * SLOT_SIZE);

    let mut reader = ByteReader::at(&record.kernargs, PREFIX);
    assert_eq!(reader.read_f64().unwrap().to_bits(), 3.0f64.to_bits());
    assert_eq!(reader.read_f64().unwrap().to_bits(), 0.0f64.to_bits());
    assert_eq!(reader.read_f64().unwrap(), 1.0);
    assert_eq!(reader.read_f64().unwrap(), 2.0);
    assert_eq!(reader.read_f32().unwrap(), -1.5);
    assert_eq!(reader.read_f32().unwrap(), 0.25);
}

#[test]
fn test_rank_mismatch_leaves_buffer_untouched() {
    let ctx = HostContext::new();
    let k = kernel(
        "saxpy",
        vec![ScalarType::I32.into(), ArgType::array(ScalarType::F32, 2)],
    );
    let data = [0.0f32; 8];
    let flat = HostArray::from_slice(&data, &[8]).unwrap();

    let err = k.launch(&ctx, &[ArgValue::from(77i32), flat.into()]).unwrap_err();

    assert_eq!(
        err,
        LaunchError::Argument {
            index: 1,
            source: MarshalError::ShapeRankMismatch {
                declared: 2,
                observed: 1
            },
        }
    );
    assert_eq!(err.argument_index(), Some(1));

    let region = ctx.kernarg_region().unwrap();
    let freed = region.freed();
    assert_eq!(freed.len(), 1);
    assert!(freed[0].bytes.iter().all(|&b| b == 0));
    assert_eq!(region.stats().live(), 0);
    assert_eq!(ctx.host_queue().dispatch_count(), 0);
}

#[test]
fn test_unsupported_and_mismatched_types() {
    let ctx = HostContext::new();

    let opaque = kernel("opaque", vec![ArgType::Opaque("record".to_string())]);
    let err = opaque.launch(&ctx, &[ArgValue::from(1i64)]).unwrap_err();
    assert!(matches!(
        err,
        LaunchError::Argument {
            index: 0,
            source: MarshalError::UnsupportedArgumentType(_)
        }
    ));

    let narrow = kernel("narrow", vec![ScalarType::I8.into()]);
    let err = narrow.launch(&ctx, &[ArgValue::from(300i32)]).unwrap_err();
    assert!(matches!(
        err,
        LaunchError::Argument {
            source: MarshalError::ValueOutOfRange { .. },
            ..
        }
    ));

    let stats = ctx.kernarg_region().unwrap().stats();
    assert_eq!(stats.allocations, stats.frees);
}

#[test]
fn test_array_descriptor_contents() {
    let ctx = HostContext::new();
    let k = kernel("fill", vec![ArgType::array(ScalarType::F64, 2)]);
    let data = [0.0f64; 6];
    let array = HostArray::from_slice(&data, &[2, 3]).unwrap();

    k.configure(6, None, None).unwrap().launch(&ctx, &[array.into()]).unwrap();

    let record = &ctx.host_queue().records()[0];
    let mut reader = ByteReader::at(&record.kernargs, PREFIX);
    assert_ne!(reader.read_address().unwrap(), 0);
}

#[test]
fn test_concurrent_launches_share_handle() {
    let ctx = HostContext::new();
    let k = kernel("scale", vec![ArgType::array(ScalarType::F32, 1), ScalarType::F32.into()]);

    std::thread::scope(|scope| {
        for worker in 0..8u32 {
            let k = k.clone();
            let ctx = &ctx;
            scope.spawn(move || {
                let data = vec![worker as f32; 16];
                let array = HostArray::from_slice(&data, &[16]).unwrap();
                k.configure(16, Some(Dims::from(4)), None)
                    .unwrap()
                    .launch(ctx, &[array.into(), ArgValue::from(worker as f32)])
                    .unwrap();
            });
        }
    });

    assert_eq!(Arc::strong_count(k.handle()), 1);
    assert_eq!(ctx.host_queue().dispatch_count(), 8);
    let stats = ctx.kernarg_region().unwrap().stats();
    assert_eq!(stats.allocations, 8);
    assert_eq!(stats.frees, 8);
    assert_eq!(ctx.programs_created(), 8);
}
