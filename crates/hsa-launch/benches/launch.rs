//! Launch pipeline benchmarks against the host driver

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hsa_driver::{HostContext, ImageBuilder};
use hsa_kernarg::marshal_all;
use hsa_launch::{ArgType, ArgValue, Dims, HostArray, Kernel, KernelHandle, LaunchGeometry, NativeImage, ScalarType};

fn benchmark_geometry(c: &mut Criterion) {
    let mut group = c.benchmark_group("geometry");

    group.bench_function("resolve_mixed_rank", |b| {
        b.iter(|| LaunchGeometry::resolve(black_box(Dims::from((1024, 64))), Some(black_box(Dims::from(64)))).unwrap());
    });
    group.bench_function("from_grid", |b| {
        b.iter(|| LaunchGeometry::from_grid(black_box(Dims::from((32, 8, 2))), black_box(Dims::from((64, 4)))).unwrap());
    });

    group.finish();
}

fn benchmark_marshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal");

    for nargs in [1usize, 4, 16] {
        let data = vec![0.0f32; 256];
        let types: Vec<ArgType> = (0..nargs).map(|_| ArgType::array(ScalarType::F32, 1)).collect();
        let values: Vec<ArgValue<'_>> = (0..nargs)
            .map(|_| HostArray::from_slice(&data, &[256]).unwrap().into())
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(nargs), &nargs, |b, _| {
            b.iter(|| black_box(marshal_all(&values, &types).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_launch(c: &mut Criterion) {
    let ctx = HostContext::new();
    let image = ImageBuilder::new().symbol("&axpy", 0x100).build();
    let handle = KernelHandle::new(
        NativeImage::new("", image),
        "axpy",
        vec![
            ScalarType::F32.into(),
            ArgType::array(ScalarType::F32, 1),
            ArgType::array(ScalarType::F32, 1),
        ],
    );
    let kernel = Kernel::new(handle).grid(64, 256, None).unwrap();
    let x = vec![1.0f32; 16_384];
    let y = vec![2.0f32; 16_384];

    c.bench_function("launch_axpy", |b| {
        b.iter(|| {
            let args = [
                ArgValue::from(2.0f32),
                HostArray::from_slice(&x, &[16_384]).unwrap().into(),
                HostArray::from_slice(&y, &[16_384]).unwrap().into(),
            ];
            kernel.launch(&ctx, black_box(&args)).unwrap();
            ctx.host_queue().clear_records();
            if let Some(region) = ctx.kernarg_region() {
                region.clear_freed();
            }
        });
    });
}

criterion_group!(benches, benchmark_geometry, benchmark_marshal, benchmark_launch);
criterion_main!(benches);
