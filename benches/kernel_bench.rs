//! Benchmarks for the lazy kernel pipeline
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lazywire::Kernel;

/// Message with 20 fields: scalars, strings and one nested message.
fn sample_bytes() -> bytes::Bytes {
    let mut kernel = Kernel::empty();
    for field in 1..=16u32 {
        kernel.set_uint64(field, (field as u64) << 20).unwrap();
    }
    kernel.set_string(17, "benchmark payload string").unwrap();
    kernel.set_packed_int32(18, (0..64).collect()).unwrap();
    let mut child = Kernel::empty();
    child.set_int32(1, 7).unwrap();
    kernel
        .set_message(19, std::rc::Rc::new(std::cell::RefCell::new(child)))
        .unwrap();
    kernel.set_bytes(20, vec![0xAB; 256]).unwrap();
    kernel.serialize().unwrap()
}

fn bench_untouched_round_trip(c: &mut Criterion) {
    let bytes = sample_bytes();
    let mut group = c.benchmark_group("untouched_round_trip");
    group.throughput(Throughput::Bytes(bytes.len() as u64));
    group.bench_function("from_bytes_serialize", |b| {
        b.iter(|| {
            let kernel = Kernel::from_bytes(black_box(bytes.clone()));
            black_box(kernel.serialize().unwrap())
        })
    });
    group.finish();
}

fn bench_lazy_single_read(c: &mut Criterion) {
    let bytes = sample_bytes();
    c.bench_function("index_and_read_one_field", |b| {
        b.iter(|| {
            let mut kernel = Kernel::from_bytes(black_box(bytes.clone()));
            black_box(kernel.get_uint64(8, 0).unwrap())
        })
    });
}

fn bench_cached_read(c: &mut Criterion) {
    let mut kernel = Kernel::from_bytes(sample_bytes());
    kernel.get_uint64(8, 0).unwrap();
    c.bench_function("cached_read", |b| {
        b.iter(|| black_box(kernel.get_uint64(8, 0).unwrap()))
    });
}

fn bench_edit_and_serialize(c: &mut Criterion) {
    let bytes = sample_bytes();
    c.bench_function("set_one_field_serialize", |b| {
        b.iter(|| {
            let mut kernel = Kernel::from_bytes(black_box(bytes.clone()));
            kernel.set_uint64(8, 1).unwrap();
            black_box(kernel.serialize().unwrap())
        })
    });
}

fn bench_shallow_copy(c: &mut Criterion) {
    let mut kernel = Kernel::from_bytes(sample_bytes());
    kernel.get_uint64(1, 0).unwrap();
    c.bench_function("shallow_copy", |b| {
        b.iter(|| black_box(kernel.shallow_copy()))
    });
}

criterion_group!(
    benches,
    bench_untouched_round_trip,
    bench_lazy_single_read,
    bench_cached_read,
    bench_edit_and_serialize,
    bench_shallow_copy
);
criterion_main!(benches);
