use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pollen::{
    conduit::{Conduit, SoftConduit},
    telemetry::{arithmetic_mean_deviation, chi_square, entropy_per_byte, SampleQuality},
};

fn sample(len: usize) -> Vec<u8> {
    SoftConduit::from_seed([7u8; 32])
        .read_full(len)
        .expect("software conduit reads never fail")
}

fn bench_entropy_per_byte(c: &mut Criterion) {
    let data = sample(64);

    c.bench_function("entropy_per_byte (64 bytes)", |b| {
        b.iter(|| entropy_per_byte(black_box(&data)))
    });
}

fn bench_chi_square(c: &mut Criterion) {
    let data = sample(64);

    c.bench_function("chi_square (64 bytes)", |b| {
        b.iter(|| chi_square(black_box(&data)))
    });
}

fn bench_mean_deviation(c: &mut Criterion) {
    let data = sample(64);

    c.bench_function("arithmetic_mean_deviation (64 bytes)", |b| {
        b.iter(|| arithmetic_mean_deviation(black_box(&data)))
    });
}

fn bench_analyze_large(c: &mut Criterion) {
    let data = sample(64 * 1024);

    c.bench_function("SampleQuality::analyze (64 KiB)", |b| {
        b.iter(|| SampleQuality::analyze(black_box(&data)))
    });
}

fn bench_soft_conduit_request(c: &mut Criterion) {
    let conduit = SoftConduit::from_seed([7u8; 32]);
    let digest = [0xabu8; 64];

    c.bench_function("SoftConduit write + read_full (64 bytes)", |b| {
        b.iter(|| {
            conduit.write(black_box(&digest)).ok();
            conduit.read_full(black_box(64))
        })
    });
}

criterion_group!(
    benches,
    bench_entropy_per_byte,
    bench_chi_square,
    bench_mean_deviation,
    bench_analyze_large,
    bench_soft_conduit_request,
);
criterion_main!(benches);
