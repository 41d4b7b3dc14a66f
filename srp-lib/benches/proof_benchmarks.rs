//! Range proof benchmarks
//!
//! Run with: `cargo bench --bench proof_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::OsRng;
use srp_lib::crypto::{self, PrivateKey};
use srp_lib::{FourSquares, RangeProofBuilder};

/// Benchmark four-squares decomposition across magnitudes
fn bench_four_squares(c: &mut Criterion) {
    let solver = FourSquares::default();
    let mut group = c.benchmark_group("four_squares");

    for n in [255u64, 65_535, 1_000_007, u32::MAX as u64] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(solver.decompose(black_box(n), &mut OsRng)))
        });
    }
    group.finish();
}

/// Benchmark full proof construction for common bit lengths
fn bench_range_proof(c: &mut Criterion) {
    let builder = RangeProofBuilder::default();
    let mut group = c.benchmark_group("range_proof_build");

    for bitlen in [8u32, 16, 32] {
        let max = ((1u64 << bitlen) - 1) as u32;
        group.bench_with_input(BenchmarkId::from_parameter(bitlen), &max, |b, &max| {
            b.iter(|| black_box(builder.build(0, max, bitlen, max / 3, &mut OsRng)))
        });
    }
    group.finish();
}

/// Benchmark commitment self-check
fn bench_verify_commitments(c: &mut Criterion) {
    let proof = RangeProofBuilder::default()
        .build(0, 255, 8, 42, &mut OsRng)
        .unwrap();

    c.bench_function("range_proof_verify_commitments", |b| {
        b.iter(|| black_box(proof.verify_commitments()))
    });
}

/// Benchmark ECDSA signing of a serial id
fn bench_ecdsa(c: &mut Criterion) {
    let key = PrivateKey::from_bytes(&[7u8; 32]).unwrap();
    let public = key.public_key();
    let message = b"client-0001";
    let signature = crypto::sign(&key, message);

    c.bench_function("ecdsa_sign", |b| {
        b.iter(|| black_box(crypto::sign(&key, black_box(message))))
    });
    c.bench_function("ecdsa_verify", |b| {
        b.iter(|| black_box(crypto::verify(&public, black_box(message), &signature)))
    });
}

criterion_group!(
    proof_benches,
    bench_four_squares,
    bench_range_proof,
    bench_verify_commitments,
    bench_ecdsa
);
criterion_main!(proof_benches);
