//! Benchmarks for the host kernels and shader generation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use shoal::kernels::{integrate, steer};
use shoal::prelude::*;
use shoal::shaders::{integrate_wgsl, steer_wgsl};
use shoal::spawn::seed_store;

fn bench_steer_single(c: &mut Criterion) {
    let mut group = c.benchmark_group("steer_single_agent");

    for count in [64u32, 512, 4096] {
        let params = FlockParams::new()
            .with_agent_count(count)
            .with_seed(1)
            .with_target(Vec3::Y);
        let store = seed_store(&params);
        let uniforms = params.to_uniforms();

        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| black_box(steer(0, store.as_slice(), &uniforms)))
        });
    }

    group.finish();
}

fn bench_integrate(c: &mut Criterion) {
    let params = FlockParams::new();
    let uniforms = params.to_uniforms();
    let agent = shoal::Agent::new(Vec3::ONE, Vec3::new(0.0, 0.0, 1.0));

    c.bench_function("integrate", |b| {
        b.iter(|| black_box(integrate(agent, Vec3::new(3.0, -1.0, 0.5), &uniforms)))
    });
}

fn bench_cpu_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_tick");
    group.sample_size(20);

    for count in [256u32, 1024, 4096] {
        let params = FlockParams::new().with_agent_count(count).with_seed(2);
        let Ok(mut flock) = FlockController::cpu(params) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| flock.tick(black_box(1.0 / 60.0)))
        });
    }

    group.finish();
}

fn bench_shader_gen(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_gen");

    group.bench_function("steer_wgsl", |b| b.iter(|| black_box(steer_wgsl(black_box(256)))));
    group.bench_function("integrate_wgsl", |b| {
        b.iter(|| black_box(integrate_wgsl(black_box(256))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_steer_single,
    bench_integrate,
    bench_cpu_tick,
    bench_shader_gen,
);
criterion_main!(benches);
