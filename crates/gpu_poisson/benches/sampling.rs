mod common;

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use gpu_poisson::prelude::*;

const SIDES: [u32; 3] = [256, 512, 1024];
const RADII: [f32; 3] = [8.0, 4.0, 2.0];

fn sampler_for(ctx: &GpuContext, side: u32, radius: f32) -> Option<PoissonDiskSampler> {
    let area = side as f64 * side as f64;
    let hint = (expected_sample_count(area, radius as f64) / 2).max(MIN_DART_BATCH);
    let config = SamplerConfig::new(side, side, radius)
        .with_target_dart_count(hint)
        .with_seed(0xC0FFEE ^ side as u64);
    let mut sampler = PoissonDiskSampler::new(config).ok()?;
    sampler.init(ctx).ok()?;
    Some(sampler)
}

fn sampling_run_benches(c: &mut Criterion) {
    let Some(ctx) = common::gpu() else { return };

    for &radius in &RADII {
        let mut group = c.benchmark_group(format!("sampler/run/radius_{radius:.1}"));

        for &side in &SIDES {
            let Some(mut sampler) = sampler_for(&ctx, side, radius) else {
                continue;
            };
            let expected = sampler.domain().expected_sample_count();
            group.throughput(common::elements_throughput(expected));

            group.bench_with_input(BenchmarkId::from_parameter(side), &side, |b, _| {
                b.iter(|| {
                    sampler.reset().ok();
                    let report = sampler.run().ok();
                    black_box(report.map(|r| r.accepted));
                });
            });
            sampler.teardown();
        }

        group.finish();
    }
}

fn sampling_stage_benches(c: &mut Criterion) {
    let Some(ctx) = common::gpu() else { return };
    let Some(mut sampler) = sampler_for(&ctx, 1024, 4.0) else {
        return;
    };
    let mut group = c.benchmark_group("sampler/stages_1024");

    group.bench_function("first_pass", |b| {
        b.iter(|| {
            sampler.reset().ok();
            black_box(sampler.step().ok());
        });
    });

    group.bench_function("census_after_reset", |b| {
        b.iter(|| {
            sampler.reset().ok();
            black_box(sampler.empty_cell_count());
        });
    });

    group.bench_function("collect_samples", |b| {
        sampler.reset().ok();
        sampler.run().ok();
        b.iter(|| black_box(sampler.collect_samples().map(|s| s.len()).ok()));
    });

    group.finish();
    sampler.teardown();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = sampling_run_benches, sampling_stage_benches
}
criterion_main!(benches);
