use std::time::Instant;

use gpu_poisson::prelude::*;
use gpu_poisson_examples::{init_tracing, output_dir, write_points_file};
use tracing::info;

const SIDE: u32 = 4096;
const RADIUS: f32 = 8.5;
const ROUNDS: usize = 5;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let ctx = GpuContext::new()?;
    info!(adapter = %ctx.adapter_info(), "benchmark device");

    let area = SIDE as f64 * SIDE as f64;
    let expected = expected_sample_count(area, RADIUS as f64);
    let config = SamplerConfig::new(SIDE, SIDE, RADIUS)
        .with_target_dart_count(expected / 2)
        .with_seed(2024);

    let mut sampler = PoissonDiskSampler::new(config)?;
    let bytes = sampler.init(&ctx)?;
    info!(
        expected,
        memory_mib = bytes as f64 / (1024.0 * 1024.0),
        "sampler ready"
    );

    let mut best = f64::INFINITY;
    let mut last = None;
    for round in 0..ROUNDS {
        sampler.reset()?;
        let start = Instant::now();
        let report = sampler.run()?;
        let samples = sampler.collect_samples()?;
        let secs = start.elapsed().as_secs_f64();
        best = best.min(secs);
        info!(
            round,
            outcome = ?report.outcome,
            iterations = report.iterations,
            points = samples.len(),
            seconds = secs,
            points_per_second = samples.len() as f64 / secs,
            "round finished"
        );
        last = Some(samples);
    }

    if let Some(samples) = last {
        info!(
            points = samples.len(),
            best_seconds = best,
            points_per_second = samples.len() as f64 / best,
            "best round"
        );
        let dir = output_dir("sampler-throughput-benchmark")?;
        write_points_file(&samples.points, dir.join("points.bin"))?;
    }

    sampler.teardown();
    Ok(())
}
