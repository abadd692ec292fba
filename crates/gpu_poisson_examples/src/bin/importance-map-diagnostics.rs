use std::path::PathBuf;

use glam::Vec2;
use gpu_poisson::prelude::*;
use gpu_poisson_examples::{
    init_tracing, load_png_importance, output_dir, render_points_png, save_raster_png,
    write_points_file,
};
use tracing::info;

const SIDE: u32 = 512;
const RADIUS: f32 = 2.0;

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Optional PNG path as first argument; otherwise a radial falloff.
    let png: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);

    let ctx = GpuContext::new()?;
    let config = SamplerConfig::new(SIDE, SIDE, RADIUS).with_target_dart_count(16_384);
    let mut sampler = PoissonDiskSampler::new(config)?;

    match &png {
        Some(path) => {
            let grid = load_png_importance(path, Channel::Luma)?;
            sampler.set_importance_map(&grid)?;
        }
        None => {
            let radial = FnImportance::new(|uv: Vec2| {
                let d = uv.distance(Vec2::splat(0.5)) * 2.0;
                (1.0 - d).clamp(0.0, 1.0)
            });
            sampler.set_importance_map(&radial)?;
        }
    }

    sampler.init(&ctx)?;
    let mut events = VecSink::new();
    let report = sampler.run_with_events(&mut events)?;
    let samples = sampler.collect_samples()?;
    info!(
        outcome = ?report.outcome,
        iterations = report.iterations,
        points = samples.len(),
        "importance-weighted run finished"
    );

    let dir = output_dir("importance-map-diagnostics")?;
    let snapshot = sampler.coverage_snapshot()?;
    save_raster_png(&snapshot.coverage_depth(), dir.join("coverage_depth.png"))?;
    save_raster_png(
        &snapshot.acceptance_priority(),
        dir.join("acceptance_priority.png"),
    )?;
    render_points_png(&samples.points, SIDE, SIDE, 2, dir.join("points.png"))?;
    write_points_file(&samples.points, dir.join("points.bin"))?;

    for step in events.iterations() {
        info!(
            iteration = step.iteration,
            darts = step.darts,
            accepted = step.accepted,
            empty_cells = step.empty_cells,
            "pass"
        );
    }

    sampler.teardown();
    Ok(())
}
