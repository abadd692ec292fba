use gpu_poisson::prelude::*;
use gpu_poisson_examples::{init_tracing, output_dir, save_raster_png};
use tracing::info;

const SIDE: u32 = 256;
const RADIUS: f32 = 3.0;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let ctx = GpuContext::new()?;
    let mut sampler = PoissonDiskSampler::new(SamplerConfig::new(SIDE, SIDE, RADIUS).with_seed(5))?;
    sampler.init(&ctx)?;

    let dir = output_dir("coverage-progress-export")?;
    loop {
        let report = sampler.step()?;
        let snapshot = sampler.coverage_snapshot()?;
        let mut map = snapshot.empty_cell_map();
        let samples = sampler.collect_samples()?;
        map.plot_points(&samples.points, [0, 0, 0, 255]);
        save_raster_png(&map, dir.join(format!("pass_{:03}.png", report.iteration)))?;
        info!(
            iteration = report.iteration,
            empty_cells = report.empty_cells,
            accepted = report.accepted,
            "pass exported"
        );
        if report.state.is_terminal() {
            break;
        }
    }

    sampler.teardown();
    Ok(())
}
