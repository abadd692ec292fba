//! The GPU dart-throwing sampler and its iteration controller.
//!
//! A pass has three stages, each its own queue submission:
//! 1. [`PoissonDiskSampler::generate_darts`] draws candidates from uncovered cells.
//! 2. [`PoissonDiskSampler::resolve_conflicts`] commits a conflict-free subset.
//! 3. [`PoissonDiskSampler::collect_empty_cells`] recounts uncovered cells.
//!
//! [`PoissonDiskSampler::step`] runs one pass and [`PoissonDiskSampler::run`]
//! repeats passes until every cell is covered or the iteration cap is hit.
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::{SamplerConfig, DEFAULT_SEED};
use crate::diagnostics::CoverageSnapshot;
use crate::domain::SamplingDomain;
use crate::error::{Error, Result};
use crate::events::{EventSink, SamplerEvent};
use crate::gpu::{GpuContext, Kernel, SamplerParams, SamplerResources};
use crate::importance::{bake, ImportanceMap};

pub mod accumulator;
pub mod census;
pub mod generator;
pub mod resolver;
pub mod state;

pub use accumulator::{dedup_exact, SampleSet};
pub use state::{RunOutcome, SamplerState};

/// Counts observed at the end of one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepReport {
    /// 1-based pass index.
    pub iteration: usize,
    /// Darts issued this pass.
    pub darts: usize,
    /// Samples committed this pass.
    pub accepted: usize,
    /// Uncovered cells after the census.
    pub empty_cells: usize,
    /// State after the pass.
    pub state: SamplerState,
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Passes executed since the last reset.
    pub iterations: usize,
    /// Samples committed since the last reset.
    pub accepted: usize,
    /// Uncovered cells left; zero when converged.
    pub empty_cells: usize,
    /// Empty-cell count after each census, starting with the initial count.
    pub empty_history: Vec<usize>,
}

struct Device {
    ctx: GpuContext,
    resources: SamplerResources,
}

/// Maximal Poisson-disk sampler running on a wgpu device.
///
/// ```no_run
/// use gpu_poisson::prelude::*;
///
/// let ctx = GpuContext::new()?;
/// let mut sampler = PoissonDiskSampler::new(SamplerConfig::new(256, 256, 4.0))?;
/// sampler.init(&ctx)?;
/// let report = sampler.run()?;
/// let samples = sampler.collect_samples()?;
/// assert_eq!(report.accepted, samples.points.len());
/// sampler.teardown();
/// # Ok::<(), gpu_poisson::error::Error>(())
/// ```
pub struct PoissonDiskSampler {
    config: SamplerConfig,
    domain: SamplingDomain,
    device: Option<Device>,
    importance: Option<Vec<f32>>,
    rng: StdRng,
    state: SamplerState,
    iteration: usize,
    empty_cells: usize,
    accepted: usize,
    pass_darts: usize,
    pass_accepted: usize,
    empty_history: Vec<usize>,
}

impl PoissonDiskSampler {
    /// Validates `config`; no device memory is touched.
    pub fn new(config: SamplerConfig) -> Result<Self> {
        let domain = SamplingDomain::from_config(&config)?;
        let rng = StdRng::seed_from_u64(config.seed.unwrap_or(DEFAULT_SEED));
        Ok(Self {
            config,
            domain,
            device: None,
            importance: None,
            rng,
            state: SamplerState::Uninitialized,
            iteration: 0,
            empty_cells: 0,
            accepted: 0,
            pass_darts: 0,
            pass_accepted: 0,
            empty_history: Vec::new(),
        })
    }

    /// Allocates all device buffers and returns their total size in bytes.
    pub fn init(&mut self, ctx: &GpuContext) -> Result<u64> {
        self.init_with_events(ctx, &mut ())
    }

    pub fn init_with_events(
        &mut self,
        ctx: &GpuContext,
        events: &mut impl EventSink,
    ) -> Result<u64> {
        if self.device.is_some() {
            return Err(Error::InvalidState(
                "sampler is already initialized; call teardown first".into(),
            ));
        }

        let mut resources = SamplerResources::new(ctx, &self.domain)?;
        if let Some(values) = &self.importance {
            resources.upload_importance(ctx, Some(values.as_slice()))?;
        }
        let memory_bytes = resources.memory_bytes();
        self.device = Some(Device {
            ctx: ctx.clone(),
            resources,
        });
        self.reset()?;

        info!(
            width = self.domain.width(),
            height = self.domain.height(),
            dart_radius = self.domain.dart_radius(),
            result_capacity = self.domain.result_capacity(),
            memory_bytes,
            "sampler initialized"
        );
        events.send(SamplerEvent::Initialized {
            memory_bytes,
            result_capacity: self.domain.result_capacity(),
            cell_count: self.domain.cell_count(),
        });
        Ok(memory_bytes)
    }

    /// Rewinds to an empty coverage field without reallocating.
    ///
    /// Also clears the `Aborted` state and restores the dart budget and RNG.
    pub fn reset(&mut self) -> Result<()> {
        let params = self.params(0, 0, 0);
        let device = self.device()?;
        device.resources.clear_field(&device.ctx)?;
        device.resources.write_params(&device.ctx, &params);
        device
            .resources
            .dispatch(&device.ctx, Kernel::CollectEmptyCells, &params)?;
        let counters = device.resources.read_counters(&device.ctx)?;

        self.domain.reset_budget();
        self.rng = StdRng::seed_from_u64(self.config.seed.unwrap_or(DEFAULT_SEED));
        self.iteration = 0;
        self.accepted = 0;
        self.pass_darts = 0;
        self.pass_accepted = 0;
        self.empty_cells = counters.empty_count as usize;
        self.empty_history.clear();
        self.empty_history.push(self.empty_cells);
        self.state = SamplerState::Initialized;
        debug!(empty_cells = self.empty_cells, "sampler reset");
        Ok(())
    }

    /// Runs one Throw/Resolve/Census pass.
    ///
    /// A pass started through the stage methods is finished instead. In a
    /// `Converged` or `Exhausted` state nothing is dispatched.
    pub fn step(&mut self) -> Result<StepReport> {
        match self.state {
            SamplerState::Uninitialized => {
                return Err(Error::InvalidState("init has not been called".into()));
            }
            SamplerState::Aborted => {
                return Err(Error::InvalidState(
                    "sampler aborted after a capacity error; call reset".into(),
                ));
            }
            SamplerState::Converged | SamplerState::Exhausted => return Ok(self.report()),
            SamplerState::Initialized | SamplerState::Throwing => {
                let batch = self.domain.next_batch(self.empty_cells);
                self.issue_darts(batch)?;
                self.resolve_conflicts()?;
                self.collect_empty_cells()?;
            }
            SamplerState::Resolving => {
                self.resolve_conflicts()?;
                self.collect_empty_cells()?;
            }
            SamplerState::Censusing => {
                self.collect_empty_cells()?;
            }
        }

        let report = self.report();
        debug!(
            iteration = report.iteration,
            darts = report.darts,
            accepted = report.accepted,
            empty_cells = report.empty_cells,
            "pass finished"
        );
        Ok(report)
    }

    /// Steps until the sampler converges or exhausts its iteration cap.
    pub fn run(&mut self) -> Result<RunReport> {
        self.run_with_events(&mut ())
    }

    pub fn run_with_events(&mut self, events: &mut impl EventSink) -> Result<RunReport> {
        let outcome = loop {
            if let Some(outcome) = self.state.outcome() {
                break outcome;
            }
            let report = self.step()?;
            events.send(SamplerEvent::IterationFinished(report));
        };

        match outcome {
            RunOutcome::Converged => info!(
                iterations = self.iteration,
                samples = self.accepted,
                "sampling converged"
            ),
            RunOutcome::Exhausted => {
                warn!(
                    iterations = self.iteration,
                    empty_cells = self.empty_cells,
                    "iteration cap reached before convergence"
                );
                events.send(SamplerEvent::Warning {
                    context: "run".into(),
                    message: format!(
                        "{} cells uncovered after {} iterations",
                        self.empty_cells, self.iteration
                    ),
                });
            }
        }

        events.send(SamplerEvent::RunFinished {
            outcome,
            iterations: self.iteration,
            accepted: self.accepted,
            empty_cells: self.empty_cells,
        });

        Ok(RunReport {
            outcome,
            iterations: self.iteration,
            accepted: self.accepted,
            empty_cells: self.empty_cells,
            empty_history: self.empty_history.clone(),
        })
    }

    /// Releases all device buffers. Further calls are no-ops.
    pub fn teardown(&mut self) {
        if let Some(device) = self.device.take() {
            device.resources.destroy();
            debug!("sampler resources released");
        }
        self.state = SamplerState::Uninitialized;
    }

    /// Biases density with `map`, sampled once per cell centre.
    ///
    /// Takes effect from the next dart batch.
    pub fn set_importance_map(&mut self, map: &dyn ImportanceMap) -> Result<()> {
        let values = bake(map, self.domain.width(), self.domain.height());
        if let Some(device) = self.device.as_mut() {
            device
                .resources
                .upload_importance(&device.ctx, Some(values.as_slice()))?;
        }
        self.importance = Some(values);
        Ok(())
    }

    /// Returns to uniform density.
    pub fn clear_importance_map(&mut self) -> Result<()> {
        if let Some(device) = self.device.as_mut() {
            device.resources.upload_importance(&device.ctx, None)?;
        }
        self.importance = None;
        Ok(())
    }

    pub fn has_importance_map(&self) -> bool {
        self.importance.is_some()
    }

    /// Downloads the coverage field and the last empty-cell list.
    pub fn coverage_snapshot(&self) -> Result<CoverageSnapshot> {
        let device = self.device()?;
        let (priorities, covered_at) = device.resources.read_cells(&device.ctx)?;
        let empty_cells = device
            .resources
            .read_empty_cells(&device.ctx, self.empty_cells)?;
        Ok(CoverageSnapshot {
            width: self.domain.width(),
            height: self.domain.height(),
            priorities,
            covered_at,
            empty_cells,
        })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn domain(&self) -> &SamplingDomain {
        &self.domain
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Passes started since the last reset.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Uncovered cells found by the last census.
    pub fn empty_cell_count(&self) -> usize {
        self.empty_cells
    }

    /// Samples committed since the last reset.
    pub fn accepted_count(&self) -> usize {
        self.accepted
    }

    /// Empty-cell count after each census since the last reset.
    pub fn empty_history(&self) -> &[usize] {
        &self.empty_history
    }

    /// Device bytes held, or `None` before `init`.
    pub fn memory_bytes(&self) -> Option<u64> {
        self.device.as_ref().map(|d| d.resources.memory_bytes())
    }

    fn device(&self) -> Result<&Device> {
        self.device
            .as_ref()
            .ok_or_else(|| Error::InvalidState("init has not been called".into()))
    }

    fn params(&self, dart_count: usize, pass_index: usize, seed: u32) -> SamplerParams {
        SamplerParams {
            width: self.domain.width(),
            height: self.domain.height(),
            dart_count: dart_count as u32,
            pass_index: pass_index as u32,
            dart_radius: self.domain.dart_radius(),
            importance_floor: self.config.importance_floor,
            seed,
            capacity: self.domain.result_capacity() as u32,
            has_importance: self.importance.is_some() as u32,
            ..Default::default()
        }
    }

    fn report(&self) -> StepReport {
        StepReport {
            iteration: self.iteration,
            darts: self.pass_darts,
            accepted: self.pass_accepted,
            empty_cells: self.empty_cells,
            state: self.state,
        }
    }

    fn expect_state(&self, expected: SamplerState, stage: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::InvalidState(format!(
                "{stage} requires state {expected}, sampler is {}",
                self.state
            )));
        }
        Ok(())
    }
}

impl Drop for PoissonDiskSampler {
    fn drop(&mut self) {
        self.teardown();
    }
}
