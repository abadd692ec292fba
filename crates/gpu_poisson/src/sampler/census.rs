//! Empty-cell census: recounts and compacts the uncovered cells.
use tracing::warn;

use super::state::after_census;
use super::{PoissonDiskSampler, SamplerState};
use crate::error::Result;
use crate::gpu::Kernel;

impl PoissonDiskSampler {
    /// Counts uncovered cells, refreshes the list darts are drawn from, and
    /// decides whether the run continues.
    pub fn collect_empty_cells(&mut self) -> Result<usize> {
        self.device()?;
        self.expect_state(SamplerState::Censusing, "collect_empty_cells")?;

        let params = self.params(self.pass_darts, self.iteration, 0);
        let device = self.device()?;
        device
            .resources
            .dispatch(&device.ctx, Kernel::CollectEmptyCells, &params)?;
        let counters = device.resources.read_counters(&device.ctx)?;
        let empty = counters.empty_count as usize;

        if empty > self.empty_cells {
            warn!(
                before = self.empty_cells,
                after = empty,
                "empty-cell count grew between passes"
            );
        }
        self.empty_cells = empty;
        self.empty_history.push(empty);
        self.state = after_census(empty, self.iteration, self.config.max_iterations);
        Ok(empty)
    }
}

/// Whether `history` never increases.
pub fn is_non_increasing(history: &[usize]) -> bool {
    history.windows(2).all(|w| w[1] <= w[0])
}
