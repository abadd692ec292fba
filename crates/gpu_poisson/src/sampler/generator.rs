//! Dart generation: candidate positions drawn from uncovered cells.
use rand::Rng;
use tracing::trace;

use super::{PoissonDiskSampler, SamplerState};
use crate::domain::batch_size;
use crate::error::{Error, Result};
use crate::gpu::Kernel;

/// Number of darts actually issued for a request of `requested`.
///
/// Clamped to the remaining empty cells, floored at [`crate::config::MIN_DART_BATCH`], and
/// capped by the candidate buffer. A request of zero issues nothing.
pub fn darts_to_issue(
    requested: usize,
    remaining_empty_cells: usize,
    candidate_capacity: usize,
) -> usize {
    if requested == 0 {
        return 0;
    }
    batch_size(requested, remaining_empty_cells).min(candidate_capacity)
}

/// Folds a 64-bit RNG draw into the 32-bit seed the kernels hash with.
pub fn pass_seed(draw: u64) -> u32 {
    (draw ^ (draw >> 32)) as u32
}

impl PoissonDiskSampler {
    /// Issues a batch of up to `n` candidate darts and returns how many were
    /// issued.
    ///
    /// Starts a new pass; follow with [`Self::resolve_conflicts`]. `n = 0` is a
    /// no-op and leaves the state unchanged.
    pub fn generate_darts(&mut self, n: usize) -> Result<usize> {
        self.device()?;
        self.expect_darts_allowed()?;
        if n == 0 {
            return Ok(0);
        }
        self.issue_darts(n)
    }

    pub(super) fn issue_darts(&mut self, n: usize) -> Result<usize> {
        let darts = darts_to_issue(n, self.empty_cells, self.domain.candidate_capacity());
        if darts == 0 {
            return Ok(0);
        }

        self.state = SamplerState::Throwing;
        self.iteration += 1;
        let seed = pass_seed(self.rng.next_u64());
        let params = self.params(darts, self.iteration, seed);
        let device = self.device()?;
        device.resources.write_params(&device.ctx, &params);
        device
            .resources
            .dispatch(&device.ctx, Kernel::GenerateDarts, &params)?;

        trace!(iteration = self.iteration, darts, seed, "darts generated");
        self.pass_darts = darts;
        self.pass_accepted = 0;
        self.state = SamplerState::Resolving;
        Ok(darts)
    }

    fn expect_darts_allowed(&self) -> Result<()> {
        if self.state.accepts_darts() {
            return Ok(());
        }
        Err(Error::InvalidState(format!(
            "generate_darts requires state {} or {}, sampler is {}",
            SamplerState::Initialized,
            SamplerState::Throwing,
            self.state
        )))
    }
}
