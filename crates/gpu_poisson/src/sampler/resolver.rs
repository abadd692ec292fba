//! Conflict resolution: commits the conflict-free subset of a dart batch.
use tracing::{debug, error};

use super::{PoissonDiskSampler, SamplerState};
use crate::error::{Error, Result};
use crate::gpu::{Counters, Kernel};

/// Fails with [`Error::Capacity`] when any winner of the pass found the
/// result buffer full.
pub fn check_capacity(counters: &Counters, capacity: usize) -> Result<()> {
    if counters.overflow > 0 {
        return Err(Error::Capacity {
            capacity,
            required: counters.cursor as usize,
        });
    }
    Ok(())
}

impl PoissonDiskSampler {
    /// Resolves the issued batch and returns the number of samples committed.
    ///
    /// Every winner is at least its local radius away from every other
    /// committed sample. On overflow the sampler enters
    /// [`SamplerState::Aborted`] and returns [`Error::Capacity`].
    pub fn resolve_conflicts(&mut self) -> Result<usize> {
        self.device()?;
        self.expect_state(SamplerState::Resolving, "resolve_conflicts")?;

        let params = self.params(self.pass_darts, self.iteration, 0);
        let device = self.device()?;
        device
            .resources
            .dispatch(&device.ctx, Kernel::ThrowDarts, &params)?;
        device
            .resources
            .dispatch(&device.ctx, Kernel::ResolveConflicts, &params)?;
        let counters = device.resources.read_counters(&device.ctx)?;

        if let Err(err) = check_capacity(&counters, self.domain.result_capacity()) {
            error!(
                iteration = self.iteration,
                capacity = self.domain.result_capacity(),
                required = counters.cursor,
                "result buffer overflow"
            );
            self.state = SamplerState::Aborted;
            return Err(err);
        }

        let committed = counters.accepted as usize;
        self.pass_accepted = committed.saturating_sub(self.accepted);
        self.accepted = committed;
        self.state = SamplerState::Censusing;
        debug!(
            iteration = self.iteration,
            accepted = self.pass_accepted,
            total = self.accepted,
            "conflicts resolved"
        );
        Ok(self.pass_accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overflow_passes() {
        let counters = Counters {
            empty_count: 10,
            accepted: 4,
            overflow: 0,
            cursor: 4,
        };
        assert!(check_capacity(&counters, 4).is_ok());
    }

    #[test]
    fn overflow_reports_required_count() {
        let counters = Counters {
            empty_count: 10,
            accepted: 1,
            overflow: 36,
            cursor: 37,
        };
        match check_capacity(&counters, 1) {
            Err(Error::Capacity { capacity, required }) => {
                assert_eq!(capacity, 1);
                assert_eq!(required, 37);
            }
            other => panic!("expected capacity error, got {other:?}"),
        }
    }
}
