//! Iteration controller states and transitions.
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`super::PoissonDiskSampler`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SamplerState {
    /// No device resources are held: before `init` or after `teardown`.
    Uninitialized,
    /// Buffers are allocated and the coverage field is empty.
    Initialized,
    /// Waiting for the next dart batch.
    Throwing,
    /// Darts are issued; conflicts are unresolved.
    Resolving,
    /// Winners are committed; the empty-cell list is stale.
    Censusing,
    /// Every cell is covered.
    Converged,
    /// The iteration cap was reached with cells still uncovered.
    Exhausted,
    /// The result buffer overflowed. Only `reset` leaves this state.
    Aborted,
}

impl SamplerState {
    /// `Converged`, `Exhausted` and `Aborted` end a run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SamplerState::Converged | SamplerState::Exhausted | SamplerState::Aborted
        )
    }

    /// The successful outcome this state represents, if any.
    pub fn outcome(self) -> Option<RunOutcome> {
        match self {
            SamplerState::Converged => Some(RunOutcome::Converged),
            SamplerState::Exhausted => Some(RunOutcome::Exhausted),
            _ => None,
        }
    }

    /// Whether a new dart batch may be issued.
    pub fn accepts_darts(self) -> bool {
        matches!(self, SamplerState::Initialized | SamplerState::Throwing)
    }
}

impl fmt::Display for SamplerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a run ended.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RunOutcome {
    /// Every cell is covered; the sample set is maximal.
    Converged,
    /// The iteration cap was hit first; the sample set is valid but partial.
    Exhausted,
}

/// State after a census found `empty_cells` uncovered cells at the end of
/// pass `iteration`.
pub fn after_census(empty_cells: usize, iteration: usize, max_iterations: usize) -> SamplerState {
    if empty_cells == 0 {
        SamplerState::Converged
    } else if iteration >= max_iterations {
        SamplerState::Exhausted
    } else {
        SamplerState::Throwing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn census_transitions() {
        assert_eq!(after_census(0, 1, 200), SamplerState::Converged);
        assert_eq!(after_census(0, 200, 200), SamplerState::Converged);
        assert_eq!(after_census(5, 200, 200), SamplerState::Exhausted);
        assert_eq!(after_census(5, 3, 200), SamplerState::Throwing);
    }

    #[test]
    fn terminal_states_and_outcomes() {
        assert!(SamplerState::Aborted.is_terminal());
        assert!(!SamplerState::Censusing.is_terminal());
        assert_eq!(SamplerState::Aborted.outcome(), None);
        assert_eq!(
            SamplerState::Exhausted.outcome(),
            Some(RunOutcome::Exhausted)
        );
    }

    #[test]
    fn only_idle_states_accept_darts() {
        assert!(SamplerState::Initialized.accepts_darts());
        assert!(SamplerState::Throwing.accepts_darts());
        assert!(!SamplerState::Resolving.accepts_darts());
        assert!(!SamplerState::Uninitialized.accepts_darts());
        assert_eq!(SamplerState::Censusing.to_string(), "Censusing");
    }
}
