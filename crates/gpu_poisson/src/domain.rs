//! Sampling domain state: grid size, dart radius, dart budget, and buffer sizing.
//!
//! [`SamplingDomain`] is derived from a validated [`SamplerConfig`] and owns the
//! only mutable piece of host-side sizing state, the dart budget.
use crate::config::{SamplerConfig, MIN_DART_BATCH};
use crate::error::Result;

/// Ratio between the radius of a maximal Poisson-disk set and that of a
/// hexagonal packing with the same point count.
pub const MAXIMAL_POISSON_RADIUS_RATIO: f64 = 0.7766;

/// Headroom applied to the packing bound when sizing the result buffer.
pub const RESULT_CAPACITY_HEADROOM: f64 = 1.2;

/// Grid dimensions, radius, and the dart budget of a sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingDomain {
    width: u32,
    height: u32,
    dart_radius: f32,
    target_dart_count: usize,
    dart_budget: usize,
    result_capacity: usize,
}

impl SamplingDomain {
    /// Validates `config` and derives the domain from it.
    pub fn from_config(config: &SamplerConfig) -> Result<Self> {
        config.validate()?;
        let result_capacity = config.result_capacity.unwrap_or_else(|| {
            packing_capacity(config.width, config.height, config.dart_radius)
        });

        Ok(Self {
            width: config.width,
            height: config.height,
            dart_radius: config.dart_radius,
            target_dart_count: config.target_dart_count,
            dart_budget: config.target_dart_count,
            result_capacity,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dart_radius(&self) -> f32 {
        self.dart_radius
    }

    pub fn target_dart_count(&self) -> usize {
        self.target_dart_count
    }

    /// Current dart budget, before the next pass clamps it.
    pub fn dart_budget(&self) -> usize {
        self.dart_budget
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Number of accepted samples the result buffer can hold.
    pub fn result_capacity(&self) -> usize {
        self.result_capacity
    }

    /// Largest batch the candidate buffer must hold.
    pub fn candidate_capacity(&self) -> usize {
        self.target_dart_count.max(MIN_DART_BATCH)
    }

    /// Expected sample count of a maximal set over this domain.
    pub fn expected_sample_count(&self) -> usize {
        expected_sample_count(
            self.width as f64 * self.height as f64,
            self.dart_radius as f64,
        )
    }

    /// Clamps the budget against the remaining empty cells and returns the
    /// batch size for the next pass.
    ///
    /// The budget only shrinks while sampling; it never drops below
    /// [`MIN_DART_BATCH`] so late passes keep the pipeline busy.
    pub fn next_batch(&mut self, remaining_empty_cells: usize) -> usize {
        self.dart_budget = batch_size(self.dart_budget, remaining_empty_cells);
        self.dart_budget
    }

    /// Restores the budget to the configured hint.
    pub fn reset_budget(&mut self) {
        self.dart_budget = self.target_dart_count;
    }
}

/// Clamp `requested` to the remaining empty cells, then raise it to the batch floor.
pub fn batch_size(requested: usize, remaining_empty_cells: usize) -> usize {
    requested.min(remaining_empty_cells).max(MIN_DART_BATCH)
}

/// Upper bound on samples with pairwise distance `>= radius` in a
/// `width` x `height` domain, with 20% headroom.
///
/// Every sample owns a disk of radius `radius / 2` inside the domain grown by
/// `radius / 2` on each side; hexagonal packing bounds how many fit.
pub fn packing_capacity(width: u32, height: u32, radius: f32) -> usize {
    let r = radius as f64;
    let grown_area = (width as f64 + r) * (height as f64 + r);
    let hex_bound = 2.0 * grown_area / (3f64.sqrt() * r * r);
    ((hex_bound * RESULT_CAPACITY_HEADROOM).floor() as usize).max(1)
}

/// Expected point count of a maximal Poisson-disk set with `radius` over `area`.
pub fn expected_sample_count(area: f64, radius: f64) -> usize {
    if radius <= 0.0 {
        return 0;
    }
    let hex_radius = radius / MAXIMAL_POISSON_RADIUS_RATIO;
    (2.0 * area / (3f64.sqrt() * hex_radius * hex_radius)) as usize
}

/// Radius that yields roughly `count` points in a maximal set over `area`.
pub fn radius_for_sample_count(area: f64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    MAXIMAL_POISSON_RADIUS_RATIO * (2.0 * area / (3f64.sqrt() * count as f64)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn from_config_rejects_invalid_config() {
        let err = SamplingDomain::from_config(&SamplerConfig::new(0, 4, 1.0)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn capacity_override_wins() {
        let config = SamplerConfig::new(64, 64, 4.0).with_result_capacity(1);
        let domain = SamplingDomain::from_config(&config).unwrap();
        assert_eq!(domain.result_capacity(), 1);
    }

    #[test]
    fn derived_capacity_exceeds_expected_count() {
        let domain = SamplingDomain::from_config(&SamplerConfig::new(64, 64, 4.0)).unwrap();
        assert!(domain.result_capacity() > domain.expected_sample_count());
        assert_eq!(domain.cell_count(), 4096);
    }

    #[test]
    fn packing_capacity_is_at_least_one() {
        assert_eq!(packing_capacity(8, 8, 1000.0), 1);
        assert!(packing_capacity(4096, 4096, 8.5) > 200_000);
    }

    #[test]
    fn batch_size_clamps_then_floors() {
        assert_eq!(batch_size(4096, 10_000), 4096);
        assert_eq!(batch_size(4096, 2000), 2000);
        assert_eq!(batch_size(4096, 3), MIN_DART_BATCH);
        assert_eq!(batch_size(10, 10_000), MIN_DART_BATCH);
    }

    #[test]
    fn budget_decays_and_resets() {
        let config = SamplerConfig::new(128, 128, 2.0).with_target_dart_count(8000);
        let mut domain = SamplingDomain::from_config(&config).unwrap();
        assert_eq!(domain.candidate_capacity(), 8000);
        assert_eq!(domain.next_batch(16_384), 8000);
        assert_eq!(domain.next_batch(3000), 3000);
        // The budget does not grow back while sampling.
        assert_eq!(domain.next_batch(16_384), 3000);
        assert_eq!(domain.next_batch(12), MIN_DART_BATCH);
        domain.reset_budget();
        assert_eq!(domain.dart_budget(), 8000);
    }

    #[test]
    fn small_hint_uses_batch_floor_for_candidate_capacity() {
        let config = SamplerConfig::new(16, 16, 2.0).with_target_dart_count(7);
        let domain = SamplingDomain::from_config(&config).unwrap();
        assert_eq!(domain.candidate_capacity(), MIN_DART_BATCH);
    }

    #[test]
    fn radius_and_count_are_inverse() {
        let area = 4096.0 * 4096.0;
        let r = 8.5;
        let n = expected_sample_count(area, r);
        let back = radius_for_sample_count(area, n);
        assert!((back - r).abs() < 1e-3, "{back} vs {r}");
        assert_eq!(expected_sample_count(area, 0.0), 0);
        assert_eq!(radius_for_sample_count(area, 0), 0.0);
    }
}
