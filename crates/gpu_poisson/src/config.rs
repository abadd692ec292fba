//! Sampler and device configuration.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Smallest number of darts thrown per pass, however few empty cells remain.
pub const MIN_DART_BATCH: usize = 1024;

/// Iteration cap applied when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Lower clamp for importance values; bounds the local radius at `4 * dart_radius`.
pub const DEFAULT_IMPORTANCE_FLOOR: f32 = 1.0 / 16.0;

/// Seed used for the per-pass device seeds when none is configured.
pub const DEFAULT_SEED: u64 = 0x5EED_D157;

/// Configuration for a [`crate::sampler::PoissonDiskSampler`].
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// Minimum distance between accepted samples, in cells.
    pub dart_radius: f32,
    /// Hint for how many darts to throw per pass. Floored at [`MIN_DART_BATCH`].
    pub target_dart_count: usize,
    /// Hard cap on Throw/Resolve/Census passes.
    pub max_iterations: usize,
    /// Overrides the derived result buffer capacity.
    pub result_capacity: Option<usize>,
    /// Seed for the host RNG that feeds each pass.
    pub seed: Option<u64>,
    /// Importance values are clamped to `[importance_floor, 1]`.
    pub importance_floor: f32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            dart_radius: 0.0,
            target_dart_count: MIN_DART_BATCH,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            result_capacity: None,
            seed: None,
            importance_floor: DEFAULT_IMPORTANCE_FLOOR,
        }
    }
}

impl SamplerConfig {
    /// Creates a new [`SamplerConfig`] for a `width` x `height` grid.
    pub fn new(width: u32, height: u32, dart_radius: f32) -> Self {
        Self {
            width,
            height,
            dart_radius,
            ..Default::default()
        }
    }

    /// Sets the per-pass dart count hint.
    pub fn with_target_dart_count(mut self, target_dart_count: usize) -> Self {
        self.target_dart_count = target_dart_count;
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Overrides the result buffer capacity.
    pub fn with_result_capacity(mut self, capacity: usize) -> Self {
        self.result_capacity = Some(capacity);
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the importance floor.
    pub fn with_importance_floor(mut self, importance_floor: f32) -> Self {
        self.importance_floor = importance_floor;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig("width and height must be > 0".into()));
        }
        if !self.dart_radius.is_finite() || self.dart_radius <= 0.0 {
            return Err(Error::InvalidConfig("dart_radius must be finite and > 0".into()));
        }
        if self.target_dart_count == 0 {
            return Err(Error::InvalidConfig("target_dart_count must be > 0".into()));
        }
        if self.max_iterations == 0 {
            return Err(Error::InvalidConfig("max_iterations must be > 0".into()));
        }
        if self.result_capacity == Some(0) {
            return Err(Error::InvalidConfig("result_capacity must be > 0 when set".into()));
        }
        if !(self.importance_floor > 0.0 && self.importance_floor <= 1.0) {
            return Err(Error::InvalidConfig("importance_floor must be in (0, 1]".into()));
        }

        Ok(())
    }
}

/// Adapter selection preferences for [`crate::gpu::GpuContext`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuOptions {
    /// Prefer a discrete GPU over an integrated one.
    pub high_performance: bool,
    /// Accept a software adapter when no hardware adapter is available.
    pub allow_software_fallback: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            high_performance: true,
            allow_software_fallback: true,
        }
    }
}

impl GpuOptions {
    /// Only accept hardware adapters.
    pub fn hardware_only() -> Self {
        Self {
            allow_software_fallback: false,
            ..Default::default()
        }
    }

    pub fn power_preference(&self) -> wgpu::PowerPreference {
        if self.high_performance {
            wgpu::PowerPreference::HighPerformance
        } else {
            wgpu::PowerPreference::LowPower
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let config = SamplerConfig::new(64, 32, 4.0);
        assert_eq!(config.target_dart_count, MIN_DART_BATCH);
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.result_capacity, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_fields() {
        let cases = [
            SamplerConfig::new(0, 8, 1.0),
            SamplerConfig::new(8, 0, 1.0),
            SamplerConfig::new(8, 8, 0.0),
            SamplerConfig::new(8, 8, -2.0),
            SamplerConfig::new(8, 8, f32::NAN),
            SamplerConfig::new(8, 8, 1.0).with_target_dart_count(0),
            SamplerConfig::new(8, 8, 1.0).with_max_iterations(0),
            SamplerConfig::new(8, 8, 1.0).with_result_capacity(0),
            SamplerConfig::new(8, 8, 1.0).with_importance_floor(0.0),
            SamplerConfig::new(8, 8, 1.0).with_importance_floor(1.5),
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(
                matches!(err, Error::InvalidConfig(_)),
                "expected InvalidConfig for {config:?}"
            );
        }
    }

    #[test]
    fn builder_setters_chain() {
        let config = SamplerConfig::new(16, 16, 2.0)
            .with_target_dart_count(4096)
            .with_max_iterations(10)
            .with_result_capacity(5)
            .with_seed(9)
            .with_importance_floor(0.25);
        assert_eq!(config.target_dart_count, 4096);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.result_capacity, Some(5));
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.importance_floor, 0.25);
    }

    #[test]
    fn gpu_options_map_power_preference() {
        assert_eq!(
            GpuOptions::default().power_preference(),
            wgpu::PowerPreference::HighPerformance
        );
        let low = GpuOptions {
            high_performance: false,
            ..Default::default()
        };
        assert_eq!(low.power_preference(), wgpu::PowerPreference::LowPower);
        assert!(!GpuOptions::hardware_only().allow_software_fallback);
    }
}
