#![forbid(unsafe_code)]
//! gpu_poisson: Maximal Poisson-disk sampling by parallel dart throwing on the GPU.
//!
//! Modules:
//! - config / domain: sampler configuration, buffer sizing, dart budget
//! - importance: density fields that shrink or grow the local radius
//! - gpu: device acquisition, WGSL kernels, buffers and readback
//! - sampler: the Throw/Resolve/Census iteration controller and result accumulation
//! - events / diagnostics: run observers, coverage rasters, raw point export
//!
//! For a runnable driver, see the `gpu_poisson_examples` crate.
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod events;
pub mod gpu;
pub mod importance;
pub mod sampler;

/// Convenient re-exports for common types. Import with `use gpu_poisson::prelude::*;`.
pub mod prelude {
    pub use crate::config::{GpuOptions, SamplerConfig, MIN_DART_BATCH};
    pub use crate::diagnostics::{write_raw_points, CoverageSnapshot, Raster};
    pub use crate::domain::{expected_sample_count, radius_for_sample_count, SamplingDomain};
    pub use crate::error::{Error, Result};
    pub use crate::events::{EventSink, FnSink, MultiSink, SamplerEvent, VecSink};
    pub use crate::gpu::{AdapterInfo, GpuContext};
    pub use crate::importance::{Channel, FnImportance, ImportanceGrid, ImportanceMap};
    pub use crate::sampler::{
        dedup_exact, PoissonDiskSampler, RunOutcome, RunReport, SampleSet, SamplerState,
        StepReport,
    };
}
