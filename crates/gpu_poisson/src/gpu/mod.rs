//! Device access and the compute kernels that run a sampling pass.
//!
//! - [`GpuContext`] owns the wgpu device and queue.
//! - [`kernels`] holds the WGSL module and the host mirror of its uniform block.
//! - [`SamplerResources`] owns the per-sampler buffers and pipelines.
pub mod context;
pub mod kernels;
pub mod resources;

pub use context::{AdapterInfo, GpuContext};
pub use kernels::{Counters, Kernel, SamplerParams};
pub use resources::SamplerResources;
