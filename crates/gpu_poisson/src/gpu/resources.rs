//! Device buffers, pipelines, and readback for one sampler.
use std::sync::mpsc;

use bytemuck::Pod;
use tracing::{debug, trace};

use super::context::GpuContext;
use super::kernels::{
    cell_dispatch, linear_dispatch, Counters, Kernel, SamplerParams, CANDIDATE_BYTES,
    COUNTERS_BYTES, FIELD_BYTES_PER_CELL, POISSON_WGSL, SAMPLE_BYTES,
};
use crate::domain::SamplingDomain;
use crate::error::{Error, Result};

const STORAGE_RW: wgpu::BindingType = wgpu::BindingType::Buffer {
    ty: wgpu::BufferBindingType::Storage { read_only: false },
    has_dynamic_offset: false,
    min_binding_size: None,
};

/// Buffers and pipelines owned by a [`crate::sampler::PoissonDiskSampler`].
pub struct SamplerResources {
    params: wgpu::Buffer,
    cells: wgpu::Buffer,
    empty_cells: wgpu::Buffer,
    candidates: wgpu::Buffer,
    counters: wgpu::Buffer,
    results: wgpu::Buffer,
    importance: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    pipelines: [wgpu::ComputePipeline; 4],
    cell_count: usize,
    result_capacity: usize,
}

impl SamplerResources {
    /// Allocate every buffer and build the pipelines for `domain`.
    pub fn new(ctx: &GpuContext, domain: &SamplingDomain) -> Result<Self> {
        let cell_count = domain.cell_count();
        let result_capacity = domain.result_capacity();
        let sizes = [
            ("cells", cell_count as u64 * FIELD_BYTES_PER_CELL),
            ("empty_cells", cell_count as u64 * 4),
            ("candidates", domain.candidate_capacity() as u64 * CANDIDATE_BYTES),
            ("results", result_capacity as u64 * SAMPLE_BYTES),
        ];
        check_sizes(ctx.limits(), &sizes)?;

        let device = &ctx.device;
        let storage = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC;
        let buffer = |label: &str, size: u64, usage: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        };

        let (params, cells, empty_cells, candidates, counters, results, importance) = ctx
            .scoped("sampler buffers", |_| {
                (
                    buffer(
                        "sampler_params",
                        std::mem::size_of::<SamplerParams>() as u64,
                        wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    ),
                    buffer("cells", sizes[0].1, storage | wgpu::BufferUsages::COPY_DST),
                    buffer("empty_cells", sizes[1].1, storage),
                    buffer("candidates", sizes[2].1, storage),
                    buffer("counters", COUNTERS_BYTES, storage | wgpu::BufferUsages::COPY_DST),
                    buffer("results", sizes[3].1, storage),
                    importance_buffer(device, 1),
                )
            })?;

        let layout = ctx.scoped("bind_group_layout", |device| {
            let entry = |binding: u32, ty: wgpu::BindingType| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty,
                count: None,
            };
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("poisson_layout"),
                entries: &[
                    entry(
                        0,
                        wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                    ),
                    entry(1, STORAGE_RW),
                    entry(2, STORAGE_RW),
                    entry(3, STORAGE_RW),
                    entry(4, STORAGE_RW),
                    entry(5, STORAGE_RW),
                    entry(
                        6,
                        wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                    ),
                ],
            })
        })?;

        let module = ctx.scoped_pipeline("poisson.wgsl", |device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("poisson.wgsl"),
                source: wgpu::ShaderSource::Wgsl(POISSON_WGSL.into()),
            })
        })?;

        let pipeline_layout = ctx.scoped("pipeline_layout", |device| {
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("poisson_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            })
        })?;

        let build = |kernel: Kernel| {
            ctx.scoped_pipeline(kernel.entry_point(), |device| {
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.entry_point()),
                    layout: Some(&pipeline_layout),
                    module: &module,
                    entry_point: kernel.entry_point(),
                    compilation_options: Default::default(),
                })
            })
        };
        let pipelines = [
            build(Kernel::GenerateDarts)?,
            build(Kernel::ThrowDarts)?,
            build(Kernel::ResolveConflicts)?,
            build(Kernel::CollectEmptyCells)?,
        ];

        let bind_group = create_bind_group(
            ctx,
            &layout,
            [
                &params,
                &cells,
                &empty_cells,
                &candidates,
                &counters,
                &results,
                &importance,
            ],
        )?;

        let resources = Self {
            params,
            cells,
            empty_cells,
            candidates,
            counters,
            results,
            importance,
            layout,
            bind_group,
            pipelines,
            cell_count,
            result_capacity,
        };
        debug!(
            memory_bytes = resources.memory_bytes(),
            cell_count, result_capacity, "allocated sampler buffers"
        );
        Ok(resources)
    }

    /// Total bytes of device memory held by this sampler.
    pub fn memory_bytes(&self) -> u64 {
        [
            &self.params,
            &self.cells,
            &self.empty_cells,
            &self.candidates,
            &self.counters,
            &self.results,
            &self.importance,
        ]
        .iter()
        .map(|b| b.size())
        .sum()
    }

    pub fn result_capacity(&self) -> usize {
        self.result_capacity
    }

    /// Replace the importance buffer with `values`, or a one-element
    /// placeholder when `None`.
    pub fn upload_importance(&mut self, ctx: &GpuContext, values: Option<&[f32]>) -> Result<()> {
        let len = values.map_or(1, |v| v.len().max(1));
        let importance = ctx.scoped("importance", |device| {
            let buffer = importance_buffer(device, len);
            if let Some(values) = values {
                ctx.queue
                    .write_buffer(&buffer, 0, bytemuck::cast_slice(values));
            }
            buffer
        })?;
        let bind_group = create_bind_group(
            ctx,
            &self.layout,
            [
                &self.params,
                &self.cells,
                &self.empty_cells,
                &self.candidates,
                &self.counters,
                &self.results,
                &importance,
            ],
        )?;
        self.importance.destroy();
        self.importance = importance;
        self.bind_group = bind_group;
        Ok(())
    }

    pub fn write_params(&self, ctx: &GpuContext, params: &SamplerParams) {
        ctx.queue
            .write_buffer(&self.params, 0, bytemuck::bytes_of(params));
    }

    /// Zero the coverage field and all counters.
    pub fn clear_field(&self, ctx: &GpuContext) -> Result<()> {
        ctx.scoped("clear_field", |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear_field"),
            });
            encoder.clear_buffer(&self.cells, 0, None);
            encoder.clear_buffer(&self.counters, 0, None);
            ctx.submit_and_wait(encoder);
        })
    }

    /// Run one stage of a pass and wait for it to finish.
    ///
    /// Per-dart kernels are sized by `params.dart_count` and the census by the
    /// grid. The throw stage clears last pass's priorities and the census clears
    /// the empty-cell counter before dispatching.
    pub fn dispatch(&self, ctx: &GpuContext, kernel: Kernel, params: &SamplerParams) -> Result<()> {
        let max = ctx.limits().max_compute_workgroups_per_dimension;
        let (x, y) = match kernel {
            Kernel::CollectEmptyCells => cell_dispatch(params.width, params.height),
            _ => linear_dispatch(params.dart_count, max),
        };
        if x > max || y > max {
            return Err(Error::ResourceLimit(format!(
                "{} needs {x}x{y} workgroups",
                kernel.entry_point()
            )));
        }

        ctx.scoped(kernel.entry_point(), |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kernel.entry_point()),
            });
            match kernel {
                Kernel::ThrowDarts => {
                    encoder.clear_buffer(&self.cells, 0, Some(self.plane_bytes()))
                }
                Kernel::CollectEmptyCells => encoder.clear_buffer(&self.counters, 0, Some(4)),
                _ => {}
            }
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some(kernel.entry_point()),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipelines[kernel as usize]);
                pass.set_bind_group(0, &self.bind_group, &[]);
                pass.dispatch_workgroups(x, y, 1);
            }
            trace!(kernel = kernel.entry_point(), x, y, "dispatch");
            ctx.submit_and_wait(encoder);
        })
    }

    pub fn read_counters(&self, ctx: &GpuContext) -> Result<Counters> {
        let mut counters = read_buffer::<Counters>(ctx, &self.counters, 1)?;
        counters
            .pop()
            .ok_or_else(|| Error::Other("empty counter readback".into()))
    }

    /// First `count` accepted positions as `[x, y]` pairs.
    pub fn read_results(&self, ctx: &GpuContext, count: usize) -> Result<Vec<[f32; 2]>> {
        read_buffer(ctx, &self.results, count.min(self.result_capacity))
    }

    /// The priority plane followed by the coverage plane.
    pub fn read_cells(&self, ctx: &GpuContext) -> Result<(Vec<u32>, Vec<u32>)> {
        let mut priorities = read_buffer::<u32>(ctx, &self.cells, 2 * self.cell_count)?;
        let covered_at = priorities.split_off(self.cell_count);
        Ok((priorities, covered_at))
    }

    /// Bytes of one plane of the coverage field.
    fn plane_bytes(&self) -> u64 {
        self.cell_count as u64 * 4
    }

    /// First `count` entries of the empty-cell list.
    pub fn read_empty_cells(&self, ctx: &GpuContext, count: usize) -> Result<Vec<u32>> {
        read_buffer(ctx, &self.empty_cells, count.min(self.cell_count))
    }

    /// Release device memory now instead of on drop.
    pub fn destroy(&self) {
        for buffer in [
            &self.params,
            &self.cells,
            &self.empty_cells,
            &self.candidates,
            &self.counters,
            &self.results,
            &self.importance,
        ] {
            buffer.destroy();
        }
    }
}

fn importance_buffer(device: &wgpu::Device, len: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("importance"),
        size: len as u64 * 4,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_bind_group(
    ctx: &GpuContext,
    layout: &wgpu::BindGroupLayout,
    buffers: [&wgpu::Buffer; 7],
) -> Result<wgpu::BindGroup> {
    let entries: Vec<wgpu::BindGroupEntry> = buffers
        .iter()
        .enumerate()
        .map(|(binding, buffer)| wgpu::BindGroupEntry {
            binding: binding as u32,
            resource: buffer.as_entire_binding(),
        })
        .collect();
    ctx.scoped("bind_group", |device| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("poisson_bind_group"),
            layout,
            entries: &entries,
        })
    })
}

fn check_sizes(limits: &wgpu::Limits, sizes: &[(&str, u64)]) -> Result<()> {
    for &(label, size) in sizes {
        if size > limits.max_storage_buffer_binding_size as u64 || size > limits.max_buffer_size {
            return Err(Error::ResourceLimit(format!(
                "{label} needs {size} bytes, device allows {}",
                (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size)
            )));
        }
    }
    Ok(())
}

/// Copy the first `count` elements of `src` into a staging buffer and map it.
fn read_buffer<T: Pod>(ctx: &GpuContext, src: &wgpu::Buffer, count: usize) -> Result<Vec<T>> {
    if count == 0 {
        return Ok(Vec::new());
    }
    let size = (count * std::mem::size_of::<T>()) as u64;
    let staging = ctx.scoped("readback", |device| {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback"),
        });
        encoder.copy_buffer_to_buffer(src, 0, &staging, 0, size);
        ctx.queue.submit(std::iter::once(encoder.finish()));
        staging
    })?;

    let slice = staging.slice(..);
    let (tx, rx) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    ctx.finish();
    rx.recv()
        .map_err(|_| Error::Other("readback callback dropped".into()))??;

    let values = {
        let view = slice.get_mapped_range();
        bytemuck::cast_slice::<u8, T>(&view).to_vec()
    };
    staging.unmap();
    staging.destroy();
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_sizes_reports_offending_buffer() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: 1024,
            ..wgpu::Limits::downlevel_defaults()
        };
        assert!(check_sizes(&limits, &[("cells", 1024)]).is_ok());
        let err = check_sizes(&limits, &[("cells", 512), ("results", 4096)]).unwrap_err();
        match err {
            Error::ResourceLimit(msg) => assert!(msg.contains("results")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
