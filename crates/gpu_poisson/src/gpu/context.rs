//! Device acquisition.
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::GpuOptions;
use crate::error::{Error, Result};

/// Storage buffers bound by the sampler kernels.
pub const REQUIRED_STORAGE_BUFFERS: u32 = 6;

/// Adapter identity, for logs and benchmark reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub backend: String,
    pub device_type: String,
    pub driver: String,
}

impl From<wgpu::AdapterInfo> for AdapterInfo {
    fn from(info: wgpu::AdapterInfo) -> Self {
        Self {
            name: info.name,
            backend: format!("{:?}", info.backend),
            device_type: format!("{:?}", info.device_type),
            driver: info.driver,
        }
    }
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.backend, self.device_type)?;
        if !self.driver.is_empty() {
            write!(f, " driver {}", self.driver)?;
        }
        Ok(())
    }
}

/// A wgpu device and queue, shared by any number of samplers.
#[derive(Clone)]
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    adapter: AdapterInfo,
    limits: wgpu::Limits,
}

impl fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter", &self.adapter)
            .finish_non_exhaustive()
    }
}

impl GpuContext {
    /// Acquire a device with [`GpuOptions::default`].
    ///
    /// Tries a hardware adapter first, then a software fallback.
    pub fn new() -> Result<Self> {
        Self::with_options(GpuOptions::default())
    }

    pub fn with_options(options: GpuOptions) -> Result<Self> {
        match pollster::block_on(Self::request(options, false)) {
            Err(Error::NoAdapter) if options.allow_software_fallback => {
                warn!("no hardware adapter, trying software fallback");
                pollster::block_on(Self::request(options, true))
            }
            other => other,
        }
    }

    async fn request(options: GpuOptions, force_fallback: bool) -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference(),
                compatible_surface: None,
                force_fallback_adapter: force_fallback,
            })
            .await
            .ok_or(Error::NoAdapter)?;

        let supported = adapter.limits();
        if supported.max_storage_buffers_per_shader_stage < REQUIRED_STORAGE_BUFFERS {
            return Err(Error::ResourceLimit(format!(
                "adapter supports {} storage buffers per stage, {} required",
                supported.max_storage_buffers_per_shader_stage, REQUIRED_STORAGE_BUFFERS
            )));
        }

        let required_limits = wgpu::Limits {
            max_storage_buffers_per_shader_stage: supported.max_storage_buffers_per_shader_stage,
            max_storage_buffer_binding_size: supported.max_storage_buffer_binding_size,
            max_buffer_size: supported.max_buffer_size,
            max_compute_workgroups_per_dimension: supported.max_compute_workgroups_per_dimension,
            ..wgpu::Limits::downlevel_defaults()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("gpu_poisson device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: required_limits.clone(),
                },
                None,
            )
            .await?;

        let adapter = AdapterInfo::from(adapter.get_info());
        info!(adapter = %adapter, "acquired GPU device");
        debug!(
            max_storage_buffer_binding_size = required_limits.max_storage_buffer_binding_size,
            max_buffer_size = required_limits.max_buffer_size,
            "device limits"
        );

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter,
            limits: required_limits,
        })
    }

    pub fn adapter_info(&self) -> &AdapterInfo {
        &self.adapter
    }

    /// Limits the device was created with.
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    /// Submit `encoder` and block until the queue drains.
    pub fn submit_and_wait(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Block until all submitted work has finished.
    pub fn finish(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Run `f` inside validation, out-of-memory and internal error scopes.
    ///
    /// A captured out-of-memory error becomes [`Error::OutOfMemory`], anything
    /// else becomes [`Error::Device`], both labelled with `label`.
    pub fn scoped<T>(&self, label: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        let (value, captured) = self.capture(f);
        match captured {
            Some(err) => Err(scope_error(label, err)),
            None => Ok(value),
        }
    }

    /// Like [`GpuContext::scoped`], but validation failures are reported as
    /// [`Error::Shader`] since they come from shader or pipeline creation.
    pub fn scoped_pipeline<T>(&self, label: &str, f: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        let (value, captured) = self.capture(f);
        match captured {
            Some(wgpu::Error::Validation { description, .. }) => Err(Error::Shader {
                label: label.to_owned(),
                message: description,
            }),
            Some(err) => Err(scope_error(label, err)),
            None => Ok(value),
        }
    }

    fn capture<T>(&self, f: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Internal);

        let value = f(&self.device);

        let internal = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        let validation = pollster::block_on(self.device.pop_error_scope());
        (value, validation.or(out_of_memory).or(internal))
    }
}

fn scope_error(label: &str, err: wgpu::Error) -> Error {
    match err {
        wgpu::Error::OutOfMemory { .. } => {
            error!(label, "device ran out of memory");
            Error::OutOfMemory {
                label: label.to_owned(),
            }
        }
        other => {
            warn!(label, error = %other, "device error");
            Error::Device {
                label: label.to_owned(),
                message: other.to_string(),
            }
        }
    }
}
