//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result]
//! alias. Variants cover invalid configuration, result buffer overflow,
//! device, allocation and pipeline failures, lifecycle misuse, IO, and generic
//! errors.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("result buffer overflow: {required} samples do not fit into a capacity of {capacity}")]
    Capacity { capacity: usize, required: usize },

    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("device request failed: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    #[error("shader or pipeline '{label}' failed to build: {message}")]
    Shader { label: String, message: String },

    #[error("device error during '{label}': {message}")]
    Device { label: String, message: String },

    #[error("device ran out of memory during '{label}'")]
    OutOfMemory { label: String },

    #[error("buffer mapping failed: {0}")]
    BufferMap(#[from] wgpu::BufferAsyncError),

    #[error("device limit exceeded: {0}")]
    ResourceLimit(String),

    #[error("invalid sampler state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` for errors that stem from device resources rather than
    /// from configuration or sizing.
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Error::NoAdapter
                | Error::DeviceRequest(_)
                | Error::Shader { .. }
                | Error::Device { .. }
                | Error::OutOfMemory { .. }
                | Error::BufferMap(_)
                | Error::ResourceLimit(_)
        )
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_string_uses_other_variant() {
        let err: Error = String::from("boom").into();
        matches!(err, Error::Other(_))
            .then_some(())
            .expect("expected Other variant");
    }

    #[test]
    fn from_str_allocates_owned_message() {
        let err: Error = "issue".into();
        assert!(matches!(err, Error::Other(ref msg) if msg == "issue"));
    }

    #[test]
    fn capacity_message_names_both_counts() {
        let err = Error::Capacity {
            capacity: 1,
            required: 37,
        };
        let msg = err.to_string();
        assert!(msg.contains("37"));
        assert!(msg.contains("capacity of 1"));
        assert!(!err.is_resource_error());
    }

    #[test]
    fn shader_errors_are_resource_errors() {
        let err = Error::Shader {
            label: "resolve_conflicts".into(),
            message: "bad binding".into(),
        };
        assert!(err.is_resource_error());
        assert!(!Error::InvalidConfig("x".into()).is_resource_error());
    }

    #[test]
    fn allocation_failures_are_resource_errors() {
        let oom = Error::OutOfMemory {
            label: "sampler buffers".into(),
        };
        assert!(oom.is_resource_error());
        assert!(oom.to_string().contains("sampler buffers"));

        let device = Error::Device {
            label: "bind_group".into(),
            message: "buffer destroyed".into(),
        };
        assert!(device.is_resource_error());
        assert_eq!(
            device.to_string(),
            "device error during 'bind_group': buffer destroyed"
        );
    }
}
