//! Error types for shoal.
//!
//! Initialization is the only place a flock can fail. Per-tick numeric edge
//! cases (no neighbors, coincident agents) are absorbed inside the kernels and
//! never surface here.

use thiserror::Error;

/// Errors that can occur while setting up or driving a flock.
#[derive(Debug, Error)]
pub enum FlockError {
    /// Parameters are missing, out of range, or not finite.
    #[error("Invalid flock configuration: {0}")]
    Configuration(String),

    /// Nothing can be dispatched: either there are no agents or the device
    /// reported a zero-sized workgroup.
    #[error("Cannot dispatch {agent_count} agents with a workgroup size of {group_size}")]
    DegenerateGroupSize { agent_count: u32, group_size: u32 },

    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support.")]
    NoAdapter,

    /// Failed to create GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),

    /// Failed to map buffer for reading.
    #[error("Failed to map GPU buffer: {0}")]
    BufferMapping(String),

    /// The backend has no buffers, either because it was never initialized
    /// or because it has already been released.
    #[error("Flock buffers are not allocated")]
    NotAllocated,

    /// Failed to parse a JSON parameter file.
    #[error("Failed to parse flock parameters: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Failed to read a parameter file from disk.
    #[error("Failed to read flock parameters: {0}")]
    Io(#[from] std::io::Error),
}

impl FlockError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether this error means the flock cannot run at all.
    ///
    /// Only initialization produces these; the controller logs them and stays
    /// inactive instead of dispatching.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FlockError::NotAllocated | FlockError::BufferMapping(_))
    }
}

/// Result type for flock operations.
pub type Result<T> = std::result::Result<T, FlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_message_names_both_sizes() {
        let err = FlockError::DegenerateGroupSize {
            agent_count: 0,
            group_size: 64,
        };
        let msg = err.to_string();
        assert!(msg.contains('0'));
        assert!(msg.contains("64"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_not_allocated_is_not_fatal() {
        assert!(!FlockError::NotAllocated.is_fatal());
        assert!(FlockError::config("bad radius").is_fatal());
    }

    #[test]
    fn test_json_error_converts() {
        let parse: std::result::Result<u32, _> = serde_json::from_str("not json");
        let err: FlockError = parse.unwrap_err().into();
        assert!(matches!(err, FlockError::ConfigParse(_)));
    }
}
