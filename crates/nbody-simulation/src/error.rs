//! Errors raised while building or driving a compute context

use nbody_physics::{BodyCount, BodyStateError};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    #[error("surface reports no supported texture formats")]
    NoSurfaceFormat,

    #[error("adapter index {index} is out of range ({available} available)")]
    AdapterIndex { index: usize, available: usize },

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("failed to build {label}: {message}")]
    Pipeline { label: &'static str, message: String },

    #[error("failed to allocate {label}: {message}")]
    Allocation { label: &'static str, message: String },

    #[error("buffer readback failed: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),

    #[error("device poll failed: {0}")]
    Poll(#[from] wgpu::PollError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("body state holds {actual} bodies but buffers are sized for {expected}")]
    SizeMismatch { expected: BodyCount, actual: usize },

    #[error(transparent)]
    BodyState(#[from] BodyStateError),
}

pub type Result<T, E = SimulationError> = std::result::Result<T, E>;
