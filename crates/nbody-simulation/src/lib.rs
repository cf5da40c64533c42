//! # N-Body Simulation
//!
//! GPU-based all-pairs gravitational simulation using a compute shader over
//! double-buffered particle state.

pub mod buffers;
pub mod compute;
pub mod error;
pub mod gpu;
pub mod params;

pub use buffers::*;
pub use compute::*;
pub use error::*;
pub use gpu::*;
pub use params::*;
