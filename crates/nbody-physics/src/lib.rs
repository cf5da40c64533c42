//! # N-Body Physics
//!
//! Host-side data model for the gravitational N-body simulation: constants,
//! body count policy, typed body state and the CPU reference integrator.

pub mod body;
pub mod body_count;
pub mod constants;
pub mod forces;

pub use body::*;
pub use body_count::*;
pub use constants::*;
pub use forces::*;
