//! Simulation constants
//!
//! Scaled for real-time visualization of a few thousand to a hundred thousand
//! bodies; they are not physical units.

/// Lanes per compute workgroup. Must match `GROUPSIZE` in `step.wgsl`.
pub const GROUPSIZE: u32 = 64;

/// Smallest body count, one full workgroup
pub const MIN_BODIES: u32 = GROUPSIZE;

/// Largest body count reachable by doubling
pub const MAX_BODIES: u32 = 131_072;

/// Body count at startup
pub const DEFAULT_BODIES: u32 = 16_384;

/// Radius of the sphere bodies are seeded on
pub const RADIUS: f32 = 0.6;

/// Integration time step per frame
pub const DELTA: f32 = 0.000_025;

/// Softening length added to the squared separation to avoid r→0 singularities
pub const SOFTENING: f32 = 0.2;

/// Approximate floating point operations for one pairwise interaction
pub const FLOPS_PER_PAIR: f64 = 21.0;

/// Mass placeholder stored in the `w` component of seeded positions
pub const BODY_MASS: f32 = 1.0;
