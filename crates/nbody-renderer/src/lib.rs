//! # N-Body Renderer
//!
//! Draws the body positions as additively blended points.

pub mod camera;
pub mod renderer;

pub use camera::*;
pub use renderer::*;
