//! Command line configuration

use clap::Parser;
use nbody_physics::{BodyCount, SimulationConfig, DELTA, RADIUS, SOFTENING};

pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

fn parse_body_count(value: &str) -> Result<BodyCount, String> {
    let count: u32 = value.parse().map_err(|e| format!("{e}"))?;
    BodyCount::new(count).map_err(|e| e.to_string())
}

fn parse_positive(value: &str) -> Result<f32, String> {
    let number: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if number.is_finite() && number > 0.0 {
        Ok(number)
    } else {
        Err(format!("{number} must be a finite number greater than zero"))
    }
}

fn parse_finite(value: &str) -> Result<f32, String> {
    let number: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if number.is_finite() {
        Ok(number)
    } else {
        Err(format!("{number} must be finite"))
    }
}

/// Direct-summation gravitational N-body simulation
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(version, about)]
pub struct Config {
    /// Number of bodies (a multiple of 64 between 64 and 131072)
    #[arg(long, default_value_t = BodyCount::default(), value_parser = parse_body_count)]
    pub bodies: BodyCount,

    /// Index of the adapter to start on
    #[arg(long, default_value_t = 0)]
    pub device: usize,

    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// Integration time step
    #[arg(long, default_value_t = DELTA, value_parser = parse_finite)]
    pub delta: f32,

    /// Softening length added to squared distances (must be positive)
    #[arg(long, default_value_t = SOFTENING, value_parser = parse_positive)]
    pub softening: f32,

    /// Radius of the seeding sphere
    #[arg(long, default_value_t = RADIUS, value_parser = parse_positive)]
    pub radius: f32,

    /// Wait for vertical blank when presenting (default)
    #[arg(long, overrides_with = "no_vsync")]
    pub vsync: bool,

    /// Present as fast as the GPU allows
    #[arg(long, overrides_with = "vsync")]
    pub no_vsync: bool,

    /// Render offscreen without opening a window
    #[arg(long)]
    pub headless: bool,

    /// Frames to run in headless mode
    #[arg(long, default_value_t = 600, requires = "headless")]
    pub frames: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bodies: BodyCount::default(),
            device: 0,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            delta: DELTA,
            softening: SOFTENING,
            radius: RADIUS,
            vsync: false,
            no_vsync: false,
            headless: false,
            frames: 600,
        }
    }
}

impl Config {
    pub fn simulation(&self) -> SimulationConfig {
        SimulationConfig {
            delta_time: self.delta,
            softening: self.softening,
            radius: self.radius,
        }
    }

    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.no_vsync {
            wgpu::PresentMode::AutoNoVsync
        } else {
            wgpu::PresentMode::Fifo
        }
    }
}
