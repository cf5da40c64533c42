//! Per-step parameters handed to the compute kernel

use bytemuck::{Pod, Zeroable};
use nbody_physics::{BodyCount, SimulationConfig};

/// Uniform block read by `step.wgsl`
///
/// Padded to 16 bytes for uniform buffer layout rules.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct SimulationParameters {
    pub body_count: u32,
    pub delta_time: f32,
    pub softening: f32,
    pub _padding: u32,
}

impl SimulationParameters {
    pub fn new(body_count: BodyCount, config: &SimulationConfig) -> Self {
        Self {
            body_count: body_count.get(),
            delta_time: config.delta_time,
            softening: config.softening,
            _padding: 0,
        }
    }
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self::new(BodyCount::default(), &SimulationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbody_physics::{DELTA, SOFTENING};

    #[test]
    fn test_layout_is_uniform_compatible() {
        assert_eq!(std::mem::size_of::<SimulationParameters>(), 16);
    }

    #[test]
    fn test_built_from_count_and_config() {
        let params = SimulationParameters::new(BodyCount::MIN, &SimulationConfig::default());
        assert_eq!(params.body_count, 64);
        assert_eq!(params.delta_time, DELTA);
        assert_eq!(params.softening, SOFTENING);
    }
}
