//! Softened all-pairs gravity
//!
//! NOTE: This is the reference implementation used for documentation and
//! testing. The simulation itself runs the same step in `step.wgsl`.
//!
//! Masses are unit and G = 1, so for body i:
//! a_i = Σ_j (p_j - p_i) / (|p_j - p_i|² + ε²)^(3/2)
//! The j = i term is exactly zero, so the sum runs over every body.

use crate::body::Float4;
use crate::constants::{DELTA, RADIUS, SOFTENING};
use glam::Vec3;

/// Run-time tunables shared by the CPU reference and the GPU kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub delta_time: f32,
    pub softening: f32,
    pub radius: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            delta_time: DELTA,
            softening: SOFTENING,
            radius: RADIUS,
        }
    }
}

fn xyz(v: &Float4) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}

/// Acceleration on body `index` from every body in `positions`
pub fn acceleration(positions: &[Float4], index: usize, softening: f32) -> Vec3 {
    let origin = xyz(&positions[index]);
    let softening2 = softening * softening;

    positions.iter().fold(Vec3::ZERO, |acc, other| {
        let d = xyz(other) - origin;
        let inv_dist = 1.0 / (d.length_squared() + softening2).sqrt();
        acc + d * (inv_dist * inv_dist * inv_dist)
    })
}

/// One symplectic Euler step: velocity first, then position with the new velocity.
///
/// `input` is read only; `output` and `velocities` are overwritten. The `w`
/// components pass through untouched.
pub fn step_reference(
    input: &[Float4],
    output: &mut [Float4],
    velocities: &mut [Float4],
    delta_time: f32,
    softening: f32,
) {
    assert_eq!(input.len(), output.len());
    assert_eq!(input.len(), velocities.len());

    for i in 0..input.len() {
        let a = acceleration(input, i, softening);
        let v = xyz(&velocities[i]) + a * delta_time;
        let p = xyz(&input[i]) + v * delta_time;

        velocities[i] = [v.x, v.y, v.z, velocities[i][3]];
        output[i] = [p.x, p.y, p.z, input[i][3]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn four_bodies() -> Vec<Float4> {
        vec![
            [0.5, 0.0, 0.0, 1.0],
            [-0.5, 0.0, 0.0, 1.0],
            [0.0, 0.3, 0.1, 1.0],
            [0.1, -0.2, 0.4, 1.0],
        ]
    }

    #[test]
    fn test_zero_delta_leaves_positions_unchanged() {
        let input = four_bodies();
        let mut output = vec![[0.0; 4]; 4];
        let mut velocities = vec![[0.0; 4]; 4];

        step_reference(&input, &mut output, &mut velocities, 0.0, SOFTENING);

        assert_eq!(output, input);
        assert!(velocities.iter().all(|v| *v == [0.0; 4]));
    }

    #[test]
    fn test_pair_attracts_symmetrically() {
        let input = vec![[0.5, 0.0, 0.0, 1.0], [-0.5, 0.0, 0.0, 1.0]];
        let a0 = acceleration(&input, 0, SOFTENING);
        let a1 = acceleration(&input, 1, SOFTENING);

        assert!(a0.x < 0.0);
        assert!(a1.x > 0.0);
        assert_abs_diff_eq!(a0.x, -a1.x, epsilon = 1e-6);

        // 1 / (1 + 0.04)^(3/2)
        let expected = 1.0 / (1.0f32 + SOFTENING * SOFTENING).powf(1.5);
        assert_abs_diff_eq!(a1.x, expected, epsilon = 1e-5);
    }

    #[test]
    fn test_momentum_is_conserved() {
        let input = four_bodies();
        let mut output = vec![[0.0; 4]; 4];
        let mut velocities = vec![[0.0; 4]; 4];

        step_reference(&input, &mut output, &mut velocities, DELTA, SOFTENING);

        let total = velocities.iter().fold(Vec3::ZERO, |acc, v| acc + xyz(v));
        assert_abs_diff_eq!(total.length(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_softening_keeps_coincident_bodies_finite() {
        let input = vec![[0.2, 0.2, 0.2, 1.0]; 2];
        let a = acceleration(&input, 0, SOFTENING);
        assert!(a.is_finite());
        assert_eq!(a, Vec3::ZERO);
    }

    #[test]
    fn test_position_uses_updated_velocity() {
        let input = vec![[0.0, 0.0, 0.0, 1.0]];
        let mut output = vec![[0.0; 4]];
        let mut velocities = vec![[2.0, 0.0, 0.0, 0.0]];

        step_reference(&input, &mut output, &mut velocities, 0.5, SOFTENING);

        assert_eq!(velocities[0], [2.0, 0.0, 0.0, 0.0]);
        assert_eq!(output[0], [1.0, 0.0, 0.0, 1.0]);
    }
}
