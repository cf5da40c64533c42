//! Host-side body state
//!
//! Positions and velocities are stored as two parallel arrays of `vec4<f32>`,
//! matching the storage buffer layout of the compute and render shaders.

use crate::body_count::BodyCount;
use crate::constants::BODY_MASS;
use glam::Vec3;
use rand::Rng;

/// One `vec4<f32>` element as laid out in GPU storage buffers
pub type Float4 = [f32; 4];

/// Size in bytes of one body's position (or velocity) element
pub const FLOAT4_SIZE: u64 = std::mem::size_of::<Float4>() as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BodyStateError {
    #[error("position array holds {positions} bodies but velocity array holds {velocities}")]
    LengthMismatch { positions: usize, velocities: usize },
}

/// Snapshot of every body's position and velocity in host memory
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    positions: Vec<Float4>,
    velocities: Vec<Float4>,
}

impl BodyState {
    pub fn from_parts(
        positions: Vec<Float4>,
        velocities: Vec<Float4>,
    ) -> Result<Self, BodyStateError> {
        if positions.len() != velocities.len() {
            return Err(BodyStateError::LengthMismatch {
                positions: positions.len(),
                velocities: velocities.len(),
            });
        }
        Ok(Self {
            positions,
            velocities,
        })
    }

    pub fn zeroed(count: BodyCount) -> Self {
        Self {
            positions: vec![[0.0; 4]; count.as_usize()],
            velocities: vec![[0.0; 4]; count.as_usize()],
        }
    }

    pub fn seeded<R: Rng>(count: BodyCount, radius: f32, rng: &mut R) -> Self {
        let mut state = Self::zeroed(count);
        state.seed(radius, rng);
        state
    }

    /// Scatter every body uniformly over the surface of a sphere and stop it.
    ///
    /// Latitude is drawn as `acos(2u - 1)` so that area, not angle, is uniform.
    pub fn seed<R: Rng>(&mut self, radius: f32, rng: &mut R) {
        for (position, velocity) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            let longitude = std::f32::consts::TAU * rng.random::<f32>();
            let latitude = (2.0 * rng.random::<f32>() - 1.0).acos();
            *position = [
                radius * latitude.sin() * longitude.cos(),
                radius * latitude.sin() * longitude.sin(),
                radius * latitude.cos(),
                BODY_MASS,
            ];
            *velocity = [0.0; 4];
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether this state can be uploaded into buffers sized for `count` bodies
    pub fn fits(&self, count: BodyCount) -> bool {
        self.len() == count.as_usize()
    }

    pub fn position(&self, index: usize) -> Vec3 {
        let [x, y, z, _] = self.positions[index];
        Vec3::new(x, y, z)
    }

    pub fn velocity(&self, index: usize) -> Vec3 {
        let [x, y, z, _] = self.velocities[index];
        Vec3::new(x, y, z)
    }

    pub fn get_position(&self, index: usize) -> Option<Vec3> {
        self.positions
            .get(index)
            .map(|&[x, y, z, _]| Vec3::new(x, y, z))
    }

    pub fn get_velocity(&self, index: usize) -> Option<Vec3> {
        self.velocities
            .get(index)
            .map(|&[x, y, z, _]| Vec3::new(x, y, z))
    }

    pub fn positions(&self) -> &[Float4] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Float4] {
        &self.velocities
    }

    pub fn velocities_mut(&mut self) -> &mut [Float4] {
        &mut self.velocities
    }

    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.positions)
    }

    pub fn velocity_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.velocities)
    }

    /// Size in bytes of one array (positions or velocities)
    pub fn array_size(&self) -> u64 {
        self.len() as u64 * FLOAT4_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::RADIUS;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seeded_bodies_lie_on_sphere() {
        let mut rng = StdRng::seed_from_u64(7);
        let count = BodyCount::new(4096).unwrap();
        let state = BodyState::seeded(count, RADIUS, &mut rng);

        assert_eq!(state.len(), 4096);
        for i in 0..state.len() {
            assert_abs_diff_eq!(state.position(i).length(), RADIUS, epsilon = 1e-5);
            assert_eq!(state.positions()[i][3], BODY_MASS);
            assert_eq!(state.velocities()[i], [0.0; 4]);
        }
    }

    #[test]
    fn test_seeding_is_uniform_over_area() {
        // Uniform over area means z is uniform on [-R, R], so a quarter of
        // the bodies sit above z = R/2 (uniform latitude would put a third there).
        let mut rng = StdRng::seed_from_u64(42);
        let count = BodyCount::new(16_384).unwrap();
        let state = BodyState::seeded(count, 1.0, &mut rng);

        let upper = (0..state.len()).filter(|&i| state.position(i).z > 0.5).count();
        let fraction = upper as f32 / state.len() as f32;
        assert_abs_diff_eq!(fraction, 0.25, epsilon = 0.02);
    }

    #[test]
    fn test_reseed_zeroes_velocities() {
        let mut rng = StdRng::seed_from_u64(1);
        let count = BodyCount::MIN;
        let mut state = BodyState::zeroed(count);
        state.velocities_mut()[3] = [1.0, 2.0, 3.0, 0.0];
        state.seed(RADIUS, &mut rng);
        assert!(state.velocities().iter().all(|v| *v == [0.0; 4]));
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        let err = BodyState::from_parts(vec![[0.0; 4]; 2], vec![[0.0; 4]; 3]).unwrap_err();
        assert_eq!(
            err,
            BodyStateError::LengthMismatch {
                positions: 2,
                velocities: 3
            }
        );
    }

    #[test]
    fn test_views_are_bounds_checked() {
        let state = BodyState::zeroed(BodyCount::MIN);
        assert!(state.get_position(63).is_some());
        assert!(state.get_position(64).is_none());
        assert!(state.get_velocity(64).is_none());
        assert_eq!(state.position_bytes().len() as u64, state.array_size());
        assert!(state.fits(BodyCount::MIN));
        assert!(!state.fits(BodyCount::default()));
    }
}
