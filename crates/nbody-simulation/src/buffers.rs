//! Double-buffered particle storage
//!
//! Two position arrays alternate between the `current` role (read by the
//! compute kernel) and the `next` role (written by the compute kernel, then
//! drawn). One velocity array is updated in place. The role flag is the only
//! thing that changes on a swap; the buffers themselves never move.

use crate::error::{Result, SimulationError};
use crate::gpu::{drain, read_float4s, scoped};
use nbody_physics::{BodyCount, BodyState, Float4, FLOAT4_SIZE};
use rand::Rng;

/// Which position array currently holds the latest generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PingPong {
    /// Array A is current, B is next
    #[default]
    Front,
    /// Array B is current, A is next
    Back,
}

impl PingPong {
    pub fn flipped(self) -> Self {
        match self {
            PingPong::Front => PingPong::Back,
            PingPong::Back => PingPong::Front,
        }
    }

    pub fn current(self) -> usize {
        match self {
            PingPong::Front => 0,
            PingPong::Back => 1,
        }
    }

    pub fn next(self) -> usize {
        1 - self.current()
    }

    /// Slot of this role in per-role arrays such as bind groups
    pub fn index(self) -> usize {
        self as usize
    }
}

pub struct ParticleBuffers {
    positions: [wgpu::Buffer; 2],
    velocities: wgpu::Buffer,
    role: PingPong,
    body_count: BodyCount,
}

impl ParticleBuffers {
    pub fn new(device: &wgpu::Device, body_count: BodyCount) -> Result<Self> {
        let size = body_count.get() as u64 * FLOAT4_SIZE;
        let usage = wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_DST
            | wgpu::BufferUsages::COPY_SRC;

        let (positions, velocities) = scoped(device, "particle buffers", || {
            let create = |label: &'static str| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label),
                    size,
                    usage,
                    mapped_at_creation: false,
                })
            };
            (
                [create("Positions A"), create("Positions B")],
                create("Velocities"),
            )
        })?;

        log::debug!("Allocated particle buffers for {} bodies", body_count);

        Ok(Self {
            positions,
            velocities,
            role: PingPong::default(),
            body_count,
        })
    }

    /// Exchange the `current` and `next` roles.
    ///
    /// Called once per frame after the frame's compute and render work has
    /// been submitted.
    pub fn swap(&mut self) {
        self.role = self.role.flipped();
    }

    pub fn role(&self) -> PingPong {
        self.role
    }

    pub fn body_count(&self) -> BodyCount {
        self.body_count
    }

    pub fn position_buffer(&self, index: usize) -> &wgpu::Buffer {
        &self.positions[index]
    }

    pub fn current(&self) -> &wgpu::Buffer {
        &self.positions[self.role.current()]
    }

    pub fn next(&self) -> &wgpu::Buffer {
        &self.positions[self.role.next()]
    }

    pub fn velocities(&self) -> &wgpu::Buffer {
        &self.velocities
    }

    fn array_size(&self) -> u64 {
        self.body_count.get() as u64 * FLOAT4_SIZE
    }

    /// Write `state` into the `current` positions and the velocities.
    ///
    /// The write is queued and lands before the next submission.
    pub fn upload(&self, queue: &wgpu::Queue, state: &BodyState) -> Result<()> {
        if !state.fits(self.body_count) {
            return Err(SimulationError::SizeMismatch {
                expected: self.body_count,
                actual: state.len(),
            });
        }
        queue.write_buffer(self.current(), 0, state.position_bytes());
        queue.write_buffer(&self.velocities, 0, state.velocity_bytes());
        Ok(())
    }

    /// Reseed every body on a sphere of `radius` with zero velocity.
    ///
    /// Drains the device first so no in-flight frame still reads the arrays.
    pub fn seed<R: Rng>(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        radius: f32,
        rng: &mut R,
    ) -> Result<()> {
        drain(device)?;
        let state = BodyState::seeded(self.body_count, radius, rng);
        self.upload(queue, &state)
    }

    /// Drain the device and copy the `current` positions and the velocities
    /// into host memory.
    pub fn snapshot(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<BodyState> {
        drain(device)?;
        let positions = read_float4s(device, queue, self.current(), self.array_size())?;
        let velocities = read_float4s(device, queue, &self.velocities, self.array_size())?;
        Ok(BodyState::from_parts(positions, velocities)?)
    }

    /// Drain the device and copy the `next` positions into host memory.
    pub fn read_next(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Vec<Float4>> {
        drain(device)?;
        read_float4s(device, queue, self.next(), self.array_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::headless_device;
    use nbody_physics::RADIUS;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_roles_never_alias() {
        for role in [PingPong::Front, PingPong::Back] {
            assert_ne!(role.current(), role.next());
        }
    }

    #[test]
    fn test_flip_exchanges_roles() {
        let role = PingPong::default();
        let flipped = role.flipped();
        assert_eq!(flipped.current(), role.next());
        assert_eq!(flipped.next(), role.current());
    }

    #[test]
    fn test_double_flip_is_identity() {
        for role in [PingPong::Front, PingPong::Back] {
            assert_eq!(role.flipped().flipped(), role);
        }
    }

    #[test]
    fn test_swap_exchanges_buffers() {
        let Some((_adapter, device, _queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let mut buffers = ParticleBuffers::new(&device, BodyCount::MIN).unwrap();
        let current = buffers.current().clone();
        let next = buffers.next().clone();
        assert_ne!(current, next);

        buffers.swap();
        assert_eq!(*buffers.current(), next);
        assert_eq!(*buffers.next(), current);

        buffers.swap();
        assert_eq!(*buffers.current(), current);
        assert_eq!(buffers.role(), PingPong::Front);
    }

    #[test]
    fn test_seed_then_snapshot() {
        let Some((_adapter, device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let buffers = ParticleBuffers::new(&device, BodyCount::MIN).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        buffers.seed(&device, &queue, RADIUS, &mut rng).unwrap();

        let state = buffers.snapshot(&device, &queue).unwrap();
        assert_eq!(state.len(), 64);
        for i in 0..state.len() {
            approx::assert_abs_diff_eq!(state.position(i).length(), RADIUS, epsilon = 1e-5);
            assert_eq!(state.velocities()[i], [0.0; 4]);
        }
    }

    #[test]
    fn test_upload_rejects_wrong_size() {
        let Some((_adapter, device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let buffers = ParticleBuffers::new(&device, BodyCount::MIN).unwrap();
        let state = BodyState::zeroed(BodyCount::MIN.grown().unwrap());
        assert!(matches!(
            buffers.upload(&queue, &state),
            Err(SimulationError::SizeMismatch { .. })
        ));
    }
}
