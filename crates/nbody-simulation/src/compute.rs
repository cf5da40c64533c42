//! Gravitational integration dispatch

use crate::buffers::{ParticleBuffers, PingPong};
use crate::error::Result;
use crate::gpu::scoped;
use crate::params::SimulationParameters;
use wgpu::util::DeviceExt;

const STEP_SHADER: &str = include_str!("shaders/step.wgsl");

/// One compute pipeline plus a bind group per ping-pong role
pub struct ComputeStage {
    pipeline: wgpu::ComputePipeline,
    bind_groups: [wgpu::BindGroup; 2],
    _params_buffer: wgpu::Buffer,
    workgroups: u32,
}

impl ComputeStage {
    pub fn new(
        device: &wgpu::Device,
        buffers: &ParticleBuffers,
        params: SimulationParameters,
    ) -> Result<Self> {
        Self::with_source(device, buffers, params, STEP_SHADER)
    }

    /// Build against an explicit WGSL source exposing a `step` entry point.
    pub fn with_source(
        device: &wgpu::Device,
        buffers: &ParticleBuffers,
        params: SimulationParameters,
        source: &str,
    ) -> Result<Self> {
        let params_buffer = scoped(device, "simulation parameters", || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Simulation Params Buffer"),
                contents: bytemuck::cast_slice(&[params]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        })?;

        let (pipeline, bind_group_layout) = scoped(device, "compute pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("N-Body Step Shader"),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

            let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            };

            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Step Bind Group Layout"),
                    entries: &[
                        // Positions in (current)
                        storage(0, true),
                        // Positions out (next)
                        storage(1, false),
                        // Velocities, updated in place
                        storage(2, false),
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Step Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("N-Body Step Pipeline"),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some("step"),
                compilation_options: Default::default(),
                cache: None,
            });

            (pipeline, bind_group_layout)
        })?;

        let bind_group = |role: PingPong| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Step Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffers.position_buffer(role.current()).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: buffers.position_buffer(role.next()).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: buffers.velocities().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = scoped(device, "compute bind groups", || {
            [bind_group(PingPong::Front), bind_group(PingPong::Back)]
        })?;

        log::info!(
            "Compute stage ready: {} bodies in {} workgroups",
            params.body_count,
            buffers.body_count().workgroups()
        );

        Ok(Self {
            pipeline,
            bind_groups,
            _params_buffer: params_buffer,
            workgroups: buffers.body_count().workgroups(),
        })
    }

    /// Record one integration step reading `current` and writing `next` for `role`.
    pub fn encode(&self, encoder: &mut wgpu::CommandEncoder, role: PingPong) {
        let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("N-Body Step Pass"),
            timestamp_writes: None,
        });
        compute_pass.set_pipeline(&self.pipeline);
        compute_pass.set_bind_group(0, &self.bind_groups[role.index()], &[]);
        compute_pass.dispatch_workgroups(self.workgroups, 1, 1);
    }

    /// Submit a single step on its own, without a render pass.
    pub fn step(&self, device: &wgpu::Device, queue: &wgpu::Queue, buffers: &ParticleBuffers) {
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Step Encoder"),
        });
        self.encode(&mut encoder, buffers.role());
        queue.submit(std::iter::once(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulationError;
    use crate::gpu::headless_device;
    use approx::assert_abs_diff_eq;
    use nbody_physics::{step_reference, BodyCount, BodyState, SimulationConfig, RADIUS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(count: BodyCount, seed: u64) -> BodyState {
        BodyState::seeded(count, RADIUS, &mut StdRng::seed_from_u64(seed))
    }

    #[test]
    fn test_zero_delta_keeps_positions() {
        let Some((_adapter, device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let count = BodyCount::MIN;
        let config = SimulationConfig {
            delta_time: 0.0,
            ..Default::default()
        };
        let buffers = ParticleBuffers::new(&device, count).unwrap();
        let stage =
            ComputeStage::new(&device, &buffers, SimulationParameters::new(count, &config))
                .unwrap();

        let state = seeded(count, 11);
        buffers.upload(&queue, &state).unwrap();
        stage.step(&device, &queue, &buffers);

        let next = buffers.read_next(&device, &queue).unwrap();
        assert_eq!(next, state.positions());
    }

    #[test]
    fn test_matches_cpu_reference() {
        let Some((_adapter, device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let count = BodyCount::new(256).unwrap();
        let config = SimulationConfig {
            delta_time: 0.001,
            ..Default::default()
        };
        let mut buffers = ParticleBuffers::new(&device, count).unwrap();
        let stage =
            ComputeStage::new(&device, &buffers, SimulationParameters::new(count, &config))
                .unwrap();

        let state = seeded(count, 5);
        buffers.upload(&queue, &state).unwrap();
        stage.step(&device, &queue, &buffers);

        let mut expected = vec![[0.0; 4]; count.as_usize()];
        let mut expected_velocities = state.velocities().to_vec();
        step_reference(
            state.positions(),
            &mut expected,
            &mut expected_velocities,
            config.delta_time,
            config.softening,
        );

        let next = buffers.read_next(&device, &queue).unwrap();
        buffers.swap();
        let after = buffers.snapshot(&device, &queue).unwrap();

        for i in 0..count.as_usize() {
            for c in 0..4 {
                assert_abs_diff_eq!(next[i][c], expected[i][c], epsilon = 1e-5);
                assert_abs_diff_eq!(
                    after.velocities()[i][c],
                    expected_velocities[i][c],
                    epsilon = 1e-3
                );
            }
        }
        assert_eq!(after.positions(), next.as_slice());
    }

    #[test]
    fn test_invalid_shader_fails_build() {
        let Some((_adapter, device, _queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let buffers = ParticleBuffers::new(&device, BodyCount::MIN).unwrap();
        let result = ComputeStage::with_source(
            &device,
            &buffers,
            SimulationParameters::default(),
            "@compute @workgroup_size(64) fn not_step() {}",
        );

        assert!(matches!(
            result,
            Err(SimulationError::Pipeline {
                label: "compute pipeline",
                ..
            })
        ));
    }
}
