//! Point cloud rendering

use crate::camera::{Camera, RenderParameters};
use nbody_physics::BodyCount;
use nbody_simulation::{scoped, ParticleBuffers, PingPong, Result};
use wgpu::util::DeviceExt;

const POINTS_SHADER: &str = include_str!("shaders/points.wgsl");

/// Background colour: a very dark blue
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.1,
    a: 1.0,
};

/// `destination += source` on every channel, so overlapping bodies brighten
/// instead of occluding each other.
pub const ADDITIVE_BLENDING: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

pub struct RenderStage {
    render_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    bind_groups: [wgpu::BindGroup; 2],
    body_count: BodyCount,
}

impl RenderStage {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        buffers: &ParticleBuffers,
        camera: &Camera,
    ) -> Result<Self> {
        let camera_buffer = scoped(device, "render parameters", || {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Render Params Buffer"),
                contents: bytemuck::cast_slice(&[camera.to_uniform()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        })?;

        let (render_pipeline, bind_group_layout) = scoped(device, "render pipeline", || {
            let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("Points Shader"),
                source: wgpu::ShaderSource::Wgsl(POINTS_SHADER.into()),
            });

            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Points Bind Group Layout"),
                    entries: &[
                        // Positions (Storage) - Binding 0
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: true },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                        // Camera (Uniform) - Binding 1
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::VERTEX,
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
                label: Some("Points Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

            let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Points Render Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vert"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("frag"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(ADDITIVE_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::PointList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });

            (render_pipeline, bind_group_layout)
        })?;

        // The render pass always draws the freshly written `next` array.
        let bind_group = |role: PingPong| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Points Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: buffers.position_buffer(role.next()).as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: camera_buffer.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_groups = scoped(device, "render bind groups", || {
            [bind_group(PingPong::Front), bind_group(PingPong::Back)]
        })?;

        log::info!("Render stage ready ({:?})", format);

        Ok(Self {
            render_pipeline,
            camera_buffer,
            bind_groups,
            body_count: buffers.body_count(),
        })
    }

    /// Upload new view parameters, e.g. after the viewport changed.
    pub fn update_camera(&self, queue: &wgpu::Queue, camera: &Camera) {
        let params: RenderParameters = camera.to_uniform();
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[params]));
    }

    /// Record a pass that clears `view` and draws every body of `next` for `role`.
    pub fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        role: PingPong,
    ) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Points Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.render_pipeline);
        render_pass.set_bind_group(0, &self.bind_groups[role.index()], &[]);
        render_pass.draw(0..self.body_count.get(), 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbody_physics::BodyState;
    use nbody_simulation::headless_device;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn target(device: &wgpu::Device) -> wgpu::Texture {
        device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Target"),
            size: wgpu::Extent3d {
                width: 64,
                height: 64,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    #[test]
    fn test_draw_does_not_touch_particles() {
        let Some((_adapter, device, queue)) = headless_device() else {
            eprintln!("no GPU adapter available, skipping");
            return;
        };

        let count = BodyCount::MIN;
        let buffers = ParticleBuffers::new(&device, count).unwrap();
        let camera = Camera::new(64, 64);
        let stage = RenderStage::new(&device, FORMAT, &buffers, &camera).unwrap();

        let state = BodyState::seeded(count, 0.6, &mut StdRng::seed_from_u64(9));
        buffers.upload(&queue, &state).unwrap();

        let texture = target(&device);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Test Encoder"),
        });
        stage.encode(&mut encoder, &view, buffers.role());
        queue.submit(std::iter::once(encoder.finish()));

        let after = buffers.snapshot(&device, &queue).unwrap();
        assert_eq!(after, state);
    }
}
