//! Compute contexts and their (re)construction
//!
//! A context is one adapter's device and queue plus every GPU object built
//! against it: particle buffers, the compute stage and the render stage. Only
//! one context is active at a time. Switching adapters or changing the body
//! count builds a complete new context before the old one is dropped, so a
//! failed build leaves the previous context running.

use nbody_physics::{BodyCount, BodyState, SimulationConfig};
use nbody_renderer::{Camera, RenderStage};
use nbody_simulation::{
    adapter_label, enumerate_adapters, open_device, scoped, ComputeStage, ParticleBuffers, Result,
    SimulationError, SimulationParameters,
};
use rand::Rng;
use std::sync::Arc;
use winit::window::Window;

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// What happens to the previous context's bodies on a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Migration {
    /// Copy the previous `current` positions and velocities across
    Retain,
    /// Start from a freshly seeded sphere
    Reseed,
}

impl Migration {
    /// Retaining only makes sense when there is a previous context holding
    /// exactly `requested` bodies.
    pub fn plan(previous: Option<BodyCount>, requested: BodyCount, retain_state: bool) -> Self {
        match previous {
            Some(count) if retain_state && count == requested => Migration::Retain,
            _ => Migration::Reseed,
        }
    }
}

/// Prefer a plain UNORM format so additive blending accumulates linearly.
fn pick_surface_format(formats: &[wgpu::TextureFormat]) -> Result<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|f| !f.is_srgb())
        .or_else(|| formats.first().copied())
        .ok_or(SimulationError::NoSurfaceFormat)
}

fn configure_surface(
    surface: &wgpu::Surface<'static>,
    device: &wgpu::Device,
    surface_config: &wgpu::SurfaceConfiguration,
) -> Result<()> {
    scoped(device, "surface", || surface.configure(device, surface_config))
}

/// The texture a frame is drawn into
pub enum Frame {
    Surface {
        texture: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
    },
    Offscreen {
        view: wgpu::TextureView,
    },
}

impl Frame {
    pub fn view(&self) -> &wgpu::TextureView {
        match self {
            Frame::Surface { view, .. } | Frame::Offscreen { view } => view,
        }
    }

    pub fn present(self) {
        if let Frame::Surface { texture, .. } = self {
            texture.present();
        }
    }
}

pub struct Context {
    pub index: usize,
    pub name: String,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub buffers: ParticleBuffers,
    pub compute: ComputeStage,
    pub render: RenderStage,
    pub camera: Camera,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    offscreen: Option<wgpu::Texture>,
}

impl Context {
    fn new(
        adapter: &wgpu::Adapter,
        index: usize,
        body_count: BodyCount,
        config: &SimulationConfig,
        surface: Option<&wgpu::Surface<'static>>,
        (width, height): (u32, u32),
        present_mode: wgpu::PresentMode,
    ) -> Result<Self> {
        let info = adapter.get_info();
        let name = adapter_label(&info);
        log::info!("✓ Using GPU: {}", name);

        let (device, queue) = pollster::block_on(open_device(adapter))?;

        let (format, surface_config, offscreen) = match surface {
            Some(surface) => {
                let caps = surface.get_capabilities(adapter);
                let format = pick_surface_format(&caps.formats)?;
                let surface_config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width,
                    height,
                    present_mode,
                    alpha_mode: caps
                        .alpha_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                (format, Some(surface_config), None)
            }
            None => {
                let texture = scoped(&device, "offscreen target", || {
                    device.create_texture(&wgpu::TextureDescriptor {
                        label: Some("Offscreen Target"),
                        size: wgpu::Extent3d {
                            width,
                            height,
                            depth_or_array_layers: 1,
                        },
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format: OFFSCREEN_FORMAT,
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        view_formats: &[],
                    })
                })?;
                (OFFSCREEN_FORMAT, None, Some(texture))
            }
        };

        let buffers = ParticleBuffers::new(&device, body_count)?;
        let compute = ComputeStage::new(
            &device,
            &buffers,
            SimulationParameters::new(body_count, config),
        )?;
        let camera = Camera::new(width, height);
        let render = RenderStage::new(&device, format, &buffers, &camera)?;

        Ok(Self {
            index,
            name,
            device,
            queue,
            buffers,
            compute,
            render,
            camera,
            surface_config,
            offscreen,
        })
    }

    pub fn body_count(&self) -> BodyCount {
        self.buffers.body_count()
    }

    /// Drain and copy the latest generation into host memory.
    pub fn snapshot(&self) -> Result<BodyState> {
        self.buffers.snapshot(&self.device, &self.queue)
    }
}

pub struct ContextManager {
    instance: wgpu::Instance,
    surface: Option<wgpu::Surface<'static>>,
    size: (u32, u32),
    present_mode: wgpu::PresentMode,
    config: SimulationConfig,
    active: Option<Context>,
}

impl ContextManager {
    pub fn windowed(
        window: Arc<Window>,
        present_mode: wgpu::PresentMode,
        config: SimulationConfig,
    ) -> Result<Self> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;

        Ok(Self {
            instance,
            surface: Some(surface),
            size: (size.width.max(1), size.height.max(1)),
            present_mode,
            config,
            active: None,
        })
    }

    pub fn headless(width: u32, height: u32, config: SimulationConfig) -> Self {
        Self {
            instance: wgpu::Instance::new(&wgpu::InstanceDescriptor::default()),
            surface: None,
            size: (width.max(1), height.max(1)),
            present_mode: wgpu::PresentMode::AutoNoVsync,
            config,
            active: None,
        }
    }

    pub fn available(&self) -> Vec<wgpu::Adapter> {
        enumerate_adapters(&self.instance, self.surface.as_ref())
    }

    pub fn context_count(&self) -> usize {
        self.available().len()
    }

    pub fn active(&self) -> Option<&Context> {
        self.active.as_ref()
    }

    /// Build a context on adapter `choice` holding `body_count` bodies.
    ///
    /// With `retain_state` and an unchanged body count the previous context's
    /// bodies are drained, read back and uploaded into the new one; otherwise
    /// the new context is seeded fresh. The previous context is replaced only
    /// once every step has succeeded.
    pub fn build<R: Rng>(
        &mut self,
        choice: usize,
        body_count: BodyCount,
        retain_state: bool,
        rng: &mut R,
    ) -> Result<()> {
        let previous = self.active.as_ref().map(Context::body_count);
        let migration = Migration::plan(previous, body_count, retain_state);
        if retain_state && migration == Migration::Reseed && previous.is_some() {
            log::warn!(
                "Body count changed from {:?} to {}; reseeding instead of migrating",
                previous,
                body_count
            );
        }

        let retained = match (migration, &self.active) {
            (Migration::Retain, Some(context)) => Some(context.snapshot()?),
            _ => None,
        };

        let adapters = self.available();
        if adapters.is_empty() {
            return Err(SimulationError::NoAdapter);
        }
        let adapter = adapters
            .get(choice)
            .ok_or(SimulationError::AdapterIndex {
                index: choice,
                available: adapters.len(),
            })?;

        let context = Context::new(
            adapter,
            choice,
            body_count,
            &self.config,
            self.surface.as_ref(),
            self.size,
            self.present_mode,
        )?;

        match retained {
            Some(state) => context.buffers.upload(&context.queue, &state)?,
            None => {
                context
                    .buffers
                    .seed(&context.device, &context.queue, self.config.radius, rng)?
            }
        }

        if let (Some(surface), Some(surface_config)) = (&self.surface, &context.surface_config) {
            configure_surface(surface, &context.device, surface_config)?;
        }

        log::info!(
            "✓ Context {} ready: {} bodies on {} ({:?})",
            choice,
            body_count,
            context.name,
            migration
        );
        self.active = Some(context);
        Ok(())
    }

    /// Reseed the active context in place.
    pub fn reseed<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        let Some(context) = &self.active else {
            return Ok(());
        };
        context
            .buffers
            .seed(&context.device, &context.queue, self.config.radius, rng)
    }

    /// Follow a window resize: reconfigure the surface and refresh the
    /// projection for the new aspect ratio.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.size = (width, height);

        let Some(context) = &mut self.active else {
            return Ok(());
        };
        context.camera.resize(width, height);
        context.render.update_camera(&context.queue, &context.camera);

        if let (Some(surface), Some(surface_config)) =
            (&self.surface, &mut context.surface_config)
        {
            surface_config.width = width;
            surface_config.height = height;
            configure_surface(surface, &context.device, surface_config)?;
        }
        Ok(())
    }

    /// Reapply the current surface configuration after a lost or outdated surface.
    pub fn reconfigure(&self) -> Result<()> {
        if let (Some(surface), Some(context)) = (&self.surface, &self.active) {
            if let Some(surface_config) = &context.surface_config {
                configure_surface(surface, &context.device, surface_config)?;
            }
        }
        Ok(())
    }

    /// Acquire the next frame target together with the active context.
    pub fn next_frame(&mut self) -> Result<Option<(Frame, &mut Context)>> {
        let Some(context) = self.active.as_mut() else {
            return Ok(None);
        };

        let frame = match (&self.surface, &context.offscreen) {
            (Some(surface), _) => {
                let texture = surface.get_current_texture()?;
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Frame::Surface { texture, view }
            }
            (None, Some(offscreen)) => Frame::Offscreen {
                view: offscreen.create_view(&wgpu::TextureViewDescriptor::default()),
            },
            (None, None) => return Ok(None),
        };

        Ok(Some((frame, context)))
    }
}
