//! Gravitational N-Body Simulation
//!
//! Direct all-pairs integration on the GPU with the result drawn as an
//! additively blended point cloud.

mod config;
mod context;
mod hud;
mod input;
mod orchestrator;
mod session;

use anyhow::Context as _;
use clap::Parser;
use config::Config;
use context::ContextManager;
use input::command_for_key;
use nbody_simulation::{drain, SimulationError};
use orchestrator::ThroughputSample;
use rand::rngs::StdRng;
use rand::SeedableRng;
use session::{Control, SimulationSession};
use std::sync::Arc;
use std::time::Instant;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{ModifiersState, PhysicalKey},
    window::{Window, WindowId},
};

struct App {
    config: Config,
    window: Option<Arc<Window>>,
    session: Option<SimulationSession>,
    modifiers: ModifiersState,
    title: String,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            session: None,
            modifiers: ModifiersState::empty(),
            title: String::new(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("N-Body Simulation")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.width,
                self.config.height,
            ));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("failed to create window")?,
        );

        let contexts = ContextManager::windowed(
            window.clone(),
            self.config.present_mode(),
            self.config.simulation(),
        )?;
        for (index, adapter) in contexts.available().iter().enumerate() {
            log::info!("  [{index}] {}", nbody_simulation::adapter_label(&adapter.get_info()));
        }

        let session = SimulationSession::new(
            contexts,
            self.config.device,
            self.config.bodies,
            StdRng::from_os_rng(),
        )
        .context("failed to build the initial context")?;

        self.window = Some(window);
        self.session = Some(session);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let (Some(window), Some(session)) = (&self.window, &mut self.session) else {
            return;
        };

        match session.frame(Instant::now()) {
            Ok(()) => {
                if let Some(hud) = session.hud() {
                    let title = hud.to_string();
                    if title != self.title {
                        window.set_title(&title);
                        if hud.sample.is_some() {
                            log::info!("{title}");
                        }
                        self.title = title;
                    }
                }
            }
            Err(SimulationError::Surface(
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated,
            )) => {
                if let Err(e) = session.reconfigure() {
                    self.fail(event_loop, e.into());
                }
            }
            Err(SimulationError::Surface(wgpu::SurfaceError::Timeout)) => {
                log::warn!("Surface timed out, skipping frame");
            }
            Err(e) => self.fail(event_loop, e.into()),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(e) = self.start(event_loop) {
                self.fail(event_loop, e);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                let Some(command) = command_for_key(key_code, self.modifiers) else {
                    return;
                };
                let Some(session) = &mut self.session else {
                    return;
                };
                log::debug!("{command:?}");
                match session.apply(command) {
                    Ok(Control::Exit) => event_loop.exit(),
                    Ok(Control::Continue) => {}
                    Err(e) => log::error!("{command:?} failed: {e}"),
                }
            }

            WindowEvent::Resized(physical_size) => {
                if let Some(session) = &mut self.session {
                    if let Err(e) = session.resize(physical_size.width, physical_size.height) {
                        log::error!("Resize failed: {e}");
                    }
                }
            }

            WindowEvent::RedrawRequested => self.redraw(event_loop),

            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

/// Run `config.frames` frames offscreen and report the overall throughput.
fn run_headless(config: &Config) -> anyhow::Result<()> {
    let contexts = ContextManager::headless(config.width, config.height, config.simulation());
    let mut session = SimulationSession::new(
        contexts,
        config.device,
        config.bodies,
        StdRng::from_os_rng(),
    )
    .context("failed to build the headless context")?;

    let start = Instant::now();
    for _ in 0..config.frames {
        session.frame(Instant::now())?;
    }
    if let Some(context) = session.contexts().active() {
        drain(&context.device)?;
    }
    let elapsed = start.elapsed();

    let sample = ThroughputSample::measure(config.frames, session.body_count(), elapsed);
    if let Some(mut hud) = session.hud() {
        hud.sample = Some(sample);
        log::info!("{hud}");
    }
    log::info!("{} frames in {:.2?}", config.frames, elapsed);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logger (RUST_LOG=debug for verbose output)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    log::info!("Starting N-body simulation with {} bodies...", config.bodies);

    if config.headless {
        return run_headless(&config);
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
