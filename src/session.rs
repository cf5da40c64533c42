//! Simulation session: the active context, frame loop state and body count

use crate::context::ContextManager;
use crate::hud::HudReport;
use crate::input::Command;
use crate::orchestrator::{FrameOrchestrator, FrameState};
use nbody_physics::BodyCount;
use nbody_simulation::{Result, SimulationError};
use rand::rngs::StdRng;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Exit,
}

pub struct SimulationSession {
    contexts: ContextManager,
    orchestrator: FrameOrchestrator,
    body_count: BodyCount,
    rng: StdRng,
}

impl SimulationSession {
    /// Build the first context on adapter `device` with freshly seeded bodies.
    pub fn new(
        mut contexts: ContextManager,
        device: usize,
        body_count: BodyCount,
        mut rng: StdRng,
    ) -> Result<Self> {
        contexts.build(device, body_count, false, &mut rng)?;
        Ok(Self {
            contexts,
            orchestrator: FrameOrchestrator::new(Instant::now()),
            body_count,
            rng,
        })
    }

    pub fn body_count(&self) -> BodyCount {
        self.body_count
    }

    pub fn context_index(&self) -> Option<usize> {
        self.contexts.active().map(|context| context.index)
    }

    pub fn frame_state(&self) -> FrameState {
        self.orchestrator.state()
    }

    pub fn contexts(&self) -> &ContextManager {
        &self.contexts
    }

    /// Carry out a keyboard command.
    ///
    /// A rebuild that fails is logged and abandoned; the previous context
    /// stays active and the session carries on with it.
    pub fn apply(&mut self, command: Command) -> Result<Control> {
        debug_assert_eq!(self.frame_state(), FrameState::Idle);

        match command {
            Command::Quit => return Ok(Control::Exit),
            Command::Reseed => {
                log::info!("Reseeding {} bodies", self.body_count);
                self.contexts.reseed(&mut self.rng)?;
            }
            Command::NextContext => {
                let available = self.contexts.context_count();
                if available == 0 {
                    return Err(SimulationError::NoAdapter);
                }
                let next = self.context_index().map_or(0, |index| (index + 1) % available);
                self.rebuild(next, self.body_count, true);
            }
            Command::GrowBodyCount => match self.body_count.grown() {
                Some(count) => self.resize_bodies(count),
                None => log::info!("Already at the maximum of {} bodies", BodyCount::MAX),
            },
            Command::ShrinkBodyCount => match self.body_count.shrunk() {
                Some(count) => self.resize_bodies(count),
                None => log::info!("Already at the minimum of {} bodies", BodyCount::MIN),
            },
        }

        Ok(Control::Continue)
    }

    fn resize_bodies(&mut self, count: BodyCount) {
        let index = self.context_index().unwrap_or(0);
        if self.rebuild(index, count, false) {
            self.body_count = count;
        }
    }

    fn rebuild(&mut self, index: usize, count: BodyCount, retain_state: bool) -> bool {
        match self.contexts.build(index, count, retain_state, &mut self.rng) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Context rebuild failed, keeping the previous context: {e}");
                false
            }
        }
    }

    /// Run one compute + render frame.
    pub fn frame(&mut self, now: Instant) -> Result<()> {
        self.orchestrator.tick(&mut self.contexts, now)
    }

    pub fn hud(&self) -> Option<HudReport> {
        let context = self.contexts.active()?;
        Some(HudReport {
            device: context.name.clone(),
            body_count: self.body_count,
            sample: self.orchestrator.latest_sample(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.contexts.resize(width, height)
    }

    pub fn reconfigure(&self) -> Result<()> {
        self.contexts.reconfigure()
    }

    /// Read back the active context's `current` bodies.
    #[cfg(test)]
    pub fn snapshot(&self) -> Result<nbody_physics::BodyState> {
        self.contexts
            .active()
            .ok_or(SimulationError::NoAdapter)?
            .snapshot()
    }
}
