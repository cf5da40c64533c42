//! Per-refresh frame sequencing and throughput accounting

use crate::context::ContextManager;
use nbody_physics::{BodyCount, FLOPS_PER_PAIR};
use nbody_simulation::Result;
use std::time::{Duration, Instant};

const SAMPLE_INTERVAL: Duration = Duration::from_millis(1000);

/// Where the orchestrator is within one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    Idle,
    ComputeIssued,
    RenderIssued,
    Presented,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThroughputSample {
    pub fps: f64,
    pub gflops: f64,
}

impl ThroughputSample {
    /// Rates for `frames` all-pairs steps over `body_count` bodies in `elapsed`
    pub fn measure(frames: u32, body_count: BodyCount, elapsed: Duration) -> Self {
        let seconds = elapsed.as_secs_f64().max(f64::EPSILON);
        let n = body_count.get() as f64;
        let frames = frames as f64;
        Self {
            fps: frames / seconds,
            gflops: frames * n * n * FLOPS_PER_PAIR / seconds * 1e-9,
        }
    }
}

/// Frame counter sampled at most once per second
#[derive(Debug, Clone)]
pub struct ThroughputCounter {
    frames: u32,
    last_sample: Instant,
    latest: Option<ThroughputSample>,
}

impl ThroughputCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            last_sample: now,
            latest: None,
        }
    }

    /// Count one frame; returns a fresh sample once a full interval has passed.
    pub fn record_frame(
        &mut self,
        now: Instant,
        body_count: BodyCount,
    ) -> Option<ThroughputSample> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.last_sample);
        if elapsed < SAMPLE_INTERVAL {
            return None;
        }

        let sample = ThroughputSample::measure(self.frames, body_count, elapsed);
        self.frames = 0;
        self.last_sample = now;
        self.latest = Some(sample);
        Some(sample)
    }

    pub fn latest(&self) -> Option<ThroughputSample> {
        self.latest
    }
}

pub struct FrameOrchestrator {
    state: FrameState,
    throughput: ThroughputCounter,
}

impl FrameOrchestrator {
    pub fn new(now: Instant) -> Self {
        Self {
            state: FrameState::Idle,
            throughput: ThroughputCounter::new(now),
        }
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn latest_sample(&self) -> Option<ThroughputSample> {
        self.throughput.latest()
    }

    /// Run one frame: compute `current`→`next`, draw `next`, present, swap.
    ///
    /// Compute and render are recorded into a single command buffer, so the
    /// queue orders the render pass after the dispatch without a CPU wait.
    pub fn tick(&mut self, contexts: &mut ContextManager, now: Instant) -> Result<()> {
        debug_assert_eq!(self.state, FrameState::Idle);

        let Some((frame, context)) = contexts.next_frame()? else {
            return Ok(());
        };

        if let Some(sample) = self.throughput.record_frame(now, context.body_count()) {
            log::info!(
                "{} bodies: {:.1} FPS, {:.1} GFLOP/s",
                context.body_count(),
                sample.fps,
                sample.gflops
            );
        }

        let role = context.buffers.role();
        let mut encoder = context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        context.compute.encode(&mut encoder, role);
        self.state = FrameState::ComputeIssued;

        context.render.encode(&mut encoder, frame.view(), role);
        self.state = FrameState::RenderIssued;

        context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.state = FrameState::Presented;

        context.buffers.swap();
        self.state = FrameState::Idle;
        Ok(())
    }
}
