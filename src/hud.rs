use crate::orchestrator::ThroughputSample;
use nbody_physics::BodyCount;
use std::fmt;

/// Status line shown in the window title
#[derive(Debug, Clone, PartialEq)]
pub struct HudReport {
    pub device: String,
    pub body_count: BodyCount,
    pub sample: Option<ThroughputSample>,
}

impl fmt::Display for HudReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (fps, gflops) = self
            .sample
            .map_or((0.0, 0.0), |sample| (sample.fps, sample.gflops));
        write!(
            f,
            "Device: {} | Bodies: {} | FPS: {:.1} | GFLOP/s: {:.1}",
            self.device, self.body_count, fps, gflops
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let report = HudReport {
            device: "Test GPU (Vulkan)".to_string(),
            body_count: BodyCount::default(),
            sample: Some(ThroughputSample {
                fps: 59.96,
                gflops: 338.04,
            }),
        };
        assert_eq!(
            report.to_string(),
            "Device: Test GPU (Vulkan) | Bodies: 16384 | FPS: 60.0 | GFLOP/s: 338.0"
        );
    }

    #[test]
    fn test_before_first_sample() {
        let report = HudReport {
            device: "cpu".to_string(),
            body_count: BodyCount::MIN,
            sample: None,
        };
        assert_eq!(
            report.to_string(),
            "Device: cpu | Bodies: 64 | FPS: 0.0 | GFLOP/s: 0.0"
        );
    }
}
