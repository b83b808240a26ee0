use super::{MotionDetector, RollingWindow};
use crate::config::{JumpConfig, JumpVariant};
use crate::landmark::{Joint, LandmarkFrame};
use crate::result::{Activity, ActivityMetric};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Shoulder height and normalized body extent (ankle_y - shoulder_y) for one frame
fn sample(frame: &LandmarkFrame, config: &JumpConfig) -> Option<(f64, f64)> {
    let shoulder = frame.get(Joint::shoulder(config.side))?;
    let ankle = frame.get(Joint::ankle(config.side))?;
    Some((shoulder.y, ankle.y - shoulder.y))
}

/// Running mean of every body-extent sample in a session
#[derive(Debug, Clone, Default)]
struct ExtentMean {
    sum: f64,
    samples: u64,
}

impl ExtentMean {
    fn push(&mut self, extent: f64) {
        self.sum += extent;
        self.samples += 1;
    }

    /// Centimeters per normalized unit, if the mean extent can scale anything
    fn scale(&self, user_height_cm: f64) -> Option<f64> {
        if self.samples == 0 {
            return None;
        }
        let mean = self.sum / self.samples as f64;
        (mean > 0.0).then(|| user_height_cm / mean)
    }
}

/// Measures the first jump after the subject has stood still and fully visible.
///
/// Readiness needs more than `stability_window` samples whose most recent window
/// is tall enough and steady enough. The shoulder position at that moment is the
/// baseline; the jump completes once the shoulder comes back within
/// `landing_tolerance` of the baseline after rising at least `min_displacement`.
#[derive(Debug, Clone)]
pub struct StabilizedJumpEstimator {
    config: JumpConfig,
    window: RollingWindow,
    extents: ExtentMean,
    ready: bool,
    baseline: Option<f64>,
    apex: Option<f64>,
    complete: bool,
    height_cm: Option<f64>,
}

impl StabilizedJumpEstimator {
    pub fn new(config: JumpConfig) -> Self {
        Self {
            window: RollingWindow::new(config.stability_window),
            config,
            extents: ExtentMean::default(),
            ready: false,
            baseline: None,
            apex: None,
            complete: false,
            height_cm: None,
        }
    }

    pub fn baseline(&self) -> Option<f64> {
        self.baseline
    }

    pub fn apex(&self) -> Option<f64> {
        self.apex
    }

    fn check_stability(&mut self, shoulder_y: f64) {
        if self.extents.samples <= self.config.stability_window as u64 {
            return;
        }

        let (Some(mean), Some(variance)) = (self.window.mean(), self.window.variance()) else {
            return;
        };

        if mean > self.config.min_body_extent && variance < self.config.max_extent_variance {
            if !self.ready {
                info!(
                    "Subject stable (extent mean {:.3}, variance {:.5}), ready for jump",
                    mean, variance
                );
            }
            self.ready = true;

            if self.baseline.is_none() {
                debug!("Jump baseline latched at shoulder y = {:.4}", shoulder_y);
                self.baseline = Some(shoulder_y);
                self.apex = Some(shoulder_y);
            }
        }
    }
}

impl MotionDetector for StabilizedJumpEstimator {
    fn activity(&self) -> Activity {
        Activity::Jump
    }

    fn observe(&mut self, frame: &LandmarkFrame) {
        if self.complete {
            return;
        }
        let Some((shoulder_y, extent)) = sample(frame, &self.config) else {
            return;
        };

        self.window.push(extent);
        self.extents.push(extent);
        self.check_stability(shoulder_y);

        if !self.ready {
            return;
        }
        let (Some(baseline), Some(apex)) = (self.baseline, self.apex) else {
            return;
        };

        // Smaller y is higher in the frame
        let apex = apex.min(shoulder_y);
        self.apex = Some(apex);

        let landed = shoulder_y > baseline - self.config.landing_tolerance;
        let cleared = apex < baseline - self.config.min_displacement;
        if landed && cleared {
            self.complete = true;
            self.height_cm = self
                .extents
                .scale(self.config.user_height_cm)
                .map(|scale| (baseline - apex) * scale);

            match self.height_cm {
                Some(height) => info!("Jump detected: {:.2} cm", height),
                None => warn!("Jump detected but body extent cannot be scaled"),
            }
        }
    }

    fn count(&self) -> u32 {
        self.height_cm.is_some() as u32
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn is_complete(&self) -> bool {
        self.complete
    }

    fn finalize(&self, _duration: Duration) -> ActivityMetric {
        ActivityMetric::Jump {
            variant: JumpVariant::Stabilized,
            height_cm: self.height_cm,
        }
    }
}

/// Reports the spread between the lowest and highest shoulder seen over the
/// whole stream, scaled by subject height, minus the subject height itself.
///
/// The subtraction of the full subject height is kept as observed in the field
/// data this estimator reproduces; the magnitude is reported.
#[derive(Debug, Clone)]
pub struct RunningExtremesJumpEstimator {
    config: JumpConfig,
    ground: Option<f64>,
    apex: Option<f64>,
    extents: ExtentMean,
}

impl RunningExtremesJumpEstimator {
    pub fn new(config: JumpConfig) -> Self {
        Self {
            config,
            ground: None,
            apex: None,
            extents: ExtentMean::default(),
        }
    }

    pub fn ground(&self) -> Option<f64> {
        self.ground
    }

    pub fn apex(&self) -> Option<f64> {
        self.apex
    }
}

impl MotionDetector for RunningExtremesJumpEstimator {
    fn activity(&self) -> Activity {
        Activity::Jump
    }

    fn observe(&mut self, frame: &LandmarkFrame) {
        let Some((shoulder_y, extent)) = sample(frame, &self.config) else {
            return;
        };

        self.extents.push(extent);
        self.ground = Some(self.ground.map_or(shoulder_y, |g| g.max(shoulder_y)));
        self.apex = Some(self.apex.map_or(shoulder_y, |a| a.min(shoulder_y)));
    }

    fn count(&self) -> u32 {
        0
    }

    fn finalize(&self, _duration: Duration) -> ActivityMetric {
        let height_cm = match (self.ground, self.apex) {
            (Some(ground), Some(apex)) => self
                .extents
                .scale(self.config.user_height_cm)
                .map(|scale| ((ground - apex) * scale - self.config.user_height_cm).abs()),
            _ => None,
        };

        ActivityMetric::Jump {
            variant: JumpVariant::RunningExtremes,
            height_cm,
        }
    }
}
