//! Per-activity motion event detectors.
//!
//! Each detector is a small state machine folded over landmark frames. A frame
//! missing any joint the detector needs is skipped without touching state.

mod jump;
mod punch;
mod pushup;
mod window;

pub use jump::{RunningExtremesJumpEstimator, StabilizedJumpEstimator};
pub use punch::PunchCounter;
pub use pushup::{PushupCounter, PushupStage};
pub use window::RollingWindow;

use crate::config::{JumpVariant, KinetrackConfig};
use crate::landmark::LandmarkFrame;
use crate::result::{Activity, ActivityMetric};
use std::time::Duration;

/// Stateful fold over landmark frames for one activity run
pub trait MotionDetector: Send {
    /// Activity this detector measures
    fn activity(&self) -> Activity;

    /// Feed one detected pose
    fn observe(&mut self, frame: &LandmarkFrame);

    /// Repetitions (or detected jumps) so far; never decreases
    fn count(&self) -> u32;

    /// Whether the detector has passed any warm-up gate
    fn is_ready(&self) -> bool {
        true
    }

    /// Whether the detector needs no further frames
    fn is_complete(&self) -> bool {
        false
    }

    /// Reduce the accumulated state to the final metric
    fn finalize(&self, duration: Duration) -> ActivityMetric;
}

/// Build a fresh detector for `activity` from configuration
pub fn build_detector(activity: Activity, config: &KinetrackConfig) -> Box<dyn MotionDetector> {
    match activity {
        Activity::Pushups => Box::new(PushupCounter::new(config.pushup.clone())),
        Activity::Jump => match config.jump.variant {
            JumpVariant::Stabilized => Box::new(StabilizedJumpEstimator::new(config.jump.clone())),
            JumpVariant::RunningExtremes => {
                Box::new(RunningExtremesJumpEstimator::new(config.jump.clone()))
            }
        },
        Activity::Punches => Box::new(PunchCounter::new(config.punch.clone())),
    }
}
