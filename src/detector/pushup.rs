use super::MotionDetector;
use crate::config::PushupConfig;
use crate::landmark::{Joint, LandmarkFrame};
use crate::result::{Activity, ActivityMetric, RepetitionRate};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushupStage {
    Down,
    Up,
}

/// Counts push-ups from the vertical order of one shoulder and elbow.
///
/// Shoulder below the elbow (larger y) puts the counter in `Down`; shoulder back
/// above the elbow while `Down` completes a repetition.
#[derive(Debug, Clone)]
pub struct PushupCounter {
    config: PushupConfig,
    stage: Option<PushupStage>,
    counter: u32,
}

impl PushupCounter {
    pub fn new(config: PushupConfig) -> Self {
        Self {
            config,
            stage: None,
            counter: 0,
        }
    }

    pub fn stage(&self) -> Option<PushupStage> {
        self.stage
    }
}

impl MotionDetector for PushupCounter {
    fn activity(&self) -> Activity {
        Activity::Pushups
    }

    fn observe(&mut self, frame: &LandmarkFrame) {
        let (Some(shoulder), Some(elbow)) = (
            frame.get(Joint::shoulder(self.config.side)),
            frame.get(Joint::elbow(self.config.side)),
        ) else {
            return;
        };

        if shoulder.y > elbow.y {
            self.stage = Some(PushupStage::Down);
        }
        if shoulder.y < elbow.y && self.stage == Some(PushupStage::Down) {
            self.stage = Some(PushupStage::Up);
            self.counter += 1;
            debug!("Push-up {} counted", self.counter);
        }
    }

    fn count(&self) -> u32 {
        self.counter
    }

    fn finalize(&self, duration: Duration) -> ActivityMetric {
        ActivityMetric::Pushups(RepetitionRate::new(self.counter, duration))
    }
}
