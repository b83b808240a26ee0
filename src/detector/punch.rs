use super::MotionDetector;
use crate::config::PunchConfig;
use crate::landmark::{Joint, LandmarkFrame};
use crate::result::{Activity, ActivityMetric, RepetitionRate};
use std::time::Duration;
use tracing::debug;

/// Counts punches as rising edges of horizontal wrist speed.
///
/// Speed is the per-frame change of the wrist x coordinate. A punch starts when
/// the speed exceeds `punch_threshold` while idle; the detector only rearms once
/// the speed drops below `reset_threshold`.
#[derive(Debug, Clone)]
pub struct PunchCounter {
    config: PunchConfig,
    prev_x: Option<f64>,
    punching: bool,
    count: u32,
}

impl PunchCounter {
    pub fn new(config: PunchConfig) -> Self {
        Self {
            config,
            prev_x: None,
            punching: false,
            count: 0,
        }
    }

    pub fn is_punching(&self) -> bool {
        self.punching
    }
}

impl MotionDetector for PunchCounter {
    fn activity(&self) -> Activity {
        Activity::Punches
    }

    fn observe(&mut self, frame: &LandmarkFrame) {
        let Some(wrist) = frame.get(Joint::wrist(self.config.hand)) else {
            return;
        };
        let x = wrist.x;

        if let Some(prev_x) = self.prev_x {
            let speed = (x - prev_x).abs();
            if speed > self.config.punch_threshold && !self.punching {
                self.count += 1;
                self.punching = true;
                debug!("Punch {} detected (speed {:.3})", self.count, speed);
            } else if speed < self.config.reset_threshold {
                self.punching = false;
            }
        }
        self.prev_x = Some(x);
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn finalize(&self, duration: Duration) -> ActivityMetric {
        ActivityMetric::Punches(RepetitionRate::new(self.count, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BodySide;

    fn wrist(x: f64) -> LandmarkFrame {
        LandmarkFrame::new(1.0).with(Joint::RightWrist, x, 0.5)
    }

    fn run(xs: &[f64]) -> PunchCounter {
        let mut counter = PunchCounter::new(PunchConfig::default());
        for &x in xs {
            counter.observe(&wrist(x));
        }
        counter
    }

    #[test]
    fn test_rising_edges_with_reset() {
        let counter = run(&[0.0, 0.10, 0.10, 0.10, 0.005, 0.10]);
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_sustained_fast_motion_counts_once() {
        // Every step is fast; nothing ever drops below the reset threshold
        let counter = run(&[0.0, 0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(counter.count(), 1);
        assert!(counter.is_punching());
    }

    #[test]
    fn test_hysteresis_band_does_not_rearm() {
        // 0.03 per frame sits between reset (0.01) and punch (0.05)
        let counter = run(&[0.0, 0.1, 0.13, 0.16, 0.3]);
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_first_frame_only_seeds_position() {
        let counter = run(&[0.9]);
        assert_eq!(counter.count(), 0);
        assert!(!counter.is_punching());
    }

    #[test]
    fn test_tracks_configured_hand() {
        let mut counter = PunchCounter::new(PunchConfig {
            hand: BodySide::Left,
            ..PunchConfig::default()
        });
        for x in [0.0, 0.2, 0.2, 0.4] {
            counter.observe(&wrist(x));
        }
        assert_eq!(counter.count(), 0);

        for x in [0.0, 0.2, 0.2, 0.4] {
            counter.observe(&LandmarkFrame::new(1.0).with(Joint::LeftWrist, x, 0.5));
        }
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn test_undetected_frames_do_not_update_position() {
        let mut counter = PunchCounter::new(PunchConfig::default());
        counter.observe(&wrist(0.0));
        counter.observe(&LandmarkFrame::new(1.0));
        counter.observe(&wrist(0.02));
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn test_count_never_decreases() {
        let mut counter = PunchCounter::new(PunchConfig::default());
        let mut last = 0;
        for i in 0..300u32 {
            let x = 0.5 + 0.3 * ((i as f64) * 1.3).sin();
            counter.observe(&wrist(x));
            assert!(counter.count() >= last);
            last = counter.count();
        }
    }

    #[test]
    fn test_zero_duration_rates() {
        let counter = run(&[0.0, 0.10, 0.0]);
        match counter.finalize(Duration::ZERO) {
            ActivityMetric::Punches(rate) => {
                assert_eq!(rate.total, 1);
                assert_eq!(rate.duration_sec, 0.0);
                assert_eq!(rate.per_sec, 0.0);
                assert_eq!(rate.per_min, 0.0);
            }
            other => panic!("unexpected metric: {:?}", other),
        }
    }
}
