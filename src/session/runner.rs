use super::{SessionClock, SessionLimits, SessionOutcome, StopReason};
use crate::detector::MotionDetector;
use crate::error::{KinetrackError, Result};
use crate::events::{EventBus, KinetrackEvent};
use crate::result::AnalysisResult;
use crate::source::{LandmarkSource, SourceMetadata};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One analysis run: a sequential fold of a landmark source into a detector.
///
/// The session owns both ends for its whole lifetime; nothing is shared with
/// other sessions, so replaying the same frames always gives the same result.
pub struct AnalysisSession {
    id: Uuid,
    user_id: u64,
    source: Box<dyn LandmarkSource>,
    detector: Box<dyn MotionDetector>,
    limits: SessionLimits,
    cancellation_token: CancellationToken,
    event_bus: Option<EventBus>,
}

impl AnalysisSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run the frame loop to completion and finalize the result
    pub async fn run(mut self) -> Result<SessionOutcome> {
        let activity = self.detector.activity();
        let source_ref = self.source.source_ref();
        let started = Instant::now();

        info!(
            "Starting {} analysis session {} on {} ({:?})",
            activity, self.id, source_ref, self.limits
        );
        self.emit(KinetrackEvent::AnalysisStarted {
            session_id: self.id,
            activity,
            source_ref: source_ref.clone(),
            timestamp: SystemTime::now(),
        });

        let mut frames_read = 0u64;
        let mut frames_with_pose = 0u64;
        let mut last_count = self.detector.count();
        let mut was_ready = self.detector.is_ready();

        let stop_reason = loop {
            if self.cancellation_token.is_cancelled() {
                info!("Session {} cancelled after {} frames", self.id, frames_read);
                break StopReason::Cancelled;
            }

            if let Some(limit) = self.limits.duration_limit {
                if started.elapsed() >= limit {
                    info!("Session {} reached its {:?} limit", self.id, limit);
                    break StopReason::TimeLimit;
                }
            }

            let frame = match self.source.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => break StopReason::EndOfStream,
                Err(e) => {
                    warn!(
                        "Frame read failed after {} frames, finalizing partial result: {}",
                        frames_read, e
                    );
                    self.emit(KinetrackEvent::SourceEnded {
                        session_id: self.id,
                        reason: e.to_string(),
                    });
                    break StopReason::SourceFailure(e.to_string());
                }
            };
            frames_read += 1;

            let Some(pose) = frame.pose.as_ref() else {
                debug!("No pose detected in frame {}", frame.index);
                continue;
            };
            frames_with_pose += 1;

            self.detector.observe(pose);

            let count = self.detector.count();
            debug_assert!(count >= last_count, "detector counter decreased");
            if count > last_count {
                last_count = count;
                self.emit(KinetrackEvent::CounterAdvanced {
                    session_id: self.id,
                    activity,
                    count,
                    frame_index: frame.index,
                });
            }

            if !was_ready && self.detector.is_ready() {
                was_ready = true;
                self.emit(KinetrackEvent::DetectorReady {
                    session_id: self.id,
                    frame_index: frame.index,
                });
            }

            if self.detector.is_complete() {
                break StopReason::DetectorComplete;
            }
        };

        let duration = self.session_duration(started.elapsed(), frames_read, &stop_reason);
        let metric = self.detector.finalize(duration);
        let result = AnalysisResult::new(self.user_id, source_ref, frames_read, metric);

        info!(
            "Session {} finished ({}): {} frames, {} with pose, {:.2}s",
            self.id,
            stop_reason,
            frames_read,
            frames_with_pose,
            duration.as_secs_f64()
        );
        self.emit(KinetrackEvent::AnalysisCompleted {
            session_id: self.id,
            activity,
            summary: result.summary(),
            timestamp: SystemTime::now(),
        });

        Ok(SessionOutcome {
            result,
            stop_reason,
            frames_read,
            frames_with_pose,
            duration,
        })
    }

    fn session_duration(
        &self,
        elapsed: Duration,
        frames_read: u64,
        stop_reason: &StopReason,
    ) -> Duration {
        match self.limits.clock {
            SessionClock::Live => match self.limits.duration_limit {
                Some(limit) => elapsed.min(limit),
                None => elapsed,
            },
            SessionClock::File => {
                let metadata = self.source.metadata();
                if *stop_reason == StopReason::EndOfStream {
                    metadata.duration(frames_read)
                } else {
                    // Stopped early: only the frames actually consumed count
                    SourceMetadata {
                        frame_count: None,
                        ..metadata
                    }
                    .duration(frames_read)
                }
            }
        }
    }

    fn emit(&self, event: KinetrackEvent) {
        let Some(bus) = &self.event_bus else {
            return;
        };
        if !bus.has_subscribers() {
            return;
        }
        if let Err(e) = bus.publish(event) {
            debug!("Dropped session event: {}", e);
        }
    }
}

/// Builder for AnalysisSession
pub struct AnalysisSessionBuilder {
    user_id: u64,
    source: Option<Box<dyn LandmarkSource>>,
    detector: Option<Box<dyn MotionDetector>>,
    limits: SessionLimits,
    cancellation_token: Option<CancellationToken>,
    event_bus: Option<EventBus>,
}

impl AnalysisSessionBuilder {
    pub fn new() -> Self {
        Self {
            user_id: 0,
            source: None,
            detector: None,
            limits: SessionLimits::default(),
            cancellation_token: None,
            event_bus: None,
        }
    }

    pub fn user_id(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn source(mut self, source: Box<dyn LandmarkSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn detector(mut self, detector: Box<dyn MotionDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<AnalysisSession> {
        let source = self.source.ok_or_else(|| {
            KinetrackError::component("analysis_session_builder", "Landmark source is required")
        })?;

        let detector = self.detector.ok_or_else(|| {
            KinetrackError::component("analysis_session_builder", "Detector is required")
        })?;

        Ok(AnalysisSession {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            source,
            detector,
            limits: self.limits,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
            event_bus: self.event_bus,
        })
    }
}

impl Default for AnalysisSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
