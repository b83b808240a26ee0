mod runner;


pub use runner::{AnalysisSession, AnalysisSessionBuilder};

use crate::config::SessionConfig;
use crate::result::AnalysisResult;
use std::fmt;
use std::time::Duration;

/// How a session measures its duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionClock {
    /// Duration comes from the recording's frame count and frame rate
    File,
    /// Duration is wall-clock time spent in the frame loop
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub clock: SessionClock,
    /// Checked once per frame, before the next read
    pub duration_limit: Option<Duration>,
}

impl SessionLimits {
    pub fn file(duration_limit: Option<Duration>) -> Self {
        Self {
            clock: SessionClock::File,
            duration_limit,
        }
    }

    pub fn live(duration_limit: Duration) -> Self {
        Self {
            clock: SessionClock::Live,
            duration_limit: Some(duration_limit),
        }
    }

    pub fn from_config(config: &SessionConfig, live: bool) -> Self {
        if live {
            Self::live(config.live_duration_limit())
        } else {
            Self::file(config.file_duration_limit())
        }
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::file(None)
    }
}

/// Why the frame loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    DetectorComplete,
    TimeLimit,
    Cancelled,
    /// A frame read failed; the state accumulated so far was still finalized
    SourceFailure(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStream => f.write_str("end of stream"),
            StopReason::DetectorComplete => f.write_str("detector complete"),
            StopReason::TimeLimit => f.write_str("time limit reached"),
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::SourceFailure(details) => write!(f, "source failure: {}", details),
        }
    }
}

/// Everything a finished session reports
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub result: AnalysisResult,
    pub stop_reason: StopReason,
    pub frames_read: u64,
    pub frames_with_pose: u64,
    pub duration: Duration,
}
