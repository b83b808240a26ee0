mod file;
mod scripted;

pub use file::LandmarkFileSource;
pub use scripted::ScriptedSource;

use crate::error::Result;
use crate::landmark::PoseFrame;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recording properties used to derive file-mode durations
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub fps: Option<f64>,
    #[serde(default)]
    pub frame_count: Option<u64>,
}

impl SourceMetadata {
    /// Duration of the recording as `frame_count / fps`, falling back to
    /// `frames_read / fps`; zero when the frame rate is unknown. Saturates at
    /// `Duration::MAX` instead of overflowing.
    pub fn duration(&self, frames_read: u64) -> Duration {
        match self.fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => {
                let frames = self.frame_count.unwrap_or(frames_read);
                Duration::try_from_secs_f64(frames as f64 / fps).unwrap_or(Duration::MAX)
            }
            _ => Duration::ZERO,
        }
    }
}

/// Producer of per-frame pose landmarks
#[async_trait]
pub trait LandmarkSource: Send {
    /// Reference recorded alongside results (file path, camera name, ...)
    fn source_ref(&self) -> String;

    fn metadata(&self) -> SourceMetadata;

    /// Next frame, or `None` at end of stream
    async fn next_frame(&mut self) -> Result<Option<PoseFrame>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_duration() {
        let meta = SourceMetadata {
            fps: Some(30.0),
            frame_count: Some(90),
        };
        assert_eq!(meta.duration(10), Duration::from_secs(3));

        let no_count = SourceMetadata {
            fps: Some(25.0),
            frame_count: None,
        };
        assert_eq!(no_count.duration(50), Duration::from_secs(2));

        assert_eq!(SourceMetadata::default().duration(500), Duration::ZERO);

        let zero_fps = SourceMetadata {
            fps: Some(0.0),
            frame_count: Some(100),
        };
        assert_eq!(zero_fps.duration(100), Duration::ZERO);
    }

    #[test]
    fn test_metadata_duration_saturates() {
        let huge = SourceMetadata {
            fps: Some(1.0),
            frame_count: Some(u64::MAX),
        };
        assert_eq!(huge.duration(0), Duration::MAX);

        let tiny_fps = SourceMetadata {
            fps: Some(1e-20),
            frame_count: Some(100),
        };
        assert_eq!(tiny_fps.duration(100), Duration::MAX);

        let infinite_fps = SourceMetadata {
            fps: Some(f64::INFINITY),
            frame_count: Some(100),
        };
        assert_eq!(infinite_fps.duration(100), Duration::ZERO);
    }
}
