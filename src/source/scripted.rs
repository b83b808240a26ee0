use super::{LandmarkSource, SourceMetadata};
use crate::error::{Result, SourceError};
use crate::landmark::{LandmarkFrame, PoseFrame};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

/// In-memory landmark source for replaying pre-computed frames
pub struct ScriptedSource {
    name: String,
    frames: VecDeque<PoseFrame>,
    metadata: SourceMetadata,
    frame_interval: Option<Duration>,
    fail_after: Option<usize>,
    delivered: usize,
}

impl ScriptedSource {
    pub fn new(name: impl Into<String>, frames: Vec<PoseFrame>) -> Self {
        Self {
            name: name.into(),
            frames: frames.into(),
            metadata: SourceMetadata::default(),
            frame_interval: None,
            fail_after: None,
            delivered: 0,
        }
    }

    /// Number frames sequentially; `None` entries are undetected frames
    pub fn from_poses(name: impl Into<String>, poses: Vec<Option<LandmarkFrame>>) -> Self {
        let frames = poses
            .into_iter()
            .enumerate()
            .map(|(i, pose)| match pose {
                Some(pose) => PoseFrame::detected(i as u64, pose),
                None => PoseFrame::empty(i as u64),
            })
            .collect();
        Self::new(name, frames)
    }

    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Pace delivery like a live camera
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// Fail the read after `frames` frames have been delivered
    pub fn with_failure_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }
}

#[async_trait]
impl LandmarkSource for ScriptedSource {
    fn source_ref(&self) -> String {
        self.name.clone()
    }

    fn metadata(&self) -> SourceMetadata {
        self.metadata
    }

    async fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        if let Some(interval) = self.frame_interval {
            tokio::time::sleep(interval).await;
        }

        if self.fail_after == Some(self.delivered) {
            return Err(SourceError::Read {
                last_index: self.delivered.checked_sub(1).map(|i| i as u64),
                details: "scripted read failure".to_string(),
            }
            .into());
        }

        let frame = self.frames.pop_front();
        if frame.is_some() {
            self.delivered += 1;
        }
        Ok(frame)
    }
}
