use super::{LandmarkSource, SourceMetadata};
use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::landmark::PoseFrame;
use async_trait::async_trait;
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info, warn};

/// Header frame rates outside this range are treated as unknown
const PLAUSIBLE_FPS: RangeInclusive<f64> = 0.1..=1000.0;

/// One line of a landmark recording
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RecordLine {
    Header(SourceMetadata),
    Frame(PoseFrame),
}

/// Reads a JSON-lines landmark recording produced by an external pose estimator.
///
/// The optional first line is a header (`{"type":"header","fps":30,...}`); every
/// other line is a frame (`{"type":"frame","index":0,"pose":{...}}`) where a null
/// pose means nothing was detected.
pub struct LandmarkFileSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
    metadata: SourceMetadata,
    min_detection_confidence: f32,
    pending: Option<PoseFrame>,
    last_index: Option<u64>,
}

impl LandmarkFileSource {
    /// Open a recording and read its header, if any
    pub async fn open<P: AsRef<Path>>(path: P, config: &SourceConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await.map_err(|e| SourceError::Open {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;

        let mut source = Self {
            path,
            lines: BufReader::new(file).lines(),
            line_no: 0,
            metadata: SourceMetadata::default(),
            min_detection_confidence: config.min_detection_confidence,
            pending: None,
            last_index: None,
        };

        match source.read_record().await? {
            Some(RecordLine::Header(metadata)) => source.metadata = metadata,
            Some(RecordLine::Frame(frame)) => source.pending = Some(frame),
            None => {}
        }

        if let Some(fps) = source.metadata.fps {
            if !PLAUSIBLE_FPS.contains(&fps) {
                warn!(
                    "Ignoring implausible frame rate {} in {}",
                    fps,
                    source.path.display()
                );
                source.metadata.fps = None;
            }
        }

        if source.metadata.fps.is_none() && config.fallback_fps > 0.0 {
            source.metadata.fps = Some(config.fallback_fps);
        }

        info!(
            "Opened landmark recording {} (fps: {:?}, frames: {:?})",
            source.path.display(),
            source.metadata.fps,
            source.metadata.frame_count
        );

        Ok(source)
    }

    /// Next non-blank record
    async fn read_record(&mut self) -> Result<Option<RecordLine>> {
        loop {
            let line = self.lines.next_line().await.map_err(|e| SourceError::Read {
                last_index: self.last_index,
                details: e.to_string(),
            })?;

            let Some(line) = line else {
                return Ok(None);
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str(&line).map_err(|e| SourceError::Malformed {
                line: self.line_no,
                details: e.to_string(),
            })?;
            return Ok(Some(record));
        }
    }

    fn filter_confidence(&self, mut frame: PoseFrame) -> PoseFrame {
        if let Some(pose) = &frame.pose {
            if !pose.is_confident(self.min_detection_confidence) {
                debug!(
                    "Frame {} pose confidence {:.2} below {:.2}, treating as undetected",
                    frame.index, pose.confidence, self.min_detection_confidence
                );
                frame.pose = None;
            }
        }
        frame
    }
}

#[async_trait]
impl LandmarkSource for LandmarkFileSource {
    fn source_ref(&self) -> String {
        self.path.display().to_string()
    }

    fn metadata(&self) -> SourceMetadata {
        self.metadata
    }

    async fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        let frame = match self.pending.take() {
            Some(frame) => frame,
            None => match self.read_record().await? {
                Some(RecordLine::Frame(frame)) => frame,
                Some(RecordLine::Header(_)) => {
                    return Err(SourceError::Malformed {
                        line: self.line_no,
                        details: "header record after the first line".to_string(),
                    }
                    .into())
                }
                None => return Ok(None),
            },
        };

        self.last_index = Some(frame.index);
        Ok(Some(self.filter_confidence(frame)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KinetrackError;
    use crate::landmark::Joint;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn recording(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    const FRAME_0: &str = r#"{"type":"frame","index":0,"pose":{"confidence":0.9,"landmarks":{"right_wrist":{"x":0.1,"y":0.5}}}}"#;
    const FRAME_1: &str = r#"{"type":"frame","index":1,"pose":null}"#;
    const FRAME_2_LOW: &str = r#"{"type":"frame","index":2,"pose":{"confidence":0.2,"landmarks":{"right_wrist":{"x":0.3,"y":0.5}}}}"#;

    #[tokio::test]
    async fn test_reads_header_and_frames() {
        let file = recording(&[
            r#"{"type":"header","fps":30.0,"frame_count":3}"#,
            FRAME_0,
            "",
            FRAME_1,
            FRAME_2_LOW,
        ]);

        let mut source = LandmarkFileSource::open(file.path(), &SourceConfig {
            min_detection_confidence: 0.5,
            fallback_fps: 0.0,
        })
        .await
        .unwrap();

        assert_eq!(source.metadata().fps, Some(30.0));
        assert_eq!(source.metadata().frame_count, Some(3));

        let first = source.next_frame().await.unwrap().unwrap();
        let wrist = first.pose.unwrap();
        assert_eq!(wrist.get(Joint::RightWrist).unwrap().x, 0.1);

        let second = source.next_frame().await.unwrap().unwrap();
        assert!(second.pose.is_none());

        // Low-confidence detections are delivered as undetected frames
        let third = source.next_frame().await.unwrap().unwrap();
        assert_eq!(third.index, 2);
        assert!(third.pose.is_none());

        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_headerless_recording_uses_fallback_fps() {
        let file = recording(&[FRAME_0, FRAME_1]);

        let mut source = LandmarkFileSource::open(file.path(), &SourceConfig {
            min_detection_confidence: 0.5,
            fallback_fps: 24.0,
        })
        .await
        .unwrap();

        assert_eq!(source.metadata().fps, Some(24.0));
        assert_eq!(source.next_frame().await.unwrap().unwrap().index, 0);
        assert_eq!(source.next_frame().await.unwrap().unwrap().index, 1);
        assert!(source.next_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_implausible_header_fps_is_unknown() {
        let file = recording(&[r#"{"type":"header","fps":1e-20,"frame_count":100}"#, FRAME_0]);

        let source = LandmarkFileSource::open(file.path(), &SourceConfig {
            min_detection_confidence: 0.5,
            fallback_fps: 0.0,
        })
        .await
        .unwrap();

        assert_eq!(source.metadata().fps, None);
        assert_eq!(source.metadata().frame_count, Some(100));
        assert_eq!(source.metadata().duration(1), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_malformed_line_is_reported() {
        let file = recording(&[FRAME_0, "{not json", FRAME_1]);

        let mut source = LandmarkFileSource::open(file.path(), &SourceConfig {
            min_detection_confidence: 0.5,
            fallback_fps: 0.0,
        })
        .await
        .unwrap();

        assert!(source.next_frame().await.unwrap().is_some());
        match source.next_frame().await {
            Err(KinetrackError::Source(SourceError::Malformed { line, .. })) => {
                assert_eq!(line, 2)
            }
            other => panic!("expected malformed record error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = LandmarkFileSource::open("/nonexistent/recording.jsonl", &SourceConfig {
            min_detection_confidence: 0.5,
            fallback_fps: 0.0,
        })
        .await;

        assert!(matches!(
            result,
            Err(KinetrackError::Source(SourceError::Open { .. }))
        ));
    }
}
