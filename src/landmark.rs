use crate::config::BodySide;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The 33 named joints emitted by the upstream pose model, in model index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum Joint {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl Joint {
    pub const COUNT: usize = 33;

    const ALL: [Joint; Joint::COUNT] = [
        Joint::Nose,
        Joint::LeftEyeInner,
        Joint::LeftEye,
        Joint::LeftEyeOuter,
        Joint::RightEyeInner,
        Joint::RightEye,
        Joint::RightEyeOuter,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::MouthLeft,
        Joint::MouthRight,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftPinky,
        Joint::RightPinky,
        Joint::LeftIndex,
        Joint::RightIndex,
        Joint::LeftThumb,
        Joint::RightThumb,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
        Joint::LeftHeel,
        Joint::RightHeel,
        Joint::LeftFootIndex,
        Joint::RightFootIndex,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn shoulder(side: BodySide) -> Self {
        match side {
            BodySide::Left => Joint::LeftShoulder,
            BodySide::Right => Joint::RightShoulder,
        }
    }

    pub fn elbow(side: BodySide) -> Self {
        match side {
            BodySide::Left => Joint::LeftElbow,
            BodySide::Right => Joint::RightElbow,
        }
    }

    pub fn wrist(side: BodySide) -> Self {
        match side {
            BodySide::Left => Joint::LeftWrist,
            BodySide::Right => Joint::RightWrist,
        }
    }

    pub fn ankle(side: BodySide) -> Self {
        match side {
            BodySide::Left => Joint::LeftAnkle,
            BodySide::Right => Joint::RightAnkle,
        }
    }
}

/// Single joint estimate in normalized image coordinates (origin top-left, y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

fn default_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f64, y: f64, visibility: f32) -> Self {
        Self { x, y, visibility }
    }
}

/// All joints detected in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    /// Overall pose detection confidence (0.0 - 1.0)
    #[serde(default = "default_visibility")]
    pub confidence: f32,
    pub landmarks: BTreeMap<Joint, Landmark>,
}

impl LandmarkFrame {
    pub fn new(confidence: f32) -> Self {
        Self {
            confidence,
            landmarks: BTreeMap::new(),
        }
    }

    /// Build from an index-ordered landmark list as emitted by the pose model
    pub fn from_indexed(confidence: f32, landmarks: &[Landmark]) -> Self {
        let landmarks = landmarks
            .iter()
            .enumerate()
            .filter_map(|(i, lm)| Joint::from_index(i).map(|joint| (joint, *lm)))
            .collect();

        Self {
            confidence,
            landmarks,
        }
    }

    pub fn with(mut self, joint: Joint, x: f64, y: f64) -> Self {
        self.landmarks.insert(joint, Landmark::new(x, y, 1.0));
        self
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks.get(&joint)
    }

    pub fn is_confident(&self, min_confidence: f32) -> bool {
        self.confidence >= min_confidence
    }
}

/// One frame delivered by a landmark source; `pose` is `None` when nothing was detected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    pub index: u64,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
    pub pose: Option<LandmarkFrame>,
}

impl PoseFrame {
    pub fn detected(index: u64, pose: LandmarkFrame) -> Self {
        Self {
            index,
            timestamp_ms: None,
            pose: Some(pose),
        }
    }

    pub fn empty(index: u64) -> Self {
        Self {
            index,
            timestamp_ms: None,
            pose: None,
        }
    }
}
