pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod keyboard_input;
pub mod landmark;
pub mod result;
pub mod session;
pub mod source;
pub mod store;

pub use config::{BodySide, JumpVariant, KinetrackConfig};
pub use detector::{build_detector, MotionDetector};
pub use error::{KinetrackError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, KinetrackEvent};
pub use keyboard_input::KeyboardInputHandler;
pub use landmark::{Joint, Landmark, LandmarkFrame, PoseFrame};
pub use result::{Activity, ActivityMetric, AnalysisResult, RepetitionRate};
pub use session::{
    AnalysisSession, AnalysisSessionBuilder, SessionLimits, SessionOutcome, StopReason,
};
pub use source::{LandmarkFileSource, LandmarkSource, ScriptedSource, SourceMetadata};
pub use store::{leaderboard, JsonlResultStore, LeaderboardEntry, MemoryResultStore, ResultStore};
