use crate::config::JumpVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Activities a recording can be analyzed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Pushups,
    Jump,
    Punches,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Pushups => "pushups",
            Activity::Jump => "jump",
            Activity::Punches => "punches",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pushups" | "pushup" | "push-ups" => Ok(Activity::Pushups),
            "jump" | "vertical_jump" => Ok(Activity::Jump),
            "punches" | "punch" | "boxing" => Ok(Activity::Punches),
            other => Err(format!("unknown activity '{}'", other)),
        }
    }
}

/// Count with duration and derived rates; rates are zero when the duration is zero
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepetitionRate {
    pub total: u32,
    pub duration_sec: f64,
    pub per_sec: f64,
    pub per_min: f64,
}

impl RepetitionRate {
    pub fn new(total: u32, duration: Duration) -> Self {
        let duration_sec = duration.as_secs_f64();
        let per_sec = if duration_sec > 0.0 {
            total as f64 / duration_sec
        } else {
            0.0
        };

        Self {
            total,
            duration_sec,
            per_sec,
            per_min: per_sec * 60.0,
        }
    }
}

/// Scalar outcome of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActivityMetric {
    Pushups(RepetitionRate),
    Jump {
        variant: JumpVariant,
        /// `None` means no jump was detected, which is not the same as a zero-height jump
        height_cm: Option<f64>,
    },
    Punches(RepetitionRate),
}

impl ActivityMetric {
    pub fn activity(&self) -> Activity {
        match self {
            ActivityMetric::Pushups(_) => Activity::Pushups,
            ActivityMetric::Jump { .. } => Activity::Jump,
            ActivityMetric::Punches(_) => Activity::Punches,
        }
    }

    /// Value used to rank results on the leaderboard
    pub fn score(&self) -> Option<f64> {
        match self {
            ActivityMetric::Pushups(rate) | ActivityMetric::Punches(rate) => {
                Some(rate.total as f64)
            }
            ActivityMetric::Jump { height_cm, .. } => *height_cm,
        }
    }

    /// Human-readable findings as shown after an upload
    pub fn summary(&self) -> String {
        match self {
            ActivityMetric::Pushups(rate) => format!("Total Push-ups: {}", rate.total),
            ActivityMetric::Jump {
                height_cm: Some(height),
                ..
            } => format!("Vertical Jump Height: {:.2} cm", height),
            ActivityMetric::Jump { height_cm: None, .. } => "No jump detected".to_string(),
            ActivityMetric::Punches(rate) => format!(
                "Total Punches: {}\nDuration: {:.2}s\nPunches/sec: {:.2}\nPunches/min: {:.2}",
                rate.total, rate.duration_sec, rate.per_sec, rate.per_min
            ),
        }
    }
}

/// Immutable record of one completed analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: Uuid,
    pub activity: Activity,
    pub user_id: u64,
    pub source_ref: String,
    pub analyzed_at: DateTime<Utc>,
    pub frames_processed: u64,
    pub metric: ActivityMetric,
}

impl AnalysisResult {
    pub fn new(
        user_id: u64,
        source_ref: impl Into<String>,
        frames_processed: u64,
        metric: ActivityMetric,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            activity: metric.activity(),
            user_id,
            source_ref: source_ref.into(),
            analyzed_at: Utc::now(),
            frames_processed,
            metric,
        }
    }

    pub fn summary(&self) -> String {
        self.metric.summary()
    }
}
