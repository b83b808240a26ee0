use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct KinetrackConfig {
    pub source: SourceConfig,
    pub session: SessionConfig,
    pub pushup: PushupConfig,
    pub jump: JumpConfig,
    pub punch: PunchConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    /// Frames whose pose detection confidence is below this are treated as "no detection"
    #[serde(default = "default_min_detection_confidence")]
    pub min_detection_confidence: f32,

    /// Frame rate assumed when a recording carries no header (0 = unknown)
    #[serde(default = "default_fallback_fps")]
    pub fallback_fps: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SessionConfig {
    /// Wall-clock limit for live sessions, in seconds
    #[serde(default = "default_live_duration_limit")]
    pub live_duration_limit_seconds: u64,

    /// Optional elapsed-time limit for file sessions, in seconds (0 = run to end of stream)
    #[serde(default = "default_file_duration_limit")]
    pub file_duration_limit_seconds: u64,

    /// Progress event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PushupConfig {
    /// Body side whose shoulder and elbow are tracked
    #[serde(default = "default_pushup_side")]
    pub side: BodySide,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct JumpConfig {
    /// Height estimation policy
    #[serde(default = "default_jump_variant")]
    pub variant: JumpVariant,

    /// Body side whose shoulder and ankle are tracked
    #[serde(default = "default_jump_side")]
    pub side: BodySide,

    /// Subject height used to convert normalized displacement to centimeters
    #[serde(default = "default_user_height_cm")]
    pub user_height_cm: f64,

    /// Number of body-extent samples inspected for stability
    #[serde(default = "default_stability_window")]
    pub stability_window: usize,

    /// Minimum mean body extent (ankle_y - shoulder_y) for the subject to count as fully visible
    #[serde(default = "default_min_body_extent")]
    pub min_body_extent: f64,

    /// Maximum body-extent variance for the subject to count as standing still
    #[serde(default = "default_max_extent_variance")]
    pub max_extent_variance: f64,

    /// How close to the baseline the shoulder must return to count as landed
    #[serde(default = "default_landing_tolerance")]
    pub landing_tolerance: f64,

    /// Minimum apex displacement above the baseline for a jump to count
    #[serde(default = "default_min_displacement")]
    pub min_displacement: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PunchConfig {
    /// Hand whose wrist is tracked
    #[serde(default = "default_punch_hand")]
    pub hand: BodySide,

    /// Per-frame wrist x displacement that starts a punch
    #[serde(default = "default_punch_threshold")]
    pub punch_threshold: f64,

    /// Per-frame wrist x displacement below which the punch state resets
    #[serde(default = "default_reset_threshold")]
    pub reset_threshold: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Append-only JSON lines file holding analysis results
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BodySide {
    Left,
    Right,
}

impl BodySide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodySide::Left => "left",
            BodySide::Right => "right",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JumpVariant {
    /// Wait for a still, fully visible subject, then measure the first jump
    Stabilized,
    /// Track shoulder extremes over the whole stream
    RunningExtremes,
}

impl JumpVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            JumpVariant::Stabilized => "stabilized",
            JumpVariant::RunningExtremes => "running_extremes",
        }
    }
}

impl SessionConfig {
    pub fn live_duration_limit(&self) -> Duration {
        Duration::from_secs(self.live_duration_limit_seconds)
    }

    pub fn file_duration_limit(&self) -> Option<Duration> {
        (self.file_duration_limit_seconds > 0)
            .then(|| Duration::from_secs(self.file_duration_limit_seconds))
    }
}

impl KinetrackConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("kinetrack.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "source.min_detection_confidence",
                default_min_detection_confidence() as f64,
            )?
            .set_default("source.fallback_fps", default_fallback_fps())?
            .set_default(
                "session.live_duration_limit_seconds",
                default_live_duration_limit() as i64,
            )?
            .set_default(
                "session.file_duration_limit_seconds",
                default_file_duration_limit() as i64,
            )?
            .set_default(
                "session.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .set_default("pushup.side", default_pushup_side().as_str())?
            .set_default("jump.variant", default_jump_variant().as_str())?
            .set_default("jump.side", default_jump_side().as_str())?
            .set_default("jump.user_height_cm", default_user_height_cm())?
            .set_default("jump.stability_window", default_stability_window() as i64)?
            .set_default("jump.min_body_extent", default_min_body_extent())?
            .set_default("jump.max_extent_variance", default_max_extent_variance())?
            .set_default("jump.landing_tolerance", default_landing_tolerance())?
            .set_default("jump.min_displacement", default_min_displacement())?
            .set_default("punch.hand", default_punch_hand().as_str())?
            .set_default("punch.punch_threshold", default_punch_threshold())?
            .set_default("punch.reset_threshold", default_reset_threshold())?
            .set_default("store.path", default_store_path())?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // KINETRACK__JUMP__USER_HEIGHT_CM=182 style overrides
            .add_source(
                Environment::with_prefix("KINETRACK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: KinetrackConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Render as TOML, e.g. for `--print-config`
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            ("source.fallback_fps", self.source.fallback_fps),
            ("jump.user_height_cm", self.jump.user_height_cm),
            ("jump.min_body_extent", self.jump.min_body_extent),
            ("jump.max_extent_variance", self.jump.max_extent_variance),
            ("jump.landing_tolerance", self.jump.landing_tolerance),
            ("jump.min_displacement", self.jump.min_displacement),
            ("punch.punch_threshold", self.punch.punch_threshold),
            ("punch.reset_threshold", self.punch.reset_threshold),
        ];
        if let Some((key, value)) = thresholds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::Message(format!(
                "{} must be a finite number, got {}",
                key, value
            )));
        }

        if !(0.0..=1.0).contains(&self.source.min_detection_confidence) {
            return Err(ConfigError::Message(
                "Source min_detection_confidence must be within [0, 1]".to_string(),
            ));
        }

        if self.source.fallback_fps < 0.0 {
            return Err(ConfigError::Message(
                "Source fallback_fps must not be negative".to_string(),
            ));
        }

        if self.session.live_duration_limit_seconds == 0 {
            return Err(ConfigError::Message(
                "Session live_duration_limit_seconds must be greater than 0".to_string(),
            ));
        }

        if self.session.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        if self.jump.user_height_cm <= 0.0 {
            return Err(ConfigError::Message(
                "Jump user_height_cm must be greater than 0".to_string(),
            ));
        }

        if self.jump.stability_window == 0 {
            return Err(ConfigError::Message(
                "Jump stability_window must be greater than 0".to_string(),
            ));
        }

        if self.jump.max_extent_variance <= 0.0 {
            return Err(ConfigError::Message(
                "Jump max_extent_variance must be greater than 0".to_string(),
            ));
        }

        if self.jump.landing_tolerance < 0.0 || self.jump.min_displacement <= 0.0 {
            return Err(ConfigError::Message(
                "Jump landing_tolerance must be >= 0 and min_displacement > 0".to_string(),
            ));
        }

        if self.punch.reset_threshold < 0.0 || self.punch.punch_threshold <= 0.0 {
            return Err(ConfigError::Message(
                "Punch thresholds must be positive".to_string(),
            ));
        }

        if self.punch.reset_threshold >= self.punch.punch_threshold {
            return Err(ConfigError::Message(
                "Punch reset_threshold must be below punch_threshold".to_string(),
            ));
        }

        if self.store.path.trim().is_empty() {
            return Err(ConfigError::Message(
                "Store path must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for KinetrackConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                min_detection_confidence: default_min_detection_confidence(),
                fallback_fps: default_fallback_fps(),
            },
            session: SessionConfig {
                live_duration_limit_seconds: default_live_duration_limit(),
                file_duration_limit_seconds: default_file_duration_limit(),
                event_bus_capacity: default_event_bus_capacity(),
            },
            pushup: PushupConfig::default(),
            jump: JumpConfig::default(),
            punch: PunchConfig::default(),
            store: StoreConfig {
                path: default_store_path(),
            },
        }
    }
}

impl Default for PushupConfig {
    fn default() -> Self {
        Self {
            side: default_pushup_side(),
        }
    }
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            variant: default_jump_variant(),
            side: default_jump_side(),
            user_height_cm: default_user_height_cm(),
            stability_window: default_stability_window(),
            min_body_extent: default_min_body_extent(),
            max_extent_variance: default_max_extent_variance(),
            landing_tolerance: default_landing_tolerance(),
            min_displacement: default_min_displacement(),
        }
    }
}

impl Default for PunchConfig {
    fn default() -> Self {
        Self {
            hand: default_punch_hand(),
            punch_threshold: default_punch_threshold(),
            reset_threshold: default_reset_threshold(),
        }
    }
}

// Default value functions
fn default_min_detection_confidence() -> f32 {
    0.5
}
fn default_fallback_fps() -> f64 {
    0.0
}

fn default_live_duration_limit() -> u64 {
    30
}
fn default_file_duration_limit() -> u64 {
    0
}
fn default_event_bus_capacity() -> usize {
    100
}

fn default_pushup_side() -> BodySide {
    BodySide::Left
}

fn default_jump_variant() -> JumpVariant {
    JumpVariant::Stabilized
}
fn default_jump_side() -> BodySide {
    BodySide::Left
}
fn default_user_height_cm() -> f64 {
    170.0
}
fn default_stability_window() -> usize {
    20
}
fn default_min_body_extent() -> f64 {
    0.4
}
fn default_max_extent_variance() -> f64 {
    0.001
}
fn default_landing_tolerance() -> f64 {
    0.01
}
fn default_min_displacement() -> f64 {
    0.05
}

fn default_punch_hand() -> BodySide {
    BodySide::Right
}
fn default_punch_threshold() -> f64 {
    0.05
}
fn default_reset_threshold() -> f64 {
    0.01
}

fn default_store_path() -> String {
    "./results/results.jsonl".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = KinetrackConfig::default();
        assert!(config.validate().is_ok());

        assert_eq!(config.pushup.side, BodySide::Left);
        assert_eq!(config.punch.hand, BodySide::Right);
        assert_eq!(config.jump.variant, JumpVariant::Stabilized);
        assert_eq!(config.jump.stability_window, 20);
        assert_eq!(config.session.file_duration_limit(), None);
        assert_eq!(config.session.live_duration_limit(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let config = KinetrackConfig::load_from_file("/nonexistent/kinetrack.toml").unwrap();
        assert_eq!(config, KinetrackConfig::default());
    }

    #[test]
    fn test_load_from_file_overrides() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
[jump]
variant = "running_extremes"
user_height_cm = 182.5

[punch]
hand = "left"
punch_threshold = 0.08
"#
        )
        .unwrap();

        let config = KinetrackConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.jump.variant, JumpVariant::RunningExtremes);
        assert_eq!(config.jump.user_height_cm, 182.5);
        assert_eq!(config.jump.stability_window, 20);
        assert_eq!(config.punch.hand, BodySide::Left);
        assert_eq!(config.punch.punch_threshold, 0.08);
        assert_eq!(config.punch.reset_threshold, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = KinetrackConfig::default();

        // Hysteresis band inverted
        config.punch.reset_threshold = 0.06;
        assert!(config.validate().is_err());
        config.punch.reset_threshold = 0.01;
        assert!(config.validate().is_ok());

        config.jump.stability_window = 0;
        assert!(config.validate().is_err());
        config.jump.stability_window = 20;

        config.jump.user_height_cm = 0.0;
        assert!(config.validate().is_err());
        config.jump.user_height_cm = 170.0;

        config.source.min_detection_confidence = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_thresholds_rejected() {
        let mut config = KinetrackConfig::default();
        config.jump.user_height_cm = f64::NAN;
        assert!(config.validate().is_err());

        config.jump.user_height_cm = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = KinetrackConfig::default();
        config.punch.punch_threshold = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = KinetrackConfig::default();
        config.jump.max_extent_variance = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = KinetrackConfig::default();
        config.source.min_detection_confidence = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = KinetrackConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[jump]"));
        assert!(rendered.contains("variant = \"stabilized\""));
        assert!(rendered.contains("hand = \"right\""));
    }
}
