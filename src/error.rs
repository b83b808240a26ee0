use thiserror::Error;

#[derive(Error, Debug)]
pub enum KinetrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Landmark source error: {0}")]
    Source(#[from] SourceError),

    #[error("Result store error: {0}")]
    Store(#[from] StoreError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures while pulling frames out of a landmark source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open landmark recording {path}: {details}")]
    Open { path: String, details: String },

    #[error("Failed to read frame after frame {last_index:?}: {details}")]
    Read {
        last_index: Option<u64>,
        details: String,
    },

    #[error("Malformed record on line {line}: {details}")]
    Malformed { line: usize, details: String },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open result store {path}: {details}")]
    Open { path: String, details: String },

    #[error("Failed to append result {result_id}: {details}")]
    Append { result_id: String, details: String },

    #[error("Corrupt result record on line {line}: {details}")]
    Corrupt { line: usize, details: String },
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event channel closed")]
    ChannelClosed,
}

impl KinetrackError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<C: Into<String>, M: Into<String>>(component: C, message: M) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KinetrackError>;
