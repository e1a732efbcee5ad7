// Error types shared across layers
use thiserror::Error;

/// The measurement source could not produce a complete result.
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error("probe request failed: {0}")]
    Transport(String),

    #[error("probe endpoint returned status {0}")]
    Status(u16),

    #[error("probe transferred no data")]
    EmptyTransfer,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a sample already exists at {timestamp}")]
    DuplicateKey { timestamp: String },

    #[error("storage error: {0}")]
    Storage(String),

    #[error("corrupt sample row: {0}")]
    CorruptRow(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("setting {key} holds {value:?}, which is not a valid integer")]
    InvalidInteger { key: &'static str, value: String },

    #[error("settings storage error: {0}")]
    Storage(String),
}

/// A settings update was rejected; the message is shown to the caller verbatim.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum SettingsUpdateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] SettingsError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error("scheduler is not running")]
    NotRunning,

    #[error("interval must be at least one minute")]
    InvalidInterval,
}
