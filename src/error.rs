// Error types for the transport core

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport error taxonomy
///
/// None of these ever stop the clock: they are logged at the boundary where
/// they occur and playback continues. Operations on a disposed authority are
/// not errors at all, they are silent no-ops.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    /// The realtime clock resource could not be acquired (recoverable through
    /// the timer fallback)
    #[error("Clock acquisition failed: {0}")]
    AcquisitionFailure(String),

    /// A command was rejected without mutating transport state
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// A consumer callback failed while handling one scheduled event
    #[error("Dispatch failed for event at tick {tick}: {reason}")]
    DispatchFailure { tick: u64, reason: String },

    /// The scheduler fell behind and dropped overdue events
    #[error("Scheduler backlog overrun at tick {tick}: dropped {dropped} events")]
    BacklogOverrun { tick: u64, dropped: usize },
}

/// Error returned by a scheduler dispatch callback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct DispatchError(pub String);

impl From<&str> for DispatchError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for DispatchError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
