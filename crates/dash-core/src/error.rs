use thiserror::Error;

/// All errors produced by the measurement dashboard.
#[derive(Error, Debug)]
pub enum DashError {
    /// An object key does not follow the `<folder>/output<ts>Z<sep><ts>Z` layout.
    #[error("Malformed object key {key}: {reason}")]
    MalformedKey { key: String, reason: String },

    /// The content behind a key could not be fetched or parsed.
    #[error("Data unavailable for {key}: {reason}")]
    DataUnavailable { key: String, reason: String },

    /// The object store failed to list or fetch.
    #[error("Object store error: {0}")]
    Transport(String),

    /// The queue publisher did not acknowledge a message.
    #[error("Publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    /// A capture request carries an out-of-range field.
    #[error("Invalid capture request: {0}")]
    InvalidCaptureRequest(String),

    /// A plot asked for a column the dataset does not have.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A timestamp string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a key.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DashError {
    pub fn malformed(key: &str, reason: impl Into<String>) -> Self {
        Self::MalformedKey {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unavailable(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::DataUnavailable {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, DashError>;
