/// Result alias that carries the custom [`SprintRhythmError`] type.
pub type Result<T> = std::result::Result<T, SprintRhythmError>;

/// Common error type for the core crate.
///
/// Gameplay anomalies (malformed zone bounds, exits without a matching enter,
/// redundant hazard transitions) are never surfaced through this type. They
/// are normalized or ignored where they happen.
#[derive(Debug, thiserror::Error)]
pub enum SprintRhythmError {
    /// A configuration value was rejected at construction time.
    #[error("invalid configuration `{field}`: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },
    /// Driver input that cannot be acted upon, such as a non-positive step.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl SprintRhythmError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}
