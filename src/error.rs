use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Failures surfaced by the transcript bus and its bindings.
///
/// Nothing is retried or swallowed: each variant carries the topic, channel or
/// key the failing operation touched so callers can decide what to do.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// A required collaborator or setting was not provided.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Input rejected before any broker or store interaction.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// The broker refused or could not route a publish, subscribe or request.
    #[error("delivery failed on {topic}: {reason}")]
    Delivery { topic: String, reason: String },

    #[error("no worker is listening on {channel}")]
    NoResponders { channel: String },

    #[error("rpc on {channel} timed out after {timeout:?}")]
    RpcTimeout { channel: String, timeout: Duration },

    #[error("rpc on {channel} was cancelled by the caller")]
    Cancelled { channel: String },

    #[error("store operation on {key} failed: {reason}")]
    Store { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TranscriptError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn delivery(topic: impl Into<String>, reason: impl ToString) -> Self {
        Self::Delivery {
            topic: topic.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn store(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Store {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}
