//! Error types for the dispatch pipeline.
//!
//! Only decode-level failures are represented here. Faults raised by handlers
//! and postprocessors are opaque `anyhow::Error`s that the stream processor
//! records and logs without propagating.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Malformed key: partition key `{partition_key}`, sort key `{sort_key}`: {reason}")]
    MalformedKey {
        partition_key: String,
        sort_key: String,
        reason: String,
    },
    #[error("Image decode error for attribute `{attribute}`: {reason}")]
    ImageDecode { attribute: String, reason: String },
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),
    #[error("Invalid record state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Event parse error: {0}")]
    EventParse(String),
}

impl DispatchError {
    pub fn malformed_key(
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedKey {
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            reason: reason.into(),
        }
    }

    pub fn image_decode(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImageDecode {
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for failures caused by the upstream record contract
    /// rather than by local state or configuration.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedKey { .. }
                | Self::ImageDecode { .. }
                | Self::UnknownEventKind(_)
                | Self::EventParse(_)
        )
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(error: serde_json::Error) -> Self {
        DispatchError::EventParse(error.to_string())
    }
}

impl From<config::ConfigError> for DispatchError {
    fn from(error: config::ConfigError) -> Self {
        DispatchError::Configuration(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;
