use serde::{Deserialize, Serialize};
use std::fmt;

/// Dispatch progress of a single change record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    /// Record accepted from the batch
    #[default]
    Received,
    /// Keys and images decoded
    Decoded,
    /// Legacy postprocessor step finished (or skipped)
    PostprocessDispatched,
    /// Item-add handlers ran (created records only)
    LifecycleDispatched,
    /// Attribute-change handlers ran (created and modified records)
    AttributeDispatched,
    /// Item-delete handlers ran (removed records only)
    DeleteDispatched,
    /// All dispatch steps finished, whatever the handler outcomes
    Done,
}

impl RecordState {
    /// Check if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Check if any handler may already have run for the record
    pub fn has_dispatched(&self) -> bool {
        !matches!(self, Self::Received | Self::Decoded)
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Decoded => write!(f, "decoded"),
            Self::PostprocessDispatched => write!(f, "postprocess_dispatched"),
            Self::LifecycleDispatched => write!(f, "lifecycle_dispatched"),
            Self::AttributeDispatched => write!(f, "attribute_dispatched"),
            Self::DeleteDispatched => write!(f, "delete_dispatched"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl std::str::FromStr for RecordState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "received" => Ok(Self::Received),
            "decoded" => Ok(Self::Decoded),
            "postprocess_dispatched" => Ok(Self::PostprocessDispatched),
            "lifecycle_dispatched" => Ok(Self::LifecycleDispatched),
            "attribute_dispatched" => Ok(Self::AttributeDispatched),
            "delete_dispatched" => Ok(Self::DeleteDispatched),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid record state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_terminal_and_dispatched() {
        assert!(RecordState::Done.is_terminal());
        assert!(!RecordState::DeleteDispatched.is_terminal());
        assert!(!RecordState::Decoded.has_dispatched());
        assert!(RecordState::PostprocessDispatched.has_dispatched());
        assert_eq!(RecordState::default(), RecordState::Received);
    }

    #[test]
    fn test_string_conversion() {
        for state in [
            RecordState::Received,
            RecordState::Decoded,
            RecordState::PostprocessDispatched,
            RecordState::LifecycleDispatched,
            RecordState::AttributeDispatched,
            RecordState::DeleteDispatched,
            RecordState::Done,
        ] {
            assert_eq!(RecordState::from_str(&state.to_string()).unwrap(), state);
        }
        assert!(RecordState::from_str("bogus").is_err());
    }
}
