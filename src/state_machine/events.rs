use serde::{Deserialize, Serialize};

/// Steps of the per-record dispatch pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordEvent {
    /// Keys and images decoded
    Decode,
    /// Postprocessor step finished
    Postprocess,
    /// Item-add handlers finished
    DispatchItemAdd,
    /// Attribute-change handlers finished
    DispatchAttributeChanges,
    /// Item-delete handlers finished
    DispatchItemDelete,
    /// Record fully handled
    Finish,
}

impl RecordEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::Postprocess => "postprocess",
            Self::DispatchItemAdd => "dispatch_item_add",
            Self::DispatchAttributeChanges => "dispatch_attribute_changes",
            Self::DispatchItemDelete => "dispatch_item_delete",
            Self::Finish => "finish",
        }
    }
}
