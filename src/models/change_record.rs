use crate::constants::event_names;
use crate::error::{DispatchError, Result};
use crate::models::attribute_value::Image;
use crate::models::key_path::KeyPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of mutation a change record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Item was inserted; old image is empty
    Created,
    /// Item was updated in place
    Modified,
    /// Item was deleted; new image is empty
    Removed,
}

impl EventKind {
    /// Name used by the upstream change stream
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Created => event_names::INSERT,
            Self::Modified => event_names::MODIFY,
            Self::Removed => event_names::REMOVE,
        }
    }

    /// Whether attribute-change bindings are evaluated for this kind
    pub fn carries_new_image(&self) -> bool {
        matches!(self, Self::Created | Self::Modified)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl std::str::FromStr for EventKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            event_names::INSERT => Ok(Self::Created),
            event_names::MODIFY => Ok(Self::Modified),
            event_names::REMOVE => Ok(Self::Removed),
            _ => Err(DispatchError::UnknownEventKind(s.to_string())),
        }
    }
}

/// One notification of a mutation to a single logical item
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub event_kind: EventKind,
    pub partition_key: String,
    pub sort_key: String,
    pub old_image: Image,
    pub new_image: Image,
    /// Upstream event id, for log context only
    pub event_id: Option<String>,
    /// Upstream sequence number, for log context only
    pub sequence_number: Option<String>,
}

impl ChangeRecord {
    pub fn new(
        event_kind: EventKind,
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
    ) -> Self {
        Self {
            event_kind,
            partition_key: partition_key.into(),
            sort_key: sort_key.into(),
            old_image: Image::new(),
            new_image: Image::new(),
            event_id: None,
            sequence_number: None,
        }
    }

    pub fn created(
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
        new_image: Image,
    ) -> Self {
        Self::new(EventKind::Created, partition_key, sort_key).with_new_image(new_image)
    }

    pub fn modified(
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
        old_image: Image,
        new_image: Image,
    ) -> Self {
        Self::new(EventKind::Modified, partition_key, sort_key)
            .with_old_image(old_image)
            .with_new_image(new_image)
    }

    pub fn removed(
        partition_key: impl Into<String>,
        sort_key: impl Into<String>,
        old_image: Image,
    ) -> Self {
        Self::new(EventKind::Removed, partition_key, sort_key).with_old_image(old_image)
    }

    pub fn with_old_image(mut self, image: Image) -> Self {
        self.old_image = image;
        self
    }

    pub fn with_new_image(mut self, image: Image) -> Self {
        self.new_image = image;
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn with_sequence_number(mut self, sequence_number: impl Into<String>) -> Self {
        self.sequence_number = Some(sequence_number.into());
        self
    }

    /// Decode the composite key.
    pub fn key_path(&self) -> Result<KeyPath> {
        KeyPath::parse(&self.partition_key, &self.sort_key)
    }
}

impl fmt::Display for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: `{}` / `{}`",
            self.event_kind, self.partition_key, self.sort_key
        )
    }
}
