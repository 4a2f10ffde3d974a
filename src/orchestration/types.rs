//! # Orchestration Types
//!
//! Result and reporting types shared by the stream processor and the
//! delivery adapter: per-record outcomes, handler failures, batch summaries
//! and dry-run dispatch plans.

use crate::constants::operations;
use crate::models::{EventKind, KeyPath};
use crate::state_machine::RecordState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Dispatch step a handler invocation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPhase {
    Postprocess,
    ItemAdd,
    AttributeChange,
    ItemDelete,
}

impl DispatchPhase {
    /// Operation name used in structured logs
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Postprocess => operations::POSTPROCESS,
            Self::ItemAdd => operations::ITEM_ADD,
            Self::AttributeChange => operations::ATTRIBUTE_CHANGE,
            Self::ItemDelete => operations::ITEM_DELETE,
        }
    }
}

impl fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operation())
    }
}

/// A handler or postprocessor that returned an error (or panicked)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerFailure {
    pub partition_key: String,
    pub sort_key: String,
    pub event_kind: EventKind,
    pub phase: DispatchPhase,
    pub handler: String,
    pub error: String,
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed in {} for {} `{}` / `{}`: {}",
            self.handler, self.phase, self.event_kind, self.partition_key, self.sort_key, self.error
        )
    }
}

/// Outcome of dispatching a single change record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub key_path: KeyPath,
    pub final_state: RecordState,
    /// Name of the postprocessor that ran, if any
    pub postprocessor: Option<String>,
    /// Number of handler and postprocessor invocations, failed ones included
    pub invocations: usize,
    pub failures: Vec<HandlerFailure>,
}

impl RecordOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Summary of one processed batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: Uuid,
    pub record_count: usize,
    pub handler_invocations: usize,
    pub failures: Vec<HandlerFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchSummary {
    pub(crate) fn start() -> Self {
        let now = Utc::now();
        Self {
            batch_id: Uuid::new_v4(),
            record_count: 0,
            handler_invocations: 0,
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn absorb(&mut self, outcome: RecordOutcome) {
        self.record_count += 1;
        self.handler_invocations += outcome.invocations;
        self.failures.extend(outcome.failures);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// True when every handler invocation in the batch succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Handlers a record would reach, computed without invoking anything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchPlan {
    pub postprocessor: Option<String>,
    pub item_add: Vec<String>,
    pub attribute_change: Vec<String>,
    pub item_delete: Vec<String>,
}

impl DispatchPlan {
    /// Total number of invocations the plan would make
    pub fn invocation_count(&self) -> usize {
        usize::from(self.postprocessor.is_some())
            + self.item_add.len()
            + self.attribute_change.len()
            + self.item_delete.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocation_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(handler: &str) -> HandlerFailure {
        HandlerFailure {
            partition_key: "user/u1".to_string(),
            sort_key: "profile".to_string(),
            event_kind: EventKind::Modified,
            phase: DispatchPhase::AttributeChange,
            handler: handler.to_string(),
            error: "boom".to_string(),
        }
    }

    #[test]
    fn test_phase_operation_names() {
        assert_eq!(DispatchPhase::Postprocess.to_string(), "postprocess");
        assert_eq!(DispatchPhase::ItemDelete.operation(), "item_delete");
    }

    #[test]
    fn test_batch_summary_accumulates_outcomes() {
        let mut summary = BatchSummary::start();
        summary.absorb(RecordOutcome {
            key_path: KeyPath::parse("user/u1", "profile").unwrap(),
            final_state: RecordState::Done,
            postprocessor: None,
            invocations: 3,
            failures: vec![failure("user.sync_email")],
        });
        summary.absorb(RecordOutcome {
            key_path: KeyPath::parse("post/p1", "-").unwrap(),
            final_state: RecordState::Done,
            postprocessor: Some("post".to_string()),
            invocations: 1,
            failures: vec![],
        });
        let summary = summary.finish();

        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.handler_invocations, 4);
        assert_eq!(summary.failure_count(), 1);
        assert!(!summary.is_clean());
        assert!(summary.duration_ms() >= 0);
    }

    #[test]
    fn test_failure_display_and_serialization() {
        let failure = failure("user.sync_email");
        let rendered = failure.to_string();
        assert!(rendered.contains("user.sync_email"));
        assert!(rendered.contains("attribute_change"));

        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["phase"], "attribute_change");
    }

    #[test]
    fn test_plan_invocation_count() {
        let plan = DispatchPlan {
            postprocessor: Some("comment".to_string()),
            item_add: vec!["user.on_comment_add".to_string()],
            ..Default::default()
        };
        assert_eq!(plan.invocation_count(), 2);
        assert!(DispatchPlan::default().is_empty());
    }
}
