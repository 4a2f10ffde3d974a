use super::{events::RecordEvent, states::RecordState};
use crate::error::{DispatchError, Result};
use crate::models::EventKind;
use tracing::trace;

/// Per-record dispatch state machine.
///
/// The pipeline depends on the record's event kind:
///
/// ```text
/// Created:  Received → Decoded → PostprocessDispatched → LifecycleDispatched
///             → AttributeDispatched → Done
/// Modified: Received → Decoded → PostprocessDispatched → AttributeDispatched → Done
/// Removed:  Received → Decoded → PostprocessDispatched → DeleteDispatched → Done
/// ```
#[derive(Debug, Clone)]
pub struct RecordStateMachine {
    event_kind: EventKind,
    current: RecordState,
}

impl RecordStateMachine {
    /// Create a new state machine for a freshly received record
    pub fn new(event_kind: EventKind) -> Self {
        Self {
            event_kind,
            current: RecordState::Received,
        }
    }

    pub fn current_state(&self) -> RecordState {
        self.current
    }

    pub fn event_kind(&self) -> EventKind {
        self.event_kind
    }

    /// Apply a pipeline event, returning the new state
    pub fn transition(&mut self, event: RecordEvent) -> Result<RecordState> {
        let target = Self::determine_target_state(self.event_kind, self.current, event)?;
        trace!(
            event_kind = %self.event_kind,
            from = %self.current,
            to = %target,
            event = event.event_type(),
            "Record state transition"
        );
        self.current = target;
        Ok(target)
    }

    /// The events a record of this kind passes through, in order
    pub fn pipeline(event_kind: EventKind) -> &'static [RecordEvent] {
        match event_kind {
            EventKind::Created => &[
                RecordEvent::Decode,
                RecordEvent::Postprocess,
                RecordEvent::DispatchItemAdd,
                RecordEvent::DispatchAttributeChanges,
                RecordEvent::Finish,
            ],
            EventKind::Modified => &[
                RecordEvent::Decode,
                RecordEvent::Postprocess,
                RecordEvent::DispatchAttributeChanges,
                RecordEvent::Finish,
            ],
            EventKind::Removed => &[
                RecordEvent::Decode,
                RecordEvent::Postprocess,
                RecordEvent::DispatchItemDelete,
                RecordEvent::Finish,
            ],
        }
    }

    /// Determine the target state for an event, without applying it
    pub fn determine_target_state(
        event_kind: EventKind,
        current: RecordState,
        event: RecordEvent,
    ) -> Result<RecordState> {
        use EventKind::{Created, Modified, Removed};

        let target = match (event_kind, current, event) {
            (_, RecordState::Received, RecordEvent::Decode) => RecordState::Decoded,
            (_, RecordState::Decoded, RecordEvent::Postprocess) => {
                RecordState::PostprocessDispatched
            }

            (Created, RecordState::PostprocessDispatched, RecordEvent::DispatchItemAdd) => {
                RecordState::LifecycleDispatched
            }
            (Created, RecordState::LifecycleDispatched, RecordEvent::DispatchAttributeChanges)
            | (
                Modified,
                RecordState::PostprocessDispatched,
                RecordEvent::DispatchAttributeChanges,
            ) => RecordState::AttributeDispatched,
            (Removed, RecordState::PostprocessDispatched, RecordEvent::DispatchItemDelete) => {
                RecordState::DeleteDispatched
            }

            (Created | Modified, RecordState::AttributeDispatched, RecordEvent::Finish)
            | (Removed, RecordState::DeleteDispatched, RecordEvent::Finish) => RecordState::Done,

            (_, from, event) => {
                return Err(DispatchError::InvalidStateTransition {
                    from: from.to_string(),
                    to: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_pipelines_reach_done() {
        for kind in [EventKind::Created, EventKind::Modified, EventKind::Removed] {
            let mut machine = RecordStateMachine::new(kind);
            for event in RecordStateMachine::pipeline(kind) {
                machine.transition(*event).unwrap();
            }
            assert_eq!(machine.current_state(), RecordState::Done, "{kind}");
        }
    }

    #[test]
    fn test_created_passes_lifecycle_then_attributes() {
        let mut machine = RecordStateMachine::new(EventKind::Created);
        machine.transition(RecordEvent::Decode).unwrap();
        machine.transition(RecordEvent::Postprocess).unwrap();
        assert_eq!(
            machine.transition(RecordEvent::DispatchItemAdd).unwrap(),
            RecordState::LifecycleDispatched
        );
        assert_eq!(
            machine.transition(RecordEvent::DispatchAttributeChanges).unwrap(),
            RecordState::AttributeDispatched
        );
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut modified = RecordStateMachine::new(EventKind::Modified);
        modified.transition(RecordEvent::Decode).unwrap();
        modified.transition(RecordEvent::Postprocess).unwrap();
        assert!(matches!(
            modified.transition(RecordEvent::DispatchItemAdd),
            Err(DispatchError::InvalidStateTransition { .. })
        ));
        // failed transition leaves the state unchanged
        assert_eq!(modified.current_state(), RecordState::PostprocessDispatched);

        let mut removed = RecordStateMachine::new(EventKind::Removed);
        assert!(removed.transition(RecordEvent::Postprocess).is_err());
        removed.transition(RecordEvent::Decode).unwrap();
        removed.transition(RecordEvent::Postprocess).unwrap();
        assert!(removed.transition(RecordEvent::DispatchAttributeChanges).is_err());
        assert!(removed.transition(RecordEvent::Finish).is_err());
    }
}
