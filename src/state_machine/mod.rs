// Per-record dispatch state machine
//
// Tracks a change record through decode, postprocessing and the three
// dispatch-table phases. Handler failures never block a transition; only
// out-of-order pipeline steps are rejected.

pub mod events;
pub mod record_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use events::RecordEvent;
pub use record_state_machine::RecordStateMachine;
pub use states::RecordState;
