//! # Orchestration Engine
//!
//! Drives change records from the stream into the registered handlers.
//!
//! ## Core Components
//!
//! - **StreamProcessor**: sequential per-batch dispatch with per-handler
//!   failure isolation
//! - **StreamConsumer**: async adapter draining a [`BatchSource`] into a
//!   processor
//! - **Types**: batch summaries, handler failures and dry-run dispatch plans
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use stream_dispatch::models::{ChangeRecord, Image};
//! use stream_dispatch::orchestration::StreamProcessor;
//! use stream_dispatch::registry::{item_handler, DispatchTable};
//!
//! let mut table = DispatchTable::new();
//! table.register_item_add(
//!     "comment",
//!     "-",
//!     vec![item_handler("user.on_comment_add", |_comment_id, _image| Ok(()))],
//! );
//!
//! let processor = StreamProcessor::new(Arc::new(table), Arc::default());
//! let summary = processor
//!     .process_records(&[ChangeRecord::created("comment/c1", "-", Image::new())])
//!     .unwrap();
//!
//! assert_eq!(summary.handler_invocations, 1);
//! assert!(summary.is_clean());
//! ```

pub mod stream_consumer;
pub mod stream_processor;
pub mod types;

// Re-export core types and components for easy access
pub use stream_consumer::{
    BatchSource, ChannelBatchSource, ConsumerStats, StreamBatchSource, StreamConsumer,
};
pub use stream_processor::StreamProcessor;
pub use types::{BatchSummary, DispatchPhase, DispatchPlan, HandlerFailure, RecordOutcome};
