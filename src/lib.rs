#![allow(clippy::doc_markdown)] // Allow technical terms like DynamoDB in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Stream Dispatch
//!
//! Change-data-capture dispatch engine for a social backend built on a single
//! key-value table.
//!
//! ## Overview
//!
//! Every item mutation in the table arrives as a change record carrying the
//! item's partition key, sort key and its before/after attribute images. The
//! engine decodes each record, classifies it by the key prefixes and routes it
//! to the domain handlers that care about it: the legacy per-entity
//! postprocessors, lifecycle handlers fired on item creation and deletion, and
//! attribute handlers fired when specific attributes change.
//!
//! ## Architecture
//!
//! ```text
//! StreamBatch ──► StreamProcessor ──┬─► PostprocessorRouter (first prefix rule wins)
//!                  (decode, state   └─► DispatchTable
//!                   machine,              ├── item_add          (Created)
//!                   isolation)            ├── attribute_change  (Created, Modified)
//!                                         └── item_delete       (Removed)
//! ```
//!
//! A failing or panicking handler is logged and recorded in the
//! [`BatchSummary`]; it never blocks its siblings or later records.
//!
//! ## Module Organization
//!
//! - [`models`] - Change records, key paths and attribute values
//! - [`events`] - Upstream wire format and decoding
//! - [`differ`] - Attribute change detection
//! - [`registry`] - Handler capabilities, dispatch table and startup registrations
//! - [`postprocessor`] - Legacy prefix-routed postprocessors
//! - [`state_machine`] - Per-record dispatch progress
//! - [`orchestration`] - Stream processor and async delivery adapter
//! - [`config`] - Processor configuration
//! - [`logging`] - Structured logging setup and helpers
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use stream_dispatch::registry::{
//!     attribute_handler, AttributeBinding, DispatchTable, ExpectedOld,
//! };
//! use stream_dispatch::{ProcessorConfig, StreamProcessor};
//!
//! let mut table = DispatchTable::new();
//! table.register_attribute_bindings(
//!     "user",
//!     "profile",
//!     vec![AttributeBinding::new(
//!         attribute_handler("user.sync_email", |_user_id, _old, _new| Ok(())),
//!         [("email", ExpectedOld::Absent)],
//!     )],
//! );
//!
//! let processor = StreamProcessor::new(Arc::new(table), Arc::default())
//!     .with_config(ProcessorConfig::default());
//!
//! let payload = r#"{"Records": [{
//!     "eventName": "MODIFY",
//!     "dynamodb": {
//!         "Keys": {"partitionKey": {"S": "user/u1"}, "sortKey": {"S": "profile"}},
//!         "OldImage": {},
//!         "NewImage": {"email": {"S": "a@b.com"}}
//!     }
//! }]}"#;
//!
//! let summary = processor.process_event_json(payload).unwrap();
//! assert_eq!(summary.handler_invocations, 1);
//! ```

pub mod config;
pub mod constants;
pub mod differ;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod postprocessor;
pub mod registry;
pub mod state_machine;

pub use config::{LogFormat, ProcessorConfig};
pub use error::{DispatchError, Result};
pub use events::{StreamBatch, StreamRecord};
pub use logging::init_structured_logging;
pub use models::{AttributeValue, ChangeRecord, EventKind, Image, KeyPath};
pub use orchestration::{
    BatchSummary, DispatchPlan, HandlerFailure, StreamConsumer, StreamProcessor,
};
pub use postprocessor::{PostprocessorKind, PostprocessorRouter};
pub use registry::{DispatchTable, Registration};
