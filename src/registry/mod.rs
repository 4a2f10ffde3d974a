//! # Handler Registry
//!
//! Registration and lookup of the domain handlers interested in change
//! records.
//!
//! ## Architecture
//!
//! ```text
//! Registry
//! ├── handler        (ItemHandler / AttributeHandler capabilities)
//! ├── dispatch_table (prefix-pair routing, lifecycle + attribute bindings)
//! └── registration   (static startup registration list)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use stream_dispatch::registry::{item_handler, DispatchTable, Registration};
//!
//! let on_comment_add = item_handler("user.on_comment_add", |comment_id, _image| {
//!     tracing::info!(comment_id, "comment added");
//!     Ok(())
//! });
//!
//! let table = DispatchTable::from_registrations(vec![Registration::item_add(
//!     "comment",
//!     "-",
//!     vec![on_comment_add],
//! )]);
//!
//! assert_eq!(table.search_item_add("comment", "-").len(), 1);
//! assert!(table.search_item_add("post", "-").is_empty());
//! ```

pub mod dispatch_table;
pub mod handler;
pub mod registration;

// Re-export main types for easy access
pub use dispatch_table::{
    AttributeBinding, DispatchTable, ExpectedOld, LifecycleBinding, LifecyclePhase,
    RouteBindings, RouteSummary,
};
pub use handler::{
    attribute_handler, item_handler, AttributeHandler, FnAttributeHandler, FnItemHandler,
    ItemHandler,
};
pub use registration::{production_registrations, DomainHandlers, Registration};
