//! # Change Record Models
//!
//! Decoded, strongly-typed view of the change stream: records, their keys and
//! their attribute images.

pub mod attribute_value;
pub mod change_record;
pub mod key_path;

pub use attribute_value::{image_to_wire, AttributeValue, Image, Number};
pub use change_record::{ChangeRecord, EventKind};
pub use key_path::KeyPath;
