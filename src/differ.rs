//! # Attribute Differ
//!
//! Determines which attributes of an item changed between two images.
//!
//! An attribute is changed when `old.get(name) != new.get(name)`: a key
//! missing on one side differs from every present value, `Null` included.

use crate::models::Image;
use std::collections::BTreeSet;

/// Names of all attributes whose value differs between the two images.
pub fn changed_attributes(old_image: &Image, new_image: &Image) -> BTreeSet<String> {
    old_image
        .keys()
        .chain(new_image.keys())
        .filter(|name| attribute_changed(old_image, new_image, name))
        .cloned()
        .collect()
}

/// Whether a single named attribute differs between the two images.
pub fn attribute_changed(old_image: &Image, new_image: &Image, name: &str) -> bool {
    old_image.get(name) != new_image.get(name)
}
