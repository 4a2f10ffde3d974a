//! # Key Codec
//!
//! Parses the composite primary key of a change record into the components
//! the dispatch table is keyed by.
//!
//! ```text
//! partition key: "user/u1"            -> type_prefix "user", item_id "u1"
//! sort key:      "follower/u2"        -> sub_prefix  "follower"
//! sort key:      "-"                  -> sub_prefix  "-" (base item)
//! partition key: "chat/c1/legacy-id"  -> type_prefix "chat", item_id "c1/legacy-id"
//! ```

use crate::constants::{BASE_SUB_PREFIX, KEY_DELIMITER};
use crate::error::{DispatchError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed components of a record's composite key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyPath {
    /// First segment of the partition key, the entity type
    pub type_prefix: String,
    /// Everything after the first delimiter of the partition key
    pub item_id: String,
    /// First segment of the sort key, the sub-item role
    pub sub_prefix: String,
}

impl KeyPath {
    /// Parse a partition key / sort key pair.
    ///
    /// Legacy partition keys carrying more than one id keep the extra
    /// segments in `item_id`; see [`KeyPath::primary_id`].
    pub fn parse(partition_key: &str, sort_key: &str) -> Result<Self> {
        let (type_prefix, item_id) =
            partition_key.split_once(KEY_DELIMITER).ok_or_else(|| {
                DispatchError::malformed_key(
                    partition_key,
                    sort_key,
                    format!("partition key has no `{KEY_DELIMITER}` delimiter"),
                )
            })?;

        if type_prefix.is_empty() {
            return Err(DispatchError::malformed_key(
                partition_key,
                sort_key,
                "partition key has an empty type prefix",
            ));
        }
        if item_id.is_empty() {
            return Err(DispatchError::malformed_key(
                partition_key,
                sort_key,
                "partition key has an empty item id",
            ));
        }
        if sort_key.is_empty() {
            return Err(DispatchError::malformed_key(
                partition_key,
                sort_key,
                "sort key is empty",
            ));
        }

        let sub_prefix = sort_key
            .split(KEY_DELIMITER)
            .next()
            .unwrap_or(sort_key);

        Ok(Self {
            type_prefix: type_prefix.to_string(),
            item_id: item_id.to_string(),
            sub_prefix: sub_prefix.to_string(),
        })
    }

    /// First id segment of the partition key.
    pub fn primary_id(&self) -> &str {
        self.item_id
            .split(KEY_DELIMITER)
            .next()
            .unwrap_or(&self.item_id)
    }

    /// Whether the record is the root item of its entity.
    pub fn is_base_item(&self) -> bool {
        self.sub_prefix == BASE_SUB_PREFIX
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{KEY_DELIMITER}{} [{}]",
            self.type_prefix, self.item_id, self.sub_prefix
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_item() {
        let path = KeyPath::parse("comment/c1", "-").unwrap();
        assert_eq!(path.type_prefix, "comment");
        assert_eq!(path.item_id, "c1");
        assert_eq!(path.sub_prefix, "-");
        assert!(path.is_base_item());
    }

    #[test]
    fn test_parse_sub_item() {
        let path = KeyPath::parse("user/u1", "follower/u2").unwrap();
        assert_eq!(path.type_prefix, "user");
        assert_eq!(path.item_id, "u1");
        assert_eq!(path.sub_prefix, "follower");
        assert!(!path.is_base_item());
    }

    #[test]
    fn test_parse_sort_key_without_delimiter() {
        let path = KeyPath::parse("user/u1", "profile").unwrap();
        assert_eq!(path.sub_prefix, "profile");
    }

    #[test]
    fn test_parse_legacy_composite_id() {
        let path = KeyPath::parse("chat/c1/u9", "view/u2/2020").unwrap();
        assert_eq!(path.type_prefix, "chat");
        assert_eq!(path.item_id, "c1/u9");
        assert_eq!(path.primary_id(), "c1");
        assert_eq!(path.sub_prefix, "view");
    }

    #[test]
    fn test_malformed_keys() {
        for (pk, sk) in [("user", "-"), ("/u1", "-"), ("user/", "-"), ("user/u1", ""), ("", "-")] {
            let err = KeyPath::parse(pk, sk).unwrap_err();
            assert!(
                matches!(err, DispatchError::MalformedKey { .. }),
                "expected malformed key for ({pk:?}, {sk:?}), got {err:?}"
            );
        }
    }

    #[test]
    fn test_display() {
        let path = KeyPath::parse("post/p1", "-").unwrap();
        assert_eq!(path.to_string(), "post/p1 [-]");
    }
}
