//! # Key Namespace Constants
//!
//! Prefixes and delimiters of the single-table key namespace shared by the
//! key codec, the postprocessor router and the production registration list.

/// Separator between a key prefix and the id portion.
pub const KEY_DELIMITER: char = '/';

/// Sort key (and sub prefix) of an entity's root item.
pub const BASE_SUB_PREFIX: &str = "-";

/// Partition key type prefixes
pub mod type_prefix {
    pub const CARD: &str = "card";
    pub const CHAT: &str = "chat";
    pub const CHAT_MESSAGE: &str = "chatMessage";
    pub const COMMENT: &str = "comment";
    pub const POST: &str = "post";
    pub const USER: &str = "user";
}

/// Sort key sub prefixes
pub mod sub_prefix {
    pub const BASE: &str = super::BASE_SUB_PREFIX;
    pub const PROFILE: &str = "profile";
    pub const FOLLOWER: &str = "follower";
}

/// Upstream event names as delivered by the change stream
pub mod event_names {
    pub const INSERT: &str = "INSERT";
    pub const MODIFY: &str = "MODIFY";
    pub const REMOVE: &str = "REMOVE";
}

/// Log operation names emitted by the stream processor
pub mod operations {
    pub const POSTPROCESS: &str = "postprocess";
    pub const ITEM_ADD: &str = "item_add";
    pub const ATTRIBUTE_CHANGE: &str = "attribute_change";
    pub const ITEM_DELETE: &str = "item_delete";
}

/// Key attribute names of the single table
pub mod key_attributes {
    pub const PARTITION_KEY: &str = "partitionKey";
    pub const SORT_KEY: &str = "sortKey";
}
