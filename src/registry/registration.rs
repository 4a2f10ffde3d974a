//! # Static Registration List
//!
//! The dispatch table is built at process start from an explicit list of
//! tagged registration entries. [`production_registrations`] is the routing
//! table of the social backend, wired against injected domain capabilities.

use crate::constants::{sub_prefix, type_prefix};
use crate::registry::dispatch_table::{AttributeBinding, ExpectedOld};
use crate::registry::handler::{AttributeHandler, ItemHandler};
use std::sync::Arc;

/// One entry of the startup registration list
#[derive(Clone)]
pub enum Registration {
    /// Handlers fired on both creation and removal
    ItemLifecycle {
        type_prefix: String,
        sub_prefix: String,
        handlers: Vec<Arc<dyn ItemHandler>>,
    },
    /// Handlers fired on creation only
    ItemAdd {
        type_prefix: String,
        sub_prefix: String,
        handlers: Vec<Arc<dyn ItemHandler>>,
    },
    /// Handlers fired on removal only
    ItemDelete {
        type_prefix: String,
        sub_prefix: String,
        handlers: Vec<Arc<dyn ItemHandler>>,
    },
    /// Attribute-change bindings
    AttributeChange {
        type_prefix: String,
        sub_prefix: String,
        bindings: Vec<AttributeBinding>,
    },
}

impl Registration {
    pub fn item_lifecycle(
        type_prefix: impl Into<String>,
        sub_prefix: impl Into<String>,
        handlers: Vec<Arc<dyn ItemHandler>>,
    ) -> Self {
        Self::ItemLifecycle {
            type_prefix: type_prefix.into(),
            sub_prefix: sub_prefix.into(),
            handlers,
        }
    }

    pub fn item_add(
        type_prefix: impl Into<String>,
        sub_prefix: impl Into<String>,
        handlers: Vec<Arc<dyn ItemHandler>>,
    ) -> Self {
        Self::ItemAdd {
            type_prefix: type_prefix.into(),
            sub_prefix: sub_prefix.into(),
            handlers,
        }
    }

    pub fn item_delete(
        type_prefix: impl Into<String>,
        sub_prefix: impl Into<String>,
        handlers: Vec<Arc<dyn ItemHandler>>,
    ) -> Self {
        Self::ItemDelete {
            type_prefix: type_prefix.into(),
            sub_prefix: sub_prefix.into(),
            handlers,
        }
    }

    pub fn attribute_change(
        type_prefix: impl Into<String>,
        sub_prefix: impl Into<String>,
        bindings: Vec<AttributeBinding>,
    ) -> Self {
        Self::AttributeChange {
            type_prefix: type_prefix.into(),
            sub_prefix: sub_prefix.into(),
            bindings,
        }
    }

    /// The `(type_prefix, sub_prefix)` pair this entry registers against.
    pub fn key(&self) -> (&str, &str) {
        match self {
            Self::ItemLifecycle {
                type_prefix,
                sub_prefix,
                ..
            }
            | Self::ItemAdd {
                type_prefix,
                sub_prefix,
                ..
            }
            | Self::ItemDelete {
                type_prefix,
                sub_prefix,
                ..
            }
            | Self::AttributeChange {
                type_prefix,
                sub_prefix,
                ..
            } => (type_prefix, sub_prefix),
        }
    }
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, count) = match self {
            Self::ItemLifecycle { handlers, .. } => ("ItemLifecycle", handlers.len()),
            Self::ItemAdd { handlers, .. } => ("ItemAdd", handlers.len()),
            Self::ItemDelete { handlers, .. } => ("ItemDelete", handlers.len()),
            Self::AttributeChange { bindings, .. } => ("AttributeChange", bindings.len()),
        };
        let (type_prefix, sub_prefix) = self.key();
        f.debug_struct(kind)
            .field("type_prefix", &type_prefix)
            .field("sub_prefix", &sub_prefix)
            .field("entries", &count)
            .finish()
    }
}

/// Domain capabilities the production routing table binds to.
///
/// Constructed once at startup by the embedding service and injected here;
/// nothing in this crate owns or creates them.
#[derive(Clone)]
pub struct DomainHandlers {
    pub user_sync_status_due_to_chat_messages: Arc<dyn AttributeHandler>,
    pub user_sync_status_due_to_comments: Arc<dyn AttributeHandler>,
    pub user_sync_status_due_to_posts: Arc<dyn AttributeHandler>,
    pub user_sync_requested_followers_card: Arc<dyn AttributeHandler>,
    pub user_sync_chats_with_new_messages_card: Arc<dyn AttributeHandler>,
    pub user_sync_pinpoint_email: Arc<dyn AttributeHandler>,
    pub user_sync_pinpoint_phone: Arc<dyn AttributeHandler>,
    pub user_sync_pinpoint_user_status: Arc<dyn AttributeHandler>,
    pub user_sync_elasticsearch: Arc<dyn AttributeHandler>,
    pub user_on_comment_add: Arc<dyn ItemHandler>,
    pub user_on_comment_delete: Arc<dyn ItemHandler>,
    pub user_on_user_delete: Arc<dyn ItemHandler>,
    pub card_on_user_delete: Arc<dyn ItemHandler>,
}

/// User status value the pinpoint sync watches transitions away from.
pub const ACTIVE_USER_STATUS: &str = "ACTIVE";

/// Routing table of the social backend.
///
/// Counter attributes are watched from zero, where a never-written counter
/// counts as zero; contact and search fields are watched from absent.
pub fn production_registrations(handlers: &DomainHandlers) -> Vec<Registration> {
    let from_zero = |name: &str, handler: &Arc<dyn AttributeHandler>| {
        AttributeBinding::new(handler.clone(), [(name, ExpectedOld::absent_or(0))])
    };
    let from_absent = |name: &str, handler: &Arc<dyn AttributeHandler>| {
        AttributeBinding::new(handler.clone(), [(name, ExpectedOld::Absent)])
    };

    vec![
        Registration::attribute_change(
            type_prefix::USER,
            sub_prefix::PROFILE,
            vec![
                from_zero(
                    "chatMessagesForcedDeletionCount",
                    &handlers.user_sync_status_due_to_chat_messages,
                ),
                from_zero(
                    "commentForcedDeletionCount",
                    &handlers.user_sync_status_due_to_comments,
                ),
                from_zero("postForcedArchivingCount", &handlers.user_sync_status_due_to_posts),
                from_zero(
                    "followersRequestedCount",
                    &handlers.user_sync_requested_followers_card,
                ),
                from_zero(
                    "chatsWithUnviewedMessagesCount",
                    &handlers.user_sync_chats_with_new_messages_card,
                ),
                from_absent("email", &handlers.user_sync_pinpoint_email),
                from_absent("phoneNumber", &handlers.user_sync_pinpoint_phone),
                AttributeBinding::new(
                    handlers.user_sync_pinpoint_user_status.clone(),
                    [("userStatus", ExpectedOld::absent_or(ACTIVE_USER_STATUS))],
                ),
                from_absent("username", &handlers.user_sync_elasticsearch)
                    .watch("fullName", ExpectedOld::Absent)
                    .watch("lastManuallyReindexedAt", ExpectedOld::Absent),
            ],
        ),
        Registration::item_add(
            type_prefix::COMMENT,
            sub_prefix::BASE,
            vec![handlers.user_on_comment_add.clone()],
        ),
        Registration::item_delete(
            type_prefix::USER,
            sub_prefix::PROFILE,
            vec![
                handlers.card_on_user_delete.clone(),
                handlers.user_on_user_delete.clone(),
            ],
        ),
        Registration::item_delete(
            type_prefix::COMMENT,
            sub_prefix::BASE,
            vec![handlers.user_on_comment_delete.clone()],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttributeValue, Image};
    use crate::registry::dispatch_table::DispatchTable;
    use crate::registry::handler::{attribute_handler, item_handler};

    fn domain_handlers() -> DomainHandlers {
        let attr = |name: &str| attribute_handler(name.to_string(), |_, _, _| Ok(()));
        let item = |name: &str| item_handler(name.to_string(), |_, _| Ok(()));
        DomainHandlers {
            user_sync_status_due_to_chat_messages: attr(
                "user.sync_user_status_due_to_chat_messages",
            ),
            user_sync_status_due_to_comments: attr("user.sync_user_status_due_to_comments"),
            user_sync_status_due_to_posts: attr("user.sync_user_status_due_to_posts"),
            user_sync_requested_followers_card: attr("user.sync_requested_followers_card"),
            user_sync_chats_with_new_messages_card: attr("user.sync_chats_with_new_messages_card"),
            user_sync_pinpoint_email: attr("user.sync_pinpoint_email"),
            user_sync_pinpoint_phone: attr("user.sync_pinpoint_phone"),
            user_sync_pinpoint_user_status: attr("user.sync_pinpoint_user_status"),
            user_sync_elasticsearch: attr("user.sync_elasticsearch"),
            user_on_comment_add: item("user.on_comment_add"),
            user_on_comment_delete: item("user.on_comment_delete"),
            user_on_user_delete: item("user.on_user_delete"),
            card_on_user_delete: item("card.on_user_delete"),
        }
    }

    #[test]
    fn test_production_routing_table() {
        let table = DispatchTable::from_registrations(production_registrations(&domain_handlers()));
        let routes = table.routes();

        let keys: Vec<(&str, &str)> = routes
            .iter()
            .map(|r| (r.type_prefix.as_str(), r.sub_prefix.as_str()))
            .collect();
        assert_eq!(keys, vec![("comment", "-"), ("user", "profile")]);

        assert_eq!(
            routes[0].lifecycle_handlers,
            vec!["user.on_comment_add", "user.on_comment_delete"]
        );
        assert_eq!(
            routes[1].lifecycle_handlers,
            vec!["card.on_user_delete", "user.on_user_delete"]
        );
        assert_eq!(routes[1].attribute_handlers.len(), 9);
    }

    #[test]
    fn test_comment_add_and_delete_are_separate_phases() {
        let table = DispatchTable::from_registrations(production_registrations(&domain_handlers()));

        let added: Vec<_> = table
            .search_item_add("comment", "-")
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        let deleted: Vec<_> = table
            .search_item_delete("comment", "-")
            .iter()
            .map(|h| h.name().to_string())
            .collect();

        assert_eq!(added, vec!["user.on_comment_add"]);
        assert_eq!(deleted, vec!["user.on_comment_delete"]);
        assert!(table.search_item_add("user", "profile").is_empty());
    }

    #[test]
    fn test_first_counter_increment_fires_status_sync() {
        let table = DispatchTable::from_registrations(production_registrations(&domain_handlers()));

        let mut new_image = Image::new();
        new_image.insert("postForcedArchivingCount".into(), AttributeValue::from(1));

        let fired: Vec<_> = table
            .search_attribute_changes("user", "profile", &Image::new(), &new_image)
            .iter()
            .map(|h| h.name().to_string())
            .collect();
        assert_eq!(fired, vec!["user.sync_user_status_due_to_posts"]);
    }

    #[test]
    fn test_registration_key_and_debug() {
        let registration = Registration::item_add("comment", "-", vec![]);
        assert_eq!(registration.key(), ("comment", "-"));
        assert!(format!("{registration:?}").contains("ItemAdd"));
    }
}
