//! # Postprocessor Router
//!
//! Legacy single-handler-per-entity routing that runs alongside the dispatch
//! table. Rules are checked in a fixed order against the raw keys and the
//! first match selects the postprocessor; at most one runs per record.
//!
//! | Order | Rule                                             | Postprocessor |
//! |-------|--------------------------------------------------|---------------|
//! | 1     | partition key starts with `card/`                | card          |
//! | 2     | partition key starts with `chat/`                | chat          |
//! | 3     | partition key starts with `chatMessage/`         | chat message  |
//! | 4     | partition key starts with `comment/`             | comment       |
//! | 5     | partition key starts with `post/`                | post          |
//! | 6     | `user/` partition key and `follower/` sort key   | follower      |

use crate::constants::{sub_prefix, type_prefix, KEY_DELIMITER};
use crate::models::Image;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Legacy per-entity change handler.
///
/// Any sub-dispatch on the sort key (base item versus sub-items) happens
/// inside the postprocessor.
pub trait Postprocessor: Send + Sync {
    /// Name used in logs and dispatch plans
    fn name(&self) -> &str;

    fn run(
        &self,
        partition_key: &str,
        sort_key: &str,
        old_image: &Image,
        new_image: &Image,
    ) -> anyhow::Result<()>;
}

/// Closure-backed [`Postprocessor`]
pub struct FnPostprocessor<F> {
    name: String,
    func: F,
}

impl<F> FnPostprocessor<F>
where
    F: Fn(&str, &str, &Image, &Image) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Postprocessor for FnPostprocessor<F>
where
    F: Fn(&str, &str, &Image, &Image) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        partition_key: &str,
        sort_key: &str,
        old_image: &Image,
        new_image: &Image,
    ) -> anyhow::Result<()> {
        (self.func)(partition_key, sort_key, old_image, new_image)
    }
}

/// Wrap a closure as a shared [`Postprocessor`].
pub fn postprocessor<F>(name: impl Into<String>, func: F) -> Arc<dyn Postprocessor>
where
    F: Fn(&str, &str, &Image, &Image) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnPostprocessor::new(name, func))
}

/// Entity kinds that have a legacy postprocessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostprocessorKind {
    Card,
    Chat,
    ChatMessage,
    Comment,
    Post,
    Follower,
}

impl PostprocessorKind {
    /// Rule evaluation order
    pub const ROUTING_ORDER: [Self; 6] = [
        Self::Card,
        Self::Chat,
        Self::ChatMessage,
        Self::Comment,
        Self::Post,
        Self::Follower,
    ];

    /// Whether this kind's rule matches the raw keys.
    pub fn matches(&self, partition_key: &str, sort_key: &str) -> bool {
        match self {
            Self::Card => has_prefix(partition_key, type_prefix::CARD),
            Self::Chat => has_prefix(partition_key, type_prefix::CHAT),
            Self::ChatMessage => has_prefix(partition_key, type_prefix::CHAT_MESSAGE),
            Self::Comment => has_prefix(partition_key, type_prefix::COMMENT),
            Self::Post => has_prefix(partition_key, type_prefix::POST),
            Self::Follower => {
                has_prefix(partition_key, type_prefix::USER)
                    && has_prefix(sort_key, sub_prefix::FOLLOWER)
            }
        }
    }
}

impl fmt::Display for PostprocessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Card => write!(f, "card"),
            Self::Chat => write!(f, "chat"),
            Self::ChatMessage => write!(f, "chat_message"),
            Self::Comment => write!(f, "comment"),
            Self::Post => write!(f, "post"),
            Self::Follower => write!(f, "follower"),
        }
    }
}

/// `key` starts with `prefix` followed by the key delimiter.
fn has_prefix(key: &str, prefix: &str) -> bool {
    key.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with(KEY_DELIMITER))
}

/// Selects the legacy postprocessor for a record
#[derive(Clone, Default)]
pub struct PostprocessorRouter {
    postprocessors: HashMap<PostprocessorKind, Arc<dyn Postprocessor>>,
}

impl PostprocessorRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the postprocessor for an entity kind, replacing any previous one.
    pub fn register(&mut self, kind: PostprocessorKind, postprocessor: Arc<dyn Postprocessor>) {
        debug!(kind = %kind, postprocessor = %postprocessor.name(), "Registered postprocessor");
        self.postprocessors.insert(kind, postprocessor);
    }

    pub fn with_postprocessor(
        mut self,
        kind: PostprocessorKind,
        postprocessor: Arc<dyn Postprocessor>,
    ) -> Self {
        self.register(kind, postprocessor);
        self
    }

    /// First rule matching the raw keys, if any.
    pub fn select_kind(partition_key: &str, sort_key: &str) -> Option<PostprocessorKind> {
        PostprocessorKind::ROUTING_ORDER
            .into_iter()
            .find(|kind| kind.matches(partition_key, sort_key))
    }

    /// The postprocessor to run for the raw keys. A matched kind with no
    /// wired postprocessor selects nothing.
    pub fn select(&self, partition_key: &str, sort_key: &str) -> Option<&Arc<dyn Postprocessor>> {
        let kind = Self::select_kind(partition_key, sort_key)?;
        self.postprocessors.get(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.postprocessors.is_empty()
    }
}

impl fmt::Debug for PostprocessorRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wired: Vec<String> = self
            .postprocessors
            .iter()
            .map(|(kind, p)| format!("{kind}={}", p.name()))
            .collect();
        wired.sort();
        f.debug_struct("PostprocessorRouter")
            .field("postprocessors", &wired)
            .finish()
    }
}
