//! # Handler Capabilities
//!
//! The two callable shapes the dispatch table routes to. Handlers are opaque
//! domain code: they may write to the backing store, send notifications or
//! update a search index, and they report failure through `anyhow::Error`.

use crate::models::Image;
use std::fmt;
use std::sync::Arc;

/// Handler fired when an item is created or removed.
///
/// Receives the item id and the image that exists (new image on create, old
/// image on delete).
pub trait ItemHandler: Send + Sync {
    /// Name used in logs and dispatch plans
    fn name(&self) -> &str;

    fn handle(&self, item_id: &str, image: &Image) -> anyhow::Result<()>;
}

/// Handler fired when watched attributes of an item change.
pub trait AttributeHandler: Send + Sync {
    /// Name used in logs and dispatch plans
    fn name(&self) -> &str;

    fn handle(&self, item_id: &str, old_image: &Image, new_image: &Image) -> anyhow::Result<()>;
}

/// Closure-backed [`ItemHandler`]
pub struct FnItemHandler<F> {
    name: String,
    func: F,
}

impl<F> FnItemHandler<F>
where
    F: Fn(&str, &Image) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> ItemHandler for FnItemHandler<F>
where
    F: Fn(&str, &Image) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, item_id: &str, image: &Image) -> anyhow::Result<()> {
        (self.func)(item_id, image)
    }
}

impl<F> fmt::Debug for FnItemHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnItemHandler")
            .field("name", &self.name)
            .finish()
    }
}

/// Closure-backed [`AttributeHandler`]
pub struct FnAttributeHandler<F> {
    name: String,
    func: F,
}

impl<F> FnAttributeHandler<F>
where
    F: Fn(&str, &Image, &Image) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> AttributeHandler for FnAttributeHandler<F>
where
    F: Fn(&str, &Image, &Image) -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn handle(&self, item_id: &str, old_image: &Image, new_image: &Image) -> anyhow::Result<()> {
        (self.func)(item_id, old_image, new_image)
    }
}

impl<F> fmt::Debug for FnAttributeHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAttributeHandler")
            .field("name", &self.name)
            .finish()
    }
}

/// Wrap a closure as a shared [`ItemHandler`].
pub fn item_handler<F>(name: impl Into<String>, func: F) -> Arc<dyn ItemHandler>
where
    F: Fn(&str, &Image) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnItemHandler::new(name, func))
}

/// Wrap a closure as a shared [`AttributeHandler`].
pub fn attribute_handler<F>(name: impl Into<String>, func: F) -> Arc<dyn AttributeHandler>
where
    F: Fn(&str, &Image, &Image) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnAttributeHandler::new(name, func))
}

/// Identity of a shared handler, independent of its vtable.
pub(crate) fn handler_identity<T: ?Sized>(handler: &Arc<T>) -> *const () {
    Arc::as_ptr(handler) as *const ()
}
