//! Shared fixtures for integration tests: recording handlers and image builders.

#![allow(dead_code)]

use parking_lot::Mutex;
use std::sync::Arc;
use stream_dispatch::models::{AttributeValue, Image};
use stream_dispatch::postprocessor::{postprocessor, Postprocessor};
use stream_dispatch::registry::{attribute_handler, item_handler, AttributeHandler, ItemHandler};

/// One observed handler invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Item {
        handler: String,
        item_id: String,
        image: Image,
    },
    Attribute {
        handler: String,
        item_id: String,
        old_image: Image,
        new_image: Image,
    },
    Postprocess {
        handler: String,
        partition_key: String,
        sort_key: String,
    },
}

impl Call {
    pub fn handler(&self) -> &str {
        match self {
            Call::Item { handler, .. }
            | Call::Attribute { handler, .. }
            | Call::Postprocess { handler, .. } => handler,
        }
    }
}

/// Shared, ordered log of handler invocations
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.handler().to_string()).collect()
    }

    pub fn count(&self, handler: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.handler() == handler).count()
    }

    pub fn item(&self, name: &str) -> Arc<dyn ItemHandler> {
        let calls = self.calls.clone();
        let handler = name.to_string();
        item_handler(name.to_string(), move |item_id, image| {
            calls.lock().push(Call::Item {
                handler: handler.clone(),
                item_id: item_id.to_string(),
                image: image.clone(),
            });
            Ok(())
        })
    }

    /// Item handler that records its call and then fails
    pub fn failing_item(&self, name: &str) -> Arc<dyn ItemHandler> {
        let calls = self.calls.clone();
        let handler = name.to_string();
        item_handler(name.to_string(), move |item_id, image| {
            calls.lock().push(Call::Item {
                handler: handler.clone(),
                item_id: item_id.to_string(),
                image: image.clone(),
            });
            anyhow::bail!("{handler} refused {item_id}")
        })
    }

    pub fn attribute(&self, name: &str) -> Arc<dyn AttributeHandler> {
        let calls = self.calls.clone();
        let handler = name.to_string();
        attribute_handler(name.to_string(), move |item_id, old_image, new_image| {
            calls.lock().push(Call::Attribute {
                handler: handler.clone(),
                item_id: item_id.to_string(),
                old_image: old_image.clone(),
                new_image: new_image.clone(),
            });
            Ok(())
        })
    }

    pub fn postprocessor(&self, name: &str) -> Arc<dyn Postprocessor> {
        let calls = self.calls.clone();
        let handler = name.to_string();
        postprocessor(name.to_string(), move |partition_key, sort_key, _old, _new| {
            calls.lock().push(Call::Postprocess {
                handler: handler.clone(),
                partition_key: partition_key.to_string(),
                sort_key: sort_key.to_string(),
            });
            Ok(())
        })
    }
}

/// Build an image from string-valued attributes
pub fn image(pairs: &[(&str, &str)]) -> Image {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), AttributeValue::from(*value)))
        .collect()
}

/// Build an image from integer-valued attributes
pub fn counters(pairs: &[(&str, i64)]) -> Image {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), AttributeValue::from(*value)))
        .collect()
}
