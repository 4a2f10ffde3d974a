//! # Dispatch Table
//!
//! Maps `(type_prefix, sub_prefix)` pairs to the handlers interested in
//! changes of matching items.
//!
//! ## Binding kinds
//!
//! - **Lifecycle bindings** fire once per matching created and/or removed
//!   record, with the item id and the image that exists.
//! - **Attribute bindings** fire once per matching created or modified
//!   record when their watched attributes transition away from an expected
//!   old value.
//!
//! ## Structure
//!
//! ```text
//! type_prefix ──▶ sub_prefix ──▶ RouteBindings
//!   "user"          "profile"       ├── lifecycle:  [user.on_user_delete, ...]
//!                                   └── attributes: [user.sync_pinpoint_email {email: absent}]
//!   "comment"       "-"             └── lifecycle:  [user.on_comment_add (add), ...]
//! ```
//!
//! The table is populated once at startup and shared read-only afterwards.
//! Lookups are exact on both levels; an unknown pair yields no handlers.

use crate::differ::attribute_changed;
use crate::models::{AttributeValue, Image};
use crate::registry::handler::{handler_identity, AttributeHandler, ItemHandler};
use crate::registry::registration::Registration;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Which lifecycle events a binding fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Created records, invoked with the new image
    Add,
    /// Removed records, invoked with the old image
    Delete,
    /// Both created and removed records
    Both,
}

impl LifecyclePhase {
    pub fn fires_on_add(&self) -> bool {
        matches!(self, Self::Add | Self::Both)
    }

    pub fn fires_on_delete(&self) -> bool {
        matches!(self, Self::Delete | Self::Both)
    }
}

/// A lifecycle handler together with the phases it is bound to
#[derive(Clone)]
pub struct LifecycleBinding {
    pub handler: Arc<dyn ItemHandler>,
    pub phase: LifecyclePhase,
}

impl fmt::Debug for LifecycleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBinding")
            .field("handler", &self.handler.name())
            .field("phase", &self.phase)
            .finish()
    }
}

/// Expected old value of a watched attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedOld {
    /// The attribute key must be missing from the old image
    Absent,
    /// The attribute must be present with exactly this value
    Value(AttributeValue),
    /// A missing attribute reads as this value, on both sides of the change
    AbsentOrValue(AttributeValue),
}

impl ExpectedOld {
    pub fn value(value: impl Into<AttributeValue>) -> Self {
        Self::Value(value.into())
    }

    pub fn absent_or(value: impl Into<AttributeValue>) -> Self {
        Self::AbsentOrValue(value.into())
    }

    /// Whether the old value of an attribute satisfies this expectation.
    pub fn matches(&self, old_value: Option<&AttributeValue>) -> bool {
        match (self, old_value) {
            (Self::Absent, None) => true,
            (Self::Absent, Some(_)) => false,
            (Self::Value(expected), Some(actual)) => expected == actual,
            (Self::Value(_), None) => false,
            (Self::AbsentOrValue(_), None) => true,
            (Self::AbsentOrValue(expected), Some(actual)) => expected == actual,
        }
    }

    /// Whether the watched attribute changed between the two images.
    pub fn changed(&self, name: &str, old_image: &Image, new_image: &Image) -> bool {
        match self {
            Self::AbsentOrValue(default) => {
                old_image.get(name).unwrap_or(default) != new_image.get(name).unwrap_or(default)
            }
            Self::Absent | Self::Value(_) => attribute_changed(old_image, new_image, name),
        }
    }
}

impl fmt::Display for ExpectedOld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Value(value) => write!(f, "{value}"),
            Self::AbsentOrValue(value) => write!(f, "absent|{value}"),
        }
    }
}

/// An attribute handler watching one or more attributes.
///
/// Fires when every watched attribute's old value matches its expectation
/// and at least one watched attribute changed value. Never fires for an
/// empty new image.
#[derive(Clone)]
pub struct AttributeBinding {
    pub handler: Arc<dyn AttributeHandler>,
    pub expectations: Vec<(String, ExpectedOld)>,
}

impl AttributeBinding {
    pub fn new<I, N>(handler: Arc<dyn AttributeHandler>, expectations: I) -> Self
    where
        I: IntoIterator<Item = (N, ExpectedOld)>,
        N: Into<String>,
    {
        Self {
            handler,
            expectations: expectations
                .into_iter()
                .map(|(name, expected)| (name.into(), expected))
                .collect(),
        }
    }

    /// Add another watched attribute.
    pub fn watch(mut self, name: impl Into<String>, expected: ExpectedOld) -> Self {
        self.expectations.push((name.into(), expected));
        self
    }

    pub fn watched_attributes(&self) -> impl Iterator<Item = &str> {
        self.expectations.iter().map(|(name, _)| name.as_str())
    }

    pub fn fires(&self, old_image: &Image, new_image: &Image) -> bool {
        if new_image.is_empty() || self.expectations.is_empty() {
            return false;
        }

        let old_values_match = self
            .expectations
            .iter()
            .all(|(name, expected)| expected.matches(old_image.get(name)));

        old_values_match
            && self
                .expectations
                .iter()
                .any(|(name, expected)| expected.changed(name, old_image, new_image))
    }
}

impl fmt::Debug for AttributeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeBinding")
            .field("handler", &self.handler.name())
            .field("expectations", &self.expectations)
            .finish()
    }
}

/// Everything registered for one `(type_prefix, sub_prefix)` pair
#[derive(Debug, Clone, Default)]
pub struct RouteBindings {
    pub lifecycle: Vec<LifecycleBinding>,
    pub attributes: Vec<AttributeBinding>,
}

/// Registered route, for inspection
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RouteSummary {
    pub type_prefix: String,
    pub sub_prefix: String,
    pub lifecycle_handlers: Vec<String>,
    pub attribute_handlers: Vec<String>,
}

/// Process-wide routing table from key prefixes to handlers
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    routes: HashMap<String, HashMap<String, RouteBindings>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from an explicit registration list, applied in order.
    pub fn from_registrations<I>(registrations: I) -> Self
    where
        I: IntoIterator<Item = Registration>,
    {
        let mut table = Self::new();
        for registration in registrations {
            table.apply(registration);
        }
        table
    }

    /// Apply a single registration entry.
    pub fn apply(&mut self, registration: Registration) {
        match registration {
            Registration::ItemLifecycle {
                type_prefix,
                sub_prefix,
                handlers,
            } => self.register_item_lifecycle(&type_prefix, &sub_prefix, handlers),
            Registration::ItemAdd {
                type_prefix,
                sub_prefix,
                handlers,
            } => self.register_item_add(&type_prefix, &sub_prefix, handlers),
            Registration::ItemDelete {
                type_prefix,
                sub_prefix,
                handlers,
            } => self.register_item_delete(&type_prefix, &sub_prefix, handlers),
            Registration::AttributeChange {
                type_prefix,
                sub_prefix,
                bindings,
            } => self.register_attribute_bindings(&type_prefix, &sub_prefix, bindings),
        }
    }

    /// Register handlers fired on both creation and removal. Repeated
    /// registration for the same pair appends, keeping order and duplicates.
    pub fn register_item_lifecycle<I>(&mut self, type_prefix: &str, sub_prefix: &str, handlers: I)
    where
        I: IntoIterator<Item = Arc<dyn ItemHandler>>,
    {
        self.register_lifecycle(type_prefix, sub_prefix, handlers, LifecyclePhase::Both);
    }

    /// Register handlers fired only on creation.
    pub fn register_item_add<I>(&mut self, type_prefix: &str, sub_prefix: &str, handlers: I)
    where
        I: IntoIterator<Item = Arc<dyn ItemHandler>>,
    {
        self.register_lifecycle(type_prefix, sub_prefix, handlers, LifecyclePhase::Add);
    }

    /// Register handlers fired only on removal.
    pub fn register_item_delete<I>(&mut self, type_prefix: &str, sub_prefix: &str, handlers: I)
    where
        I: IntoIterator<Item = Arc<dyn ItemHandler>>,
    {
        self.register_lifecycle(type_prefix, sub_prefix, handlers, LifecyclePhase::Delete);
    }

    fn register_lifecycle<I>(
        &mut self,
        type_prefix: &str,
        sub_prefix: &str,
        handlers: I,
        phase: LifecyclePhase,
    ) where
        I: IntoIterator<Item = Arc<dyn ItemHandler>>,
    {
        let route = self.route_mut(type_prefix, sub_prefix);
        for handler in handlers {
            debug!(
                type_prefix = %type_prefix,
                sub_prefix = %sub_prefix,
                handler = %handler.name(),
                phase = ?phase,
                "Registered lifecycle handler"
            );
            route.lifecycle.push(LifecycleBinding { handler, phase });
        }
    }

    /// Register attribute bindings, appended after any existing ones.
    pub fn register_attribute_bindings<I>(
        &mut self,
        type_prefix: &str,
        sub_prefix: &str,
        bindings: I,
    ) where
        I: IntoIterator<Item = AttributeBinding>,
    {
        let route = self.route_mut(type_prefix, sub_prefix);
        for binding in bindings {
            debug!(
                type_prefix = %type_prefix,
                sub_prefix = %sub_prefix,
                handler = %binding.handler.name(),
                "Registered attribute binding"
            );
            route.attributes.push(binding);
        }
    }

    fn route_mut(&mut self, type_prefix: &str, sub_prefix: &str) -> &mut RouteBindings {
        self.routes
            .entry(type_prefix.to_string())
            .or_default()
            .entry(sub_prefix.to_string())
            .or_default()
    }

    fn route(&self, type_prefix: &str, sub_prefix: &str) -> Option<&RouteBindings> {
        self.routes.get(type_prefix)?.get(sub_prefix)
    }

    /// All lifecycle handlers registered for the pair, in registration order.
    pub fn search_item_lifecycle(
        &self,
        type_prefix: &str,
        sub_prefix: &str,
    ) -> Vec<&Arc<dyn ItemHandler>> {
        self.lifecycle_where(type_prefix, sub_prefix, |_| true)
    }

    /// Lifecycle handlers to run for a created record.
    pub fn search_item_add(
        &self,
        type_prefix: &str,
        sub_prefix: &str,
    ) -> Vec<&Arc<dyn ItemHandler>> {
        self.lifecycle_where(type_prefix, sub_prefix, LifecyclePhase::fires_on_add)
    }

    /// Lifecycle handlers to run for a removed record.
    pub fn search_item_delete(
        &self,
        type_prefix: &str,
        sub_prefix: &str,
    ) -> Vec<&Arc<dyn ItemHandler>> {
        self.lifecycle_where(type_prefix, sub_prefix, LifecyclePhase::fires_on_delete)
    }

    fn lifecycle_where<P>(
        &self,
        type_prefix: &str,
        sub_prefix: &str,
        predicate: P,
    ) -> Vec<&Arc<dyn ItemHandler>>
    where
        P: Fn(&LifecyclePhase) -> bool,
    {
        self.route(type_prefix, sub_prefix)
            .map(|route| {
                route
                    .lifecycle
                    .iter()
                    .filter(|binding| predicate(&binding.phase))
                    .map(|binding| &binding.handler)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Attribute handlers whose binding fires for this transition, in
    /// registration order, each handler at most once.
    pub fn search_attribute_changes(
        &self,
        type_prefix: &str,
        sub_prefix: &str,
        old_image: &Image,
        new_image: &Image,
    ) -> Vec<&Arc<dyn AttributeHandler>> {
        let Some(route) = self.route(type_prefix, sub_prefix) else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        route
            .attributes
            .iter()
            .filter(|binding| binding.fires(old_image, new_image))
            .filter(|binding| seen.insert(handler_identity(&binding.handler)))
            .map(|binding| &binding.handler)
            .collect()
    }

    /// Registered routes, sorted by prefix pair.
    pub fn routes(&self) -> Vec<RouteSummary> {
        let mut summaries: Vec<RouteSummary> = self
            .routes
            .iter()
            .flat_map(|(type_prefix, subs)| {
                subs.iter().map(move |(sub_prefix, route)| RouteSummary {
                    type_prefix: type_prefix.clone(),
                    sub_prefix: sub_prefix.clone(),
                    lifecycle_handlers: route
                        .lifecycle
                        .iter()
                        .map(|b| b.handler.name().to_string())
                        .collect(),
                    attribute_handlers: route
                        .attributes
                        .iter()
                        .map(|b| b.handler.name().to_string())
                        .collect(),
                })
            })
            .collect();
        summaries.sort();
        summaries
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
