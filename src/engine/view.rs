//! The `View` trait - behaviour attached to a view node.
//!
//! The tree owns identity, output element, registry and listeners for every
//! node. A `View` only supplies what differs between components: how to render,
//! what to do on removal, and which named methods/handlers/properties exist.

use serde_json::Value;

use crate::error::Result;
use crate::subviews::Registry;
use crate::types::{ElementId, Event, ViewId};

use super::ViewTree;

/// Context handed to [`View`] callbacks.
///
/// The view's own behaviour is checked out of the tree while the callback
/// runs; everything else in the tree is reachable through `tree`.
pub struct ViewContext<'a> {
    pub tree: &'a mut ViewTree,
    pub id: ViewId,
}

impl ViewContext<'_> {
    /// This view's output element.
    pub fn el(&self) -> Option<ElementId> {
        self.tree.el(self.id)
    }

    /// This view's registry.
    pub fn subs(&self) -> Option<Registry> {
        self.tree.subs(self.id)
    }

    pub fn parent(&self) -> Option<ViewId> {
        self.tree.parent(self.id)
    }

    /// Set this view's text content.
    pub fn set_text(&mut self, text: impl Into<String>) {
        if let Some(el) = self.el() {
            self.tree.document_mut().set_text(el, text);
        }
    }
}

/// Component behaviour. Every method has a no-op default.
pub trait View {
    /// Produce or refresh this view's output.
    fn render(&mut self, cx: &mut ViewContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    /// Called when the view is removed, before its element is detached.
    fn remove(&mut self, cx: &mut ViewContext<'_>) {
        let _ = cx;
    }

    /// Run the operation `name` (used by `descend` and `invoke`).
    ///
    /// Return false if the view has no such operation.
    fn invoke(&mut self, name: &str, cx: &mut ViewContext<'_>, args: &[Value]) -> bool {
        let _ = (name, cx, args);
        false
    }

    /// Run the handler method `handler` for `event`.
    ///
    /// Return false if the view has no such handler.
    fn handle_event(&mut self, handler: &str, cx: &mut ViewContext<'_>, event: &Event) -> bool {
        let _ = (handler, cx, event);
        false
    }

    /// Resolve a named property to a view (listen targets in `bind_view_events`).
    fn property(&self, name: &str) -> Option<ViewId> {
        let _ = name;
        None
    }
}

/// A view with no behaviour of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainView;

impl View for PlainView {}
