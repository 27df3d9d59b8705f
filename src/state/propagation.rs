//! Propagation - Bubbling and descending custom events through the view tree.
//!
//! Two traversals share one argument contract: every emission carries the
//! caller's args and `origin = Some(start)`.
//!
//! - **Bubbling** emits on the start view, then on each ancestor nearest-first.
//!   The start view's flag is checked after it emits; an ancestor's flag is
//!   checked before it emits. An armed flag is consumed and ends the walk.
//! - **Descending** emits pre-order from the start view. Each visited view
//!   emits first; if its flag is armed it is consumed and that view's subtree
//!   is skipped, and the walk continues with the next sibling.

use serde_json::Value;
use tracing::trace;

use crate::engine::ViewTree;
use crate::types::{Event, ViewId};

impl ViewTree {
    /// Arm the one-shot stop flag for `event` on `view`.
    pub fn stop_event(&mut self, view: ViewId, event: &str) -> &mut Self {
        if let Some(node) = self.node_mut(view) {
            node.stops.arm(event);
        }
        self
    }

    /// True if `view` has an armed stop flag for `event`.
    pub fn is_event_stopped(&self, view: ViewId, event: &str) -> bool {
        self.node(view).is_some_and(|node| node.stops.is_armed(event))
    }

    fn consume_stop(&mut self, view: ViewId, event: &str) -> bool {
        self.node_mut(view)
            .is_some_and(|node| node.stops.consume_if_armed(event))
    }

    /// Emit `event` on `view`, then on each ancestor nearest-first.
    pub fn trigger_bubble(&mut self, view: ViewId, event: &str, args: Vec<Value>) -> &mut Self {
        if !self.contains(view) {
            return self;
        }

        self.emit(&Event::new(event, &args, view, Some(view)));
        if self.consume_stop(view, event) {
            trace!(%view, event, "bubble stopped at origin");
            return self;
        }

        let mut ancestor = self.parent(view);
        while let Some(current) = ancestor {
            if self.consume_stop(current, event) {
                trace!(%view, stopped_at = %current, event, "bubble stopped");
                return self;
            }
            self.emit(&Event::new(event, &args, current, Some(view)));
            ancestor = self.parent(current);
        }
        self
    }

    /// Emit `event` on `view` and its descendants in pre-order.
    pub fn trigger_descend(&mut self, view: ViewId, event: &str, args: Vec<Value>) -> &mut Self {
        if self.contains(view) {
            self.descend_event(&[view], event, &args, view);
        }
        self
    }

    fn descend_event(&mut self, views: &[ViewId], event: &str, args: &[Value], origin: ViewId) {
        for &current in views {
            // A handler earlier in the walk may have destroyed this view
            if !self.contains(current) {
                continue;
            }
            self.emit(&Event::new(event, args, current, Some(origin)));
            if self.consume_stop(current, event) {
                trace!(%origin, stopped_at = %current, event, "descend skipped subtree");
                continue;
            }
            let children = self.child_ids(current);
            if !children.is_empty() {
                self.descend_event(&children, event, args, origin);
            }
        }
    }

    // =========================================================================
    // Ancestry
    // =========================================================================

    /// First ancestor of `view` whose registered type is `view_type`.
    pub fn find_ancestor(&self, view: ViewId, view_type: &str) -> Option<ViewId> {
        let mut ancestor = self.parent(view);
        while let Some(current) = ancestor {
            if self.view_type(current) == Some(view_type) {
                return Some(current);
            }
            ancestor = self.parent(current);
        }
        None
    }

    /// The root of the tree containing `view` (the view itself if it has no parent).
    pub fn get_top_view(&self, view: ViewId) -> Option<ViewId> {
        if !self.contains(view) {
            return None;
        }
        let mut current = view;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        Some(current)
    }

    /// True if `view` has no parent.
    pub fn is_top_view(&self, view: ViewId) -> bool {
        self.parent(view).is_none()
    }
}
