//! Events Module - Per-view notification mechanism.
//!
//! Each view (and each [`Registry`](crate::Registry)) owns an [`Emitter`]: a
//! one-to-many handler table keyed by event name. Both propagation
//! algorithms emit through it and `bind_view_events` subscribes through it.
//!
//! # API
//!
//! - `tree.on(view, event, handler)` - Subscribe a view to its own event
//! - `tree.off(view, event, listener)` - Remove one subscription
//! - `tree.listen_to(listener, target, event, handler)` - Subscribe to another view
//! - `tree.stop_listening(listener, target, event, handler)` - Undo `listen_to`
//! - `tree.trigger(view, event, args)` - Emit on one view only
//!
//! # Example
//!
//! ```ignore
//! use spark_views::{Handler, ViewTree};
//!
//! let listener = tree.on(view, "save", Handler::func(|tree, me, event| {
//!     println!("{me} got {} from {:?}", event.name, event.origin);
//! }));
//!
//! tree.trigger(view, "save", vec![]);
//! tree.off(view, "save", listener);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::engine::ViewTree;
use crate::types::{Event, RegistryEvent, ViewId};

// =============================================================================
// TYPES
// =============================================================================

/// Callback for view events. Receives the tree, the view the handler is bound to, and the event.
pub type EventHandler = Rc<dyn Fn(&mut ViewTree, ViewId, &Event)>;

/// Callback for registry add/remove notifications.
pub type RegistryHandler = Rc<dyn Fn(&mut ViewTree, &RegistryEvent)>;

/// Identifies one subscription inside an [`Emitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

/// A view event handler: a method name resolved on the bound view, or a closure.
#[derive(Clone)]
pub enum Handler {
    /// Resolved through [`View::handle_event`](crate::View::handle_event) on the bound view.
    Named(String),
    /// Called directly.
    Func(EventHandler),
}

impl Handler {
    /// Wrap a closure.
    pub fn func<F>(handler: F) -> Self
    where
        F: Fn(&mut ViewTree, ViewId, &Event) + 'static,
    {
        Self::Func(Rc::new(handler))
    }

    /// Refer to a handler method by name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Named(a), Self::Named(b)) => a == b,
            (Self::Func(a), Self::Func(b)) => std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for Handler {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl From<String> for Handler {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// A subscription stored on a view's emitter.
#[derive(Clone, Debug)]
pub(crate) struct Subscription {
    /// The view the handler runs for.
    pub(crate) receiver: ViewId,
    pub(crate) handler: Handler,
}

/// Bookkeeping for a `listen_to` made by a view on another view.
#[derive(Clone, Debug)]
pub(crate) struct Listening {
    pub(crate) target: ViewId,
    pub(crate) event: String,
    pub(crate) handler: Handler,
    pub(crate) id: ListenerId,
}

// =============================================================================
// EMITTER
// =============================================================================

/// One-to-many handler table keyed by event name.
pub struct Emitter<H> {
    handlers: HashMap<String, Vec<(ListenerId, H)>>,
    next_id: usize,
}

impl<H> Default for Emitter<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<H> fmt::Debug for Emitter<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("Emitter").field("handlers", &counts).finish()
    }
}

impl<H: Clone> Emitter<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `event`.
    pub fn on(&mut self, event: &str, handler: H) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one subscription. Returns true if it existed.
    pub fn off(&mut self, event: &str, id: ListenerId) -> bool {
        let Some(list) = self.handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(listener_id, _)| *listener_id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(event);
        }
        removed
    }

    /// Remove every subscription for `event`, or every subscription at all.
    pub fn off_all(&mut self, event: Option<&str>) {
        match event {
            Some(event) => {
                self.handlers.remove(event);
            }
            None => self.handlers.clear(),
        }
    }

    /// Snapshot of the handlers for `event`, in subscription order.
    ///
    /// Handlers are cloned out so they can mutate the tree while running.
    pub fn handlers(&self, event: &str) -> Vec<H> {
        self.handlers
            .get(event)
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.handlers.get(event).map_or(0, Vec::len)
    }
}

// =============================================================================
// VIEW TREE API
// =============================================================================

impl ViewTree {
    /// Subscribe `view` to its own `event`. The handler is bound to `view`.
    ///
    /// Returns `None` if the view does not exist.
    pub fn on(&mut self, view: ViewId, event: &str, handler: impl Into<Handler>) -> Option<ListenerId> {
        let handler = handler.into();
        let node = self.node_mut(view)?;
        Some(node.events.on(
            event,
            Subscription {
                receiver: view,
                handler,
            },
        ))
    }

    /// Remove a subscription made with [`ViewTree::on`].
    pub fn off(&mut self, view: ViewId, event: &str, listener: ListenerId) -> bool {
        self.node_mut(view)
            .is_some_and(|node| node.events.off(event, listener))
    }

    /// Number of handlers subscribed to `event` on `view`.
    pub fn listener_count(&self, view: ViewId, event: &str) -> usize {
        self.node(view).map_or(0, |node| node.events.listener_count(event))
    }

    /// Subscribe `listener` to `event` on `target`; the handler runs bound to `listener`.
    pub fn listen_to(
        &mut self,
        listener: ViewId,
        target: ViewId,
        event: &str,
        handler: impl Into<Handler>,
    ) -> Option<ListenerId> {
        let handler = handler.into();
        if !self.contains(listener) {
            return None;
        }
        let id = self.node_mut(target)?.events.on(
            event,
            Subscription {
                receiver: listener,
                handler: handler.clone(),
            },
        );
        if let Some(node) = self.node_mut(listener) {
            node.listening.push(Listening {
                target,
                event: event.to_string(),
                handler,
                id,
            });
        }
        Some(id)
    }

    /// Undo `listen_to` subscriptions made by `listener`.
    ///
    /// Each filter left as `None` matches everything.
    pub fn stop_listening(
        &mut self,
        listener: ViewId,
        target: Option<ViewId>,
        event: Option<&str>,
        handler: Option<&Handler>,
    ) {
        let Some(node) = self.node_mut(listener) else {
            return;
        };
        let (matched, kept): (Vec<Listening>, Vec<Listening>) =
            std::mem::take(&mut node.listening).into_iter().partition(|l| {
                target.is_none_or(|t| t == l.target)
                    && event.is_none_or(|e| e == l.event)
                    && handler.is_none_or(|h| *h == l.handler)
            });
        node.listening = kept;

        for listening in matched {
            if let Some(target) = self.node_mut(listening.target) {
                target.events.off(&listening.event, listening.id);
            }
        }
    }

    /// Emit `event` on `view` only. No traversal, no stop flags.
    pub fn trigger(&mut self, view: ViewId, event: &str, args: Vec<Value>) -> &mut Self {
        if self.contains(view) {
            self.emit(&Event::new(event, &args, view, None));
        }
        self
    }

    /// Deliver `event` to every handler subscribed on `event.target`.
    pub(crate) fn emit(&mut self, event: &Event) {
        let subscriptions = match self.node(event.target) {
            Some(node) => node.events.handlers(&event.name),
            None => return,
        };
        for subscription in subscriptions {
            match &subscription.handler {
                Handler::Named(name) => {
                    let handled = self.with_behavior(subscription.receiver, |view, cx| {
                        view.handle_event(name, cx, event)
                    });
                    // The receiver is busy in one of its own hooks
                    if handled.is_none() && self.contains(subscription.receiver) {
                        self.defer_named(subscription.receiver, name, event);
                    }
                }
                Handler::Func(handler) => handler(self, subscription.receiver, event),
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
