//! View Tree - Arena of view nodes.
//!
//! Manages the lifecycle of view nodes:
//! - Slot allocation with a free pool for O(1) reuse
//! - Generation counters so stale [`ViewId`]s never resolve
//! - Unique identity tokens (`cid`) that are never reused
//! - Recursive release of descendants on destroy
//!
//! Parent/child links are handles into the arena, never owning references.

use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::dom::Document;
use crate::error::{Result, ViewError};
use crate::state::{Emitter, Handler, Listening, StopFlags, Subscription};
use crate::subviews::{ChildList, Registry, RegistryRef, parse_config_specs};
use crate::types::{ElementId, Event, Options, ViewId};

use super::class::{FactoryTable, ViewClass};
use super::view::{View, ViewContext};

// =============================================================================
// Node Storage
// =============================================================================

/// Everything the tree knows about one view.
pub(crate) struct ViewNode {
    pub(crate) cid: String,
    pub(crate) model: Option<String>,
    /// Key the view was registered under in its parent's registry.
    pub(crate) view_type: Option<String>,
    pub(crate) parent: Option<ViewId>,
    pub(crate) class: Rc<ViewClass>,
    pub(crate) options: Options,
    pub(crate) el: ElementId,
    pub(crate) subs: Registry,
    /// Registries listing this view as a child.
    pub(crate) holders: Vec<RegistryRef>,
    pub(crate) stops: StopFlags,
    pub(crate) events: Emitter<Subscription>,
    pub(crate) listening: Vec<Listening>,
    pub(crate) view_events: Vec<(String, Handler)>,
    /// Checked out while one of its callbacks runs.
    pub(crate) behavior: Option<Box<dyn View>>,
}

/// A named handler whose receiver was checked out when the event was emitted.
struct DeferredCall {
    receiver: ViewId,
    handler: String,
    event: Event,
}

#[derive(Default)]
struct Slot {
    generation: u32,
    node: Option<ViewNode>,
}

/// Arena owning every view node, the output document and the factory table.
pub struct ViewTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    next_cid: u64,
    document: Document,
    factories: FactoryTable,
    deferred: Vec<DeferredCall>,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewTree")
            .field("views", &self.len())
            .field("free", &self.free.len())
            .field("factories", &self.factories.len())
            .finish()
    }
}

impl ViewTree {
    pub fn new() -> Self {
        Self::with_factories(FactoryTable::new())
    }

    /// A tree whose configs can name constructors registered in `factories`.
    pub fn with_factories(factories: FactoryTable) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            next_cid: 0,
            document: Document::new(),
            factories,
            deferred: Vec::new(),
        }
    }

    pub fn factories(&self) -> &FactoryTable {
        &self.factories
    }

    pub fn factories_mut(&mut self) -> &mut FactoryTable {
        &mut self.factories
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    // =========================================================================
    // Index Allocation
    // =========================================================================

    /// Reserve a slot, reusing a freed one if possible.
    fn reserve_slot(&mut self) -> ViewId {
        if let Some(index) = self.free.pop() {
            let generation = self.slots[index as usize].generation;
            return ViewId::new(index, generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot::default());
        ViewId::new(index, 0)
    }

    fn next_cid(&mut self) -> String {
        let cid = format!("view{}", self.next_cid);
        self.next_cid += 1;
        cid
    }

    pub(crate) fn node(&self, id: ViewId) -> Option<&ViewNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn node_mut(&mut self, id: ViewId) -> Option<&mut ViewNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Construct a view of `class`.
    ///
    /// `parent` is kept only if it is a live view. The new view's registry is
    /// seeded from the `"subViewConfig"` option if present, else from the
    /// class; view events come from `"viewEvents"` or the class and are bound
    /// last. Other recognised options: `"tagName"`, `"id"`, `"className"`,
    /// `"model"` (model identity token).
    pub fn create_view(
        &mut self,
        class: &Rc<ViewClass>,
        options: Options,
        parent: Option<ViewId>,
    ) -> Result<ViewId> {
        let parent = parent.filter(|p| self.contains(*p));
        let configs = match options.get("subViewConfig") {
            Some(value) => parse_config_specs(value.clone())?,
            None => class.declared_sub_views().clone(),
        };
        let view_events = match options.get("viewEvents") {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(spec, handler)| {
                    handler.as_str().map(|name| (spec.clone(), Handler::named(name)))
                })
                .collect(),
            _ => class.declared_view_events().to_vec(),
        };

        let tag = options
            .get("tagName")
            .and_then(Value::as_str)
            .unwrap_or(class.element_tag())
            .to_string();
        let el = self.document.create_element(&tag);
        if let Some(id_attr) = options.get("id").and_then(Value::as_str) {
            self.document.set_element_id(el, id_attr);
        }
        if let Some(class_name) = options.get("className").and_then(Value::as_str) {
            for name in class_name.split_whitespace() {
                self.document.add_class(el, name);
            }
        }

        let behavior = class.build(&options);
        let model = options
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string);
        let cid = self.next_cid();
        let id = self.reserve_slot();
        let subs = Registry::new(Some(id), class.flags());

        self.slots[id.index()].node = Some(ViewNode {
            cid,
            model,
            view_type: None,
            parent,
            class: class.clone(),
            options,
            el,
            subs: subs.clone(),
            holders: Vec::new(),
            stops: StopFlags::new(),
            events: Emitter::new(),
            listening: Vec::new(),
            view_events,
            behavior: Some(behavior),
        });
        debug!(view = %id, class = class.name(), "created view");

        if let Err(err) = subs.add_configs(self, configs) {
            self.destroy(id);
            return Err(err);
        }
        if self.node(id).is_some_and(|node| !node.view_events.is_empty()) {
            self.bind_view_events(id, None);
        }
        Ok(id)
    }

    /// Construct a view from a class registered in the factory table.
    pub fn create_named(
        &mut self,
        path: &str,
        options: Options,
        parent: Option<ViewId>,
    ) -> Result<ViewId> {
        let class = self
            .factories
            .resolve(path)
            .ok_or_else(|| ViewError::UnresolvedFactory {
                key: path.to_string(),
                path: path.to_string(),
            })?;
        self.create_view(&class, options, parent)
    }

    /// Construct a behaviour-less view.
    pub fn create_plain(&mut self, parent: Option<ViewId>) -> Result<ViewId> {
        let class = Rc::new(ViewClass::plain("View"));
        self.create_view(&class, Options::new(), parent)
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn contains(&self, id: ViewId) -> bool {
        self.node(id).is_some()
    }

    /// Count of live views.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handles of every live view, in slot order.
    pub fn view_ids(&self) -> Vec<ViewId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.node.is_some())
            .map(|(index, slot)| ViewId::new(index as u32, slot.generation))
            .collect()
    }

    /// Identity token of `id`.
    pub fn cid(&self, id: ViewId) -> Option<&str> {
        self.node(id).map(|node| node.cid.as_str())
    }

    /// Find a live view by identity token.
    pub fn find_by_cid(&self, cid: &str) -> Option<ViewId> {
        self.view_ids()
            .into_iter()
            .find(|id| self.cid(*id) == Some(cid))
    }

    /// Model identity token of `id`.
    pub fn model(&self, id: ViewId) -> Option<&str> {
        self.node(id).and_then(|node| node.model.as_deref())
    }

    /// Set the model identity token. Registries index it on the next registration.
    pub fn set_model(&mut self, id: ViewId, model: Option<String>) {
        if let Some(node) = self.node_mut(id) {
            node.model = model;
        }
    }

    /// Key `id` was registered under in its parent's registry.
    pub fn view_type(&self, id: ViewId) -> Option<&str> {
        self.node(id).and_then(|node| node.view_type.as_deref())
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Output element of `id`.
    pub fn el(&self, id: ViewId) -> Option<ElementId> {
        self.node(id).map(|node| node.el)
    }

    /// Construction options of `id`.
    pub fn options(&self, id: ViewId) -> Option<&Options> {
        self.node(id).map(|node| &node.options)
    }

    pub fn class(&self, id: ViewId) -> Option<Rc<ViewClass>> {
        self.node(id).map(|node| node.class.clone())
    }

    /// The registry managing `id`'s children.
    pub fn subs(&self, id: ViewId) -> Option<Registry> {
        self.node(id).map(|node| node.subs.clone())
    }

    /// `id`'s public child list. Shares storage with its registry's ordered sequence.
    pub fn sub_views(&self, id: ViewId) -> Option<ChildList> {
        self.node(id).map(|node| node.subs.child_list())
    }

    /// Snapshot of `id`'s live children.
    pub fn child_ids(&self, id: ViewId) -> Vec<ViewId> {
        self.node(id).map(|node| node.subs.ids()).unwrap_or_default()
    }

    // =========================================================================
    // Behaviour
    // =========================================================================

    /// Run `f` with `id`'s behaviour checked out of the tree.
    ///
    /// Returns `None` if the view is unknown or its behaviour is already
    /// checked out further up the stack. Named handlers that targeted the
    /// view in the meantime run once the behaviour is back.
    pub fn with_behavior<R>(
        &mut self,
        id: ViewId,
        f: impl FnOnce(&mut dyn View, &mut ViewContext<'_>) -> R,
    ) -> Option<R> {
        let mut behavior = self.node_mut(id)?.behavior.take()?;
        let result = f(behavior.as_mut(), &mut ViewContext { tree: self, id });
        if let Some(node) = self.node_mut(id) {
            node.behavior.get_or_insert(behavior);
        }
        self.run_deferred(id);
        Some(result)
    }

    /// Queue a named handler for `receiver`, whose behaviour is checked out.
    pub(crate) fn defer_named(&mut self, receiver: ViewId, handler: &str, event: &Event) {
        trace!(%receiver, handler, event = %event.name, "deferred named handler");
        self.deferred.push(DeferredCall {
            receiver,
            handler: handler.to_string(),
            event: event.clone(),
        });
    }

    fn run_deferred(&mut self, id: ViewId) {
        if !self.deferred.iter().any(|call| call.receiver == id) {
            return;
        }
        let (ready, waiting): (Vec<DeferredCall>, Vec<DeferredCall>) =
            std::mem::take(&mut self.deferred)
                .into_iter()
                .partition(|call| call.receiver == id);
        self.deferred = waiting;
        for call in ready {
            self.with_behavior(id, |view, cx| view.handle_event(&call.handler, cx, &call.event));
        }
    }

    /// Render `id` (its own output only; sub-views render through its registry).
    pub fn render(&mut self, id: ViewId) -> Result<()> {
        if !self.contains(id) {
            return Err(ViewError::UnknownView(id));
        }
        self.with_behavior(id, |view, cx| view.render(cx))
            .unwrap_or(Ok(()))
    }

    /// Run the named operation on `id`. Returns false if the view doesn't have it.
    pub fn invoke(&mut self, id: ViewId, name: &str, args: &[Value]) -> bool {
        self.with_behavior(id, |view, cx| view.invoke(name, cx, args))
            .unwrap_or(false)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// The view's removal operation: run its `remove` hook, detach its element
    /// and drop the subscriptions it made on other views.
    ///
    /// The node stays allocated; use [`ViewTree::destroy`] to free it.
    pub fn remove_view(&mut self, id: ViewId) -> &mut Self {
        if !self.contains(id) {
            return self;
        }
        self.with_behavior(id, |view, cx| view.remove(cx));
        if let Some(el) = self.el(id) {
            self.document.detach(el);
        }
        self.stop_listening(id, None, None, None);
        self
    }

    /// Remove `id`, unregister it from every registry listing it and free it
    /// together with every descendant.
    pub fn destroy(&mut self, id: ViewId) {
        if self.contains(id) {
            self.release(id);
        }
    }

    /// Free `id` and, first, every view whose parent is `id`.
    fn release(&mut self, id: ViewId) {
        let children: Vec<ViewId> = self
            .view_ids()
            .into_iter()
            .filter(|child| self.parent(*child) == Some(id))
            .collect();
        for child in children {
            self.release(child);
        }

        let holders: Vec<Registry> = self
            .node(id)
            .map(|node| node.holders.iter().filter_map(RegistryRef::upgrade).collect())
            .unwrap_or_default();
        for holder in holders {
            holder.remove_views(self, &[id], true);
        }
        self.remove_view(id);
        self.deferred.retain(|call| call.receiver != id);

        let slot = &mut self.slots[id.index()];
        let Some(node) = slot.node.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.document.discard(node.el);
        debug!(view = %id, cid = node.cid, "released view");
    }
}
