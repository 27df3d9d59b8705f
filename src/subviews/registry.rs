//! Registry - Per-node manager of child configs, live children and their indexes.
//!
//! Every live child is filed in:
//! - the ordered child list (shared with the owning node's `sub_views()`)
//! - exactly one of the singleton index or the by-type index
//! - the by-cid index
//! - the by-model index, if it has a model token
//!
//! A type key is never in both the singleton and the by-type index.
//!
//! # Handles
//!
//! `Registry` is a cheap clonable handle. Operations take `&mut ViewTree`
//! and never hold the internal borrow while calling back into the tree, so
//! constructors, hooks and listeners may freely use the registry again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::engine::ViewTree;
use crate::error::{Result, ViewError};
use crate::state::{Emitter, ListenerId, RegistryHandler};
use crate::types::{Options, RegistryEvent, ViewId, merge_options};

use super::config::{ChildConfig, Constructor, RegistryFlags, parse_config_specs};
use super::source::{ChildSource, Operation, Selection, SubKey, SubLookup};

/// Ordered child list, aliased between a node and its registry.
pub type ChildList = Rc<RefCell<Vec<ViewId>>>;

type ConfigTable = Rc<RefCell<IndexMap<String, ChildConfig>>>;

// =============================================================================
// State
// =============================================================================

/// What the registry remembers about one child.
#[derive(Debug, Clone)]
struct Member {
    key: String,
    cid: String,
    model: Option<String>,
}

struct RegistryState {
    owner: Option<ViewId>,
    flags: RegistryFlags,
    configs: ConfigTable,
    children: ChildList,
    members: HashMap<ViewId, Member>,
    singletons: HashMap<String, ViewId>,
    by_type: HashMap<String, Vec<ViewId>>,
    by_cid: HashMap<String, ViewId>,
    by_model: HashMap<String, SubLookup>,
    events: Emitter<RegistryHandler>,
}

impl RegistryState {
    fn new(owner: Option<ViewId>, flags: RegistryFlags, configs: ConfigTable) -> Self {
        Self {
            owner,
            flags,
            configs,
            children: Rc::new(RefCell::new(Vec::new())),
            members: HashMap::new(),
            singletons: HashMap::new(),
            by_type: HashMap::new(),
            by_cid: HashMap::new(),
            by_model: HashMap::new(),
            events: Emitter::new(),
        }
    }
}

/// Manager of one node's children. See the module docs.
#[derive(Clone)]
pub struct Registry {
    state: Rc<RefCell<RegistryState>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let configs = state.configs.borrow();
        f.debug_struct("Registry")
            .field("owner", &state.owner)
            .field("flags", &state.flags)
            .field("children", &*state.children.borrow())
            .field("configs", &configs.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Non-owning link from a child node back to a registry listing it.
#[derive(Clone)]
pub(crate) struct RegistryRef(Weak<RefCell<RegistryState>>);

impl RegistryRef {
    pub(crate) fn upgrade(&self) -> Option<Registry> {
        self.0.upgrade().map(|state| Registry { state })
    }

    fn is(&self, registry: &Registry) -> bool {
        std::ptr::eq(self.0.as_ptr(), Rc::as_ptr(&registry.state))
    }
}

fn required_key(key: Option<&str>) -> Result<&str> {
    key.ok_or_else(|| {
        error!("construction options given without a sub-view key");
        ViewError::MissingConfig { key: String::new() }
    })
}

impl Registry {
    /// An empty registry for the children of `owner`.
    pub fn new(owner: Option<ViewId>, flags: RegistryFlags) -> Self {
        let configs = Rc::new(RefCell::new(IndexMap::new()));
        Self {
            state: Rc::new(RefCell::new(RegistryState::new(owner, flags, configs))),
        }
    }

    /// The node whose children this registry manages.
    pub fn owner(&self) -> Option<ViewId> {
        self.state.borrow().owner
    }

    pub fn flags(&self) -> RegistryFlags {
        self.state.borrow().flags
    }

    /// The ordered child list itself (not a copy).
    pub fn child_list(&self) -> ChildList {
        self.state.borrow().children.clone()
    }

    // =========================================================================
    // Configs
    // =========================================================================

    /// Snapshot of every stored config, in insertion order.
    pub fn configs(&self) -> IndexMap<String, ChildConfig> {
        self.state.borrow().configs.borrow().clone()
    }

    pub fn config(&self, key: &str) -> Option<ChildConfig> {
        self.state.borrow().configs.borrow().get(key).cloned()
    }

    pub fn has_config(&self, key: &str) -> bool {
        self.state.borrow().configs.borrow().contains_key(key)
    }

    /// Store `config` under `key` (last write wins).
    ///
    /// With `AUTO_INIT_SINGLETONS` set, a singleton config is constructed at once.
    pub fn add_config(&self, tree: &mut ViewTree, key: &str, config: ChildConfig) -> Result<&Self> {
        let auto_init =
            config.is_singleton() && self.flags().contains(RegistryFlags::AUTO_INIT_SINGLETONS);
        self.state
            .borrow()
            .configs
            .borrow_mut()
            .insert(key.to_string(), config);
        trace!(key, "stored sub-view config");

        if auto_init {
            self.create(tree, key, Options::new(), None)?;
        }
        Ok(self)
    }

    pub fn add_configs(
        &self,
        tree: &mut ViewTree,
        configs: IndexMap<String, ChildConfig>,
    ) -> Result<&Self> {
        for (key, config) in configs {
            self.add_config(tree, &key, config)?;
        }
        Ok(self)
    }

    /// Store configs given in JSON form (`key -> { construct, options, singleton, location }`).
    pub fn add_config_specs(&self, tree: &mut ViewTree, specs: Value) -> Result<&Self> {
        let configs = parse_config_specs(specs)?;
        self.add_configs(tree, configs)
    }

    // =========================================================================
    // Adding
    // =========================================================================

    /// Register ready views or construct new ones, depending on `source`.
    ///
    /// A live singleton under the key makes the call a no-op for that key.
    /// Instances without a key are filed under a generated `_svid_<n>` key.
    pub fn add(
        &self,
        tree: &mut ViewTree,
        key: Option<&str>,
        source: impl Into<ChildSource>,
        singleton: Option<bool>,
    ) -> Result<&Self> {
        match source.into() {
            ChildSource::Instance(view) => {
                self.register_instances(tree, key, vec![view], singleton);
            }
            ChildSource::Instances(views) => {
                self.register_instances(tree, key, views, singleton);
            }
            ChildSource::Options(options) => {
                self.create(tree, required_key(key)?, options, singleton)?;
            }
            ChildSource::OptionsList(list) => {
                let key = required_key(key)?;
                for options in list {
                    self.create(tree, key, options, singleton)?;
                }
            }
            ChildSource::Keyed(map) => {
                for (key, source) in map {
                    self.add(tree, Some(&key), source, singleton)?;
                }
            }
        }
        Ok(self)
    }

    /// Register a ready view under `key`.
    pub fn add_instance(
        &self,
        tree: &mut ViewTree,
        key: Option<&str>,
        view: ViewId,
        singleton: Option<bool>,
    ) -> Result<&Self> {
        self.register_instances(tree, key, vec![view], singleton);
        Ok(self)
    }

    /// Construct a child from `key`'s config with `options` merged over the config's.
    pub fn add_options(
        &self,
        tree: &mut ViewTree,
        key: &str,
        options: Options,
        singleton: Option<bool>,
    ) -> Result<&Self> {
        self.create(tree, key, options, singleton)?;
        Ok(self)
    }

    /// Like [`Registry::add_options`], returning the new view.
    ///
    /// `Ok(None)` means a singleton already occupies `key`.
    pub fn create(
        &self,
        tree: &mut ViewTree,
        key: &str,
        options: Options,
        singleton: Option<bool>,
    ) -> Result<Option<ViewId>> {
        let Some(config) = self.config(key) else {
            error!(key, "no sub-view config registered");
            return Err(ViewError::MissingConfig {
                key: key.to_string(),
            });
        };
        if self.has_singleton(key) {
            trace!(key, "singleton already constructed");
            return Ok(None);
        }

        let class = match &config.constructor {
            Constructor::Class(class) => class.clone(),
            Constructor::Path(path) => match tree.factories().resolve(path) {
                Some(class) => class,
                None => {
                    error!(key, path = %path, "sub-view constructor was not found");
                    return Err(ViewError::UnresolvedFactory {
                        key: key.to_string(),
                        path: path.clone(),
                    });
                }
            },
        };

        let options = merge_options(&config.options, &options);
        let view = tree.create_view(&class, options, self.owner())?;
        if !self.set_instance(tree, key, view, singleton.or(config.singleton)) {
            tree.destroy(view);
            return Ok(None);
        }
        debug!(key, %view, "constructed sub-view");
        self.notify_added(tree, key, view);
        Ok(Some(view))
    }

    fn register_instances(
        &self,
        tree: &mut ViewTree,
        key: Option<&str>,
        views: Vec<ViewId>,
        singleton: Option<bool>,
    ) {
        let key = match key {
            Some(key) => key.to_string(),
            None => format!("_svid_{}", self.state.borrow().configs.borrow().len()),
        };
        if self.has_singleton(&key) {
            trace!(key = %key, "singleton already registered");
            return;
        }

        let views: Vec<ViewId> = views.into_iter().filter(|v| tree.contains(*v)).collect();
        let Some(&first) = views.first() else {
            return;
        };

        let config_singleton = match self.config(&key) {
            Some(config) => config.singleton,
            None => {
                if let Some(class) = tree.class(first) {
                    let implicit = ChildConfig {
                        constructor: Constructor::Class(class),
                        options: tree.options(first).cloned().unwrap_or_default(),
                        singleton,
                        location: None,
                    };
                    self.state
                        .borrow()
                        .configs
                        .borrow_mut()
                        .insert(key.clone(), implicit);
                }
                singleton
            }
        };

        let singleton = singleton.or(config_singleton);
        for view in views {
            if self.set_instance(tree, &key, view, singleton) {
                debug!(key = %key, %view, "registered sub-view");
                self.notify_added(tree, &key, view);
            }
        }
    }

    /// File `view` in every index. Returns false if it was not added.
    fn set_instance(
        &self,
        tree: &mut ViewTree,
        key: &str,
        view: ViewId,
        singleton: Option<bool>,
    ) -> bool {
        let Some(cid) = tree.cid(view).map(str::to_string) else {
            return false;
        };
        let model = tree.model(view).map(str::to_string);

        let owner = {
            let mut state = self.state.borrow_mut();
            if state.members.contains_key(&view) {
                trace!(%view, "already registered");
                return false;
            }
            let singleton =
                singleton.unwrap_or(state.flags.contains(RegistryFlags::DEFAULT_TO_SINGLETONS));
            if singleton && state.singletons.contains_key(key) {
                return false;
            }

            let state = &mut *state;
            state.children.borrow_mut().push(view);
            state.by_cid.insert(cid.clone(), view);
            if let Some(model) = &model {
                let entry = match state.by_model.remove(model) {
                    None => SubLookup::One(view),
                    Some(SubLookup::One(existing)) => SubLookup::Many(vec![existing, view]),
                    Some(SubLookup::Many(mut list)) => {
                        list.push(view);
                        SubLookup::Many(list)
                    }
                };
                state.by_model.insert(model.clone(), entry);
            }
            // A key with by-type children stays by-type
            if singleton && !state.by_type.contains_key(key) {
                state.singletons.insert(key.to_string(), view);
            } else {
                state.by_type.entry(key.to_string()).or_default().push(view);
            }
            state.members.insert(
                view,
                Member {
                    key: key.to_string(),
                    cid,
                    model,
                },
            );
            state.owner
        };

        if let Some(node) = tree.node_mut(view) {
            node.holders.push(RegistryRef(Rc::downgrade(&self.state)));
            node.view_type = Some(key.to_string());
            if node.parent.is_none() && owner != Some(view) {
                node.parent = owner;
            }
        }
        true
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Resolve `key` to a child or children.
    ///
    /// Order: identity token (for views), model token, dotted path, singleton,
    /// by-cid, by-model, by-type. An empty by-type sequence is a miss.
    pub fn get(&self, tree: &ViewTree, key: impl Into<SubKey>) -> Option<SubLookup> {
        match key.into() {
            SubKey::View(view) => self.lookup_token(tree.cid(view)?),
            SubKey::Model(model) => self.lookup_token(&model),
            SubKey::Name(name) => {
                if name.contains('.') && self.flags().contains(RegistryFlags::DOT_NOTATION) {
                    return self.get_dotted(tree, &name);
                }
                self.get_local(&name)
            }
        }
    }

    fn lookup_token(&self, token: &str) -> Option<SubLookup> {
        let state = self.state.borrow();
        state
            .by_cid
            .get(token)
            .map(|view| SubLookup::One(*view))
            .or_else(|| state.by_model.get(token).cloned())
    }

    fn get_local(&self, name: &str) -> Option<SubLookup> {
        let state = self.state.borrow();
        if let Some(view) = state.singletons.get(name) {
            return Some(SubLookup::One(*view));
        }
        if let Some(view) = state.by_cid.get(name) {
            return Some(SubLookup::One(*view));
        }
        if let Some(found) = state.by_model.get(name) {
            return Some(found.clone());
        }
        state
            .by_type
            .get(name)
            .filter(|views| !views.is_empty())
            .map(|views| SubLookup::Many(views.clone()))
    }

    /// Walk `a.b.c` through nested registries. Any unresolved segment, or an
    /// intermediate segment that isn't exactly one view, is a miss.
    fn get_dotted(&self, tree: &ViewTree, path: &str) -> Option<SubLookup> {
        let mut segments = path.split('.');
        let mut found = self.get_local(segments.next()?)?;
        for segment in segments {
            let view = found.single()?;
            found = tree.subs(view)?.get_local(segment)?;
        }
        Some(found)
    }

    /// Every child registered under `key`: the by-type sequence, the singleton, or nothing.
    pub fn get_by_type(&self, key: &str) -> Vec<ViewId> {
        let state = self.state.borrow();
        if let Some(views) = state.by_type.get(key) {
            return views.clone();
        }
        state.singletons.get(key).map(|v| vec![*v]).unwrap_or_default()
    }

    /// The key a child was registered under here.
    pub fn sub_view_type(&self, tree: &ViewTree, key: impl Into<SubKey>) -> Option<String> {
        let view = match key.into() {
            SubKey::View(view) if self.contains(view) => view,
            other => self.get(tree, other)?.single()?,
        };
        self.key_of(view)
    }

    pub(crate) fn key_of(&self, view: ViewId) -> Option<String> {
        self.state.borrow().members.get(&view).map(|m| m.key.clone())
    }

    pub(crate) fn has_singleton(&self, key: &str) -> bool {
        self.state.borrow().singletons.contains_key(key)
    }

    fn is_registered_singleton(&self, view: ViewId) -> bool {
        let state = self.state.borrow();
        state
            .members
            .get(&view)
            .is_some_and(|m| state.singletons.get(&m.key) == Some(&view))
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove the child(ren) `key` resolves to. A miss is a no-op.
    pub fn remove(&self, tree: &mut ViewTree, key: impl Into<SubKey>, preserve_output: bool) -> &Self {
        let views = self
            .get(tree, key)
            .map(SubLookup::into_vec)
            .unwrap_or_default();
        self.remove_views(tree, &views, preserve_output)
    }

    /// Unregister `views` and, unless `preserve_output`, destroy them.
    ///
    /// Emits `"remove"` once with the batch, then `"remove:<type>"` once per type.
    pub fn remove_views(&self, tree: &mut ViewTree, views: &[ViewId], preserve_output: bool) -> &Self {
        let mut batch: Vec<ViewId> = Vec::with_capacity(views.len());
        for view in views {
            if self.contains(*view) && !batch.contains(view) {
                batch.push(*view);
            }
        }
        if batch.is_empty() {
            return self;
        }

        self.notify(tree, "remove", batch.clone());

        let mut by_key: IndexMap<String, Vec<ViewId>> = IndexMap::new();
        for view in &batch {
            if let Some(key) = self.detach(*view) {
                self.release_member(tree, *view, preserve_output);
                by_key.entry(key).or_default().push(*view);
            }
        }
        for (key, removed) in by_key {
            debug!(key = %key, count = removed.len(), "removed sub-views");
            self.notify(tree, &format!("remove:{key}"), removed);
        }

        if !preserve_output {
            for view in batch {
                tree.destroy(view);
            }
        }
        self
    }

    /// Drop `view` from every index. Returns the key it was under.
    fn detach(&self, view: ViewId) -> Option<String> {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let member = state.members.remove(&view)?;

        state.children.borrow_mut().retain(|child| *child != view);
        state.by_cid.remove(&member.cid);
        if state.singletons.get(&member.key) == Some(&view) {
            state.singletons.remove(&member.key);
        }
        let type_emptied = state.by_type.get_mut(&member.key).is_some_and(|list| {
            list.retain(|child| *child != view);
            list.is_empty()
        });
        if type_emptied {
            state.by_type.remove(&member.key);
        }
        if let Some(model) = &member.model {
            let model_emptied = match state.by_model.get_mut(model) {
                Some(SubLookup::One(existing)) => *existing == view,
                Some(SubLookup::Many(list)) => {
                    list.retain(|child| *child != view);
                    list.is_empty()
                }
                None => false,
            };
            if model_emptied {
                state.by_model.remove(model);
            }
        }
        Some(member.key)
    }

    /// Unlink `view` from this registry. A view kept alive after leaving its
    /// parent's registry, and not listed elsewhere under that parent, becomes
    /// a top view.
    fn release_member(&self, tree: &mut ViewTree, view: ViewId, preserve_output: bool) {
        let owner = self.owner();
        let Some(node) = tree.node_mut(view) else {
            return;
        };
        node.holders
            .retain(|holder| !holder.is(self) && holder.upgrade().is_some());
        if !preserve_output || owner.is_none() || node.parent != owner {
            return;
        }
        let still_listed = node
            .holders
            .iter()
            .filter_map(RegistryRef::upgrade)
            .any(|holder| holder.owner() == owner);
        if !still_listed {
            node.parent = None;
        }
    }

    /// Run the removal operation of each view (they stay registered).
    pub fn remove_elems(&self, tree: &mut ViewTree, views: &[ViewId]) -> &Self {
        for view in views {
            tree.remove_view(*view);
        }
        self
    }

    /// Empty every index in place, optionally destroying the children and dropping configs.
    pub fn clear(&self, tree: &mut ViewTree, preserve_output: bool, drop_configs: bool) -> &Self {
        let removed = {
            let mut state = self.state.borrow_mut();
            let removed = std::mem::take(&mut *state.children.borrow_mut());
            state.members.clear();
            state.singletons.clear();
            state.by_type.clear();
            state.by_cid.clear();
            state.by_model.clear();
            if drop_configs {
                state.configs.borrow_mut().clear();
            }
            removed
        };
        debug!(count = removed.len(), preserve_output, drop_configs, "cleared registry");

        for view in &removed {
            self.release_member(tree, *view, preserve_output);
        }
        if !preserve_output {
            for view in removed {
                tree.destroy(view);
            }
        }
        self
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Run `operation` on every child, recursing pre-order into their children.
    ///
    /// No stop flags apply here.
    pub fn descend(&self, tree: &mut ViewTree, operation: impl Into<Operation>, args: &[Value]) -> &Self {
        let operation = operation.into();
        descend_views(tree, self.ids(), &operation, args);
        self
    }

    /// A registry over the same configs and owner holding only the selected children.
    ///
    /// The children keep their parent and type key; the new registry has its
    /// own child list.
    pub fn filtered_subs(&self, tree: &mut ViewTree, selection: impl Into<Selection>) -> Registry {
        let views = match selection.into() {
            Selection::Type(key) => self.get_by_type(&key),
            Selection::Views(views) => views.into_iter().filter(|v| self.contains(*v)).collect(),
            Selection::Predicate(predicate) => self
                .ids()
                .into_iter()
                .filter(|view| predicate(tree, *view))
                .collect(),
        };

        let filtered = {
            let state = self.state.borrow();
            Registry {
                state: Rc::new(RefCell::new(RegistryState::new(
                    state.owner,
                    state.flags,
                    state.configs.clone(),
                ))),
            }
        };
        for view in views {
            let Some(key) = self.key_of(view) else {
                continue;
            };
            let singleton = self.is_registered_singleton(view);
            filtered.set_instance(tree, &key, view, Some(singleton));
        }
        filtered
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Subscribe to `"add"`, `"add:<type>"`, `"remove"` or `"remove:<type>"`.
    pub fn on<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&mut ViewTree, &RegistryEvent) + 'static,
    {
        self.state.borrow_mut().events.on(event, Rc::new(handler))
    }

    pub fn off(&self, event: &str, listener: ListenerId) -> bool {
        self.state.borrow_mut().events.off(event, listener)
    }

    fn notify(&self, tree: &mut ViewTree, name: &str, views: Vec<ViewId>) {
        let handlers = self.state.borrow().events.handlers(name);
        if handlers.is_empty() {
            return;
        }
        let event = RegistryEvent {
            name: name.to_string(),
            views,
        };
        for handler in handlers {
            handler(tree, &event);
        }
    }

    fn notify_added(&self, tree: &mut ViewTree, key: &str, view: ViewId) {
        self.notify(tree, "add", vec![view]);
        self.notify(tree, &format!("add:{key}"), vec![view]);
    }
}

fn descend_views(tree: &mut ViewTree, views: Vec<ViewId>, operation: &Operation, args: &[Value]) {
    for view in views {
        if !tree.contains(view) {
            continue;
        }
        match operation {
            Operation::Named(name) => {
                tree.invoke(view, name, args);
            }
            Operation::Func(f) => f(tree, view, args),
        }
        let children = tree.child_ids(view);
        if !children.is_empty() {
            descend_views(tree, children, operation, args);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::json;

    use super::*;
    use crate::engine::{FactoryTable, View, ViewClass, ViewContext};
    use crate::types::options;

    fn setup() -> (ViewTree, ViewId, Registry) {
        let mut tree = ViewTree::new();
        let root = tree.create_plain(None).unwrap();
        let subs = tree.subs(root).unwrap();
        (tree, root, subs)
    }

    fn plain(name: &str) -> Rc<ViewClass> {
        Rc::new(ViewClass::plain(name))
    }

    /// Class that counts how many times it was built.
    fn counted(name: &str) -> (Rc<ViewClass>, Rc<Cell<u32>>) {
        let builds = Rc::new(Cell::new(0));
        let counter = builds.clone();
        let class = ViewClass::new(name, move |_| {
            counter.set(counter.get() + 1);
            Box::new(crate::engine::PlainView)
        });
        (Rc::new(class), builds)
    }

    fn assert_consistent(subs: &Registry) {
        let state = subs.state.borrow();
        let children = state.children.borrow();
        assert_eq!(children.len(), state.members.len());
        for view in children.iter() {
            assert_eq!(children.iter().filter(|c| *c == view).count(), 1);
            let member = &state.members[view];
            assert_eq!(state.by_cid.get(&member.cid), Some(view));
            let as_singleton = state.singletons.get(&member.key) == Some(view);
            let as_typed = state
                .by_type
                .get(&member.key)
                .is_some_and(|list| list.contains(view));
            assert!(as_singleton ^ as_typed, "{view} must be in exactly one of singleton/by-type");
        }
        for key in state.singletons.keys() {
            assert!(!state.by_type.contains_key(key));
        }
        assert_eq!(state.by_cid.len(), children.len());
    }

    #[test]
    fn test_add_options_merges_config_options() {
        let (mut tree, root, subs) = setup();
        let config = ChildConfig::new(plain("Row")).with_options(options(json!({ "a": 1, "b": 1 })));
        subs.add_config(&mut tree, "row", config).unwrap();

        let row = subs
            .create(&mut tree, "row", options(json!({ "b": 2 })), None)
            .unwrap()
            .unwrap();

        let opts = tree.options(row).unwrap();
        assert_eq!(opts["a"], json!(1));
        assert_eq!(opts["b"], json!(2));
        assert_eq!(tree.parent(row), Some(root));
        assert_eq!(tree.view_type(row), Some("row"));
        assert_eq!(subs.get_by_type("row"), vec![row]);
        assert_consistent(&subs);
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let (mut tree, _, subs) = setup();
        let err = subs.add_options(&mut tree, "nope", Options::new(), None).unwrap_err();
        assert!(matches!(err, ViewError::MissingConfig { ref key } if key == "nope"));

        let err = subs.add(&mut tree, None, Options::new(), None).unwrap_err();
        assert!(err.is_configuration());
        assert!(subs.is_empty());
    }

    #[test]
    fn test_unresolved_factory_is_an_error() {
        let (mut tree, _, subs) = setup();
        subs.add_config(&mut tree, "panel", ChildConfig::path("app.Missing")).unwrap();

        let err = subs.add_options(&mut tree, "panel", Options::new(), None).unwrap_err();
        assert!(matches!(err, ViewError::UnresolvedFactory { ref path, .. } if path == "app.Missing"));
        assert!(subs.is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_factory_path_resolves() {
        let mut factories = FactoryTable::new();
        factories.register("app.Panel", plain("Panel"));
        let mut tree = ViewTree::with_factories(factories);
        let root = tree.create_plain(None).unwrap();
        let subs = tree.subs(root).unwrap();

        subs.add_config_specs(&mut tree, json!({ "panel": { "construct": "app.Panel" } }))
            .unwrap();
        let panel = subs.create(&mut tree, "panel", Options::new(), None).unwrap().unwrap();
        assert_eq!(tree.class(panel).unwrap().name(), "Panel");
    }

    #[test]
    fn test_singleton_guard() {
        let (mut tree, _, subs) = setup();
        let (class, builds) = counted("Panel");
        subs.add_config(&mut tree, "panel", ChildConfig::new(class).singleton(true))
            .unwrap();

        subs.add(&mut tree, Some("panel"), options(json!({ "v": "A" })), None).unwrap();
        subs.add(&mut tree, Some("panel"), options(json!({ "v": "B" })), None).unwrap();

        assert_eq!(builds.get(), 1);
        let panel = subs.get(&tree, "panel").unwrap().single().unwrap();
        assert_eq!(tree.options(panel).unwrap()["v"], json!("A"));
        assert_eq!(subs.len(), 1);

        // Ready instances are refused too
        let extra = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("panel"), extra, None).unwrap();
        assert!(!subs.contains(extra));
        assert_consistent(&subs);
    }

    #[test]
    fn test_auto_init_singletons() {
        let mut tree = ViewTree::new();
        let (panel_class, builds) = counted("Panel");
        let class = Rc::new(
            ViewClass::plain("Page")
                .auto_init_sub_views(true)
                .sub_view("panel", ChildConfig::new(panel_class).singleton(true))
                .sub_view("row", ChildConfig::new(plain("Row"))),
        );

        let page = tree.create_view(&class, Options::new(), None).unwrap();
        let subs = tree.subs(page).unwrap();
        assert_eq!(builds.get(), 1);
        assert!(subs.get(&tree, "panel").is_some());
        assert!(subs.get(&tree, "row").is_none());
    }

    #[test]
    fn test_default_to_singletons() {
        let mut tree = ViewTree::new();
        let class = Rc::new(
            ViewClass::plain("Page")
                .singleton_sub_views(true)
                .sub_view("panel", ChildConfig::new(plain("Panel"))),
        );
        let page = tree.create_view(&class, Options::new(), None).unwrap();
        let subs = tree.subs(page).unwrap();

        subs.add_options(&mut tree, "panel", Options::new(), None).unwrap();
        subs.add_options(&mut tree, "panel", Options::new(), None).unwrap();
        assert_eq!(subs.len(), 1);
        assert!(matches!(subs.get(&tree, "panel"), Some(SubLookup::One(_))));

        // An explicit hint still wins
        subs.add_config(&mut tree, "row", ChildConfig::new(plain("Row"))).unwrap();
        subs.add_options(&mut tree, "row", Options::new(), Some(false)).unwrap();
        subs.add_options(&mut tree, "row", Options::new(), Some(false)).unwrap();
        assert_eq!(subs.get_by_type("row").len(), 2);
        assert_consistent(&subs);
    }

    #[test]
    fn test_add_instance_records_implicit_config() {
        let (mut tree, root, subs) = setup();
        let class = Rc::new(ViewClass::plain("Badge").tag_name("span"));
        let badge = tree
            .create_view(&class, options(json!({ "label": "new" })), None)
            .unwrap();

        subs.add_instance(&mut tree, Some("badge"), badge, None).unwrap();
        assert_eq!(tree.parent(badge), Some(root));

        let config = subs.config("badge").unwrap();
        assert!(matches!(&config.constructor, Constructor::Class(c) if c.name() == "Badge"));
        assert_eq!(config.options["label"], json!("new"));

        // The implicit config can construct more
        let second = subs.create(&mut tree, "badge", Options::new(), None).unwrap().unwrap();
        assert_eq!(tree.document().tag(tree.el(second).unwrap()), Some("span"));
        assert_eq!(subs.get_by_type("badge"), vec![badge, second]);
    }

    #[test]
    fn test_unkeyed_instances_get_generated_keys() {
        let (mut tree, _, subs) = setup();
        subs.add_config(&mut tree, "row", ChildConfig::new(plain("Row"))).unwrap();
        let a = tree.create_plain(None).unwrap();
        let b = tree.create_plain(None).unwrap();

        subs.add(&mut tree, None, a, None).unwrap();
        subs.add(&mut tree, None, b, None).unwrap();

        assert_eq!(tree.view_type(a), Some("_svid_1"));
        assert_eq!(tree.view_type(b), Some("_svid_2"));
        assert_eq!(subs.ids(), vec![a, b]);
    }

    #[test]
    fn test_keyed_source() {
        let (mut tree, _, subs) = setup();
        subs.add_config(&mut tree, "row", ChildConfig::new(plain("Row"))).unwrap();
        let header = tree.create_plain(None).unwrap();

        let mut map = IndexMap::new();
        map.insert("header".to_string(), ChildSource::from(header));
        map.insert(
            "row".to_string(),
            ChildSource::from(vec![Options::new(), Options::new()]),
        );
        subs.add(&mut tree, None, map, Some(false)).unwrap();

        assert_eq!(subs.len(), 3);
        assert_eq!(subs.get_by_type("header"), vec![header]);
        assert_eq!(subs.get_by_type("row").len(), 2);
        assert_consistent(&subs);
    }

    #[test]
    fn test_same_instance_is_registered_once() {
        let (mut tree, _, subs) = setup();
        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("item"), a, Some(false)).unwrap();
        subs.add_instance(&mut tree, Some("item"), a, Some(false)).unwrap();
        assert_eq!(subs.ids(), vec![a]);
        assert_consistent(&subs);
    }

    #[test]
    fn test_child_list_is_aliased() {
        let (mut tree, root, subs) = setup();
        let list = tree.sub_views(root).unwrap();
        let a = tree.create_plain(None).unwrap();

        subs.add_instance(&mut tree, Some("a"), a, None).unwrap();
        assert_eq!(*list.borrow(), vec![a]);

        subs.clear(&mut tree, true, false);
        assert!(list.borrow().is_empty());
        assert!(Rc::ptr_eq(&list, &tree.sub_views(root).unwrap()));
    }

    #[test]
    fn test_model_index_grows_and_shrinks() {
        let (mut tree, _, subs) = setup();
        let class = plain("Row");
        let a = tree.create_view(&class, options(json!({ "model": "c1" })), None).unwrap();
        let b = tree.create_view(&class, options(json!({ "model": "c1" })), None).unwrap();

        subs.add_instance(&mut tree, Some("row"), a, Some(false)).unwrap();
        assert_eq!(subs.get(&tree, SubKey::Model("c1".into())), Some(SubLookup::One(a)));

        subs.add_instance(&mut tree, Some("row"), b, Some(false)).unwrap();
        assert_eq!(
            subs.get(&tree, SubKey::Model("c1".into())),
            Some(SubLookup::Many(vec![a, b]))
        );

        subs.remove(&mut tree, a, true);
        assert_eq!(
            subs.get(&tree, SubKey::Model("c1".into())),
            Some(SubLookup::Many(vec![b]))
        );
        assert_consistent(&subs);
    }

    #[test]
    fn test_get_resolution_order() {
        let (mut tree, _, subs) = setup();
        let single = tree.create_plain(None).unwrap();
        let row = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("panel"), single, Some(true)).unwrap();
        subs.add_instance(&mut tree, Some("row"), row, Some(false)).unwrap();

        assert_eq!(subs.get(&tree, "panel"), Some(SubLookup::One(single)));
        assert_eq!(subs.get(&tree, "row"), Some(SubLookup::Many(vec![row])));

        let cid = tree.cid(row).unwrap().to_string();
        assert_eq!(subs.get(&tree, cid.as_str()), Some(SubLookup::One(row)));
        assert_eq!(subs.get(&tree, row), Some(SubLookup::One(row)));
        assert_eq!(subs.get(&tree, "missing"), None);

        // Removing the last typed child leaves a miss, not an empty sequence
        subs.remove(&mut tree, row, true);
        assert_eq!(subs.get(&tree, "row"), None);
        assert!(subs.get_by_type("row").is_empty());
        assert_eq!(subs.get_by_type("panel"), vec![single]);
    }

    #[test]
    fn test_dotted_lookup() {
        let (mut tree, root, subs) = setup();
        let a = tree.create_plain(Some(root)).unwrap();
        subs.add_instance(&mut tree, Some("a"), a, Some(true)).unwrap();
        let b = tree.create_plain(Some(a)).unwrap();
        tree.subs(a).unwrap().add_instance(&mut tree, Some("b"), b, Some(true)).unwrap();

        let direct = tree.subs(a).unwrap().get(&tree, "b");
        assert_eq!(subs.get(&tree, "a.b"), direct);
        assert_eq!(subs.get(&tree, "a.b"), Some(SubLookup::One(b)));
        assert_eq!(subs.get(&tree, "a.c"), None);
        assert_eq!(subs.get(&tree, "x.b"), None);
        assert_eq!(subs.get(&tree, "a..b"), None);
    }

    #[test]
    fn test_dotted_lookup_needs_single_intermediate() {
        let (mut tree, root, subs) = setup();
        let a1 = tree.create_plain(Some(root)).unwrap();
        let a2 = tree.create_plain(Some(root)).unwrap();
        subs.add(&mut tree, Some("a"), vec![a1, a2], Some(false)).unwrap();
        let b = tree.create_plain(Some(a1)).unwrap();
        tree.subs(a1).unwrap().add_instance(&mut tree, Some("b"), b, None).unwrap();

        assert_eq!(subs.get(&tree, "a.b"), None);
    }

    #[test]
    fn test_dot_notation_disabled() {
        let mut tree = ViewTree::new();
        let class = Rc::new(ViewClass::plain("Root").dot_notation(false));
        let root = tree.create_view(&class, Options::new(), None).unwrap();
        let subs = tree.subs(root).unwrap();
        let child = tree.create_plain(None).unwrap();

        subs.add_instance(&mut tree, Some("a.b"), child, Some(true)).unwrap();
        assert_eq!(subs.get(&tree, "a.b"), Some(SubLookup::One(child)));
    }

    #[test]
    fn test_remove_preserves_sibling_order() {
        let (mut tree, _, subs) = setup();
        let x = tree.create_plain(None).unwrap();
        let y = tree.create_plain(None).unwrap();
        let z = tree.create_plain(None).unwrap();
        subs.add(&mut tree, Some("item"), vec![x, y, z], Some(false)).unwrap();

        subs.remove(&mut tree, y, false);
        assert_eq!(subs.get_by_type("item"), vec![x, z]);
        assert_eq!(subs.ids(), vec![x, z]);
        assert!(!tree.contains(y));
        assert_consistent(&subs);
    }

    #[test]
    fn test_remove_preserve_output_keeps_view() {
        let (mut tree, _, subs) = setup();
        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("a"), a, None).unwrap();

        subs.remove(&mut tree, "a", true);
        assert!(subs.is_empty());
        assert!(tree.contains(a));

        // A miss is a no-op
        subs.remove(&mut tree, "a", false);
        assert!(tree.contains(a));
    }

    #[test]
    fn test_remove_notifications() {
        let (mut tree, _, subs) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        for event in ["remove", "remove:row", "remove:cell"] {
            let log = log.clone();
            subs.on(event, move |_, ev| log.borrow_mut().push((ev.name.clone(), ev.views.len())));
        }

        let rows: Vec<ViewId> = (0..2).map(|_| tree.create_plain(None).unwrap()).collect();
        let cell = tree.create_plain(None).unwrap();
        subs.add(&mut tree, Some("row"), rows.clone(), Some(false)).unwrap();
        subs.add_instance(&mut tree, Some("cell"), cell, Some(false)).unwrap();

        let mut batch = rows.clone();
        batch.push(cell);
        subs.remove_views(&mut tree, &batch, false);

        assert_eq!(
            *log.borrow(),
            vec![
                ("remove".to_string(), 3),
                ("remove:row".to_string(), 2),
                ("remove:cell".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_add_notifications() {
        let (mut tree, _, subs) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let listener = subs.on("add:row", move |_, ev| log_clone.borrow_mut().extend(ev.views.clone()));

        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("row"), a, None).unwrap();
        assert_eq!(*log.borrow(), vec![a]);

        assert!(subs.off("add:row", listener));
        let b = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("row"), b, None).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_clear_destroys_and_drops_configs() {
        let (mut tree, _, subs) = setup();
        subs.add_config(&mut tree, "row", ChildConfig::new(plain("Row"))).unwrap();
        let row = subs.create(&mut tree, "row", Options::new(), None).unwrap().unwrap();

        subs.clear(&mut tree, false, false);
        assert!(subs.is_empty());
        assert!(!tree.contains(row));
        assert!(subs.has_config("row"));

        subs.clear(&mut tree, true, true);
        assert!(!subs.has_config("row"));
    }

    struct Recorder {
        log: Rc<RefCell<Vec<(ViewId, Vec<Value>)>>>,
    }

    impl View for Recorder {
        fn invoke(&mut self, name: &str, cx: &mut ViewContext<'_>, args: &[Value]) -> bool {
            if name != "refresh" {
                return false;
            }
            self.log.borrow_mut().push((cx.id, args.to_vec()));
            true
        }
    }

    #[test]
    fn test_descend_pre_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = log.clone();
        let class = Rc::new(ViewClass::new("Recorder", move |_| {
            Box::new(Recorder { log: log_clone.clone() })
        }));

        let (mut tree, root, subs) = setup();
        let b = tree.create_view(&class, Options::new(), Some(root)).unwrap();
        let c = tree.create_view(&class, Options::new(), Some(b)).unwrap();
        let d = tree.create_plain(Some(root)).unwrap();
        subs.add_instance(&mut tree, Some("b"), b, None).unwrap();
        subs.add_instance(&mut tree, Some("d"), d, None).unwrap();
        tree.subs(b).unwrap().add_instance(&mut tree, Some("c"), c, None).unwrap();

        // Views without the operation are skipped
        subs.descend(&mut tree, "refresh", &[json!(1)]);
        let visited: Vec<ViewId> = log.borrow().iter().map(|(v, _)| *v).collect();
        assert_eq!(visited, vec![b, c]);
        assert_eq!(log.borrow()[0].1, vec![json!(1)]);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        subs.descend(
            &mut tree,
            Operation::func(move |_, view, _| seen_clone.borrow_mut().push(view)),
            &[],
        );
        assert_eq!(*seen.borrow(), vec![b, c, d]);
    }

    #[test]
    fn test_filtered_subs() {
        let (mut tree, root, subs) = setup();
        subs.add_config(&mut tree, "row", ChildConfig::new(plain("Row"))).unwrap();
        let rows: Vec<ViewId> = (0..3)
            .map(|_| subs.create(&mut tree, "row", Options::new(), Some(false)).unwrap().unwrap())
            .collect();
        let header = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("header"), header, Some(true)).unwrap();

        let only_rows = subs.filtered_subs(&mut tree, "row");
        assert_eq!(only_rows.ids(), rows);
        assert_eq!(only_rows.owner(), Some(root));
        assert!(only_rows.has_config("row"));
        assert!(!Rc::ptr_eq(&only_rows.child_list(), &subs.child_list()));

        // Removing through the filtered registry leaves the original alone
        only_rows.remove(&mut tree, rows[0], true);
        assert_eq!(subs.len(), 4);

        let picked = subs.filtered_subs(&mut tree, Selection::predicate(move |_, v| v == header));
        assert_eq!(picked.get(&tree, "header"), Some(SubLookup::One(header)));
        assert_eq!(tree.view_type(header), Some("header"));
        assert_eq!(tree.sub_views(root).unwrap().borrow().len(), 4);

        // Destroying a child drops it from every registry listing it
        tree.destroy(rows[1]);
        assert_eq!(only_rows.ids(), vec![rows[2]]);
        assert_eq!(subs.len(), 3);
    }

    #[test]
    fn test_sub_view_type() {
        let (mut tree, _, subs) = setup();
        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("panel"), a, Some(true)).unwrap();

        assert_eq!(subs.sub_view_type(&tree, a), Some("panel".to_string()));
        assert_eq!(subs.sub_view_type(&tree, "panel"), Some("panel".to_string()));
        assert_eq!(subs.sub_view_type(&tree, "missing"), None);
    }

    #[test]
    fn test_singleton_hint_on_typed_key_stays_typed() {
        let (mut tree, _, subs) = setup();
        let a = tree.create_plain(None).unwrap();
        let b = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("item"), a, Some(false)).unwrap();
        subs.add_instance(&mut tree, Some("item"), b, Some(true)).unwrap();

        assert_eq!(subs.get_by_type("item"), vec![a, b]);
        assert!(!subs.has_singleton("item"));
        assert_consistent(&subs);
    }
}
