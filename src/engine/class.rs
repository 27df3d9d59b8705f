//! View classes and the factory table.
//!
//! A [`ViewClass`] is the "prototype" of a view: how to build its behaviour,
//! which element tag it renders into, which sub-view configs and view events
//! it declares, and how its registry behaves.
//!
//! The [`FactoryTable`] maps dotted names (`"app.views.Panel"`) to classes so
//! configs can name their constructor as a string. It is populated at startup
//! and injected into the [`ViewTree`](super::ViewTree).

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::state::Handler;
use crate::subviews::{ChildConfig, RegistryFlags};
use crate::types::Options;

use super::view::{PlainView, View};

/// Builds a view's behaviour from its construction options.
pub type BuildFn = Rc<dyn Fn(&Options) -> Box<dyn View>>;

// =============================================================================
// ViewClass
// =============================================================================

/// Prototype for a family of views.
#[derive(Clone)]
pub struct ViewClass {
    name: String,
    build: BuildFn,
    tag_name: String,
    sub_view_config: IndexMap<String, ChildConfig>,
    view_events: Vec<(String, Handler)>,
    flags: RegistryFlags,
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewClass")
            .field("name", &self.name)
            .field("tag_name", &self.tag_name)
            .field("sub_views", &self.sub_view_config.keys().collect::<Vec<_>>())
            .field("view_events", &self.view_events)
            .field("flags", &self.flags)
            .finish()
    }
}

impl ViewClass {
    /// A class whose behaviour is built by `build`.
    pub fn new<F>(name: impl Into<String>, build: F) -> Self
    where
        F: Fn(&Options) -> Box<dyn View> + 'static,
    {
        Self {
            name: name.into(),
            build: Rc::new(build),
            tag_name: "div".to_string(),
            sub_view_config: IndexMap::new(),
            view_events: Vec::new(),
            flags: RegistryFlags::default(),
        }
    }

    /// A class with no behaviour ([`PlainView`]).
    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, |_| Box::new(PlainView))
    }

    /// Element tag used for the view's output (default `div`).
    pub fn tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = tag.into();
        self
    }

    /// Declare a sub-view config seeded into every instance's registry.
    pub fn sub_view(mut self, key: impl Into<String>, config: ChildConfig) -> Self {
        self.sub_view_config.insert(key.into(), config);
        self
    }

    /// Declare a view event bound at construction (`"event"` or `"event property"`).
    pub fn view_event(mut self, spec: impl Into<String>, handler: impl Into<Handler>) -> Self {
        self.view_events.push((spec.into(), handler.into()));
        self
    }

    /// Construct singleton sub-views as soon as their config is added.
    pub fn auto_init_sub_views(mut self, enabled: bool) -> Self {
        self.flags.set(RegistryFlags::AUTO_INIT_SINGLETONS, enabled);
        self
    }

    /// Treat sub-views as singletons unless told otherwise.
    pub fn singleton_sub_views(mut self, enabled: bool) -> Self {
        self.flags.set(RegistryFlags::DEFAULT_TO_SINGLETONS, enabled);
        self
    }

    /// Allow `a.b` paths in registry lookups (on by default).
    pub fn dot_notation(mut self, enabled: bool) -> Self {
        self.flags.set(RegistryFlags::DOT_NOTATION, enabled);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_tag(&self) -> &str {
        &self.tag_name
    }

    pub fn flags(&self) -> RegistryFlags {
        self.flags
    }

    pub(crate) fn build(&self, options: &Options) -> Box<dyn View> {
        (self.build)(options)
    }

    pub(crate) fn declared_sub_views(&self) -> &IndexMap<String, ChildConfig> {
        &self.sub_view_config
    }

    pub(crate) fn declared_view_events(&self) -> &[(String, Handler)] {
        &self.view_events
    }
}

// =============================================================================
// FactoryTable
// =============================================================================

/// Registration table from dotted names to view classes.
#[derive(Debug, Clone, Default)]
pub struct FactoryTable {
    classes: HashMap<String, Rc<ViewClass>>,
}

impl FactoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `class` under `path` (e.g. `"app.views.Panel"`). Last write wins.
    pub fn register(&mut self, path: impl Into<String>, class: Rc<ViewClass>) -> &mut Self {
        self.classes.insert(path.into(), class);
        self
    }

    /// Resolve a dotted path. Returns `None` if nothing is registered under it.
    pub fn resolve(&self, path: &str) -> Option<Rc<ViewClass>> {
        self.classes.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.classes.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
