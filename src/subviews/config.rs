//! Sub-view configuration: how a registry builds and places a child.
//!
//! Configs come from three places:
//! - Builders on [`ChildConfig`] (class handles, closures for locations)
//! - The JSON form [`ConfigSpec`], read from the `"subViewConfig"` option
//! - Implicit configs the registry records when it adopts a ready instance

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::engine::{ViewClass, ViewTree};
use crate::error::Result;
use crate::types::{ElementId, Options, ViewId};

bitflags::bitflags! {
    /// Registry behaviour switches.
    ///
    /// The default is `DOT_NOTATION` alone.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RegistryFlags: u8 {
        /// Construct a singleton child as soon as its config is added.
        const AUTO_INIT_SINGLETONS = 1 << 0;
        /// Children without an explicit singleton hint are singletons.
        const DEFAULT_TO_SINGLETONS = 1 << 1;
        /// `get("a.b")` walks nested registries.
        const DOT_NOTATION = 1 << 2;
    }
}

impl Default for RegistryFlags {
    fn default() -> Self {
        Self::DOT_NOTATION
    }
}

// =============================================================================
// Destination
// =============================================================================

/// Resolves a child's output container at placement time.
pub type LocationFn = Rc<dyn Fn(&ViewTree, ViewId) -> Option<ElementId>>;

/// Where a child's output goes.
#[derive(Clone)]
pub enum Destination {
    /// Selector resolved under the parent's element (first match).
    Selector(String),
    /// An element handle.
    Element(ElementId),
    /// Called with the child being placed. Must return a live element.
    Resolve(LocationFn),
}

impl Destination {
    pub fn resolve<F>(f: F) -> Self
    where
        F: Fn(&ViewTree, ViewId) -> Option<ElementId> + 'static,
    {
        Self::Resolve(Rc::new(f))
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector(sel) => f.debug_tuple("Selector").field(sel).finish(),
            Self::Element(el) => f.debug_tuple("Element").field(el).finish(),
            Self::Resolve(_) => f.write_str("Resolve(..)"),
        }
    }
}

impl From<&str> for Destination {
    fn from(selector: &str) -> Self {
        Self::Selector(selector.to_string())
    }
}

impl From<String> for Destination {
    fn from(selector: String) -> Self {
        Self::Selector(selector)
    }
}

impl From<ElementId> for Destination {
    fn from(el: ElementId) -> Self {
        Self::Element(el)
    }
}

// =============================================================================
// ChildConfig
// =============================================================================

/// How a config names its constructor.
#[derive(Clone)]
pub enum Constructor {
    Class(Rc<ViewClass>),
    /// Dotted name looked up in the tree's [`FactoryTable`](crate::FactoryTable).
    Path(String),
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// A named template for producing a child on demand.
#[derive(Debug, Clone)]
pub struct ChildConfig {
    pub constructor: Constructor,
    /// Base options. Call-time options are merged over these (shallow).
    pub options: Options,
    /// `None` defers to the call-time hint or the registry default.
    pub singleton: Option<bool>,
    pub location: Option<Destination>,
}

impl ChildConfig {
    pub fn new(class: Rc<ViewClass>) -> Self {
        Self::from_constructor(Constructor::Class(class))
    }

    /// A config whose constructor is resolved by name at construction time.
    pub fn path(path: impl Into<String>) -> Self {
        Self::from_constructor(Constructor::Path(path.into()))
    }

    fn from_constructor(constructor: Constructor) -> Self {
        Self {
            constructor,
            options: Options::new(),
            singleton: None,
            location: None,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn singleton(mut self, singleton: bool) -> Self {
        self.singleton = Some(singleton);
        self
    }

    pub fn location(mut self, location: impl Into<Destination>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn is_singleton(&self) -> bool {
        self.singleton == Some(true)
    }
}

// =============================================================================
// JSON form
// =============================================================================

/// Serialized config:
///
/// ```json
/// { "construct": "app.views.Panel", "options": {}, "singleton": true, "location": "#slot" }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSpec {
    pub construct: String,
    #[serde(default)]
    pub options: Options,
    #[serde(default)]
    pub singleton: Option<bool>,
    #[serde(default)]
    pub location: Option<String>,
}

impl From<ConfigSpec> for ChildConfig {
    fn from(spec: ConfigSpec) -> Self {
        Self {
            constructor: Constructor::Path(spec.construct),
            options: spec.options,
            singleton: spec.singleton,
            location: spec.location.map(Destination::Selector),
        }
    }
}

/// Decode a `key -> ConfigSpec` object, keeping key order.
pub fn parse_config_specs(value: Value) -> Result<IndexMap<String, ChildConfig>> {
    let specs: IndexMap<String, ConfigSpec> = serde_json::from_value(value)?;
    Ok(specs
        .into_iter()
        .map(|(key, spec)| (key, spec.into()))
        .collect())
}
