//! Tagged inputs and outputs of the registry API.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::engine::ViewTree;
use crate::types::{Options, ViewId};

/// What to register in [`Registry::add`](super::Registry::add).
#[derive(Debug, Clone)]
pub enum ChildSource {
    /// A ready view, registered as is.
    Instance(ViewId),
    Instances(Vec<ViewId>),
    /// Options for constructing one child from the key's config.
    Options(Options),
    OptionsList(Vec<Options>),
    /// Several keys at once.
    Keyed(IndexMap<String, ChildSource>),
}

impl From<ViewId> for ChildSource {
    fn from(view: ViewId) -> Self {
        Self::Instance(view)
    }
}

impl From<Vec<ViewId>> for ChildSource {
    fn from(views: Vec<ViewId>) -> Self {
        Self::Instances(views)
    }
}

impl From<Options> for ChildSource {
    fn from(options: Options) -> Self {
        Self::Options(options)
    }
}

impl From<Vec<Options>> for ChildSource {
    fn from(list: Vec<Options>) -> Self {
        Self::OptionsList(list)
    }
}

impl From<IndexMap<String, ChildSource>> for ChildSource {
    fn from(map: IndexMap<String, ChildSource>) -> Self {
        Self::Keyed(map)
    }
}

// =============================================================================
// Lookup
// =============================================================================

/// Key accepted by `get`, `remove`, `render_by_key` and `sub_view_type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubKey {
    /// A type key, identity token, model token, or dotted path.
    Name(String),
    /// A view: matched by its identity token, then as a model token.
    View(ViewId),
    /// A model identity token.
    Model(String),
}

impl From<&str> for SubKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for SubKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<ViewId> for SubKey {
    fn from(view: ViewId) -> Self {
        Self::View(view)
    }
}

/// Result of a lookup: one view or a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubLookup {
    One(ViewId),
    Many(Vec<ViewId>),
}

impl SubLookup {
    /// The view if exactly one was found as `One`.
    pub fn single(&self) -> Option<ViewId> {
        match self {
            Self::One(view) => Some(*view),
            Self::Many(_) => None,
        }
    }

    pub fn first(&self) -> Option<ViewId> {
        match self {
            Self::One(view) => Some(*view),
            Self::Many(views) => views.first().copied(),
        }
    }

    pub fn into_vec(self) -> Vec<ViewId> {
        match self {
            Self::One(view) => vec![view],
            Self::Many(views) => views,
        }
    }
}

// =============================================================================
// Selection & Operation
// =============================================================================

/// Predicate over children, used by [`Selection::Predicate`].
pub type ChildPredicate = Rc<dyn Fn(&ViewTree, ViewId) -> bool>;

/// Which children a filtered registry keeps.
#[derive(Clone)]
pub enum Selection {
    Type(String),
    /// Explicit views; ones not registered here are ignored.
    Views(Vec<ViewId>),
    Predicate(ChildPredicate),
}

impl Selection {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&ViewTree, ViewId) -> bool + 'static,
    {
        Self::Predicate(Rc::new(f))
    }
}

impl fmt::Debug for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(key) => f.debug_tuple("Type").field(key).finish(),
            Self::Views(views) => f.debug_tuple("Views").field(views).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for Selection {
    fn from(key: &str) -> Self {
        Self::Type(key.to_string())
    }
}

impl From<Vec<ViewId>> for Selection {
    fn from(views: Vec<ViewId>) -> Self {
        Self::Views(views)
    }
}

/// Function run on each view by [`Registry::descend`](super::Registry::descend).
pub type OperationFn = Rc<dyn Fn(&mut ViewTree, ViewId, &[Value])>;

/// What `descend` runs on each view.
#[derive(Clone)]
pub enum Operation {
    /// Resolved through [`View::invoke`](crate::View::invoke); views without it are skipped.
    Named(String),
    Func(OperationFn),
}

impl Operation {
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&mut ViewTree, ViewId, &[Value]) + 'static,
    {
        Self::Func(Rc::new(f))
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl From<&str> for Operation {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}
