//! Core types for spark-views.
//!
//! Views are not objects. They are handles into the [`ViewTree`](crate::ViewTree)
//! arena, the same way output elements are handles into the
//! [`Document`](crate::Document).

use std::fmt;

use serde_json::{Map, Value};

// =============================================================================
// Handles
// =============================================================================

/// Handle to a view node in a [`ViewTree`](crate::ViewTree).
///
/// The generation is bumped every time an index is reused, so a handle to a
/// destroyed view never resolves to its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ViewId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Arena slot of this view.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.index, self.generation)
    }
}

/// Handle to an output element in a [`Document`](crate::Document).
///
/// Element indices are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

// =============================================================================
// Options
// =============================================================================

/// Construction options passed to view builders.
pub type Options = Map<String, Value>;

/// Shallow merge: keys in `overrides` replace keys in `base`.
pub fn merge_options(base: &Options, overrides: &Options) -> Options {
    let mut merged = base.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Build [`Options`] from a `serde_json::json!` object literal.
///
/// Non-object values produce empty options.
pub fn options(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        _ => Options::new(),
    }
}

// =============================================================================
// Events
// =============================================================================

/// A custom event delivered to a view's listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name (e.g. `"save"`).
    pub name: String,
    /// Arguments supplied by the trigger call.
    pub args: Vec<Value>,
    /// The view the event is being emitted on.
    pub target: ViewId,
    /// The view that started a bubble/descend traversal.
    ///
    /// Plain `trigger` leaves it unset.
    pub origin: Option<ViewId>,
}

impl Event {
    pub(crate) fn new(name: &str, args: &[Value], target: ViewId, origin: Option<ViewId>) -> Self {
        Self {
            name: name.to_string(),
            args: args.to_vec(),
            target,
            origin,
        }
    }
}

/// Notification emitted by a [`Registry`](crate::Registry) when children are added or removed.
///
/// Names are `"add"`, `"add:<type>"`, `"remove"` and `"remove:<type>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEvent {
    pub name: String,
    pub views: Vec<ViewId>,
}
