//! # spark-views
//!
//! Composable view trees for Rust.
//!
//! A view owns a registry of child views: configs that describe how to build
//! a child, lazily or eagerly constructed instances, singleton and typed
//! indexes for lookup, and placement of each child's output into the parent's
//! output. Custom events travel up the tree (bubbling) or down it
//! (descending), and any view can stop one traversal of an event with a
//! one-shot flag.
//!
//! ## Architecture
//!
//! Views are handles into a [`ViewTree`] arena; output elements are handles
//! into the tree's [`Document`]. Nothing holds a strong reference to a view,
//! so parent links and child lists are plain [`ViewId`]s.
//!
//! ```text
//! ViewTree ── slots ──► ViewNode { parent, el, subs: Registry, stops, events }
//!     │                                      │
//!     └── Document ◄──── el / locations ─────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Core handles, options and event payloads
//! - [`error`] - The [`ViewError`] taxonomy
//! - [`engine`] - `ViewTree` arena, `ViewClass`, `FactoryTable`, the `View` trait
//! - [`dom`] - In-memory output document and selectors
//! - [`subviews`] - The per-node [`Registry`]
//! - [`state`] - Emitters, stop flags, bubbling/descending, view events, placement

pub mod dom;
pub mod engine;
pub mod error;
pub mod state;
pub mod subviews;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{Result, ViewError};

pub use engine::{BuildFn, FactoryTable, PlainView, View, ViewClass, ViewContext, ViewTree};

pub use dom::{Document, Selector};

pub use subviews::{
    ChildConfig, ChildList, ChildPredicate, ChildSource, ConfigSpec, Constructor, Destination,
    LocationFn, Operation, OperationFn, Placement, Registry, RegistryFlags, RenderOptions,
    Selection, SubKey, SubLookup, parse_config_specs,
};

pub use state::{Emitter, EventHandler, Handler, ListenerId, RegistryHandler, StopFlags};
