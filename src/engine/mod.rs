//! View Engine - Arena of view nodes, view classes and behaviour.
//!
//! - **tree** - `ViewTree`: slot allocation, generations, identity tokens, destroy
//! - **class** - `ViewClass` prototypes and the injected `FactoryTable`
//! - **view** - The `View` behaviour trait and its `ViewContext`
//!
//! # Architecture
//!
//! Views are NOT objects. They are handles into one arena:
//!
//! ```text
//! Slot 0: Page  (parent=None,    el=e1, subs=[v1.0, v2.0])
//! Slot 1: Row   (parent=v0.0,    el=e2, type="row")
//! Slot 2: Row   (parent=v0.0,    el=e3, type="row")
//! ```
//!
//! Parent links and child lists hold handles, so the cyclic parent/child
//! graph never needs shared ownership.

mod class;
mod tree;
mod view;

pub use class::*;
pub use tree::*;
pub use view::*;
