//! Sub-views - The per-node child registry.
//!
//! - **config** - `ChildConfig`, destinations, registry flags, JSON config specs
//! - **source** - Tagged inputs (`ChildSource`, `SubKey`, `Selection`, `Operation`) and `SubLookup`
//! - **registry** - Registration, lookup, removal, descend, filtered registries
//! - **render** - Rendering children and placing their output
//! - **collection** - Sequence helpers over the ordered children
//!
//! # Example
//!
//! ```ignore
//! use spark_views::{ChildConfig, RenderOptions, ViewClass, ViewTree};
//!
//! let row = Rc::new(ViewClass::plain("Row").tag_name("li"));
//! let list = Rc::new(ViewClass::plain("List").sub_view("row", ChildConfig::new(row).location("ul")));
//!
//! let mut tree = ViewTree::new();
//! let root = tree.create_view(&list, Options::new(), None)?;
//! let subs = tree.subs(root).unwrap();
//! subs.add_options(&mut tree, "row", options(json!({ "title": "one" })), None)?;
//! subs.render(&mut tree, RenderOptions::default())?;
//! ```

mod collection;
mod config;
mod registry;
mod render;
mod source;

pub use config::*;
pub use registry::*;
pub(crate) use registry::RegistryRef;
pub use render::{Placement, RenderOptions};
pub(crate) use render::resolve_destination;
pub use source::*;
