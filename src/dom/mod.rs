//! Output elements and destination resolution.
//!
//! Views own one output element each. Placement appends or replaces elements
//! inside a [`Document`]; destinations written as selectors are resolved with
//! [`Document::query`] scoped under a root element.

mod document;
mod selector;

pub use document::Document;
pub use selector::Selector;
