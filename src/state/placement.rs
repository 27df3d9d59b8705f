//! Placing a view's own output.

use crate::engine::ViewTree;
use crate::error::{Result, ViewError};
use crate::subviews::{Destination, resolve_destination};
use crate::types::ViewId;

impl ViewTree {
    /// Attach `view`'s element to `destination`, replacing its content if `replace`.
    ///
    /// Selectors resolve under the parent's element, or the document body for
    /// a top view. A selector with no match leaves the view where it was.
    pub fn place(&mut self, view: ViewId, destination: impl Into<Destination>, replace: bool) -> Result<&mut Self> {
        let el = self.el(view).ok_or(ViewError::UnknownView(view))?;
        let root = self
            .parent(view)
            .and_then(|parent| self.el(parent))
            .unwrap_or_else(|| self.document().body());

        let Some(target) = resolve_destination(self, root, view, &destination.into())? else {
            return Ok(self);
        };
        let placed = if replace {
            self.document_mut().replace_content(target, el)
        } else {
            self.document_mut().append(target, el)
        };
        if !placed {
            return Err(ViewError::Placement { view });
        }
        Ok(self)
    }
}
