//! View events - Declarative `"event [property]" -> handler` subscriptions.
//!
//! An event spec with no property listens on the view itself. `parentView` listens
//! on the parent; any other property is resolved through
//! [`View::property`](crate::View::property). Targets that don't resolve are
//! skipped.

use tracing::trace;

use crate::engine::ViewTree;
use crate::types::ViewId;

use super::events::Handler;

impl ViewTree {
    /// Subscribe `view` to the events in `specs`, or in its declared view events if `None`.
    ///
    /// Rebinding the same spec does not subscribe twice.
    pub fn bind_view_events(&mut self, view: ViewId, specs: Option<Vec<(String, Handler)>>) -> &mut Self {
        let specs = match specs {
            Some(specs) => specs,
            None => match self.node(view) {
                Some(node) => node.view_events.clone(),
                None => return self,
            },
        };

        for (spec, handler) in specs {
            let mut parts = spec.split_whitespace();
            let Some(event) = parts.next() else {
                continue;
            };
            let target = match parts.next() {
                None => Some(view),
                Some("parentView") => self.parent(view),
                Some(property) => self
                    .with_behavior(view, |behavior, _| behavior.property(property))
                    .flatten(),
            };
            let Some(target) = target.filter(|t| self.contains(*t)) else {
                trace!(%view, spec = %spec, "view event target did not resolve");
                continue;
            };

            self.stop_listening(view, Some(target), Some(event), Some(&handler));
            self.listen_to(view, target, event, handler);
        }
        self
    }
}
