//! State Module - Runtime behaviour of view nodes.
//!
//! - **Events** - Per-view emitters, `on`/`off`, `listen_to`/`stop_listening`, `trigger`
//! - **Stop** - One-shot per-event stop flags
//! - **Propagation** - Bubbling and descending traversals, ancestor helpers
//! - **View events** - Declarative subscriptions bound at construction
//! - **Placement** - Attaching a view's own output

mod events;
mod placement;
mod propagation;
mod stop;
mod view_events;

pub use events::*;
pub use stop::*;
