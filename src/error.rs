//! Error types for view trees.
//!
//! Lookup misses are not errors: `get`/`get_by_type` return `None` or an empty
//! `Vec`. Only construction and placement failures surface here.

use thiserror::Error;

use crate::types::ViewId;

/// Errors raised while building or placing views.
#[derive(Debug, Error)]
pub enum ViewError {
    /// No sub-view config is registered for the requested key.
    #[error("no sub-view config registered for key '{key}'")]
    MissingConfig {
        /// The key that was requested.
        key: String,
    },

    /// A config names a constructor path the factory table does not know.
    #[error("constructor '{path}' for key '{key}' was not found")]
    UnresolvedFactory {
        /// The key whose config was used.
        key: String,
        /// The dotted constructor path.
        path: String,
    },

    /// A destination did not resolve to a live output element.
    #[error("location for view {view} did not resolve to a live element")]
    Placement {
        /// The view being placed.
        view: ViewId,
    },

    /// A selector could not be parsed.
    #[error("invalid selector '{selector}': {reason}")]
    Selector {
        /// The selector text.
        selector: String,
        /// What went wrong.
        reason: String,
    },

    /// The view handle is stale or was never allocated.
    #[error("unknown view {0}")]
    UnknownView(ViewId),

    /// A JSON sub-view config could not be decoded.
    #[error("invalid sub-view config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl ViewError {
    /// True for the configuration family (missing config, unresolved factory, bad config).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingConfig { .. } | Self::UnresolvedFactory { .. } | Self::InvalidConfig(_)
        )
    }

    /// True when a destination failed to resolve.
    pub fn is_placement(&self) -> bool {
        matches!(self, Self::Placement { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ViewError>;
