//! Error taxonomy for the panel tree, layout engine and deferred registry.
//!
//! Every error here is `Clone`: a single visibility transition can be awaited
//! by several callers at once, and each of them observes the same outcome.

use thiserror::Error;

/// Errors raised while driving the view tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PanelError {
    /// A panel's `init` failed or its required context was missing.
    #[error("panel '{panel}' failed to initialize: {reason}")]
    Initialization { panel: String, reason: String },

    /// A `before()` completion rejected somewhere in the subtree.
    #[error("panel '{panel}' failed to become visible: {reason}")]
    VisibilityTransition { panel: String, reason: String },

    #[error("container '{container}' has no child slot '{slot}'")]
    UnknownSlot { container: String, slot: String },

    #[error("panel '{0}' is a leaf and has no child slots")]
    NotAContainer(String),

    /// Children can only be shown inside a container that is itself showing.
    #[error("container '{container}' is hidden; cannot show '{slot}'")]
    ContainerHidden { container: String, slot: String },

    #[error("no panel at path '{0}'")]
    UnknownPanel(String),
}

impl PanelError {
    /// Path of the panel the error originated from, when there is one.
    pub fn panel(&self) -> Option<&str> {
        match self {
            PanelError::Initialization { panel, .. }
            | PanelError::VisibilityTransition { panel, .. } => Some(panel),
            PanelError::UnknownSlot { container, .. }
            | PanelError::ContainerHidden { container, .. } => Some(container),
            PanelError::NotAContainer(panel) => Some(panel),
            PanelError::UnknownPanel(_) => None,
        }
    }
}

/// Errors raised by the deferred registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeferredError {
    /// The slot already holds a capability; the first one is kept.
    #[error("slot '{key}' was already resolved")]
    DuplicateResolution { key: String },

    #[error("slot '{key}' was never registered")]
    MissingSlot { key: String },

    /// Every handle to a pending slot was dropped before it resolved.
    #[error("slot '{key}' was dropped before it resolved")]
    Abandoned { key: String },

    #[error("capability '{key}' failed: {reason}")]
    Invocation { key: String, reason: String },

    #[error("upstream step failed: {reason}")]
    Upstream { reason: String },
}

/// Errors raised while registering or computing layout nodes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("layout node '{0}' is already registered")]
    DuplicateNode(String),

    /// Parents must be registered before their children.
    #[error("layout node '{node}' names unknown parent '{parent}'")]
    UnknownParent { node: String, parent: String },

    #[error("unknown layout node '{0}'")]
    UnknownNode(String),

    #[error("invalid length expression '{0}'")]
    InvalidLength(String),
}

/// Errors raised while validating a panel declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeclarationError {
    #[error("panel names must not be empty")]
    EmptyName,

    #[error("panel name '{0}' must not contain '.'")]
    InvalidName(String),

    #[error("container '{container}' declares child '{child}' twice")]
    DuplicateChild { container: String, child: String },

    #[error("container '{container}' activates unknown child '{child}'")]
    UnknownActivation { container: String, child: String },

    #[error("panel '{panel}' references unknown layout '{layout}'")]
    UnknownLayout { panel: String, layout: String },
}
