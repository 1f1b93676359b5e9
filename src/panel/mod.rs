//! Panels: the nodes of the view tree.
//!
//! The tree's shape is fixed when it is declared (see [`PanelSpec`]); only a
//! panel's visibility and its rendered element change afterwards. Each panel
//! runs the state machine
//!
//! ```text
//! Hidden --show--> Showing --before() fulfilled--> Visible --hide--> Hiding --> Hidden
//!                     \--before() rejected--> (subtree torn down) --> Hidden
//! ```
//!
//! The transient states carry the in-flight transition, so a second request
//! awaits it instead of starting a duplicate.

mod context;
mod spec;
mod surface;
mod transition;
mod view;

pub use context::{MountContext, MountContextBuilder};
pub use spec::{ContainerSpec, LeafSpec, PanelSpec};
pub use surface::Surface;
pub use view::{ready, Completion, ContainerView, FnView, Frame, View};

use crate::error::PanelError;
use crate::host::NodeId;
use crate::layout::SharedLayout;
use futures::future::{LocalBoxFuture, Shared};
use indexmap::IndexMap;
use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Visibility of a panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Hidden,
    Showing,
    Visible,
    Hiding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Container,
    Leaf,
}

/// Result of a visibility transition
pub type Transition = LocalBoxFuture<'static, Result<(), PanelError>>;

type InFlight = Shared<Transition>;

enum Phase {
    Hidden,
    Showing(InFlight),
    Visible,
    Hiding(InFlight),
}

impl Phase {
    fn state(&self) -> VisibilityState {
        match self {
            Phase::Hidden => VisibilityState::Hidden,
            Phase::Showing(_) => VisibilityState::Showing,
            Phase::Visible => VisibilityState::Visible,
            Phase::Hiding(_) => VisibilityState::Hiding,
        }
    }
}

enum InitState {
    Pending,
    Ready,
    /// Sticky: a failed init is never retried
    Failed(PanelError),
}

/// Everything a panel inherits when it is initialized
#[derive(Clone)]
pub(crate) struct Mount {
    pub(crate) context: MountContext,
    pub(crate) layout: SharedLayout,
    /// Host element the root panel attaches under
    pub(crate) root_node: Option<NodeId>,
}

struct ContainerBody {
    view: RefCell<Box<dyn ContainerView>>,
    children: IndexMap<String, Panel>,
    activation: Vec<String>,
    exclusive: bool,
}

enum Body {
    Leaf(RefCell<Box<dyn View>>),
    Container(ContainerBody),
}

struct PanelInner {
    name: String,
    /// Dotted path from the root; empty for the root itself
    path: String,
    layout: Option<String>,
    body: Body,
    parent: RefCell<Weak<PanelInner>>,
    phase: RefCell<Phase>,
    init: RefCell<InitState>,
    mount: OnceCell<Mount>,
    surface: OnceCell<Surface>,
}

/// Handle to a panel. Clones refer to the same panel.
#[derive(Clone)]
pub struct Panel {
    inner: Rc<PanelInner>,
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("path", &self.label())
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("layout", &self.inner.layout)
            .finish()
    }
}

impl PartialEq for Panel {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Panel {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Dotted path from the root (`content.deck`); empty for the root
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Path, or the name for the root. Used in logs and errors.
    pub fn label(&self) -> &str {
        if self.inner.path.is_empty() {
            &self.inner.name
        } else {
            &self.inner.path
        }
    }

    pub fn kind(&self) -> PanelKind {
        match self.inner.body {
            Body::Leaf(_) => PanelKind::Leaf,
            Body::Container(_) => PanelKind::Container,
        }
    }

    pub fn layout_ref(&self) -> Option<&str> {
        self.inner.layout.as_deref()
    }

    pub fn state(&self) -> VisibilityState {
        self.inner.phase.borrow().state()
    }

    pub fn is_visible(&self) -> bool {
        self.state() == VisibilityState::Visible
    }

    pub fn is_initialized(&self) -> bool {
        matches!(*self.inner.init.borrow(), InitState::Ready)
    }

    /// Whether showing one child hides its visible siblings
    pub fn is_exclusive(&self) -> bool {
        matches!(&self.inner.body, Body::Container(c) if c.exclusive)
    }

    /// Host element currently rendered for this panel
    pub fn node(&self) -> Option<NodeId> {
        self.inner.surface.get().and_then(Surface::node)
    }

    pub fn parent(&self) -> Option<Panel> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Panel { inner })
    }

    /// Children in declaration order; empty for leaves
    pub fn children(&self) -> Vec<Panel> {
        match &self.inner.body {
            Body::Container(c) => c.children.values().cloned().collect(),
            Body::Leaf(_) => Vec::new(),
        }
    }

    pub fn child(&self, slot: &str) -> Option<Panel> {
        match &self.inner.body {
            Body::Container(c) => c.children.get(slot).cloned(),
            Body::Leaf(_) => None,
        }
    }

    /// Descendant at a dotted path relative to this panel
    pub fn find(&self, path: &str) -> Option<Panel> {
        if path.is_empty() {
            return Some(self.clone());
        }
        path.split('.')
            .try_fold(self.clone(), |panel, slot| panel.child(slot))
    }

    /// First descendant (pre-order, declaration order) with this name
    pub fn find_named(&self, name: &str) -> Option<Panel> {
        let mut stack = self.children();
        stack.reverse();
        while let Some(panel) = stack.pop() {
            if panel.name() == name {
                return Some(panel);
            }
            let mut children = panel.children();
            children.reverse();
            stack.extend(children);
        }
        None
    }

    /// Pre-order walk over this panel and every descendant
    pub fn walk(&self) -> Vec<Panel> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(panel) = stack.pop() {
            let mut children = panel.children();
            children.reverse();
            stack.extend(children);
            out.push(panel);
        }
        out
    }

    fn container(&self) -> Result<&ContainerBody, PanelError> {
        match &self.inner.body {
            Body::Container(c) => Ok(c),
            Body::Leaf(_) => Err(PanelError::NotAContainer(self.label().to_string())),
        }
    }

    fn slot(&self, slot: &str) -> Result<Panel, PanelError> {
        self.container()?
            .children
            .get(slot)
            .cloned()
            .ok_or_else(|| PanelError::UnknownSlot {
                container: self.label().to_string(),
                slot: slot.to_string(),
            })
    }
}

#[cfg(test)]
mod tests;
