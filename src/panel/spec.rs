//! Declarative view-tree assembly.
//!
//! ```ignore
//! let root = PanelSpec::container("AppMain")
//!     .child(PanelSpec::leaf("topnav", Header::default()).layout("topnav"))
//!     .child(
//!         PanelSpec::container("content")
//!             .exclusive()
//!             .activate(["dashboard"])
//!             .child(PanelSpec::leaf("dashboard", Dashboard::default())),
//!     )
//!     .build()?;
//! ```

use super::{Body, ContainerBody, ContainerView, Frame, InitState, Panel, PanelInner, Phase, View};
use crate::error::DeclarationError;
use indexmap::IndexMap;
use std::cell::{OnceCell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

/// A leaf panel declaration
pub struct LeafSpec {
    name: String,
    layout: Option<String>,
    view: Box<dyn View>,
}

impl LeafSpec {
    pub fn layout(mut self, layout: &str) -> Self {
        self.layout = Some(layout.to_string());
        self
    }

    pub fn build(self) -> Result<Panel, DeclarationError> {
        PanelSpec::from(self).build()
    }
}

/// A container panel declaration
pub struct ContainerSpec {
    name: String,
    layout: Option<String>,
    view: Box<dyn ContainerView>,
    children: Vec<PanelSpec>,
    activation: Option<Vec<String>>,
    exclusive: bool,
}

impl ContainerSpec {
    pub fn layout(mut self, layout: &str) -> Self {
        self.layout = Some(layout.to_string());
        self
    }

    pub fn view(mut self, view: impl ContainerView + 'static) -> Self {
        self.view = Box::new(view);
        self
    }

    pub fn child(mut self, child: impl Into<PanelSpec>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Children shown when this container becomes visible. Defaults to all.
    pub fn activate<I, S>(mut self, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.activation = Some(slots.into_iter().map(Into::into).collect());
        self
    }

    /// Navigating to one child hides its visible siblings
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn build(self) -> Result<Panel, DeclarationError> {
        PanelSpec::from(self).build()
    }
}

/// A panel declaration; build the root with [`PanelSpec::build`]
pub enum PanelSpec {
    Leaf(LeafSpec),
    Container(ContainerSpec),
}

impl From<LeafSpec> for PanelSpec {
    fn from(spec: LeafSpec) -> Self {
        PanelSpec::Leaf(spec)
    }
}

impl From<ContainerSpec> for PanelSpec {
    fn from(spec: ContainerSpec) -> Self {
        PanelSpec::Container(spec)
    }
}

impl PanelSpec {
    pub fn leaf(name: &str, view: impl View + 'static) -> LeafSpec {
        LeafSpec {
            name: name.to_string(),
            layout: None,
            view: Box::new(view),
        }
    }

    /// A container without chrome; add one with [`ContainerSpec::view`]
    pub fn container(name: &str) -> ContainerSpec {
        ContainerSpec {
            name: name.to_string(),
            layout: None,
            view: Box::new(Frame),
            children: Vec::new(),
            activation: None,
            exclusive: false,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PanelSpec::Leaf(spec) => &spec.name,
            PanelSpec::Container(spec) => &spec.name,
        }
    }

    /// Validate the declaration and build the panel tree, with this
    /// declaration as the root
    pub fn build(self) -> Result<Panel, DeclarationError> {
        build_node(self, String::new())
    }
}

fn validate_name(name: &str) -> Result<(), DeclarationError> {
    if name.is_empty() {
        return Err(DeclarationError::EmptyName);
    }
    if name.contains('.') {
        return Err(DeclarationError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn child_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn build_node(spec: PanelSpec, path: String) -> Result<Panel, DeclarationError> {
    validate_name(spec.name())?;

    let (name, layout, body) = match spec {
        PanelSpec::Leaf(leaf) => (leaf.name, leaf.layout, Body::Leaf(RefCell::new(leaf.view))),
        PanelSpec::Container(container) => {
            let mut children = IndexMap::new();
            for child in container.children {
                let slot = child.name().to_string();
                if children.contains_key(&slot) {
                    return Err(DeclarationError::DuplicateChild {
                        container: container.name.clone(),
                        child: slot,
                    });
                }
                let panel = build_node(child, child_path(&path, &slot))?;
                children.insert(slot, panel);
            }

            let activation = match container.activation {
                Some(slots) => {
                    let mut seen = HashSet::new();
                    for slot in &slots {
                        if !children.contains_key(slot) || !seen.insert(slot.as_str()) {
                            return Err(DeclarationError::UnknownActivation {
                                container: container.name.clone(),
                                child: slot.clone(),
                            });
                        }
                    }
                    slots
                }
                None => children.keys().cloned().collect(),
            };

            let body = Body::Container(ContainerBody {
                view: RefCell::new(container.view),
                children,
                activation,
                exclusive: container.exclusive,
            });
            (container.name, container.layout, body)
        }
    };

    let inner = Rc::new(PanelInner {
        name,
        path,
        layout,
        body,
        parent: RefCell::new(Weak::new()),
        phase: RefCell::new(Phase::Hidden),
        init: RefCell::new(InitState::Pending),
        mount: OnceCell::new(),
        surface: OnceCell::new(),
    });
    if let Body::Container(c) = &inner.body {
        for child in c.children.values() {
            *child.inner.parent.borrow_mut() = Rc::downgrade(&inner);
        }
    }
    Ok(Panel { inner })
}
