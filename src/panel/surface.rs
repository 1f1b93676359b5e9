//! A panel's rendered element.
//!
//! Each panel creates exactly one surface and hands it only to its own hooks.
//! Whoever created the element owns its markup, its listeners and every
//! later mutation; there is no API for reaching into another panel's element.

use crate::host::{Dom, DomEvent, ListenerId, NodeId, Template};
use crate::layout::Placement;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

struct Element {
    owner: String,
    dom: Rc<dyn Dom>,
    node: Cell<Option<NodeId>>,
    listeners: RefCell<Vec<ListenerId>>,
}

/// Handle to one panel's element. Clones refer to the same element.
#[derive(Clone)]
pub struct Surface {
    element: Rc<Element>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("owner", &self.element.owner)
            .field("node", &self.element.node.get())
            .field("listeners", &self.element.listeners.borrow().len())
            .finish()
    }
}

impl Surface {
    pub(crate) fn new(owner: &str, dom: Rc<dyn Dom>) -> Self {
        Self {
            element: Rc::new(Element {
                owner: owner.to_string(),
                dom,
                node: Cell::new(None),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Path of the owning panel
    pub fn owner(&self) -> &str {
        &self.element.owner
    }

    pub fn node(&self) -> Option<NodeId> {
        self.element.node.get()
    }

    pub fn is_attached(&self) -> bool {
        self.node().is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.element.listeners.borrow().len()
    }

    fn require_node(&self) -> Result<NodeId> {
        self.node()
            .ok_or_else(|| anyhow!("element of '{}' is not attached", self.owner()))
    }

    pub fn set_html(&self, markup: &str) -> Result<()> {
        let node = self.require_node()?;
        self.element.dom.set_html(node, markup);
        Ok(())
    }

    /// Render `template` with `data` into this element
    pub fn render(&self, template: &dyn Template, data: &Value) -> Result<()> {
        let markup = template.render(data)?;
        self.set_html(&markup)
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        let node = self.node()?;
        self.element.dom.get_attribute(node, name)
    }

    /// Bind a listener on this element. It is unbound when the panel hides.
    pub fn on<F>(&self, event: &str, handler: F) -> Result<ListenerId>
    where
        F: Fn(&DomEvent) + 'static,
    {
        let node = self.require_node()?;
        let id = self.element.dom.listen(node, event, Rc::new(handler));
        self.element.listeners.borrow_mut().push(id);
        Ok(id)
    }

    /// Create the element under `parent`, replacing any previous one
    pub(crate) fn attach(&self, parent: Option<NodeId>) -> NodeId {
        self.detach();
        let id = self.element.owner.replace('.', "-");
        let node = self.element.dom.create_element(parent, &id);
        self.element.node.set(Some(node));
        node
    }

    pub(crate) fn place(&self, placement: Placement) {
        if let Some(node) = self.node() {
            self.element.dom.place(node, placement);
        }
    }

    /// Unbind every listener and remove the element
    pub(crate) fn detach(&self) {
        let listeners = std::mem::take(&mut *self.element.listeners.borrow_mut());
        for listener in listeners {
            self.element.dom.unlisten(listener);
        }
        if let Some(node) = self.element.node.take() {
            self.element.dom.remove(node);
        }
    }
}
