//! DOM helper seam.
//!
//! The panel tree never touches a platform DOM directly. Everything goes
//! through [`Dom`], so the same tree runs in a desktop browser, inside a
//! native shell, or against [`MemoryDom`] in tests.

use crate::layout::Placement;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

/// Opaque handle to a host element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Handle returned by [`Dom::listen`], used to unbind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// A user-input event delivered to a listener
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: String,
    pub target: NodeId,
    pub detail: Value,
}

pub type Listener = Rc<dyn Fn(&DomEvent)>;

pub trait Dom {
    /// Find an element. Selectors are `#id` or `tag`-less `[attr=value]`.
    fn query(&self, selector: &str) -> Option<NodeId>;

    fn set_html(&self, node: NodeId, markup: &str);

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Create an element with the given `id` attribute under `parent`
    /// (or under the document root).
    fn create_element(&self, parent: Option<NodeId>, id: &str) -> NodeId;

    /// Detach and drop an element and everything below it
    fn remove(&self, node: NodeId);

    fn place(&self, node: NodeId, placement: Placement);

    fn listen(&self, node: NodeId, event: &str, listener: Listener) -> ListenerId;

    fn unlisten(&self, listener: ListenerId);
}

struct MemoryNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    html: String,
    attributes: BTreeMap<String, String>,
}

struct BoundListener {
    node: NodeId,
    event: String,
    callback: Listener,
}

/// In-memory element table. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct MemoryDom {
    nodes: Rc<RefCell<BTreeMap<NodeId, MemoryNode>>>,
    listeners: Rc<RefCell<BTreeMap<ListenerId, BoundListener>>>,
    next_id: Rc<Cell<u64>>,
}

impl std::fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDom")
            .field("nodes", &self.nodes.borrow().len())
            .field("listeners", &self.listeners.borrow().len())
            .finish()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    /// Current markup of an element
    pub fn html(&self, node: NodeId) -> Option<String> {
        self.nodes.borrow().get(&node).map(|n| n.html.clone())
    }

    /// Markup of the element with the given `id`
    pub fn html_of(&self, id: &str) -> Option<String> {
        self.query(&format!("#{id}")).and_then(|node| self.html(node))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains_key(&node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Number of listeners bound to an element
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners
            .borrow()
            .values()
            .filter(|l| l.node == node)
            .count()
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Deliver an event to every listener bound on `node` for `kind`.
    /// Returns how many listeners ran.
    pub fn dispatch(&self, node: NodeId, kind: &str, detail: Value) -> usize {
        // Collect first: listeners may bind or unbind while running
        let targets: Vec<Listener> = self
            .listeners
            .borrow()
            .values()
            .filter(|l| l.node == node && l.event == kind)
            .map(|l| l.callback.clone())
            .collect();

        let event = DomEvent {
            kind: kind.to_string(),
            target: node,
            detail,
        };
        for callback in &targets {
            callback(&event);
        }
        targets.len()
    }

    /// Indented text dump of the element tree
    pub fn snapshot(&self) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        let roots = nodes.iter().filter(|(_, n)| n.parent.is_none()).map(|(id, _)| *id);
        let mut stack: Vec<(NodeId, usize)> = roots.rev().map(|id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            let node = &nodes[&id];
            let name = node.attributes.get("id").map(String::as_str).unwrap_or("?");
            let _ = write!(out, "{}#{}", "  ".repeat(depth), name);
            if let Some(style) = node.attributes.get("style") {
                let _ = write!(out, " [{style}]");
            }
            if !node.html.is_empty() {
                let _ = write!(out, " {}", node.html);
            }
            out.push('\n');
            stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
        }
        out
    }

    fn matches(node: &MemoryNode, selector: &str) -> bool {
        if let Some(id) = selector.strip_prefix('#') {
            return node.attributes.get("id").is_some_and(|v| v == id);
        }
        if let Some(inner) = selector.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            return match inner.split_once('=') {
                Some((attr, value)) => node
                    .attributes
                    .get(attr.trim())
                    .is_some_and(|v| v == value.trim().trim_matches('"')),
                None => node.attributes.contains_key(inner.trim()),
            };
        }
        false
    }
}

impl Dom for MemoryDom {
    fn query(&self, selector: &str) -> Option<NodeId> {
        self.nodes
            .borrow()
            .iter()
            .find(|(_, node)| Self::matches(node, selector))
            .map(|(id, _)| *id)
    }

    fn set_html(&self, node: NodeId, markup: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.html = markup.to_string();
        }
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(&node)
            .and_then(|n| n.attributes.get(name).cloned())
    }

    fn create_element(&self, parent: Option<NodeId>, id: &str) -> NodeId {
        let node_id = NodeId(self.next());
        let mut nodes = self.nodes.borrow_mut();
        // Unknown parents fall back to the document root
        let parent = parent.filter(|p| nodes.contains_key(p));
        if let Some(p) = parent {
            if let Some(parent_node) = nodes.get_mut(&p) {
                parent_node.children.push(node_id);
            }
        }
        nodes.insert(
            node_id,
            MemoryNode {
                parent,
                children: Vec::new(),
                html: String::new(),
                attributes: BTreeMap::from([("id".to_string(), id.to_string())]),
            },
        );
        node_id
    }

    fn remove(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(removed) = nodes.remove(&node) else {
            return;
        };
        if let Some(parent) = removed.parent.and_then(|p| nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }

        let mut gone = vec![node];
        let mut stack = removed.children;
        while let Some(child) = stack.pop() {
            if let Some(n) = nodes.remove(&child) {
                stack.extend(n.children);
                gone.push(child);
            }
        }
        drop(nodes);

        self.listeners
            .borrow_mut()
            .retain(|_, l| !gone.contains(&l.node));
    }

    fn place(&self, node: NodeId, placement: Placement) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(&node) {
            n.attributes.insert("style".to_string(), placement.to_style());
        }
    }

    fn listen(&self, node: NodeId, event: &str, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.borrow_mut().insert(
            id,
            BoundListener {
                node,
                event: event.to_string(),
                callback: listener,
            },
        );
        id
    }

    fn unlisten(&self, listener: ListenerId) {
        self.listeners.borrow_mut().remove(&listener);
    }
}
