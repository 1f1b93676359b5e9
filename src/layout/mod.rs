//! Layout tree: geometry computed from pure functions, never from the live
//! element tree.
//!
//! Each node's rectangle depends only on its parent's rectangle and the
//! window size. Nodes are registered once at startup, parents first; only the
//! cached geometry changes afterwards, and only through [`LayoutTree::recompute`].
//! Several panels may share one node.

mod geometry;
mod length;

pub use geometry::{Geometry, LayoutInput, Placement, Size};
pub use length::{Axis, Length, LayoutSpec, Term};

use crate::error::LayoutError;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Pure compute function: `(parent, window) -> rectangle relative to the parent`
pub type ComputeFn = Box<dyn Fn(&LayoutInput) -> Geometry>;

/// Layout tree shared between the scheduler, resize coordinator and panels
pub type SharedLayout = Rc<RefCell<LayoutTree>>;

struct LayoutNode {
    parent: Option<String>,
    compute: ComputeFn,
    children: Vec<String>,
    cached: Option<Geometry>,
}

/// The set of named layout nodes
#[derive(Default)]
pub struct LayoutTree {
    nodes: IndexMap<String, LayoutNode>,
    roots: Vec<String>,
    window: Option<Size>,
}

impl std::fmt::Debug for LayoutTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutTree")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("window", &self.window)
            .finish()
    }
}

impl LayoutTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from declarative specs, in declaration order
    pub fn from_specs<'a>(
        specs: impl IntoIterator<Item = &'a LayoutSpec>,
    ) -> Result<Self, LayoutError> {
        let mut tree = Self::new();
        for spec in specs {
            tree.register_spec(spec)?;
        }
        Ok(tree)
    }

    /// Register a node. `parent` must already be registered; `None` makes
    /// the node a child of the window.
    pub fn register_layout<F>(
        &mut self,
        name: &str,
        compute: F,
        parent: Option<&str>,
    ) -> Result<(), LayoutError>
    where
        F: Fn(&LayoutInput) -> Geometry + 'static,
    {
        self.insert(name, Box::new(compute), parent)
    }

    pub fn register_spec(&mut self, spec: &LayoutSpec) -> Result<(), LayoutError> {
        let compute = spec.compute_fn()?;
        self.insert(&spec.name, compute, spec.parent.as_deref())
    }

    fn insert(
        &mut self,
        name: &str,
        compute: ComputeFn,
        parent: Option<&str>,
    ) -> Result<(), LayoutError> {
        if self.nodes.contains_key(name) {
            return Err(LayoutError::DuplicateNode(name.to_string()));
        }

        match parent {
            Some(parent) => {
                let Some(parent_node) = self.nodes.get_mut(parent) else {
                    return Err(LayoutError::UnknownParent {
                        node: name.to_string(),
                        parent: parent.to_string(),
                    });
                };
                parent_node.children.push(name.to_string());
            }
            None => self.roots.push(name.to_string()),
        }

        self.nodes.insert(
            name.to_string(),
            LayoutNode {
                parent: parent.map(str::to_string),
                compute,
                children: Vec::new(),
                cached: None,
            },
        );
        tracing::trace!(node = %name, parent = ?parent, "registered layout node");

        // A node added after a resize gets geometry right away
        if let Some(window) = self.window {
            self.recompute_from(name, window);
        }
        Ok(())
    }

    /// Recompute every node top-down for a new window size.
    ///
    /// Pre-order: a node is always computed from its parent's fresh rectangle.
    pub fn recompute(&mut self, window: Size) -> usize {
        self.window = Some(window);
        let roots = self.roots.clone();
        let count = roots
            .iter()
            .map(|root| self.recompute_from(root, window))
            .sum();
        tracing::debug!(window = %window, nodes = count, "layout recomputed");
        count
    }

    fn recompute_from(&mut self, name: &str, window: Size) -> usize {
        let mut count = 0;
        let mut stack = vec![name.to_string()];

        while let Some(current) = stack.pop() {
            let parent_size = match self.nodes[&current].parent.as_deref() {
                Some(parent) => match self.nodes[parent].cached {
                    Some(geometry) => geometry.size(),
                    None => continue,
                },
                None => window,
            };

            let node = &mut self.nodes[&current];
            node.cached = Some((node.compute)(&LayoutInput::new(parent_size, window)));
            count += 1;

            // Reverse so the first child is computed first
            stack.extend(node.children.iter().rev().cloned());
        }
        count
    }

    /// Cached rectangle, relative to the parent node
    pub fn geometry(&self, name: &str) -> Option<Geometry> {
        self.nodes.get(name).and_then(|node| node.cached)
    }

    /// Cached rectangle in window coordinates
    pub fn absolute(&self, name: &str) -> Option<Geometry> {
        let node = self.nodes.get(name)?;
        let own = node.cached?;
        match node.parent.as_deref() {
            Some(parent) => Some(own.offset_by(&self.absolute(parent)?)),
            None => Some(own),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn parent(&self, name: &str) -> Result<Option<&str>, LayoutError> {
        self.nodes
            .get(name)
            .map(|node| node.parent.as_deref())
            .ok_or_else(|| LayoutError::UnknownNode(name.to_string()))
    }

    /// Node names in registration order (parents before children)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn window(&self) -> Option<Size> {
        self.window
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn into_shared(self) -> SharedLayout {
        Rc::new(RefCell::new(self))
    }
}
