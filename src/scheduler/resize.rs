//! Pushes recomputed geometry to the panels that are on screen.

use crate::layout::{SharedLayout, Size};
use crate::panel::{Panel, VisibilityState};
use tracing::debug;

/// Outcome of one resize pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResizeReport {
    /// Layout nodes recomputed
    pub nodes: usize,
    /// Panels whose element was repositioned
    pub panels: usize,
}

/// Couples the layout tree to the view tree on window-size changes.
///
/// Geometry is recomputed for every layout node, but only panels with a
/// mounted element are touched. Hidden subtrees are skipped without being
/// walked; they pick up the current geometry when they are next shown.
pub struct ResizeCoordinator {
    layout: SharedLayout,
    root: Panel,
}

impl ResizeCoordinator {
    pub fn new(layout: SharedLayout, root: Panel) -> Self {
        Self { layout, root }
    }

    pub fn on_resize(&self, window: Size) -> ResizeReport {
        let nodes = self.layout.borrow_mut().recompute(window);

        let mut panels = 0;
        let mut stack = vec![self.root.clone()];
        while let Some(panel) = stack.pop() {
            match panel.state() {
                VisibilityState::Hidden | VisibilityState::Hiding => continue,
                VisibilityState::Visible | VisibilityState::Showing => {}
            }
            if panel.apply_geometry() {
                panels += 1;
            }
            stack.extend(panel.children());
        }

        debug!(window = %window, nodes, panels, "resize applied");
        ResizeReport { nodes, panels }
    }
}
