//! Rectangles, sizes and placements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Window or parent dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A computed rectangle. Origins are relative to the parent node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle covering the whole window.
    pub fn window(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Moves this rectangle's origin into the coordinate space of `origin`.
    pub fn offset_by(&self, origin: &Geometry) -> Geometry {
        Geometry::new(self.x + origin.x, self.y + origin.y, self.width, self.height)
    }
}

/// Inputs a compute function may read. Nothing else is available to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutInput {
    pub parent_width: f64,
    pub parent_height: f64,
    pub window_width: f64,
    pub window_height: f64,
}

impl LayoutInput {
    pub fn new(parent: Size, window: Size) -> Self {
        Self {
            parent_width: parent.width,
            parent_height: parent.height,
            window_width: window.width,
            window_height: window.height,
        }
    }
}

/// How a panel's element is positioned inside its parent's element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    /// width=height=100%, top=left=0
    FullBleed,
    Absolute(Geometry),
}

impl Placement {
    /// Inline style string, as a browser host would apply it.
    pub fn to_style(&self) -> String {
        match self {
            Placement::FullBleed => "position:absolute;left:0;top:0;width:100%;height:100%".into(),
            Placement::Absolute(g) => format!(
                "position:absolute;left:{}px;top:{}px;width:{}px;height:{}px",
                g.x, g.y, g.width, g.height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_moves_origin_only() {
        let child = Geometry::new(10.0, 20.0, 100.0, 50.0);
        let parent = Geometry::new(5.0, 5.0, 500.0, 500.0);
        assert_eq!(child.offset_by(&parent), Geometry::new(15.0, 25.0, 100.0, 50.0));
    }

    #[test]
    fn placement_styles() {
        assert_eq!(
            Placement::Absolute(Geometry::new(10.0, 20.0, 100.0, 800.0)).to_style(),
            "position:absolute;left:10px;top:20px;width:100px;height:800px"
        );
        assert!(Placement::FullBleed.to_style().contains("width:100%"));
    }
}
