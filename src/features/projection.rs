//! Projection of normalized field rects into PDF point space.

use serde::{Deserialize, Serialize};

use crate::features::coordinates::NormalizedRect;

/// Size of a PDF page in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width_pt: f64,
    pub height_pt: f64,
}

impl PageGeometry {
    pub const fn new(width_pt: f64, height_pt: f64) -> Self {
        Self {
            width_pt,
            height_pt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// An absolute box in points, anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PointBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Normalized space is top-left origin, PDF space is bottom-left: the y axis
/// is flipped and shifted by the box height.
pub fn project(rect: &NormalizedRect, page: PageGeometry) -> PointBox {
    let width = rect.width * page.width_pt;
    let height = rect.height * page.height_pt;
    let x = rect.x * page.width_pt;
    let y = page.height_pt - (rect.y * page.height_pt) - height;
    PointBox::new(x, y, width, height)
}
