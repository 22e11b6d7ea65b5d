//! Conversion between on-screen pixel rectangles and page-relative
//! normalized rectangles.
//!
//! A normalized rect is expressed as fractions of the rendered page's own
//! bounding box, origin top-left. Nothing here performs I/O.

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCREEN_DPI: f64 = 96.0;
const POINTS_PER_INCH: f64 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn full_page() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

/// A rectangle in container-relative pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Viewport-relative bounding box of a rendered element (page or container).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn page_offset(page: &BoundingBox, container: &BoundingBox) -> (f64, f64) {
    (page.left - container.left, page.top - container.top)
}

/// Map a container-relative pixel rect onto the page, each component clamped
/// into `[0,1]`.
///
/// Returns the input reinterpreted as-is when either bounding box is not yet
/// measurable.
pub fn pixels_to_normalized(
    pixels: PixelRect,
    page: Option<&BoundingBox>,
    container: Option<&BoundingBox>,
) -> NormalizedRect {
    let (Some(page), Some(container)) = (page, container) else {
        return NormalizedRect::new(pixels.x, pixels.y, pixels.width, pixels.height);
    };
    let (offset_x, offset_y) = page_offset(page, container);

    NormalizedRect {
        x: clamp_unit((pixels.x - offset_x) / page.width),
        y: clamp_unit((pixels.y - offset_y) / page.height),
        width: clamp_unit(pixels.width / page.width),
        height: clamp_unit(pixels.height / page.height),
    }
}

/// Exact inverse of [`pixels_to_normalized`], without clamping.
pub fn normalized_to_pixels(
    rect: NormalizedRect,
    page: Option<&BoundingBox>,
    container: Option<&BoundingBox>,
) -> PixelRect {
    let (Some(page), Some(container)) = (page, container) else {
        return PixelRect::new(rect.x, rect.y, rect.width, rect.height);
    };
    let (offset_x, offset_y) = page_offset(page, container);

    PixelRect {
        x: offset_x + rect.x * page.width,
        y: offset_y + rect.y * page.height,
        width: rect.width * page.width,
        height: rect.height * page.height,
    }
}

/// Component-wise range check. `x + width` may still exceed 1.
pub fn validate_coordinates(rect: &NormalizedRect) -> bool {
    let NormalizedRect {
        x,
        y,
        width,
        height,
    } = *rect;
    [x, y, width, height].iter().all(|v| v.is_finite())
        && width > 0.0
        && height > 0.0
        && (0.0..=1.0).contains(&x)
        && (0.0..=1.0).contains(&y)
        && width <= 1.0
        && height <= 1.0
}

/// Clamp each component independently into `[0,1]`; NaN becomes 0.
pub fn clamp_coordinates(rect: &NormalizedRect) -> NormalizedRect {
    NormalizedRect {
        x: clamp_unit(rect.x),
        y: clamp_unit(rect.y),
        width: clamp_unit(rect.width),
        height: clamp_unit(rect.height),
    }
}

pub fn pixels_to_points(pixels: f64, screen_dpi: f64) -> f64 {
    pixels * POINTS_PER_INCH / screen_dpi
}

pub fn points_to_pixels(points: f64, screen_dpi: f64) -> f64 {
    points * screen_dpi / POINTS_PER_INCH
}

/// Rescale a normalized rect captured under one viewport for another one.
pub fn responsive_coordinates(
    rect: &NormalizedRect,
    original: Viewport,
    current: Viewport,
) -> NormalizedRect {
    let scale_x = current.width / original.width;
    let scale_y = current.height / original.height;

    NormalizedRect {
        x: clamp_unit(rect.x * scale_x),
        y: clamp_unit(rect.y * scale_y),
        width: clamp_unit(rect.width * scale_x),
        height: clamp_unit(rect.height * scale_y),
    }
}
