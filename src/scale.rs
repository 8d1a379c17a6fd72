//! Coordinate scaling between document space and the PDF viewport.
//!
//! Document space is the page in pixels at the reference zoom (100%).
//! Viewport space is the same page as drawn at the current zoom. The
//! mapping is linear and exact: nothing here rounds or clamps, pixel
//! snapping and scroll clamping belong to whoever draws the page.

use serde::{Deserialize, Serialize};

use crate::layout::{Coordinates, LayoutBlock};

/// Smallest zoom the PDF panel offers, in percent.
pub const MIN_ZOOM: u32 = 10;
/// Largest zoom the PDF panel offers, in percent.
pub const MAX_ZOOM: u32 = 500;
/// Zoom at which document coordinates are expressed.
pub const REFERENCE_ZOOM: u32 = 100;

/// Whether `zoom` is inside the range the UI layer is expected to enforce.
pub const fn is_supported_zoom(zoom: u32) -> bool {
    zoom >= MIN_ZOOM && zoom <= MAX_ZOOM
}

/// Multiplier applied to document coordinates at `zoom` percent.
pub fn zoom_factor(zoom: u32) -> f64 {
    f64::from(zoom) / f64::from(REFERENCE_ZOOM)
}

/// A rectangle in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaledRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ScaledRect {
    /// Apply a further zoom to an already scaled rectangle.
    #[must_use]
    pub fn rescale(self, zoom: u32) -> Self {
        let factor = zoom_factor(zoom);
        Self {
            left: self.left * factor,
            top: self.top * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

impl From<Coordinates> for ScaledRect {
    fn from(bbox: Coordinates) -> Self {
        Self {
            left: f64::from(bbox.x),
            top: f64::from(bbox.y),
            width: f64::from(bbox.width),
            height: f64::from(bbox.height),
        }
    }
}

/// A point in either space; which one is up to the caller.
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

/// Map a document-space box to viewport pixels at `zoom` percent.
///
/// ```
/// use pagelink::layout::Coordinates;
/// use pagelink::scale::scale;
///
/// let rect = scale(Coordinates::new(100, 50, 400, 30), 200);
/// assert_eq!((rect.left, rect.top, rect.width, rect.height), (200.0, 100.0, 800.0, 60.0));
/// ```
pub fn scale(bbox: Coordinates, zoom: u32) -> ScaledRect {
    ScaledRect::from(bbox).rescale(zoom)
}

/// Scroll offset that vertically centres `block` in a viewport of
/// `viewport_height` pixels.
///
/// The result can be negative for blocks near the top of the page; the
/// PDF panel clamps it to its own scroll range.
pub fn scroll_target_for(block: &LayoutBlock, zoom: u32, viewport_height: f64) -> f64 {
    let rect = scale(block.bbox, zoom);
    rect.top - viewport_height / 2.0 + rect.height / 2.0
}

/// Map a viewport point back to document space.
pub fn unscale_point(point: Point, zoom: u32) -> Point {
    let factor = zoom_factor(zoom);
    Point::new(point.x / factor, point.y / factor)
}

/// The block under a viewport point on `page`.
///
/// When blocks overlap (a caption inside a figure, say) the smallest one
/// wins, since it is the most specific target.
pub fn block_at_point(
    blocks: &[LayoutBlock],
    page: u32,
    point: Point,
    zoom: u32,
) -> Option<&LayoutBlock> {
    let doc = unscale_point(point, zoom);
    blocks
        .iter()
        .filter(|block| block.page_num == page && contains(block.bbox, doc))
        .min_by_key(|block| block.bbox.area())
}

/// The block that best represents the top of the viewport on `page`.
///
/// This is the last block, in reading order, whose top edge is at or above
/// the viewport top. When the viewport is above every block the first
/// block on the page is returned.
pub fn block_at_viewport_top(
    blocks: &[LayoutBlock],
    page: u32,
    scroll_offset: f64,
    zoom: u32,
) -> Option<&LayoutBlock> {
    let doc_top = scroll_offset / zoom_factor(zoom);
    let on_page = || blocks.iter().filter(move |block| block.page_num == page);
    on_page()
        .filter(|block| f64::from(block.bbox.y) <= doc_top)
        .max_by_key(|block| (block.bbox.y, block.bbox.x))
        .or_else(|| on_page().min_by_key(|block| (block.bbox.y, block.bbox.x)))
}

#[allow(clippy::cast_precision_loss)]
fn contains(bbox: Coordinates, point: Point) -> bool {
    point.x >= f64::from(bbox.x)
        && point.y >= f64::from(bbox.y)
        && point.x < bbox.right() as f64
        && point.y < bbox.bottom() as f64
}
