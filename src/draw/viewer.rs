//! The viewer trait implemented by the GUI host.

use super::color::{Color, BLACK, WHITE};
use crate::util::{Bounds, Point, EPSILON};

/// A pixel-size-aware 2D drawing surface.
///
/// Implemented by the host on top of its rendering backend. Coordinates
/// are in world space; `pixel_size` reports the world-space size of one
/// screen pixel so overlays can keep a constant on-screen thickness.
pub trait Viewer {
    /// World-space size of one screen pixel.
    fn pixel_size(&self) -> f64;

    /// World-space rectangle currently visible, used to clip unbounded
    /// guides (full lines and rays) to the screen.
    fn visible_bounds(&self) -> Bounds;

    /// Draws a line segment with the given on-screen line width (pixels).
    fn draw_segment(&mut self, p0: Point, p1: Point, width: f64, color: Color);

    /// Draws a circle outline.
    fn draw_circle(&mut self, center: Point, radius: f64, width: f64, color: Color);

    /// Draws a filled disk.
    fn draw_disk(&mut self, center: Point, radius: f64, color: Color);
}

/// Draws a segment as a doubled offset black/white pair for contrast on
/// arbitrary backgrounds. Inactive guides draw at half opacity.
pub fn draw_contrast_segment(viewer: &mut dyn Viewer, p0: Point, p1: Point, active: bool) {
    let (black, white) = if active {
        (BLACK, WHITE)
    } else {
        (BLACK.faded(0.5), WHITE.faded(0.5))
    };

    let d = p1 - p0;
    let k = d.norm2();
    if k <= EPSILON * EPSILON {
        return;
    }
    let k = 0.5 * viewer.pixel_size() / k.sqrt();
    let offset = Point::new(-k * d.y, k * d.x);
    viewer.draw_segment(p0 - offset, p1 - offset, 1.0, white);
    viewer.draw_segment(p0 + offset, p1 + offset, 1.0, black);
}
