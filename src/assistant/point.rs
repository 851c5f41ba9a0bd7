//! Assistant control handles.

use crate::util::Point;

/// Default on-screen handle radius in pixels.
pub const DEFAULT_POINT_RADIUS: f64 = 10.0;

/// Visual convention for a control handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointKind {
    /// Plain circle outline
    Circle,
    /// Filled disk
    CircleFill,
    /// Circle with a crosshair
    CircleCross,
}

/// One draggable control handle of an assistant.
#[derive(Debug, Clone, Copy)]
pub struct AssistantPoint {
    pub kind: PointKind,
    /// Position in document space
    pub position: Point,
    /// On-screen radius in pixels
    pub radius: f64,
    /// Selection highlight, toggled by the editor
    pub selected: bool,
}

impl AssistantPoint {
    pub fn new(kind: PointKind, position: Point, radius: f64) -> Self {
        Self {
            kind,
            position,
            radius,
            selected: false,
        }
    }
}
