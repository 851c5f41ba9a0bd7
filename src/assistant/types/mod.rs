//! Concrete assistant subtypes.
//!
//! The subtypes form a tagged sum behind a common capability set; the
//! registry maps stable string ids (and their load-time aliases) to
//! constructors.

pub mod ellipse;
pub mod line;
pub mod vanishing_point;

pub use ellipse::EllipseAssistant;
pub use line::LineAssistant;
pub use vanishing_point::VanishingPointAssistant;

use super::guideline::GuidelineList;
use super::point::AssistantPoint;
use super::properties::PropertyGroup;
use super::VariantMap;
use crate::draw::Viewer;
use crate::util::{Affine, Point};

/// The tagged sum of assistant subtypes.
#[derive(Debug, Clone)]
pub enum AssistantVariant {
    Line(LineAssistant),
    VanishingPoint(VanishingPointAssistant),
    Ellipse(EllipseAssistant),
}

impl AssistantVariant {
    /// Human-readable type name for the editor.
    pub fn local_name(&self) -> &'static str {
        match self {
            Self::Line(_) => "Line",
            Self::VanishingPoint(_) => "Vanishing Point",
            Self::Ellipse(_) => "Ellipse",
        }
    }

    /// Fresh control handles for a newly created assistant.
    pub fn default_points(&self, radius: f64) -> Vec<AssistantPoint> {
        match self {
            Self::Line(a) => a.default_points(radius),
            Self::VanishingPoint(a) => a.default_points(radius),
            Self::Ellipse(a) => a.default_points(radius),
        }
    }

    /// Adds subtype-specific properties to the group.
    pub fn declare_properties(&self, properties: &mut PropertyGroup) {
        match self {
            Self::Line(a) => a.declare_properties(properties),
            Self::VanishingPoint(_) => {}
            Self::Ellipse(_) => {}
        }
    }

    /// Fills in subtype-specific property labels.
    pub fn update_translation(&self, properties: &mut PropertyGroup) {
        match self {
            Self::Line(a) => a.update_translation(properties),
            Self::VanishingPoint(_) => {}
            Self::Ellipse(_) => {}
        }
    }

    /// Applies a handle move, clamping or reprojecting as the subtype
    /// requires. `index` is already bounds-checked.
    pub fn on_move_point(&self, points: &mut [AssistantPoint], index: usize, position: Point) {
        match self {
            Self::Ellipse(a) => a.on_move_point(points, index, position),
            _ => points[index].position = position,
        }
    }

    /// Re-validates every handle after external mutation.
    pub fn on_fix_points(&self, points: &mut [AssistantPoint]) {
        if let Self::Ellipse(a) = self {
            a.on_fix_points(points);
        }
    }

    /// Appends the candidate guidelines this assistant produces near
    /// `pivot` in tool space. Pure.
    pub fn guidelines(
        &self,
        points: &[AssistantPoint],
        data: &VariantMap,
        pivot: Point,
        to_tool: &Affine,
        out: &mut GuidelineList,
    ) {
        match self {
            Self::Line(a) => a.guidelines(points, data, pivot, to_tool, out),
            Self::VanishingPoint(a) => a.guidelines(points, data, pivot, to_tool, out),
            Self::Ellipse(a) => a.guidelines(points, data, pivot, to_tool, out),
        }
    }

    /// Draws the assistant's passive overlay (no edit handles).
    pub fn draw(&self, points: &[AssistantPoint], viewer: &mut dyn Viewer) {
        match self {
            Self::Line(a) => a.draw(points, viewer),
            Self::VanishingPoint(_) => {}
            Self::Ellipse(a) => a.draw(points, viewer),
        }
    }
}
