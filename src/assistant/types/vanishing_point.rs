//! The vanishing-point assistant: strokes converge on one point.

use crate::assistant::guideline::{GuidelineList, GuidelineRay};
use crate::assistant::point::{AssistantPoint, PointKind};
use crate::assistant::VariantMap;
use crate::util::{Affine, Point, EPSILON};
use std::rc::Rc;

/// A single crosshair handle; the guideline is the ray from the
/// vanishing point through the stroke pivot.
#[derive(Debug, Clone, Default)]
pub struct VanishingPointAssistant;

impl VanishingPointAssistant {
    pub const TYPE_NAME: &'static str = "vanishing_point";
    pub const ALIASES: &'static [&'static str] = &["assistantVanishingPoint"];

    pub fn default_points(&self, radius: f64) -> Vec<AssistantPoint> {
        vec![AssistantPoint::new(
            PointKind::CircleCross,
            Point::ZERO,
            radius,
        )]
    }

    pub fn guidelines(
        &self,
        points: &[AssistantPoint],
        _data: &VariantMap,
        pivot: Point,
        to_tool: &Affine,
        out: &mut GuidelineList,
    ) {
        let center = to_tool.apply(points[0].position);
        if (pivot - center).norm2() <= EPSILON * EPSILON {
            return;
        }
        out.push(Rc::new(GuidelineRay {
            p0: center,
            p1: pivot,
        }));
    }
}
