//! The straightedge assistant: a line through two handles.

use crate::assistant::guideline::{
    GuidelineInfiniteLine, GuidelineLine, GuidelineList, GuidelineRay,
};
use crate::assistant::point::{AssistantPoint, PointKind};
use crate::assistant::properties::{Property, PropertyGroup};
use crate::assistant::{data_bool, VariantMap};
use crate::draw::{draw_contrast_segment, Viewer};
use crate::util::{Affine, Point, EPSILON};
use std::rc::Rc;

pub const RESTRICT_A: &str = "restrict_a";
pub const RESTRICT_B: &str = "restrict_b";

/// A ruler through handles `a` and `b`. The `restrict_a`/`restrict_b`
/// properties bound the guide at the corresponding handle, turning the
/// full line into a ray or a segment.
#[derive(Debug, Clone, Default)]
pub struct LineAssistant;

impl LineAssistant {
    pub const TYPE_NAME: &'static str = "line";
    pub const ALIASES: &'static [&'static str] = &["assistantLine"];

    pub fn default_points(&self, radius: f64) -> Vec<AssistantPoint> {
        vec![
            AssistantPoint::new(PointKind::CircleCross, Point::new(-50.0, 0.0), radius),
            AssistantPoint::new(PointKind::Circle, Point::new(50.0, 0.0), radius),
        ]
    }

    pub fn declare_properties(&self, properties: &mut PropertyGroup) {
        properties.add(Property::bool(RESTRICT_A, false));
        properties.add(Property::bool(RESTRICT_B, false));
    }

    pub fn update_translation(&self, properties: &mut PropertyGroup) {
        properties.set_label(RESTRICT_A, "Restrict A");
        properties.set_label(RESTRICT_B, "Restrict B");
    }

    pub fn guidelines(
        &self,
        points: &[AssistantPoint],
        data: &VariantMap,
        _pivot: Point,
        to_tool: &Affine,
        out: &mut GuidelineList,
    ) {
        let [a, b] = [points[0].position, points[1].position].map(|p| to_tool.apply(p));
        if (b - a).norm2() <= EPSILON * EPSILON {
            return;
        }
        let restrict_a = data_bool(data, RESTRICT_A, false);
        let restrict_b = data_bool(data, RESTRICT_B, false);
        match (restrict_a, restrict_b) {
            (false, false) => out.push(Rc::new(GuidelineInfiniteLine { p0: a, p1: b })),
            (true, false) => out.push(Rc::new(GuidelineRay { p0: a, p1: b })),
            (false, true) => out.push(Rc::new(GuidelineRay { p0: b, p1: a })),
            (true, true) => out.push(Rc::new(GuidelineLine { p0: a, p1: b })),
        }
    }

    pub fn draw(&self, points: &[AssistantPoint], viewer: &mut dyn Viewer) {
        draw_contrast_segment(viewer, points[0].position, points[1].position, false);
    }
}
