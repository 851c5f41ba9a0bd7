//! The ellipse-guide assistant: center plus two orthogonal axis handles.

use crate::assistant::guideline::{GuidelineEllipse, GuidelineList};
use crate::assistant::point::{AssistantPoint, PointKind};
use crate::assistant::VariantMap;
use crate::util::{Affine, Point, EPSILON};
use std::rc::Rc;

const CENTER: usize = 0;
const AXIS_X: usize = 1;
const AXIS_Y: usize = 2;

/// Three handles: the center, the end of the first semi-axis, and the end
/// of the second. Handle moves keep the axes orthogonal: moving an axis
/// handle rotates and scales the ellipse, moving the center translates
/// everything.
#[derive(Debug, Clone, Default)]
pub struct EllipseAssistant;

impl EllipseAssistant {
    pub const TYPE_NAME: &'static str = "ellipse";
    pub const ALIASES: &'static [&'static str] = &["assistantEllipse"];

    pub fn default_points(&self, radius: f64) -> Vec<AssistantPoint> {
        vec![
            AssistantPoint::new(PointKind::CircleCross, Point::ZERO, radius),
            AssistantPoint::new(PointKind::Circle, Point::new(100.0, 0.0), radius),
            AssistantPoint::new(PointKind::Circle, Point::new(0.0, 50.0), radius),
        ]
    }

    pub fn on_move_point(&self, points: &mut [AssistantPoint], index: usize, position: Point) {
        match index {
            CENTER => {
                let delta = position - points[CENTER].position;
                for point in points.iter_mut() {
                    point.position += delta;
                }
            }
            AXIS_X => {
                points[AXIS_X].position = position;
                self.on_fix_points(points);
            }
            AXIS_Y => {
                points[AXIS_Y].position = position;
                // keep the second axis perpendicular to the first
                let center = points[CENTER].position;
                let x_dir = (points[AXIS_X].position - center).normalized();
                if x_dir != Point::ZERO {
                    let perp = x_dir.rotate90();
                    let along = (position - center).dot(perp);
                    points[AXIS_Y].position = center + perp * along;
                }
            }
            _ => {}
        }
    }

    /// Reprojects the second axis handle onto the perpendicular of the
    /// first, preserving its current extent.
    pub fn on_fix_points(&self, points: &mut [AssistantPoint]) {
        let center = points[CENTER].position;
        let x_dir = (points[AXIS_X].position - center).normalized();
        if x_dir == Point::ZERO {
            return;
        }
        let perp = x_dir.rotate90();
        let y = points[AXIS_Y].position - center;
        let mut extent = y.dot(perp);
        if extent.abs() <= EPSILON {
            extent = y.norm();
        }
        points[AXIS_Y].position = center + perp * extent;
    }

    pub fn guidelines(
        &self,
        points: &[AssistantPoint],
        _data: &VariantMap,
        _pivot: Point,
        to_tool: &Affine,
        out: &mut GuidelineList,
    ) {
        let center = to_tool.apply(points[CENTER].position);
        let axis_x = to_tool.apply(points[AXIS_X].position) - center;
        let axis_y = to_tool.apply(points[AXIS_Y].position) - center;
        if axis_x.norm2() <= EPSILON * EPSILON || axis_y.norm2() <= EPSILON * EPSILON {
            return;
        }
        out.push(Rc::new(GuidelineEllipse {
            center,
            axis_x,
            axis_y,
        }));
    }

    pub fn draw(&self, points: &[AssistantPoint], viewer: &mut dyn crate::draw::Viewer) {
        let mut guides = GuidelineList::new();
        self.guidelines(points, &VariantMap::new(), Point::ZERO, &Affine::IDENTITY, &mut guides);
        for guide in &guides {
            guide.draw(viewer, false);
        }
    }
}
