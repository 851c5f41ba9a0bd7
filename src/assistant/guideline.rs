//! Guidelines: geometric snap candidates and their scoring.
//!
//! A guideline projects track points onto an ideal geometry. Scoring
//! weighs the screen-space deviation of the live stroke from that
//! geometry over a log-normal arc-length window, so the first couple of
//! centimeters of a stroke decide the snap while the tail is free.

use std::rc::Rc;

use crate::config::SnapConfig;
use crate::draw::{draw_contrast_segment, Viewer};
use crate::input::track::{Track, TrackPoint};
use crate::util::{log_normal_unscaled, Affine, Bounds, Point, EPSILON};

/// Shared guideline handle.
pub type GuidelineRef = Rc<dyn Guideline>;

/// Candidate guidelines produced by one assistant query.
pub type GuidelineList = Vec<GuidelineRef>;

/// A geometric snap candidate.
pub trait Guideline {
    /// Projects a track point onto the guide. Only the position moves;
    /// every other field passes through.
    fn transform_point(&self, point: &TrackPoint) -> TrackPoint;

    /// Draws the guide overlay; the winning candidate draws `active`.
    fn draw(&self, viewer: &mut dyn Viewer, active: bool);

    /// Ranks this guideline against the live track in screen space.
    ///
    /// Returns the weighted mean deviation and whether the stroke has
    /// consumed the full scoring window ("long enough" for a commit
    /// decision). Degenerate input (< 2 points, zero total weight)
    /// scores infinity.
    fn calc_track_weight(&self, track: &Track, to_screen: &Affine, snap: &SnapConfig) -> (f64, bool) {
        if track.size() < 2 {
            return (f64::INFINITY, false);
        }
        let max_length = snap.max_length();

        let mut long_enough = false;
        let mut sum_weight = 0.0;
        let mut sum_length = 0.0;
        let mut sum_deviation = 0.0;

        let mut prev = to_screen.apply(track.point(0).position);
        for i in 0..track.size() {
            let tp = track.point(i as isize);
            let p = to_screen.apply(tp.position);
            let length = prev.distance(p);
            sum_length += length;

            let mid_step_length = sum_length - 0.5 * length;
            if mid_step_length > EPSILON {
                let weight =
                    length * log_normal_unscaled(mid_step_length, snap.snap_length, snap.snap_scale);
                sum_weight += weight;

                let projected = self.transform_point(&tp);
                let deviation = to_screen.apply(projected.position).distance(p);
                sum_deviation += weight * deviation;
            }
            prev = p;

            if sum_length >= max_length {
                long_enough = true;
                break;
            }
        }

        if sum_weight > EPSILON {
            (sum_deviation / sum_weight, long_enough)
        } else {
            (f64::INFINITY, long_enough)
        }
    }
}

/// Result of scanning a candidate set against a track.
pub struct BestMatch {
    pub guideline: Option<GuidelineRef>,
    /// Index of the winner within the scanned list
    pub index: Option<usize>,
    pub weight: f64,
    /// True as soon as any candidate exhausted its scoring window
    pub long_enough: bool,
}

/// Scans all candidates; least weight wins and the first candidate takes
/// ties. `long_enough` is the OR across candidates.
pub fn find_best(
    guidelines: &[GuidelineRef],
    track: &Track,
    to_screen: &Affine,
    snap: &SnapConfig,
) -> BestMatch {
    let mut index = None;
    let mut best_weight = f64::INFINITY;
    let mut long_enough = false;
    for (i, guideline) in guidelines.iter().enumerate() {
        let (weight, le) = guideline.calc_track_weight(track, to_screen, snap);
        long_enough |= le;
        if index.is_none() || weight < best_weight {
            index = Some(i);
            best_weight = weight;
        }
    }
    BestMatch {
        guideline: index.map(|i| guidelines[i].clone()),
        index,
        weight: best_weight,
        long_enough,
    }
}

fn project_with(point: &TrackPoint, position: Point) -> TrackPoint {
    TrackPoint {
        position,
        ..*point
    }
}

fn project_to_line(p: Point, p0: Point, direction: Point, t_min: f64, t_max: f64) -> Point {
    let n2 = direction.norm2();
    if n2 <= EPSILON * EPSILON {
        return p0;
    }
    let t = ((p - p0).dot(direction) / n2).clamp(t_min, t_max);
    p0 + direction * t
}

// Parameter span of the line `p0 + t*direction` that covers the visible
// bounds, so unbounded guides can be drawn as finite segments.
fn visible_span(p0: Point, direction: Point, bounds: Bounds) -> (f64, f64) {
    let n2 = direction.norm2();
    if n2 <= EPSILON * EPSILON {
        return (0.0, 0.0);
    }
    let mut t_min = f64::INFINITY;
    let mut t_max = f64::NEG_INFINITY;
    for corner in bounds.corners() {
        let t = (corner - p0).dot(direction) / n2;
        t_min = t_min.min(t);
        t_max = t_max.max(t);
    }
    (t_min, t_max)
}

/// A full line through two points.
#[derive(Debug, Clone, Copy)]
pub struct GuidelineInfiniteLine {
    pub p0: Point,
    pub p1: Point,
}

impl Guideline for GuidelineInfiniteLine {
    fn transform_point(&self, point: &TrackPoint) -> TrackPoint {
        let position = project_to_line(
            point.position,
            self.p0,
            self.p1 - self.p0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        );
        project_with(point, position)
    }

    fn draw(&self, viewer: &mut dyn Viewer, active: bool) {
        let direction = self.p1 - self.p0;
        let (t_min, t_max) = visible_span(self.p0, direction, viewer.visible_bounds());
        draw_contrast_segment(
            viewer,
            self.p0 + direction * t_min,
            self.p0 + direction * t_max,
            active,
        );
    }
}

/// A ray from `p0` through `p1`.
#[derive(Debug, Clone, Copy)]
pub struct GuidelineRay {
    pub p0: Point,
    pub p1: Point,
}

impl Guideline for GuidelineRay {
    fn transform_point(&self, point: &TrackPoint) -> TrackPoint {
        let position = project_to_line(
            point.position,
            self.p0,
            self.p1 - self.p0,
            0.0,
            f64::INFINITY,
        );
        project_with(point, position)
    }

    fn draw(&self, viewer: &mut dyn Viewer, active: bool) {
        let direction = self.p1 - self.p0;
        let (_, t_max) = visible_span(self.p0, direction, viewer.visible_bounds());
        if t_max > 0.0 {
            draw_contrast_segment(viewer, self.p0, self.p0 + direction * t_max, active);
        }
    }
}

/// The segment between two points.
#[derive(Debug, Clone, Copy)]
pub struct GuidelineLine {
    pub p0: Point,
    pub p1: Point,
}

impl Guideline for GuidelineLine {
    fn transform_point(&self, point: &TrackPoint) -> TrackPoint {
        let position = project_to_line(point.position, self.p0, self.p1 - self.p0, 0.0, 1.0);
        project_with(point, position)
    }

    fn draw(&self, viewer: &mut dyn Viewer, active: bool) {
        draw_contrast_segment(viewer, self.p0, self.p1, active);
    }
}

/// An ellipse outline given by its center and two orthogonal semi-axes.
#[derive(Debug, Clone, Copy)]
pub struct GuidelineEllipse {
    pub center: Point,
    pub axis_x: Point,
    pub axis_y: Point,
}

impl GuidelineEllipse {
    fn point_at(&self, angle: f64) -> Point {
        self.center + self.axis_x * angle.cos() + self.axis_y * angle.sin()
    }
}

impl Guideline for GuidelineEllipse {
    fn transform_point(&self, point: &TrackPoint) -> TrackPoint {
        let nx = self.axis_x.norm2();
        let ny = self.axis_y.norm2();
        if nx <= EPSILON * EPSILON || ny <= EPSILON * EPSILON {
            return project_with(point, self.center);
        }
        // anomaly-angle projection: normalize into the ellipse frame,
        // take the angle, map back onto the outline
        let d = point.position - self.center;
        let lx = d.dot(self.axis_x) / nx;
        let ly = d.dot(self.axis_y) / ny;
        let angle = ly.atan2(lx);
        project_with(point, self.point_at(angle))
    }

    fn draw(&self, viewer: &mut dyn Viewer, active: bool) {
        const SEGMENTS: usize = 64;
        let step = std::f64::consts::TAU / SEGMENTS as f64;
        let mut prev = self.point_at(0.0);
        for i in 1..=SEGMENTS {
            let next = self.point_at(step * i as f64);
            draw_contrast_segment(viewer, prev, next, active);
            prev = next;
        }
    }
}
