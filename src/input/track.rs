//! The track data model: time- and geometry-indexed stroke samples.
//!
//! A track is the ordered sample sequence for one device+touch contact.
//! Every sample carries four monotone indices (sample ordinal, source
//! ordinal, time, arc length), which makes resampling and snapping
//! modifiers cheap: any of them can be mapped back to a fractional sample
//! index by binary search and interpolated.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicI64, Ordering};

use super::state::{
    Button, ButtonHistoryHolder, DeviceId, Key, KeyHistoryHolder, PressedSet, Ticks, TouchId,
};
use crate::util::{lerp, lerp_point, Point, EPSILON};

/// Monotonically increasing track identifier, unique per process.
pub type TrackId = i64;

// Process-wide id source, never reset within a session. Atomic only
// because Rust statics must be Sync; the crate itself is single-threaded.
static LAST_TRACK_ID: AtomicI64 = AtomicI64::new(0);

fn next_track_id() -> TrackId {
    LAST_TRACK_ID.fetch_add(1, Ordering::SeqCst) + 1
}

/// One input sample.
///
/// `original_index` locates this sample in the source track's integer
/// index space; it is fractional because modifiers may resample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackPoint {
    /// Position in tool space
    pub position: Point,
    /// Stylus pressure, typically 0..1
    pub pressure: f64,
    /// Stylus tilt
    pub tilt: Point,
    /// Fractional index into the source track
    pub original_index: f64,
    /// Seconds since the track started
    pub time: f64,
    /// Cumulative arc length up to this sample
    pub length: f64,
    /// True on the last sample of a finished stroke
    pub is_final: bool,
}

impl TrackPoint {
    /// Linear blend of all numeric fields. `l` at or outside the ends
    /// returns the endpoint exactly.
    pub fn lerp(p0: &TrackPoint, p1: &TrackPoint, l: f64) -> TrackPoint {
        if l <= EPSILON {
            return *p0;
        }
        if l >= 1.0 - EPSILON {
            return *p1;
        }
        TrackPoint {
            position: lerp_point(p0.position, p1.position, l),
            pressure: lerp(p0.pressure, p1.pressure, l),
            tilt: lerp_point(p0.tilt, p1.tilt, l),
            original_index: lerp(p0.original_index, p1.original_index, l),
            time: lerp(p0.time, p1.time, l),
            length: lerp(p0.length, p1.length, l),
            is_final: false,
        }
    }

    /// Cubic Hermite blend in position only; every other field stays
    /// linear so the monotone indices stay monotone.
    pub fn spline(
        p0: &TrackPoint,
        p1: &TrackPoint,
        t0: &TrackTangent,
        t1: &TrackTangent,
        l: f64,
    ) -> TrackPoint {
        if l <= EPSILON {
            return *p0;
        }
        if l >= 1.0 - EPSILON {
            return *p1;
        }
        let ll = l * l;
        let lll = ll * l;
        let h00 = 2.0 * lll - 3.0 * ll + 1.0;
        let h01 = -2.0 * lll + 3.0 * ll;
        let h10 = lll - 2.0 * ll + l;
        let h11 = lll - ll;
        TrackPoint {
            position: p0.position * h00 + p1.position * h01 + t0.position * h10 + t1.position * h11,
            ..TrackPoint::lerp(p0, p1, l)
        }
    }
}

/// Tangent handles for spline interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackTangent {
    pub position: Point,
    pub pressure: f64,
    pub tilt: Point,
}

/// Manager-side bookkeeping attached to each output track.
///
/// `saves[k]` is the track's size at the moment save point `k` was
/// created. A track born at stack depth `d` reads as empty for the `d`
/// save points that predate it.
#[derive(Debug, Clone)]
pub struct TrackHandler {
    pub saves: Vec<usize>,
}

impl TrackHandler {
    pub fn new(depth: usize) -> Self {
        Self {
            saves: vec![0; depth],
        }
    }
}

/// Derives a transformed track from an original track.
///
/// The default `calc_point` interpolates the original at the given
/// fractional index and shifts its timestamp by `time_offset`.
pub trait TrackModifier {
    /// The track this modifier reads from.
    fn original(&self) -> &TrackRef;

    /// Offset added to all derived timestamps.
    fn time_offset(&self) -> f64 {
        0.0
    }

    /// Computes the derived point for a fractional index into the
    /// original track.
    fn calc_point(&self, original_index: f64) -> TrackPoint {
        let mut point = self.original().borrow().interpolate_linear(original_index);
        point.original_index = original_index;
        point.time += self.time_offset();
        point
    }
}

/// Shared track handle. Tracks are multi-owner: the manager's level lists
/// hold them, derived tracks reference their originals, and tools may
/// retain them across paint calls.
pub type TrackRef = Rc<RefCell<Track>>;

/// An ordered sequence of input samples for one device+touch, with
/// identity, capability flags, history snapshots, and the delta counters
/// consumed by the paint protocol.
pub struct Track {
    /// Process-unique id, shared with every track derived from this one
    pub id: TrackId,
    pub device_id: DeviceId,
    pub touch_id: TouchId,
    /// Key history pinned at the track's creation tick
    pub key_history: KeyHistoryHolder,
    /// Button history of the owning device, pinned at creation
    pub button_history: ButtonHistoryHolder,
    pub has_pressure: bool,
    pub has_tilt: bool,
    /// Present iff this track is derived from another track
    modifier: Option<Rc<dyn TrackModifier>>,
    /// Manager-attached save-point bookkeeping
    pub handler: Option<TrackHandler>,
    /// Opaque slot for the consuming tool
    pub tool_handler: Option<Box<dyn Any>>,
    /// Points appended since the last consumer acknowledgement
    pub points_added: usize,
    /// Previously consumed points removed since the last acknowledgement
    pub points_removed: usize,
    points: Vec<TrackPoint>,
}

impl Track {
    pub fn new(
        device_id: DeviceId,
        touch_id: TouchId,
        key_history: KeyHistoryHolder,
        button_history: ButtonHistoryHolder,
        has_pressure: bool,
        has_tilt: bool,
    ) -> Self {
        Self {
            id: next_track_id(),
            device_id,
            touch_id,
            key_history,
            button_history,
            has_pressure,
            has_tilt,
            modifier: None,
            handler: None,
            tool_handler: None,
            points_added: 0,
            points_removed: 0,
            points: Vec::new(),
        }
    }

    /// Creates a derived track. Identity fields are mirrored from the
    /// original so that `(device, touch)` lookups keep working at every
    /// pipeline level.
    pub fn from_modifier(modifier: Rc<dyn TrackModifier>) -> Self {
        let original = modifier.original().borrow();
        let mut track = Self {
            id: original.id,
            device_id: original.device_id,
            touch_id: original.touch_id,
            key_history: original.key_history.clone(),
            button_history: original.button_history.clone(),
            has_pressure: original.has_pressure,
            has_tilt: original.has_tilt,
            modifier: None,
            handler: None,
            tool_handler: None,
            points_added: 0,
            points_removed: 0,
            points: Vec::new(),
        };
        drop(original);
        track.modifier = Some(modifier);
        track
    }

    /// The original track when derived.
    pub fn original(&self) -> Option<TrackRef> {
        self.modifier.as_ref().map(|m| m.original().clone())
    }

    /// Offset of this track's timeline relative to its original.
    pub fn time_offset(&self) -> f64 {
        self.modifier.as_ref().map_or(0.0, |m| m.time_offset())
    }

    /// The creation tick of this track.
    pub fn ticks(&self) -> Ticks {
        self.key_history.ticks()
    }

    /// Depth of the modifier chain above the raw track.
    pub fn level(&self) -> usize {
        match &self.modifier {
            Some(m) => m.original().borrow().level() + 1,
            None => 0,
        }
    }

    /// Follows the modifier chain to the raw origin.
    pub fn root(track: &TrackRef) -> TrackRef {
        let original = track.borrow().original();
        match original {
            Some(original) => Track::root(&original),
            None => track.clone(),
        }
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// True once the last point carries the final flag.
    pub fn finished(&self) -> bool {
        self.points.last().is_some_and(|p| p.is_final)
    }

    /// True while the delta counters carry unconsumed changes.
    pub fn changed(&self) -> bool {
        self.points_added != 0 || self.points_removed != 0
    }

    pub fn reset_changes(&mut self) {
        self.points_added = 0;
        self.points_removed = 0;
    }

    fn clamp_index(&self, index: isize) -> usize {
        let last = self.points.len().saturating_sub(1) as isize;
        index.clamp(0, last).max(0) as usize
    }

    /// Saturating-indexed access; a blank point when the track is empty.
    pub fn point(&self, index: isize) -> TrackPoint {
        if self.points.is_empty() {
            TrackPoint::default()
        } else {
            self.points[self.clamp_index(index)]
        }
    }

    pub fn front(&self) -> TrackPoint {
        self.point(0)
    }

    pub fn back(&self) -> TrackPoint {
        self.point(self.points.len() as isize - 1)
    }

    /// First point of the unconsumed delta.
    pub fn current(&self) -> TrackPoint {
        self.point(self.points.len() as isize - self.points_added as isize)
    }

    /// Last point the consumer has already acknowledged.
    pub fn previous(&self) -> TrackPoint {
        self.point(self.points.len() as isize - self.points_added as isize - 1)
    }

    /// Second point of the unconsumed delta.
    pub fn next(&self) -> TrackPoint {
        self.point(self.points.len() as isize - self.points_added as isize + 1)
    }

    /// Pressed keys at `time` seconds into this track.
    pub fn key_state(&self, time: f64) -> PressedSet<Key> {
        self.key_history.get(time)
    }

    /// Pressed keys at the first unconsumed point.
    pub fn current_key_state(&self) -> PressedSet<Key> {
        self.key_state(self.current().time)
    }

    /// Pressed buttons of the owning device at `time` seconds.
    pub fn button_state(&self, time: f64) -> PressedSet<Button> {
        self.button_history.get(time)
    }

    /// Pressed buttons at the first unconsumed point.
    pub fn current_button_state(&self) -> PressedSet<Button> {
        self.button_state(self.current().time)
    }

    /// Appends a sample, recomputing the cumulative arc length and keeping
    /// time monotone. Ignored once the track is finished.
    pub fn push_back(&mut self, mut point: TrackPoint) {
        if self.finished() {
            log::debug!("push_back on finished track {} ignored", self.id);
            return;
        }
        match self.points.last() {
            Some(last) => {
                point.time = point.time.max(last.time);
                point.length = last.length + last.position.distance(point.position);
            }
            None => point.length = 0.0,
        }
        self.points.push(point);
        self.points_added += 1;
    }

    /// Removes the last `count` points. Points that were appended but
    /// never consumed simply cancel out of `points_added`; removing
    /// consumed points accrues `points_removed` and signals the manager
    /// to roll back.
    pub fn pop_back(&mut self, count: usize) {
        let count = count.min(self.points.len());
        if count == 0 {
            return;
        }
        let canceled = count.min(self.points_added);
        self.points_added -= canceled;
        self.points_removed += count - canceled;
        self.points.truncate(self.points.len() - count);
    }

    /// Shrinks the track to `count` points.
    pub fn truncate(&mut self, count: usize) {
        if count < self.points.len() {
            self.pop_back(self.points.len() - count);
        }
    }

    fn floor_index_frac(&self, index: f64) -> (usize, f64) {
        let i = (index + EPSILON).floor() as isize;
        let clamped = self.clamp_index(i);
        if i < 0 || clamped as isize != i {
            (clamped, 0.0)
        } else {
            (clamped, (index - i as f64).max(0.0))
        }
    }

    fn ceil_index(&self, index: f64) -> usize {
        self.clamp_index((index - EPSILON).ceil() as isize)
    }

    // points[a].field <= value < points[b].field, with interpolation
    // between the bracketing samples. Degenerate spans return the lower
    // endpoint.
    fn index_by_field(&self, value: f64, field: impl Fn(&TrackPoint) -> f64) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let mut a = 0usize;
        let mut aa = field(&self.points[a]);
        if value - aa <= 0.5 * EPSILON {
            return a as f64;
        }
        let mut b = self.points.len() - 1;
        let mut bb = field(&self.points[b]);
        if bb - value <= 0.5 * EPSILON {
            return b as f64;
        }
        loop {
            let c = (a + b) / 2;
            if a == c {
                break;
            }
            let cc = field(&self.points[c]);
            if cc - value > 0.5 * EPSILON {
                b = c;
                bb = cc;
            } else {
                a = c;
                aa = cc;
            }
        }
        if bb - aa >= 0.5 * EPSILON {
            a as f64 + (value - aa) / (bb - aa)
        } else {
            a as f64
        }
    }

    /// Fractional index whose interpolated source ordinal equals `value`.
    pub fn index_by_original_index(&self, value: f64) -> f64 {
        self.index_by_field(value, |p| p.original_index)
    }

    /// Fractional index whose interpolated time equals `value`.
    pub fn index_by_time(&self, value: f64) -> f64 {
        self.index_by_field(value, |p| p.time)
    }

    /// Fractional index whose interpolated arc length equals `value`.
    pub fn index_by_length(&self, value: f64) -> f64 {
        self.index_by_field(value, |p| p.length)
    }

    fn field_by_index(&self, index: f64, field: impl Fn(&TrackPoint) -> f64) -> f64 {
        let (i0, frac) = self.floor_index_frac(index);
        let p0 = self.point(i0 as isize);
        let p1 = self.point(self.ceil_index(index) as isize);
        lerp(field(&p0), field(&p1), frac)
    }

    /// Source ordinal at a fractional index of this track.
    pub fn original_index_by_index(&self, index: f64) -> f64 {
        self.field_by_index(index, |p| p.original_index)
    }

    /// Time at a fractional index of this track.
    pub fn time_by_index(&self, index: f64) -> f64 {
        self.field_by_index(index, |p| p.time)
    }

    /// Arc length at a fractional index of this track.
    pub fn length_by_index(&self, index: f64) -> f64 {
        self.field_by_index(index, |p| p.length)
    }

    /// Linear blend of the bracketing samples at a fractional index.
    pub fn interpolate_linear(&self, index: f64) -> TrackPoint {
        let (i0, frac) = self.floor_index_frac(index);
        let p0 = self.point(i0 as isize);
        let p1 = self.point(self.ceil_index(index) as isize);
        TrackPoint::lerp(&p0, &p1, frac)
    }

    /// Point at a fractional index: delegates to the modifier when this
    /// track is derived, else interpolates the stored samples.
    pub fn calc_point(&self, index: f64) -> TrackPoint {
        match &self.modifier {
            Some(m) => m.calc_point(self.original_index_by_index(index)),
            None => self.interpolate_linear(index),
        }
    }

    /// Maps a fractional index of this track to the raw track's index
    /// space through the whole modifier chain.
    pub fn root_index_by_index(&self, index: f64) -> f64 {
        match &self.modifier {
            Some(m) => {
                let original_index = self.original_index_by_index(index);
                m.original().borrow().root_index_by_index(original_index)
            }
            None => index,
        }
    }

    /// Point of the raw track corresponding to a fractional index of
    /// this track.
    pub fn calc_root_point(&self, index: f64) -> TrackPoint {
        match &self.modifier {
            Some(m) => {
                let original_index = self.original_index_by_index(index);
                m.original().borrow().calc_root_point(original_index)
            }
            None => self.calc_point(index),
        }
    }

    /// Unit tangent at a fractional index, estimated backward over
    /// `distance` of arc length.
    pub fn calc_tangent(&self, index: f64, distance: f64) -> Point {
        let distance = distance.max(10.0 * EPSILON);
        let p = self.calc_point(index);
        let prev = self.calc_point(self.index_by_length(p.length - distance));
        (p.position - prev.position).normalized()
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("id", &self.id)
            .field("device_id", &self.device_id)
            .field("touch_id", &self.touch_id)
            .field("level", &self.level())
            .field("size", &self.points.len())
            .field("points_added", &self.points_added)
            .field("points_removed", &self.points_removed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::state::InputState;

    fn test_track() -> Track {
        let mut state = InputState::new();
        Track::new(
            DeviceId(1),
            TouchId(1),
            state.key_holder(0, 0.001),
            state.button_holder(DeviceId(1), 0, 0.001),
            true,
            false,
        )
    }

    fn push(track: &mut Track, x: f64, y: f64, time: f64) {
        let index = track.size() as f64;
        track.push_back(TrackPoint {
            position: Point::new(x, y),
            pressure: 0.5,
            original_index: index,
            time,
            ..TrackPoint::default()
        });
    }

    #[test]
    fn length_is_running_sum_of_distances() {
        let mut track = test_track();
        push(&mut track, 0.0, 0.0, 0.0);
        push(&mut track, 3.0, 4.0, 0.1);
        push(&mut track, 3.0, 10.0, 0.2);
        assert_eq!(track.point(0).length, 0.0);
        assert!((track.point(1).length - 5.0).abs() < EPSILON);
        assert!((track.point(2).length - 11.0).abs() < EPSILON);
        assert_eq!(track.points_added, 3);
    }

    #[test]
    fn empty_track_yields_blank_point() {
        let track = test_track();
        assert_eq!(track.point(0), TrackPoint::default());
        assert_eq!(track.point(5), TrackPoint::default());
        assert!(!track.finished());
    }

    #[test]
    fn push_after_final_is_ignored() {
        let mut track = test_track();
        push(&mut track, 0.0, 0.0, 0.0);
        let mut last = TrackPoint {
            position: Point::new(1.0, 0.0),
            time: 0.1,
            is_final: true,
            ..TrackPoint::default()
        };
        last.original_index = 1.0;
        track.push_back(last);
        assert!(track.finished());

        push(&mut track, 2.0, 0.0, 0.2);
        assert_eq!(track.size(), 2);
    }

    #[test]
    fn pop_back_cancels_unconsumed_points_first() {
        let mut track = test_track();
        for i in 0..5 {
            push(&mut track, i as f64, 0.0, i as f64 * 0.01);
        }
        track.reset_changes(); // consumer acknowledged all five
        push(&mut track, 5.0, 0.0, 0.05);
        assert_eq!(track.points_added, 1);

        // popping two removes the fresh point silently and one consumed point
        track.pop_back(2);
        assert_eq!(track.points_added, 0);
        assert_eq!(track.points_removed, 1);
        assert_eq!(track.size(), 4);
    }

    #[test]
    fn index_by_time_matches_binary_search_scenario() {
        let mut track = test_track();
        for (i, t) in [0.0, 1.0, 2.0, 4.0, 8.0].iter().enumerate() {
            push(&mut track, i as f64, 0.0, *t);
        }
        assert_eq!(track.index_by_time(3.0), 2.5);
        assert_eq!(track.index_by_time(0.0), 0.0);
        assert_eq!(track.index_by_time(8.0), 4.0);
        assert_eq!(track.index_by_time(10.0), 4.0);
    }

    #[test]
    fn index_round_trips_through_each_monotone_field() {
        let mut track = test_track();
        for (i, t) in [0.0, 0.5, 0.9, 1.7, 3.0].iter().enumerate() {
            push(&mut track, (i * i) as f64, 0.0, *t);
        }
        for i in 0..track.size() {
            let p = track.point(i as isize);
            assert!((track.index_by_time(p.time) - i as f64).abs() < 1e-6);
            assert!((track.index_by_length(p.length) - i as f64).abs() < 1e-6);
            assert!((track.index_by_original_index(p.original_index) - i as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn interpolate_linear_midpoint() {
        let mut track = test_track();
        push(&mut track, 0.0, 0.0, 0.0);
        push(&mut track, 10.0, 0.0, 2.0);
        let p = track.interpolate_linear(0.5);
        assert_eq!(p.position, Point::new(5.0, 0.0));
        assert_eq!(p.time, 1.0);
        assert_eq!(p.length, 5.0);
    }

    #[test]
    fn interpolate_linear_at_integer_indices_is_exact() {
        let mut track = test_track();
        for i in 0..4 {
            push(&mut track, i as f64 * 1.3, i as f64, i as f64 * 0.01);
        }
        for i in 0..4 {
            assert_eq!(track.interpolate_linear(i as f64), track.point(i));
        }
        // out-of-range indices clamp to the endpoints
        assert_eq!(track.interpolate_linear(-1.0), track.point(0));
        assert_eq!(track.interpolate_linear(9.0), track.point(3));
    }

    #[test]
    fn spline_stays_linear_outside_position() {
        let p0 = TrackPoint {
            position: Point::new(0.0, 0.0),
            pressure: 0.0,
            time: 0.0,
            length: 0.0,
            ..TrackPoint::default()
        };
        let p1 = TrackPoint {
            position: Point::new(10.0, 0.0),
            pressure: 1.0,
            time: 1.0,
            length: 10.0,
            original_index: 1.0,
            ..TrackPoint::default()
        };
        let t = TrackTangent {
            position: Point::new(0.0, 8.0),
            ..TrackTangent::default()
        };
        let mid = TrackPoint::spline(&p0, &p1, &t, &t, 0.5);
        assert_eq!(mid.pressure, 0.5);
        assert_eq!(mid.time, 0.5);
        assert_eq!(mid.length, 5.0);
        // the tangents bend the position off the straight chord
        assert!(mid.position.y.abs() > EPSILON);
        // endpoints are exact
        assert_eq!(TrackPoint::spline(&p0, &p1, &t, &t, 0.0), p0);
        assert_eq!(TrackPoint::spline(&p0, &p1, &t, &t, 1.0), p1);
    }

    struct ShiftModifier {
        original: TrackRef,
        offset: Point,
    }

    impl TrackModifier for ShiftModifier {
        fn original(&self) -> &TrackRef {
            &self.original
        }

        fn time_offset(&self) -> f64 {
            0.25
        }

        fn calc_point(&self, original_index: f64) -> TrackPoint {
            let mut p = self.original().borrow().interpolate_linear(original_index);
            p.original_index = original_index;
            p.time += self.time_offset();
            p.position += self.offset;
            p
        }
    }

    #[test]
    fn derived_track_mirrors_identity_and_delegates_calc_point() {
        let mut raw = test_track();
        push(&mut raw, 0.0, 0.0, 0.0);
        push(&mut raw, 10.0, 0.0, 1.0);
        let raw: TrackRef = Rc::new(RefCell::new(raw));

        let modifier = Rc::new(ShiftModifier {
            original: raw.clone(),
            offset: Point::new(0.0, 2.0),
        });
        let mut derived = Track::from_modifier(modifier);
        derived.push_back(TrackPoint {
            position: Point::new(0.0, 2.0),
            original_index: 0.0,
            time: 0.25,
            ..TrackPoint::default()
        });
        derived.push_back(TrackPoint {
            position: Point::new(10.0, 2.0),
            original_index: 1.0,
            time: 1.25,
            ..TrackPoint::default()
        });

        assert_eq!(derived.id, raw.borrow().id);
        assert_eq!(derived.level(), 1);
        assert_eq!(derived.time_offset(), 0.25);

        let p = derived.calc_point(0.5);
        assert_eq!(p.position, Point::new(5.0, 2.0));
        assert_eq!(p.time, 0.75);

        let derived: TrackRef = Rc::new(RefCell::new(derived));
        assert_eq!(Track::root(&derived).borrow().level(), 0);
        assert_eq!(derived.borrow().root_index_by_index(0.5), 0.5);
        assert_eq!(
            derived.borrow().calc_root_point(0.5).position,
            Point::new(5.0, 0.0)
        );
    }
}
