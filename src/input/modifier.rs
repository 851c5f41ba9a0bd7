//! Pipeline stages: input modifiers.
//!
//! A modifier reads the track list at level *i* and writes the list at
//! level *i+1*. The default implementations pass tracks and hovers
//! through unchanged, so a modifier only overrides the granularity it
//! cares about (whole lists or single tracks).

use super::save_point::SavePointRef;
use super::track::TrackRef;
use crate::draw::Viewer;
use crate::util::Point;

/// Tracks at one pipeline level.
pub type TrackList = Vec<TrackRef>;

/// Hover positions at one pipeline level.
pub type HoverList = Vec<Point>;

/// A stage of the input pipeline.
///
/// A modifier that publishes output it may later revise retains a
/// [`super::save_point::SavePointHolder`] on the pass's save point; the
/// manager keeps the matching checkpoint open until the holder is
/// dropped.
pub trait InputModifier {
    /// Called when the modifier is inserted into a manager's chain.
    fn activate(&mut self) {}

    /// Called when the modifier is removed from the chain.
    fn deactivate(&mut self) {}

    /// Transforms one input track, appending derived tracks to `out`.
    /// The default forwards the track unchanged.
    fn modify_track(&mut self, track: &TrackRef, save_point: &SavePointRef, out: &mut TrackList) {
        let _ = save_point;
        out.push(track.clone());
    }

    /// Transforms the whole level. The default fans out per track.
    fn modify_tracks(&mut self, tracks: &TrackList, save_point: &SavePointRef, out: &mut TrackList) {
        for track in tracks {
            self.modify_track(track, save_point, out);
        }
    }

    /// Transforms one hover position. The default forwards it unchanged.
    fn modify_hover(&mut self, hover: Point, out: &mut HoverList) {
        out.push(hover);
    }

    /// Transforms the hover list. The default fans out per hover.
    fn modify_hovers(&mut self, hovers: &HoverList, out: &mut HoverList) {
        for hover in hovers {
            self.modify_hover(*hover, out);
        }
    }

    /// Draws this stage's overlay for one input track.
    fn draw_track(&self, track: &TrackRef, viewer: &mut dyn Viewer) {
        let _ = (track, viewer);
    }

    /// Draws this stage's overlay for one hover position.
    fn draw_hover(&self, hover: Point, viewer: &mut dyn Viewer) {
        let _ = (hover, viewer);
    }

    /// Draws the whole stage overlay. The default fans out.
    fn draw(&self, tracks: &TrackList, hovers: &HoverList, viewer: &mut dyn Viewer) {
        for track in tracks {
            self.draw_track(track, viewer);
        }
        for hover in hovers {
            self.draw_hover(*hover, viewer);
        }
    }
}
