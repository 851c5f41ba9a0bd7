//! The drawing-tool interface consumed by the manager.

use super::modifier::{HoverList, TrackList};
use super::state::{Button, DeviceId, Key};

/// A drawing tool fed by the input manager.
///
/// The paint methods mirror a checkpoint stack inside the tool:
/// `paint_push` opens a checkpoint, `paint_apply` squashes the oldest
/// open checkpoints into permanent state, `paint_pop` discards the
/// newest ones, and `paint_cancel` reverts work done above the current
/// top checkpoint. The manager keeps its save-point stack aligned with
/// the depth the tool reports through these calls.
pub trait Tool {
    /// Whether the tool currently accepts input.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Called once before the first point of the first track of a paint
    /// sequence.
    fn pre_left_button_down(&mut self) {}

    /// Consumes the current output tracks. Each track's delta counters
    /// describe what changed since the previous call.
    fn paint_tracks(&mut self, tracks: &TrackList);

    /// Opens a checkpoint; returns false to decline it.
    fn paint_push(&mut self) -> bool {
        true
    }

    /// Discards the newest `count` checkpoints.
    fn paint_pop(&mut self, count: usize) {
        let _ = count;
    }

    /// Reverts uncommitted work above the current checkpoint depth.
    fn paint_cancel(&mut self) {}

    /// Commits up to `count` checkpoints; returns how many were actually
    /// committed.
    fn paint_apply(&mut self, count: usize) -> usize {
        count
    }

    fn key_event(&mut self, press: bool, key: Key) {
        let _ = (press, key);
    }

    fn button_event(&mut self, press: bool, device_id: DeviceId, button: Button) {
        let _ = (press, device_id, button);
    }

    fn hover_event(&mut self, hovers: &HoverList) {
        let _ = hovers;
    }

    fn double_click_event(&mut self) {}

    /// Text input with preedit/commit semantics.
    fn on_input_text(&mut self, preedit: &str, commit: &str, replace_start: i32, replace_len: i32) {
        let _ = (preedit, commit, replace_start, replace_len);
    }

    fn on_enter(&mut self) {}

    fn on_leave(&mut self) {}
}
