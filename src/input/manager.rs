//! The input manager: event ingestion, modifier pipeline, paint protocol.
//!
//! Raw device events land in level-0 tracks. Each pipeline pass runs the
//! modifier chain, level by level, into the output list, then settles the
//! save-point stack against the tool's checkpoint stack: rolling back
//! when a modifier revised already-delivered points, committing trailing
//! checkpoints no modifier claims anymore, and finally delivering the
//! fresh delta to the tool.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicI64, Ordering};

use super::modifier::{HoverList, InputModifier, TrackList};
use super::save_point::{SavePoint, SavePointRef};
use super::state::{Button, DeviceId, InputState, Key, Ticks, TouchId};
use super::tool::Tool;
use super::track::{Track, TrackHandler, TrackPoint, TrackRef};
use crate::draw::{Color, Viewer};
use crate::util::Point;

// Process-wide synthetic-touch source, shared by all managers and never
// reset within a session.
static LAST_TOUCH_ID: AtomicI64 = AtomicI64::new(0);

/// Seconds per host tick when no configuration is supplied.
pub const DEFAULT_TICK_SECONDS: f64 = 0.001;

// Overlay styling for the not-yet-committed stroke suffix.
const OVERLAY_COLOR: Color = Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.8,
};
const OVERLAY_LEVEL_ALPHA: f64 = 0.8;

/// Orchestrates the raw-to-output track pipeline and the save-point
/// paint protocol toward the active drawing tool.
pub struct InputManager {
    state: InputState,
    tool: Option<Box<dyn Tool>>,
    tool_busy: bool,
    tick_seconds: f64,
    viewer: Option<Rc<RefCell<dyn Viewer>>>,
    modifiers: Vec<Box<dyn InputModifier>>,
    /// `tracks[0]` is raw input; `tracks[i+1]` is the output of modifier `i`.
    tracks: Vec<TrackList>,
    hovers: Vec<HoverList>,
    save_points: Vec<SavePointRef>,
    /// Checkpoints the tool actually accepted via `paint_push`.
    save_points_sent: usize,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    pub fn new() -> Self {
        Self::with_tick_seconds(DEFAULT_TICK_SECONDS)
    }

    /// Creates a manager with an explicit tick-to-seconds mapping.
    pub fn with_tick_seconds(tick_seconds: f64) -> Self {
        Self {
            state: InputState::new(),
            tool: None,
            tool_busy: false,
            tick_seconds,
            viewer: None,
            modifiers: Vec::new(),
            tracks: vec![TrackList::new()],
            hovers: vec![HoverList::new()],
            save_points: Vec::new(),
            save_points_sent: 0,
        }
    }

    /// Creates a manager configured from the config file values.
    pub fn with_config(config: &crate::Config) -> Self {
        Self::with_tick_seconds(config.timing.tick_seconds)
    }

    /// Generates a synthetic touch id, unique per process.
    pub fn gen_touch_id() -> TouchId {
        TouchId(LAST_TOUCH_ID.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// True while a tool is installed and enabled.
    pub fn is_active(&self) -> bool {
        self.tool.as_ref().is_some_and(|tool| tool.is_enabled())
    }

    /// True from the first raw point until the stroke set finishes.
    pub fn is_tool_busy(&self) -> bool {
        self.tool_busy
    }

    /// Raw level-0 tracks.
    pub fn input_tracks(&self) -> &TrackList {
        &self.tracks[0]
    }

    /// Final-level tracks delivered to the tool.
    pub fn output_tracks(&self) -> &TrackList {
        self.tracks.last().expect("level lists are never empty")
    }

    /// Hover positions after the full modifier chain.
    pub fn output_hovers(&self) -> &HoverList {
        self.hovers.last().expect("level lists are never empty")
    }

    pub fn modifiers_count(&self) -> usize {
        self.modifiers.len()
    }

    /// Depth of the save-point stack.
    pub fn save_point_depth(&self) -> usize {
        self.save_points.len()
    }

    /// Checkpoints the tool has accepted.
    pub fn save_points_sent(&self) -> usize {
        self.save_points_sent
    }

    /// Installs (or removes) the active tool. The manager resets; the
    /// outgoing tool is assumed to have settled its own paint stack.
    pub fn set_tool(&mut self, tool: Option<Box<dyn Tool>>) {
        self.reset();
        self.tool_busy = false;
        self.tool = tool;
        log::info!(
            "Tool switched ({})",
            if self.tool.is_some() { "installed" } else { "none" }
        );
    }

    /// Attaches the overlay viewer used by [`InputManager::draw`].
    pub fn set_viewer(&mut self, viewer: Option<Rc<RefCell<dyn Viewer>>>) {
        self.viewer = viewer;
    }

    /// Drops all save points and clears every level list. The tool's
    /// paint stack is assumed to be settled by the caller.
    pub fn reset(&mut self) {
        self.save_points_sent = 0;
        for save_point in &self.save_points {
            save_point.set_available(false);
        }
        self.save_points.clear();
        for list in &mut self.tracks {
            list.clear();
        }
        for list in &mut self.hovers {
            list.clear();
        }
    }

    // ------------------------------------------------------------------
    // Modifier chain
    // ------------------------------------------------------------------

    /// Inserts a modifier at `index`, flushing open strokes first.
    pub fn insert_modifier(&mut self, index: usize, modifier: Box<dyn InputModifier>) {
        let index = index.min(self.modifiers.len());
        self.finish_tracks();
        self.modifiers.insert(index, modifier);
        self.tracks.insert(index + 1, TrackList::new());
        self.hovers.insert(index + 1, HoverList::new());
        self.modifiers[index].activate();
        log::debug!("Modifier inserted at level {}", index);
    }

    /// Appends a modifier at the end of the chain.
    pub fn push_modifier(&mut self, modifier: Box<dyn InputModifier>) {
        self.insert_modifier(self.modifiers.len(), modifier);
    }

    /// Removes the modifier at `index`, flushing open strokes first.
    pub fn remove_modifier(&mut self, index: usize) {
        if index >= self.modifiers.len() {
            return;
        }
        self.finish_tracks();
        self.modifiers[index].deactivate();
        self.modifiers.remove(index);
        self.tracks.remove(index + 1);
        self.hovers.remove(index + 1);
        log::debug!("Modifier removed from level {}", index);
    }

    /// Removes every modifier.
    pub fn clear_modifiers(&mut self) {
        while !self.modifiers.is_empty() {
            self.remove_modifier(self.modifiers.len() - 1);
        }
    }

    // ------------------------------------------------------------------
    // Raw-track bookkeeping
    // ------------------------------------------------------------------

    fn create_track(
        &mut self,
        index: usize,
        device_id: DeviceId,
        touch_id: TouchId,
        ticks: Ticks,
        has_pressure: bool,
        has_tilt: bool,
    ) -> TrackRef {
        let track = Rc::new(RefCell::new(Track::new(
            device_id,
            touch_id,
            self.state.key_holder(ticks, self.tick_seconds),
            self.state.button_holder(device_id, ticks, self.tick_seconds),
            has_pressure,
            has_tilt,
        )));
        self.tracks[0].insert(index, track.clone());
        track
    }

    /// Finds or creates the raw track for `(device, touch)`. The raw list
    /// stays sorted by that pair so the lookup is a binary search.
    fn get_track(
        &mut self,
        device_id: DeviceId,
        touch_id: TouchId,
        ticks: Ticks,
        has_pressure: bool,
        has_tilt: bool,
    ) -> TrackRef {
        let key = (device_id, touch_id);
        let found = self.tracks[0].binary_search_by(|track| {
            let track = track.borrow();
            (track.device_id, track.touch_id).cmp(&key)
        });
        match found {
            Ok(index) => self.tracks[0][index].clone(),
            Err(index) => {
                self.create_track(index, device_id, touch_id, ticks, has_pressure, has_tilt)
            }
        }
    }

    fn add_track_point(
        track: &TrackRef,
        position: Point,
        pressure: f64,
        tilt: Point,
        time: f64,
        is_final: bool,
    ) {
        let mut track = track.borrow_mut();
        let original_index = track.size() as f64;
        track.push_back(TrackPoint {
            position,
            pressure,
            tilt,
            original_index,
            time,
            length: 0.0, // computed by push_back
            is_final,
        });
    }

    /// Repeats the last point of every open track so a key or button
    /// transition materializes in each track's timeline.
    fn touch_tracks(&mut self, finish: bool) {
        for track in &self.tracks[0] {
            let last = {
                let track = track.borrow();
                if track.finished() || track.is_empty() {
                    continue;
                }
                track.back()
            };
            Self::add_track_point(track, last.position, last.pressure, last.tilt, last.time, finish);
        }
    }

    // ------------------------------------------------------------------
    // Paint protocol
    // ------------------------------------------------------------------

    /// Rolls the tool back to the checkpoint of save point `save_index`
    /// and rewinds the delta counters so the suffix is resent.
    fn paint_rollback_to(&mut self, save_index: usize, tool: &mut dyn Tool) {
        if save_index >= self.save_points.len() {
            return;
        }
        let level = save_index + 1;
        if level <= self.save_points_sent {
            if level < self.save_points_sent {
                tool.paint_pop(self.save_points_sent - level);
            }
            tool.paint_cancel();
            self.save_points_sent = level;
        }

        for track in self.tracks.last().expect("level lists are never empty") {
            let mut track = track.borrow_mut();
            let size = track.size();
            if let Some(handler) = track.handler.as_mut() {
                handler.saves.truncate(level);
                let kept = handler.saves[save_index];
                track.points_removed = 0;
                track.points_added = size.saturating_sub(kept);
            }
        }
        for save_point in &self.save_points[level..] {
            save_point.set_available(false);
        }
        self.save_points.truncate(level);
    }

    /// Commits the newest `count` save points, honoring the number of
    /// checkpoints the tool reports it actually applied.
    fn paint_apply_count(&mut self, count: usize, tool: &mut dyn Tool) {
        if count == 0 {
            return;
        }
        let level = self.save_points.len() - count;
        let mut resend = true;

        if level < self.save_points_sent {
            let requested = self.save_points_sent - level;
            let applied = tool.paint_apply(requested).min(requested);
            self.save_points_sent -= applied;
            if self.save_points_sent == level {
                resend = false;
            }
        }
        if level < self.save_points_sent {
            // the tool declined part of the commit; discard the rest
            tool.paint_pop(self.save_points_sent - level);
            self.save_points_sent = level;
        }

        let sent = self.save_points_sent;
        for track in self.tracks.last().expect("level lists are never empty") {
            let mut track = track.borrow_mut();
            let size = track.size();
            let Some(handler) = track.handler.as_mut() else {
                continue;
            };
            let resend_from = if resend { Some(handler.saves[sent]) } else { None };
            handler.saves.truncate(level);
            if let Some(kept) = resend_from {
                track.points_removed = 0;
                track.points_added = size.saturating_sub(kept);
            }
        }
        for save_point in &self.save_points[level..] {
            save_point.set_available(false);
        }
        self.save_points.truncate(level);
    }

    /// One full pipeline settlement: runs the modifier chain, resolves
    /// rollback and apply against the tool, and delivers fresh deltas,
    /// looping until the pass's save point comes back free.
    fn paint_tracks(&mut self) {
        let Some(mut tool) = self.tool.take() else {
            return;
        };

        let all_finished = self.tracks[0].iter().all(|t| t.borrow().finished());

        loop {
            // run modifiers
            let save_point = SavePoint::create();
            for i in 0..self.modifiers.len() {
                let (inputs, outputs) = self.tracks.split_at_mut(i + 1);
                let output = &mut outputs[0];
                output.clear();
                self.modifiers[i].modify_tracks(&inputs[i], &save_point, output);
            }

            // attach handlers to new output tracks
            let depth = self.save_points.len();
            for track in self.tracks.last().expect("level lists are never empty") {
                let mut track = track.borrow_mut();
                if track.handler.is_none() {
                    track.handler = Some(TrackHandler::new(depth));
                }
            }

            if !self.save_points.is_empty() {
                // rollback: deepest save point whose snapshot is still a
                // clean prefix of every revised track
                let mut rollback_index = self.save_points.len();
                for track in self.tracks.last().expect("level lists are never empty") {
                    let track = track.borrow();
                    if track.points_removed > 0 {
                        let kept = track.size().saturating_sub(track.points_added);
                        if let Some(handler) = &track.handler {
                            while rollback_index > 0
                                && (rollback_index >= self.save_points.len()
                                    || handler.saves[rollback_index] > kept)
                            {
                                rollback_index -= 1;
                            }
                        }
                    }
                }
                self.paint_rollback_to(rollback_index, tool.as_mut());

                // apply every trailing save point no modifier claims
                let mut apply_count = 0;
                while apply_count < self.save_points.len()
                    && self.save_points[self.save_points.len() - apply_count - 1].is_free()
                {
                    apply_count += 1;
                }
                self.paint_apply_count(apply_count, tool.as_mut());
            }

            // deliver the delta once the tool's depth matches the stack
            {
                let sub_tracks = self.tracks.last().expect("level lists are never empty");
                if self.save_points_sent == self.save_points.len() && !sub_tracks.is_empty() {
                    tool.paint_tracks(sub_tracks);
                }
                for track in sub_tracks {
                    track.borrow_mut().reset_changes();
                }
            }

            if save_point.is_free() {
                save_point.set_available(false);
                if all_finished {
                    let remaining = self.save_points.len();
                    self.paint_apply_count(remaining, tool.as_mut());
                    for list in &mut self.tracks {
                        list.clear();
                    }
                    self.tool_busy = false;
                    log::debug!("Paint sequence finished");
                }
                break;
            }

            // the pass's output is tentative: checkpoint and go around
            if tool.paint_push() {
                self.save_points_sent += 1;
            }
            self.save_points.push(save_point);
            for track in self.tracks.last().expect("level lists are never empty") {
                let mut track = track.borrow_mut();
                let size = track.size();
                if let Some(handler) = track.handler.as_mut() {
                    handler.saves.push(size);
                }
            }
        }

        self.tool = Some(tool);
    }

    /// Runs the pipeline if a tool is active.
    pub fn process_tracks(&mut self) {
        if self.is_active() {
            self.paint_tracks();
        }
    }

    /// Marks every open track final and settles the pipeline. Without an
    /// active tool this degenerates to a reset.
    pub fn finish_tracks(&mut self) {
        if self.is_active() {
            self.touch_tracks(true);
            self.process_tracks();
        } else {
            self.reset();
        }
    }

    // ------------------------------------------------------------------
    // Host events
    // ------------------------------------------------------------------

    /// Ingests one pointer/stylus sample. Events on finished tracks are
    /// ignored; the host triggers a pipeline pass via `process_tracks`.
    #[allow(clippy::too_many_arguments)]
    pub fn track_event(
        &mut self,
        device_id: DeviceId,
        touch_id: TouchId,
        position: Point,
        pressure: Option<f64>,
        tilt: Option<Point>,
        is_final: bool,
        ticks: Ticks,
    ) {
        if !self.is_active() {
            return;
        }
        if self.tracks[0].is_empty() {
            if let Some(tool) = self.tool.as_mut() {
                tool.pre_left_button_down();
            }
            self.tool_busy = true;
        }

        let track = self.get_track(device_id, touch_id, ticks, pressure.is_some(), tilt.is_some());
        let (finished, track_ticks, time_offset) = {
            let track = track.borrow();
            (track.finished(), track.ticks(), track.time_offset())
        };
        if finished {
            return;
        }
        let time = (ticks - track_ticks) as f64 * self.tick_seconds - time_offset;
        Self::add_track_point(
            &track,
            position,
            pressure.unwrap_or(1.0),
            tilt.unwrap_or_default(),
            time,
            is_final,
        );
    }

    /// Records a key transition and runs the event sandwich: settle,
    /// inform the tool, materialize the transition into open tracks,
    /// settle again.
    pub fn key_event(&mut self, press: bool, key: Key, ticks: Ticks) {
        self.state.key_event(press, key, ticks);
        if self.is_active() {
            self.process_tracks();
            if let Some(tool) = self.tool.as_mut() {
                tool.key_event(press, key);
            }
            self.touch_tracks(false);
            self.process_tracks();
        }
    }

    /// Records a button transition; same sandwich as `key_event`.
    pub fn button_event(&mut self, press: bool, device_id: DeviceId, button: Button, ticks: Ticks) {
        self.state.button_event(press, device_id, button, ticks);
        if self.is_active() {
            self.process_tracks();
            if let Some(tool) = self.tool.as_mut() {
                tool.button_event(press, device_id, button);
            }
            self.touch_tracks(false);
            self.process_tracks();
        }
    }

    /// Runs hover positions through the modifier chain and informs the
    /// tool.
    pub fn hover_event(&mut self, hovers: HoverList) {
        self.hovers[0] = hovers;
        for i in 0..self.modifiers.len() {
            let (inputs, outputs) = self.hovers.split_at_mut(i + 1);
            let output = &mut outputs[0];
            output.clear();
            self.modifiers[i].modify_hovers(&inputs[i], output);
        }
        if self.is_active() {
            let hovers = self.hovers.last().cloned().unwrap_or_default();
            if let Some(tool) = self.tool.as_mut() {
                tool.hover_event(&hovers);
            }
        }
    }

    pub fn double_click_event(&mut self) {
        if self.is_active() {
            if let Some(tool) = self.tool.as_mut() {
                tool.double_click_event();
            }
        }
    }

    pub fn text_event(&mut self, preedit: &str, commit: &str, replace_start: i32, replace_len: i32) {
        if self.is_active() {
            if let Some(tool) = self.tool.as_mut() {
                tool.on_input_text(preedit, commit, replace_start, replace_len);
            }
        }
    }

    pub fn enter_event(&mut self) {
        if self.is_active() {
            if let Some(tool) = self.tool.as_mut() {
                tool.on_enter();
            }
        }
    }

    pub fn leave_event(&mut self) {
        if self.is_active() {
            if let Some(tool) = self.tool.as_mut() {
                tool.on_leave();
            }
        }
    }

    // ------------------------------------------------------------------
    // Overlay
    // ------------------------------------------------------------------

    /// Draws the in-flight overlay through the viewer installed with
    /// [`InputManager::set_viewer`].
    pub fn draw(&self) {
        if let Some(viewer) = &self.viewer {
            let mut viewer = viewer.borrow_mut();
            self.draw_overlay(&mut *viewer);
        }
    }

    /// Draws the not-yet-committed suffix of every output track (fading
    /// across checkpoint boundaries) followed by each modifier's own
    /// overlay.
    pub fn draw_overlay(&self, viewer: &mut dyn Viewer) {
        if !self.is_active() {
            return;
        }

        if self.save_points_sent < self.save_points.len() {
            for track in self.output_tracks() {
                let track = track.borrow();
                let Some(handler) = &track.handler else {
                    continue;
                };
                let start = handler.saves[self.save_points_sent].saturating_sub(1);
                if start >= track.size() {
                    continue;
                }
                let mut level = self.save_points_sent;
                let mut color = OVERLAY_COLOR;
                for i in (start + 1)..track.size() {
                    while level < handler.saves.len() && handler.saves[level] <= i {
                        color = color.faded(OVERLAY_LEVEL_ALPHA);
                        level += 1;
                    }
                    viewer.draw_segment(
                        track.point(i as isize - 1).position,
                        track.point(i as isize).position,
                        1.0,
                        color,
                    );
                }
            }
        }

        for (i, modifier) in self.modifiers.iter().enumerate() {
            modifier.draw(&self.tracks[i], &self.hovers[i], viewer);
        }
    }
}
