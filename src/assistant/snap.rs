//! The snapping stage of the input pipeline.
//!
//! For each raw stroke the modifier collects candidate guidelines from
//! every enabled assistant near the stroke's first point. While the
//! stroke is shorter than the scoring window its output stays tentative:
//! the modifier keeps the stroke's first save point held and projects
//! new points onto the current best candidate, so the live preview is
//! already snapped while everything it publishes remains rollbackable.
//! Once the stroke is long enough (or ends early) the best candidate
//! wins, the whole output is republished snapped to the winner, and the
//! save point is released, letting the manager roll the tool back and
//! commit the snapped stroke.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::base::Assistant;
use super::guideline::{find_best, GuidelineList, GuidelineRef};
use crate::config::SnapConfig;
use crate::draw::Viewer;
use crate::input::modifier::{InputModifier, TrackList};
use crate::input::save_point::{SavePointHolder, SavePointRef};
use crate::input::track::{Track, TrackId, TrackModifier, TrackPoint, TrackRef};
use crate::util::{lerp_point, Affine, Point, EPSILON};

/// Shared, document-owned assistant list. The modifier borrows it
/// read-only during each pass.
pub type AssistantList = Rc<RefCell<Vec<Assistant>>>;

struct Candidate {
    guideline: GuidelineRef,
    magnetism: f64,
}

/// Track modifier realizing the snap as a point transformation, so
/// `calc_point` on the derived track reflects the chosen guideline.
struct SnapTrackModifier {
    original: TrackRef,
    chosen: RefCell<Option<(GuidelineRef, f64)>>,
}

impl SnapTrackModifier {
    fn snap(&self, mut point: TrackPoint) -> TrackPoint {
        if let Some((guideline, magnetism)) = &*self.chosen.borrow() {
            let projected = guideline.transform_point(&point);
            point.position = lerp_point(point.position, projected.position, *magnetism);
        }
        point
    }
}

impl TrackModifier for SnapTrackModifier {
    fn original(&self) -> &TrackRef {
        &self.original
    }

    fn calc_point(&self, original_index: f64) -> TrackPoint {
        let mut point = self.original.borrow().interpolate_linear(original_index);
        point.original_index = original_index;
        self.snap(point)
    }
}

struct SnapState {
    candidates: Vec<Candidate>,
    modifier: Rc<SnapTrackModifier>,
    out: TrackRef,
    /// Holds the stroke's first save point while the output is tentative
    holder: Option<SavePointHolder>,
    /// The first pass publishes an empty output under a held save point,
    /// so every later point stays rollbackable
    primed: bool,
    decided: bool,
    chosen_index: Option<usize>,
    /// No candidates: the input track passes through untouched
    passthrough: bool,
}

/// Assistant-driven pipeline stage producing snapped output tracks.
pub struct SnapModifier {
    assistants: AssistantList,
    to_tool: Affine,
    to_screen: Affine,
    snap: SnapConfig,
    states: HashMap<TrackId, SnapState>,
}

impl SnapModifier {
    pub fn new(assistants: AssistantList, snap: SnapConfig) -> Self {
        Self {
            assistants,
            to_tool: Affine::IDENTITY,
            to_screen: Affine::IDENTITY,
            snap,
            states: HashMap::new(),
        }
    }

    /// Updates the document-to-tool and tool-to-screen transforms used
    /// for guideline queries and scoring.
    pub fn set_transforms(&mut self, to_tool: Affine, to_screen: Affine) {
        self.to_tool = to_tool;
        self.to_screen = to_screen;
    }

    fn collect_candidates(&self, pivot: Point) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for assistant in self.assistants.borrow().iter() {
            let magnetism = assistant.magnetism();
            if !assistant.enabled() || magnetism <= EPSILON {
                continue;
            }
            let mut guidelines = GuidelineList::new();
            assistant.guidelines(pivot, &self.to_tool, &mut guidelines);
            candidates.extend(guidelines.into_iter().map(|guideline| Candidate {
                guideline,
                magnetism,
            }));
        }
        candidates
    }

    fn new_state(&self, track: &TrackRef) -> SnapState {
        let pivot = track.borrow().front().position;
        let candidates = self.collect_candidates(pivot);
        let modifier = Rc::new(SnapTrackModifier {
            original: track.clone(),
            chosen: RefCell::new(None),
        });
        let out = Rc::new(RefCell::new(Track::from_modifier(modifier.clone())));
        let passthrough = candidates.is_empty();
        SnapState {
            candidates,
            modifier,
            out,
            holder: None,
            primed: false,
            decided: false,
            chosen_index: None,
            passthrough,
        }
    }
}

impl InputModifier for SnapModifier {
    fn modify_tracks(&mut self, tracks: &TrackList, save_point: &SavePointRef, out: &mut TrackList) {
        let live: HashSet<TrackId> = tracks.iter().map(|t| t.borrow().id).collect();
        self.states.retain(|id, _| live.contains(id));
        for track in tracks {
            self.modify_track(track, save_point, out);
        }
    }

    fn modify_track(&mut self, track: &TrackRef, save_point: &SavePointRef, out_list: &mut TrackList) {
        let id = track.borrow().id;
        if !self.states.contains_key(&id) {
            let state = self.new_state(track);
            self.states.insert(id, state);
        }
        let state = self.states.get_mut(&id).expect("state just ensured");

        if state.passthrough {
            out_list.push(track.clone());
            return;
        }

        let input = track.borrow();
        let mut out = state.out.borrow_mut();

        if state.decided {
            // append the new points snapped to the winner
            for i in out.size()..input.size() {
                let mut point = input.point(i as isize);
                point.original_index = i as f64;
                out.push_back(state.modifier.snap(point));
            }
        } else if !state.primed {
            // stage an empty output under a held save point first, so
            // the whole tentative stroke can be rolled back later
            state.primed = true;
            state.holder = Some(SavePointHolder::new(save_point));
        } else {
            // re-rank the candidates against the stroke so far; the
            // running best projects the tentative preview
            let guidelines: Vec<GuidelineRef> = state
                .candidates
                .iter()
                .map(|c| c.guideline.clone())
                .collect();
            let best = find_best(&guidelines, &input, &self.to_screen, &self.snap);
            if best.weight.is_finite() {
                if let Some(index) = best.index {
                    let candidate = &state.candidates[index];
                    *state.modifier.chosen.borrow_mut() =
                        Some((candidate.guideline.clone(), candidate.magnetism));
                    state.chosen_index = Some(index);
                }
            } else {
                *state.modifier.chosen.borrow_mut() = None;
                state.chosen_index = None;
            }

            for i in out.size()..input.size() {
                let mut point = input.point(i as isize);
                point.original_index = i as f64;
                out.push_back(state.modifier.snap(point));
            }

            if best.long_enough || input.finished() {
                // republish the whole stroke through the winner (or raw
                // when nothing scored) and release the save point
                let size = out.size();
                out.pop_back(size);
                for i in 0..input.size() {
                    let mut point = input.point(i as isize);
                    point.original_index = i as f64;
                    out.push_back(state.modifier.snap(point));
                }
                state.decided = true;
                state.holder = None;
                if let Some(index) = state.chosen_index {
                    log::debug!(
                        "Snap decided for track {} (candidate {}, weight {:.4})",
                        id,
                        index,
                        best.weight
                    );
                }
            }
        }

        drop(out);
        drop(input);
        out_list.push(state.out.clone());
    }

    fn draw(&self, tracks: &TrackList, _hovers: &crate::input::modifier::HoverList, viewer: &mut dyn Viewer) {
        for track in tracks {
            let id = track.borrow().id;
            let Some(state) = self.states.get(&id) else {
                continue;
            };
            for (i, candidate) in state.candidates.iter().enumerate() {
                let active = state.chosen_index == Some(i);
                if active || !state.decided {
                    candidate.guideline.draw(viewer, active);
                }
            }
        }
    }
}
