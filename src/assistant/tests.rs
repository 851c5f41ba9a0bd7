//! Assistant, guideline, registry, and storage tests.

use serde_json::{json, Value};

use super::guideline::{
    find_best, Guideline, GuidelineEllipse, GuidelineInfiniteLine, GuidelineLine, GuidelineRay,
    GuidelineRef,
};
use super::registry::{AssistantRegistry, RegistryError};
use super::types::line::{RESTRICT_A, RESTRICT_B};
use super::{load_assistants, save_assistants};
use crate::config::SnapConfig;
use crate::input::state::{DeviceId, InputState, TouchId};
use crate::input::track::{Track, TrackPoint};
use crate::util::{Affine, Point, EPSILON};
use std::rc::Rc;

fn track_with_points(points: &[(f64, f64)]) -> Track {
    let mut state = InputState::new();
    let mut track = Track::new(
        DeviceId(1),
        TouchId(1),
        state.key_holder(0, 0.001),
        state.button_holder(DeviceId(1), 0, 0.001),
        false,
        false,
    );
    for (i, (x, y)) in points.iter().enumerate() {
        track.push_back(TrackPoint {
            position: Point::new(*x, *y),
            original_index: i as f64,
            time: i as f64 * 0.01,
            ..TrackPoint::default()
        });
    }
    track
}

fn x_axis() -> GuidelineRef {
    Rc::new(GuidelineInfiniteLine {
        p0: Point::ZERO,
        p1: Point::new(1.0, 0.0),
    })
}

fn y_axis() -> GuidelineRef {
    Rc::new(GuidelineInfiniteLine {
        p0: Point::ZERO,
        p1: Point::new(0.0, 1.0),
    })
}

// ----------------------------------------------------------------------
// Guideline projection
// ----------------------------------------------------------------------

#[test]
fn line_projections_respect_their_clamping() {
    let point = TrackPoint {
        position: Point::new(-3.0, 4.0),
        pressure: 0.7,
        time: 1.5,
        ..TrackPoint::default()
    };

    let infinite = GuidelineInfiniteLine {
        p0: Point::ZERO,
        p1: Point::new(1.0, 0.0),
    };
    let projected = infinite.transform_point(&point);
    assert_eq!(projected.position, Point::new(-3.0, 0.0));
    // only the position moves
    assert_eq!(projected.pressure, 0.7);
    assert_eq!(projected.time, 1.5);

    let ray = GuidelineRay {
        p0: Point::ZERO,
        p1: Point::new(1.0, 0.0),
    };
    assert_eq!(ray.transform_point(&point).position, Point::ZERO);

    let segment = GuidelineLine {
        p0: Point::new(1.0, 0.0),
        p1: Point::new(2.0, 0.0),
    };
    assert_eq!(
        segment.transform_point(&point).position,
        Point::new(1.0, 0.0)
    );
}

#[test]
fn ellipse_projection_lands_on_the_outline() {
    let ellipse = GuidelineEllipse {
        center: Point::ZERO,
        axis_x: Point::new(10.0, 0.0),
        axis_y: Point::new(0.0, 5.0),
    };
    let point = TrackPoint {
        position: Point::new(0.0, 99.0),
        ..TrackPoint::default()
    };
    let projected = ellipse.transform_point(&point).position;
    assert!(projected.distance(Point::new(0.0, 5.0)) < 1e-9);

    // a circle projects radially
    let circle = GuidelineEllipse {
        center: Point::ZERO,
        axis_x: Point::new(2.0, 0.0),
        axis_y: Point::new(0.0, 2.0),
    };
    let p = TrackPoint {
        position: Point::new(3.0, 3.0),
        ..TrackPoint::default()
    };
    let q = circle.transform_point(&p).position;
    assert!((q.norm() - 2.0).abs() < 1e-9);
    assert!((q.x - q.y).abs() < 1e-9);
}

// ----------------------------------------------------------------------
// Scoring and selection
// ----------------------------------------------------------------------

#[test]
fn scoring_needs_at_least_two_points() {
    let snap = SnapConfig::default();
    let track = track_with_points(&[(0.0, 0.0)]);
    let (weight, long_enough) = x_axis().calc_track_weight(&track, &Affine::IDENTITY, &snap);
    assert!(weight.is_infinite());
    assert!(!long_enough);
}

#[test]
fn near_axis_wiggle_scores_low_and_is_selected() {
    let snap = SnapConfig::default();
    let points: Vec<(f64, f64)> = (0..20)
        .map(|i| (3.0 * i as f64, (i as f64).sin() * 0.01))
        .collect();
    let track = track_with_points(&points);

    let guidelines = vec![y_axis(), x_axis()];
    let best = find_best(&guidelines, &track, &Affine::IDENTITY, &snap);

    // the stroke hugs the x axis; deviation stays on the order of the
    // wiggle amplitude
    assert_eq!(best.index, Some(1));
    assert!(best.weight > 0.0);
    assert!(best.weight < 0.05);
    // arc length exceeds twice the snap length, enough to commit
    assert!(best.long_enough);
}

#[test]
fn find_best_minimizes_and_first_wins_ties() {
    let snap = SnapConfig::default();
    let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 0.0)).collect();
    let track = track_with_points(&points);

    let guidelines = vec![x_axis(), x_axis(), y_axis()];
    let best = find_best(&guidelines, &track, &Affine::IDENTITY, &snap);
    assert_eq!(best.index, Some(0));

    let weights: Vec<f64> = guidelines
        .iter()
        .map(|g| g.calc_track_weight(&track, &Affine::IDENTITY, &snap).0)
        .collect();
    let min = weights.iter().cloned().fold(f64::INFINITY, f64::min);
    assert_eq!(best.weight, min);
}

#[test]
fn short_strokes_are_not_long_enough() {
    let snap = SnapConfig::default();
    // total screen arc length 9, well under the 40-unit window
    let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 0.0)).collect();
    let track = track_with_points(&points);
    let (_, long_enough) = x_axis().calc_track_weight(&track, &Affine::IDENTITY, &snap);
    assert!(!long_enough);

    // the screen transform decides, not tool space
    let (_, long_enough) = x_axis().calc_track_weight(&track, &Affine::scale(5.0), &snap);
    assert!(long_enough);
}

// ----------------------------------------------------------------------
// Assistants
// ----------------------------------------------------------------------

#[test]
fn new_assistants_get_sensible_defaults() {
    let registry = AssistantRegistry::built_in();
    let assistant = registry.create("line").unwrap();
    assert!(assistant.enabled());
    assert_eq!(assistant.magnetism(), 1.0);
    assert_eq!(assistant.points_count(), 2);
    assert_eq!(assistant.local_name(), "Line");
    assert_eq!(assistant.properties().bool_value(RESTRICT_A), Some(false));
    assert_eq!(assistant.properties().bool_value(RESTRICT_B), Some(false));
}

#[test]
fn registry_resolves_aliases_and_rejects_unknown_types() {
    let registry = AssistantRegistry::built_in();
    assert_eq!(
        registry.create("assistantLine").unwrap().type_name(),
        "line"
    );
    assert_eq!(
        registry
            .create("assistantVanishingPoint")
            .unwrap()
            .type_name(),
        "vanishing_point"
    );
    assert_eq!(
        registry.create("nope").unwrap_err(),
        RegistryError::UnknownType("nope".to_string())
    );
}

#[test]
fn property_round_trip_is_byte_identical() {
    let registry = AssistantRegistry::built_in();
    let mut assistant = registry.create("line").unwrap();
    assistant.move_point(0, Point::new(1.0, 2.0));
    assistant.move_point(1, Point::new(3.0, 4.0));
    assistant.set_magnetism(0.5);

    let data = assistant.to_data();
    let reloaded = registry.from_data(&data).unwrap();

    assert_eq!(reloaded.to_data(), data);
    assert_eq!(reloaded.magnetism(), 0.5);
    assert_eq!(
        reloaded.properties().double_value("magnetism"),
        Some(0.5)
    );
    assert_eq!(reloaded.points()[0].position, Point::new(1.0, 2.0));
    assert_eq!(reloaded.points()[1].position, Point::new(3.0, 4.0));
}

#[test]
fn out_of_range_magnetism_clamps_on_load() {
    let registry = AssistantRegistry::built_in();
    let assistant = registry.create("line").unwrap();
    let mut data = assistant.to_data();
    data["magnetism"] = json!(1.7);

    let reloaded = registry.from_data(&data).unwrap();
    assert_eq!(reloaded.magnetism(), 1.0);
    assert_eq!(reloaded.properties().double_value("magnetism"), Some(1.0));
}

#[test]
fn mismatched_variant_shapes_leave_properties_unchanged() {
    let registry = AssistantRegistry::built_in();
    let mut assistant = registry.create("line").unwrap();
    assistant.set_data_field("restrict_a", json!("not a bool"));
    assert_eq!(assistant.properties().bool_value(RESTRICT_A), Some(false));
}

#[test]
fn move_point_ignores_out_of_range_indices() {
    let registry = AssistantRegistry::built_in();
    let mut assistant = registry.create("line").unwrap();
    let before = assistant.points()[0].position;
    assistant.move_point(7, Point::new(100.0, 100.0));
    assert_eq!(assistant.points()[0].position, before);
}

#[test]
fn line_restriction_flags_change_the_guideline() {
    let registry = AssistantRegistry::built_in();
    let mut assistant = registry.create("line").unwrap();
    assistant.move_point(0, Point::ZERO);
    assistant.move_point(1, Point::new(10.0, 0.0));

    let probe = TrackPoint {
        position: Point::new(-5.0, 3.0),
        ..TrackPoint::default()
    };

    let mut guides = Vec::new();
    assistant.guidelines(Point::ZERO, &Affine::IDENTITY, &mut guides);
    assert_eq!(guides.len(), 1);
    assert_eq!(
        guides[0].transform_point(&probe).position,
        Point::new(-5.0, 0.0)
    );

    assistant.set_data_field(RESTRICT_A, json!(true));
    let mut guides = Vec::new();
    assistant.guidelines(Point::ZERO, &Affine::IDENTITY, &mut guides);
    assert_eq!(guides[0].transform_point(&probe).position, Point::ZERO);
}

#[test]
fn vanishing_point_produces_a_ray_through_the_pivot() {
    let registry = AssistantRegistry::built_in();
    let assistant = registry.create("vanishing_point").unwrap();

    let mut guides = Vec::new();
    assistant.guidelines(Point::new(10.0, 0.0), &Affine::IDENTITY, &mut guides);
    assert_eq!(guides.len(), 1);

    // projecting behind the vanishing point clamps onto it
    let behind = TrackPoint {
        position: Point::new(-5.0, 1.0),
        ..TrackPoint::default()
    };
    assert_eq!(guides[0].transform_point(&behind).position, Point::ZERO);

    // a pivot on the vanishing point yields no guide
    let mut guides = Vec::new();
    assistant.guidelines(Point::ZERO, &Affine::IDENTITY, &mut guides);
    assert!(guides.is_empty());
}

#[test]
fn ellipse_handles_stay_orthogonal() {
    let registry = AssistantRegistry::built_in();
    let mut assistant = registry.create("ellipse").unwrap();

    // rotate the first axis; the second reprojects perpendicular
    assistant.move_point(1, Point::new(0.0, 100.0));
    let center = assistant.points()[0].position;
    let axis_x = assistant.points()[1].position - center;
    let axis_y = assistant.points()[2].position - center;
    assert!(axis_x.dot(axis_y).abs() < EPSILON);
    assert!((axis_y.norm() - 50.0).abs() < 1e-9);

    // moving the center translates every handle
    assistant.move_point(0, Point::new(10.0, 10.0));
    assert_eq!(assistant.points()[0].position, Point::new(10.0, 10.0));
    let moved_axis_x = assistant.points()[1].position - assistant.points()[0].position;
    assert_eq!(moved_axis_x, axis_x);
}

// ----------------------------------------------------------------------
// Storage
// ----------------------------------------------------------------------

#[test]
fn storage_round_trips_assistants() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assistants.json");
    let registry = AssistantRegistry::built_in();

    let mut line = registry.create("line").unwrap();
    line.set_magnetism(0.25);
    let ellipse = registry.create("ellipse").unwrap();

    save_assistants(&path, &[line, ellipse]).unwrap();
    let loaded = load_assistants(&path, &registry).unwrap();

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].type_name(), "line");
    assert_eq!(loaded[0].magnetism(), 0.25);
    assert_eq!(loaded[1].type_name(), "ellipse");

    // saving again keeps a backup of the previous contents
    save_assistants(&path, &loaded).unwrap();
    assert!(path.with_extension("json.bak").exists());
}

#[test]
fn storage_skips_unknown_entries_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assistants.json");
    let registry = AssistantRegistry::built_in();

    let good = registry.create("line").unwrap().to_data();
    let file = json!({
        "version": 1,
        "last_modified": "2024-01-01T00:00:00Z",
        "assistants": [good, {"type": "hexagon"}, 42],
    });
    std::fs::write(&path, serde_json::to_string(&file).unwrap()).unwrap();

    let loaded = load_assistants(&path, &registry).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].type_name(), "line");
}

#[test]
fn loading_a_missing_file_is_an_error() {
    let registry = AssistantRegistry::built_in();
    assert!(load_assistants(std::path::Path::new("/nonexistent/a.json"), &registry).is_err());
}

// ----------------------------------------------------------------------
// Data/property ping-pong guard
// ----------------------------------------------------------------------

#[test]
fn property_writes_propagate_into_data() {
    let registry = AssistantRegistry::built_in();
    let mut assistant = registry.create("line").unwrap();

    if let Some(property) = assistant.properties_mut().get_mut(RESTRICT_B) {
        property.value = super::properties::PropertyValue::Bool(true);
    }
    assistant.property_changed(RESTRICT_B);

    assert_eq!(assistant.data().get(RESTRICT_B), Some(&Value::Bool(true)));
    assert_eq!(assistant.properties().bool_value(RESTRICT_B), Some(true));
}
