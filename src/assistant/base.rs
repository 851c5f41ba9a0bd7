//! The assistant object: handles, variant data, and its property view.
//!
//! An assistant owns two representations of the same state: the variant
//! map (persisted, source of truth) and a typed property group (bound to
//! the property editor). Writes on either side propagate to the other
//! through `set_data_field` / `property_changed`, with an in-flight
//! guard breaking the ping-pong.

use serde_json::{json, Value};
use std::cell::Cell;
use std::rc::Rc;

use super::guideline::GuidelineList;
use super::point::AssistantPoint;
use super::properties::{Property, PropertyGroup, PropertyValue};
use super::types::AssistantVariant;
use super::{data_bool, VariantMap};
use crate::draw::{Color, Viewer};
use crate::util::{Affine, Point};

pub const KEY_TYPE: &str = "type";
pub const KEY_POINTS: &str = "points";
pub const KEY_ENABLED: &str = "enabled";
pub const KEY_MAGNETISM: &str = "magnetism";
const KEY_X: &str = "x";
const KEY_Y: &str = "y";

/// Scoped re-entrancy lock for property/data propagation. Acquiring
/// fails while another propagation is in flight; dropping the token
/// releases the lock on every exit path.
struct EventsLock {
    locked: Rc<Cell<bool>>,
}

impl EventsLock {
    fn acquire(flag: &Rc<Cell<bool>>) -> Option<Self> {
        if flag.get() {
            return None;
        }
        flag.set(true);
        Some(Self {
            locked: flag.clone(),
        })
    }
}

impl Drop for EventsLock {
    fn drop(&mut self) {
        self.locked.set(false);
    }
}

/// A document-level guide producer with editable control handles.
pub struct Assistant {
    type_name: &'static str,
    variant: AssistantVariant,
    data: VariantMap,
    properties: PropertyGroup,
    points: Vec<AssistantPoint>,
    /// In-flight re-entrancy lock for property/data propagation
    events_locked: Rc<Cell<bool>>,
}

impl Assistant {
    pub(crate) fn new(
        type_name: &'static str,
        variant: AssistantVariant,
        point_radius: f64,
    ) -> Self {
        let points = variant.default_points(point_radius);
        let mut properties = PropertyGroup::new();
        properties.add(Property::bool(KEY_ENABLED, true));
        properties.add(Property::double(KEY_MAGNETISM, 0.0, 1.0, 1.0));
        variant.declare_properties(&mut properties);

        let mut assistant = Self {
            type_name,
            variant,
            data: VariantMap::new(),
            properties,
            points,
            events_locked: Rc::new(Cell::new(false)),
        };
        assistant.fix_data();
        assistant.update_translation();
        assistant
    }

    /// Stable type id used by the registry and in persisted data.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Human-readable type name.
    pub fn local_name(&self) -> &'static str {
        self.variant.local_name()
    }

    pub fn points(&self) -> &[AssistantPoint] {
        &self.points
    }

    pub fn points_count(&self) -> usize {
        self.points.len()
    }

    pub fn properties(&self) -> &PropertyGroup {
        &self.properties
    }

    /// Mutable property access for the editor; follow writes with
    /// [`Assistant::property_changed`].
    pub fn properties_mut(&mut self) -> &mut PropertyGroup {
        &mut self.properties
    }

    /// The persisted variant map (without the type tag).
    pub fn data(&self) -> &VariantMap {
        &self.data
    }

    pub fn enabled(&self) -> bool {
        data_bool(&self.data, KEY_ENABLED, true)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.set_data_field(KEY_ENABLED, Value::Bool(enabled));
    }

    pub fn magnetism(&self) -> f64 {
        self.data
            .get(KEY_MAGNETISM)
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    pub fn set_magnetism(&mut self, magnetism: f64) {
        self.set_data_field(KEY_MAGNETISM, json!(magnetism.clamp(0.0, 1.0)));
    }

    pub fn set_point_selection(&mut self, index: usize, selected: bool) {
        if let Some(point) = self.points.get_mut(index) {
            point.selected = selected;
        }
    }

    pub fn select_all(&mut self) {
        for point in &mut self.points {
            point.selected = true;
        }
    }

    pub fn deselect_all(&mut self) {
        for point in &mut self.points {
            point.selected = false;
        }
    }

    /// Moves a control handle through the subtype hook, which may clamp
    /// or reproject it. Out-of-range indices are silently ignored.
    pub fn move_point(&mut self, index: usize, position: Point) {
        if index >= self.points.len() {
            log::debug!(
                "move_point index {} out of range for '{}'",
                index,
                self.type_name
            );
            return;
        }
        self.variant.on_move_point(&mut self.points, index, position);
        self.fix_data();
    }

    /// Re-validates all handles after external mutation.
    pub fn fix_points(&mut self) {
        self.variant.on_fix_points(&mut self.points);
    }

    /// Appends all candidate guidelines this assistant produces near
    /// `pivot` in tool space. Pure.
    pub fn guidelines(&self, pivot: Point, to_tool: &Affine, out: &mut GuidelineList) {
        self.variant
            .guidelines(&self.points, &self.data, pivot, to_tool, out);
    }

    /// Fills editor labels for all properties.
    pub fn update_translation(&mut self) {
        self.properties.set_label(KEY_ENABLED, "Enabled");
        self.properties.set_label(KEY_MAGNETISM, "Magnetism");
        self.variant.update_translation(&mut self.properties);
    }

    // ------------------------------------------------------------------
    // Property/data propagation
    // ------------------------------------------------------------------

    /// Pushes a property value into the variant map after an editor
    /// write. Blocked while a data-side change is in flight.
    pub fn property_changed(&mut self, name: &str) {
        let Some(_lock) = EventsLock::acquire(&self.events_locked) else {
            return;
        };
        self.on_property_changed(name);
    }

    fn on_property_changed(&mut self, name: &str) {
        if name == KEY_POINTS {
            return;
        }
        let Some(property) = self.properties.get(name) else {
            return;
        };
        let value = property_to_value(&property.value);
        self.data.insert(name.to_string(), value);
    }

    /// Writes one field of the variant map and refreshes the derived
    /// state. Blocked while a property-side change is in flight.
    pub fn set_data_field(&mut self, name: &str, value: Value) {
        let Some(_lock) = EventsLock::acquire(&self.events_locked) else {
            return;
        };
        self.data.insert(name.to_string(), value.clone());
        if name == KEY_POINTS {
            self.load_points_from_data();
            self.fix_points();
            self.fix_data();
        } else {
            self.update_property(name, &value);
        }
    }

    /// Replaces the whole variant map (used on load) and rebuilds the
    /// derived state, clamping as needed.
    pub(crate) fn apply_data(&mut self, mut data: VariantMap) {
        let Some(_lock) = EventsLock::acquire(&self.events_locked) else {
            return;
        };
        data.remove(KEY_TYPE);
        self.data = data;
        self.load_points_from_data();
        self.fix_points();
        self.update_properties();
        self.fix_data();
    }

    fn load_points_from_data(&mut self) {
        let Some(Value::Array(entries)) = self.data.get(KEY_POINTS) else {
            return;
        };
        let positions: Vec<Option<Point>> = entries
            .iter()
            .take(self.points.len())
            .map(|entry| {
                let map = entry.as_object()?;
                let x = map.get(KEY_X).and_then(Value::as_f64)?;
                let y = map.get(KEY_Y).and_then(Value::as_f64)?;
                Some(Point::new(x, y))
            })
            .collect();
        for (point, position) in self.points.iter_mut().zip(positions) {
            if let Some(position) = position {
                point.position = position;
            }
        }
    }

    /// Reloads every non-point property from the variant map.
    fn update_properties(&mut self) {
        let fields: Vec<(String, Value)> = self
            .data
            .iter()
            .filter(|(name, _)| name.as_str() != KEY_POINTS)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, value) in fields {
            self.update_property(&name, &value);
        }
    }

    /// Loads one property from a variant value. A value whose shape
    /// disagrees with the property type leaves the property unchanged.
    fn update_property(&mut self, name: &str, value: &Value) {
        let Some(property) = self.properties.get_mut(name) else {
            return;
        };
        match (&mut property.value, value) {
            (PropertyValue::Bool(target), Value::Bool(v)) => *target = *v,
            (PropertyValue::Double { min, max, value: target }, Value::Number(n)) => {
                if let Some(n) = n.as_f64() {
                    let clamped = n.clamp(*min, *max);
                    if clamped != n {
                        log::warn!("Value {} for '{}' out of range, clamped", n, name);
                    }
                    *target = clamped;
                }
            }
            (PropertyValue::String(target), Value::String(v)) => *target = v.clone(),
            (PropertyValue::Enum { options, value: target }, Value::String(v)) => {
                if options.contains(v) {
                    *target = v.clone();
                }
            }
            _ => {}
        }
    }

    /// Writes handles and property values back into the variant map,
    /// clamping `magnetism` into its range.
    pub fn fix_data(&mut self) {
        let entries: Vec<Value> = self
            .points
            .iter()
            .map(|p| json!({ KEY_X: p.position.x, KEY_Y: p.position.y }))
            .collect();
        self.data
            .insert(KEY_POINTS.to_string(), Value::Array(entries));

        let values: Vec<(String, Value)> = self
            .properties
            .iter()
            .map(|p| (p.name.clone(), property_to_value(&p.value)))
            .collect();
        for (name, value) in values {
            self.data.insert(name, value);
        }
    }

    /// The persisted form, including the type tag.
    pub fn to_data(&self) -> Value {
        let mut map = self.data.clone();
        map.insert(KEY_TYPE.to_string(), Value::String(self.type_name.to_string()));
        Value::Object(map)
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    /// Passive overlay (the guide itself, no handles).
    pub fn draw(&self, viewer: &mut dyn Viewer) {
        self.variant.draw(&self.points, viewer);
    }

    /// Edit overlay: the guide plus every control handle in its visual
    /// convention.
    pub fn draw_edit(&self, viewer: &mut dyn Viewer) {
        self.draw(viewer);
        for point in &self.points {
            draw_point(point, viewer);
        }
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("type_name", &self.type_name)
            .field("enabled", &self.enabled())
            .field("magnetism", &self.magnetism())
            .field("points", &self.points.len())
            .finish()
    }
}

fn property_to_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Bool(v) => Value::Bool(*v),
        PropertyValue::Double { value, .. } => json!(value),
        PropertyValue::String(v) => Value::String(v.clone()),
        PropertyValue::Enum { value, .. } => Value::String(value.clone()),
    }
}

/// Draws one control handle: a gray fill for the disk variant, a
/// crosshair for the cross variant, and a white-under-black outline pair
/// for contrast. Selected handles draw wider and tinted.
fn draw_point(point: &AssistantPoint, viewer: &mut dyn Viewer) {
    let pixel_size = viewer.pixel_size();
    let radius = point.radius * pixel_size;
    let cross = 1.2 * radius;

    let mut black = Color::new(0.0, 0.0, 0.0, 0.5);
    let mut gray = Color::new(0.5, 0.5, 0.5, 0.5);
    let white = Color::new(1.0, 1.0, 1.0, 0.5);
    let mut width: f64 = 0.5;
    if point.selected {
        black.b = 1.0;
        gray.b = 1.0;
        width = 2.0;
    }

    if point.kind == super::point::PointKind::CircleFill {
        viewer.draw_disk(point.position, radius, gray);
    }

    let dx = Point::new(cross, 0.0);
    let dy = Point::new(0.0, cross);
    let back_width = 2.0 * width.max(1.0);

    if point.kind == super::point::PointKind::CircleCross {
        viewer.draw_segment(point.position - dx, point.position + dx, back_width, white);
        viewer.draw_segment(point.position - dy, point.position + dy, back_width, white);
    }
    viewer.draw_circle(point.position, radius, back_width, white);

    if point.kind == super::point::PointKind::CircleCross {
        viewer.draw_segment(point.position - dx, point.position + dx, width, black);
        viewer.draw_segment(point.position - dy, point.position + dy, width, black);
    }
    viewer.draw_circle(point.position, radius, width, black);
}
