//! Typed property groups: the editor-facing view of assistant data.
//!
//! The persisted variant map stays the source of truth; a property group
//! is the derived, typed view the property editor binds to. Values are
//! rebuilt from the variant side after each mutation, and writes through
//! a property are pushed back into the variant map by the owning
//! assistant.

/// A typed property value, with range metadata where the editor needs it.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Double { min: f64, max: f64, value: f64 },
    String(String),
    Enum { options: Vec<String>, value: String },
}

/// One named property with its editor label.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    /// Human-readable label, filled by `update_translation`
    pub label: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn bool(name: &str, value: bool) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            value: PropertyValue::Bool(value),
        }
    }

    pub fn double(name: &str, min: f64, max: f64, value: f64) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            value: PropertyValue::Double {
                min,
                max,
                value: value.clamp(min, max),
            },
        }
    }

    pub fn string(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            value: PropertyValue::String(value.to_string()),
        }
    }

    pub fn enumeration(name: &str, options: &[&str], value: &str) -> Self {
        Self {
            name: name.to_string(),
            label: name.to_string(),
            value: PropertyValue::Enum {
                options: options.iter().map(|o| o.to_string()).collect(),
                value: value.to_string(),
            },
        }
    }
}

/// Ordered collection of properties, looked up by name.
#[derive(Debug, Clone, Default)]
pub struct PropertyGroup {
    properties: Vec<Property>,
}

impl PropertyGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, property: Property) {
        self.properties.push(property);
    }

    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    /// Sets the editor label of a property, if it exists.
    pub fn set_label(&mut self, name: &str, label: &str) {
        if let Some(property) = self.get_mut(name) {
            property.label = label.to_string();
        }
    }

    pub fn bool_value(&self, name: &str) -> Option<bool> {
        match self.get(name)?.value {
            PropertyValue::Bool(value) => Some(value),
            _ => None,
        }
    }

    pub fn double_value(&self, name: &str) -> Option<f64> {
        match self.get(name)?.value {
            PropertyValue::Double { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn string_value(&self, name: &str) -> Option<&str> {
        match &self.get(name)?.value {
            PropertyValue::String(value) => Some(value),
            PropertyValue::Enum { value, .. } => Some(value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_properties_clamp_to_their_range() {
        let p = Property::double("magnetism", 0.0, 1.0, 1.7);
        assert_eq!(
            p.value,
            PropertyValue::Double {
                min: 0.0,
                max: 1.0,
                value: 1.0
            }
        );
    }

    #[test]
    fn group_lookup_and_labels() {
        let mut group = PropertyGroup::new();
        group.add(Property::bool("enabled", true));
        group.add(Property::double("magnetism", 0.0, 1.0, 0.5));

        assert_eq!(group.bool_value("enabled"), Some(true));
        assert_eq!(group.double_value("magnetism"), Some(0.5));
        assert_eq!(group.bool_value("magnetism"), None);
        assert!(group.get("missing").is_none());

        group.set_label("enabled", "Enabled");
        assert_eq!(group.get("enabled").unwrap().label, "Enabled");
    }
}
