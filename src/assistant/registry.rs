//! The assistant type registry.
//!
//! Maps stable string ids (plus load-time aliases kept for backward
//! compatibility) to constructors.

use serde_json::Value;
use thiserror::Error;

use super::base::{Assistant, KEY_TYPE};
use super::point::DEFAULT_POINT_RADIUS;
use super::types::{AssistantVariant, EllipseAssistant, LineAssistant, VanishingPointAssistant};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("unknown assistant type `{0}`")]
    UnknownType(String),
    #[error("malformed assistant data: {0}")]
    MalformedData(&'static str),
}

/// One registered assistant type.
pub struct AssistantType {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub construct: fn() -> AssistantVariant,
}

impl AssistantType {
    fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// Registry of assistant types, preloaded with the built-in set.
pub struct AssistantRegistry {
    types: Vec<AssistantType>,
    point_radius: f64,
}

impl Default for AssistantRegistry {
    fn default() -> Self {
        Self::built_in()
    }
}

impl AssistantRegistry {
    /// The built-in types with default handle appearance.
    pub fn built_in() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            point_radius: DEFAULT_POINT_RADIUS,
        };
        registry.register(AssistantType {
            name: LineAssistant::TYPE_NAME,
            aliases: LineAssistant::ALIASES,
            construct: || AssistantVariant::Line(LineAssistant),
        });
        registry.register(AssistantType {
            name: VanishingPointAssistant::TYPE_NAME,
            aliases: VanishingPointAssistant::ALIASES,
            construct: || AssistantVariant::VanishingPoint(VanishingPointAssistant),
        });
        registry.register(AssistantType {
            name: EllipseAssistant::TYPE_NAME,
            aliases: EllipseAssistant::ALIASES,
            construct: || AssistantVariant::Ellipse(EllipseAssistant),
        });
        registry
    }

    /// Built-in types with handle radius taken from the config.
    pub fn with_config(config: &crate::Config) -> Self {
        let mut registry = Self::built_in();
        registry.point_radius = config.assistant.point_radius;
        registry
    }

    pub fn register(&mut self, assistant_type: AssistantType) {
        self.types.push(assistant_type);
    }

    /// Looks up a type by stable id or alias.
    pub fn find(&self, name: &str) -> Option<&AssistantType> {
        self.types.iter().find(|t| t.matches(name))
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.iter().map(|t| t.name)
    }

    /// Creates a fresh assistant of the named type with default state.
    pub fn create(&self, name: &str) -> Result<Assistant, RegistryError> {
        let assistant_type = self
            .find(name)
            .ok_or_else(|| RegistryError::UnknownType(name.to_string()))?;
        Ok(Assistant::new(
            assistant_type.name,
            (assistant_type.construct)(),
            self.point_radius,
        ))
    }

    /// Reconstructs an assistant from its persisted form, clamping
    /// out-of-range values and re-validating handle positions.
    pub fn from_data(&self, data: &Value) -> Result<Assistant, RegistryError> {
        let map = data
            .as_object()
            .ok_or(RegistryError::MalformedData("not an object"))?;
        let type_name = map
            .get(KEY_TYPE)
            .and_then(Value::as_str)
            .ok_or(RegistryError::MalformedData("missing type tag"))?;
        let mut assistant = self.create(type_name)?;
        assistant.apply_data(map.clone());
        Ok(assistant)
    }
}
