//! Assistants and guidelines: snap-candidate generation and scoring.
//!
//! Assistants are document-owned objects (straightedges, vanishing
//! points, ellipse guides) that produce [`guideline::Guideline`] snap
//! candidates for a stroke. The [`snap::SnapModifier`] queries them
//! during pipeline passes and scores the live track against the
//! candidates to pick a snap target.

pub mod base;
pub mod guideline;
pub mod point;
pub mod properties;
pub mod registry;
pub mod snap;
pub mod storage;
pub mod types;

// Re-export commonly used types at module level
pub use base::Assistant;
pub use guideline::{find_best, BestMatch, Guideline, GuidelineList, GuidelineRef};
pub use point::{AssistantPoint, PointKind};
pub use properties::{Property, PropertyGroup, PropertyValue};
pub use registry::{AssistantRegistry, AssistantType, RegistryError};
pub use snap::{AssistantList, SnapModifier};
pub use storage::{load_assistants, save_assistants};
pub use types::AssistantVariant;

/// The persisted variant form of an assistant: a JSON object map.
pub type VariantMap = serde_json::Map<String, serde_json::Value>;

pub(crate) fn data_bool(data: &VariantMap, name: &str, default: bool) -> bool {
    data.get(name)
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests;
