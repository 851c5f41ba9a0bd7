//! Persistence of assistant metadata.
//!
//! Assistants are stored as a versioned JSON file. Saving writes to a
//! temp file in the same directory and renames over the target, keeping
//! the previous contents in a `.bak` alongside. Loading skips entries it
//! cannot reconstruct (unknown type, malformed data) with a warning
//! rather than failing the whole file.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::base::Assistant;
use super::registry::AssistantRegistry;

const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct AssistantFile {
    version: u32,
    last_modified: String,
    assistants: Vec<serde_json::Value>,
}

/// Saves all assistants to `path`.
pub fn save_assistants(path: &Path, assistants: &[Assistant]) -> Result<()> {
    let file = AssistantFile {
        version: CURRENT_VERSION,
        last_modified: Utc::now().to_rfc3339(),
        assistants: assistants.iter().map(Assistant::to_data).collect(),
    };
    let contents = serde_json::to_string_pretty(&file).context("Failed to serialize assistants")?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    if path.exists() {
        let backup = path.with_extension("json.bak");
        if let Err(err) = fs::copy(path, &backup) {
            warn!("Could not write backup {}: {}", backup.display(), err);
        }
    }

    let temp = path.with_extension("json.tmp");
    fs::write(&temp, contents)
        .with_context(|| format!("Failed to write {}", temp.display()))?;
    fs::rename(&temp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;

    info!("Saved {} assistants to {}", assistants.len(), path.display());
    Ok(())
}

/// Loads assistants from `path`, reconstructing each entry through the
/// registry. Entries that fail to reconstruct are skipped with a
/// warning.
pub fn load_assistants(path: &Path, registry: &AssistantRegistry) -> Result<Vec<Assistant>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: AssistantFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if file.version > CURRENT_VERSION {
        warn!(
            "Assistant file {} has version {} (newer than supported {})",
            path.display(),
            file.version,
            CURRENT_VERSION
        );
    }

    let mut assistants = Vec::new();
    for entry in &file.assistants {
        match registry.from_data(entry) {
            Ok(assistant) => assistants.push(assistant),
            Err(err) => warn!("Skipping assistant entry: {}", err),
        }
    }
    debug!(
        "Loaded {} assistants from {} (last modified {})",
        assistants.len(),
        path.display(),
        file.last_modified
    );
    Ok(assistants)
}
