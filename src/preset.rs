//! Named size presets.
//!
//! Presets are read once at startup from a JSON file holding an ordered list
//! of records:
//!
//! ```json
//! [
//!   { "name": "thumb", "width": 100, "height": 0 },
//!   { "name": "banner", "width": 1200, "height": 400 }
//! ]
//! ```
//!
//! A zero dimension means "derive this axis from the other one, keeping the
//! source aspect ratio". A preset with both dimensions zero is rejected, as is
//! a preset without a name; either failure rejects the whole file.
//!
//! Duplicate names are accepted. Lookup returns the first record with the
//! requested name, and a warning is logged at load time for each shadowed
//! record.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum PresetError {
    #[error("IO error reading presets file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Preset validation error: {0}")]
    Validation(String),
}

/// A named target size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

impl Preset {
    fn validate(&self) -> Result<(), PresetError> {
        if self.name.is_empty() {
            return Err(PresetError::Validation(format!(
                "preset must have a name, got {self}"
            )));
        }
        if self.width == 0 && self.height == 0 {
            return Err(PresetError::Validation(format!(
                "preset must set at least one of width or height, got {self}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name: {:?}, width: {}, height: {}",
            self.name, self.width, self.height
        )
    }
}

/// Read-only collection of presets, shared by every request.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: Vec<Preset>,
}

impl PresetRegistry {
    /// Build a registry from already-parsed records, validating each.
    pub fn new(presets: Vec<Preset>) -> Result<Self, PresetError> {
        for preset in &presets {
            preset.validate()?;
        }

        let mut seen = HashSet::new();
        for preset in &presets {
            if !seen.insert(preset.name.as_str()) {
                warn!(preset = %preset.name, "Duplicate preset name, the first definition wins");
            }
        }

        Ok(Self { presets })
    }

    /// Parse a registry from JSON text.
    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        let presets: Vec<Preset> = serde_json::from_str(json)?;
        Self::new(presets)
    }

    /// Load a registry from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PresetError> {
        let content = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Exact, case-sensitive lookup. The first matching record wins.
    pub fn find(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}
