use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{DataError, DataResult, DifferenceOptions, S1pOptions};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// User-adjustable settings. Every key is optional in the JSON file.
///
/// ```json
/// {
///   "s1p": { "instrument_keywords": ["keysight", "anritsu"] },
///   "difference": { "grid_points": 2001 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub s1p: S1pOptions,
    pub difference: DifferenceOptions,
}

impl Settings {
    pub fn from_json_str(text: &str) -> DataResult<Self> {
        let settings: Settings = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from `path`, or fall back to defaults when no file is given or
    /// the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> DataResult<Self> {
        let Some(path) = path else {
            return Ok(Settings::default());
        };
        if !path.exists() {
            log::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Settings::default());
        }
        let text = std::fs::read_to_string(path)?;
        let settings = Settings::from_json_str(&text)?;
        log::debug!("Loaded settings from {}: {settings:?}", path.display());
        Ok(settings)
    }

    fn validate(&self) -> DataResult<()> {
        if self.difference.grid_points < 2 {
            return Err(DataError::InvalidFormat {
                format: "config",
                message: format!(
                    "difference.grid_points must be at least 2, got {}",
                    self.difference.grid_points
                ),
            });
        }
        Ok(())
    }
}
