//! Tracker configuration.

use crate::error::{Result, TrackerError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Sheet tab rows are appended to when none is configured.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

/// File store configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the snapshot.
    pub path: PathBuf,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./salestally"),
            create_if_missing: true,
        }
    }
}

/// Spreadsheet the export appends to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

impl Default for SheetTarget {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
        }
    }
}

impl SheetTarget {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            ..Default::default()
        }
    }

    /// Check the target can be exported to.
    pub fn validate(&self) -> Result<()> {
        if self.spreadsheet_id.trim().is_empty() {
            return Err(TrackerError::Config("spreadsheet_id is not set".into()));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(TrackerError::Config("sheet_name is empty".into()));
        }
        Ok(())
    }
}

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub store: StoreConfig,

    pub sheet: SheetTarget,

    /// Buffered events per subscriber before it is dropped.
    /// Default: 64
    pub event_buffer: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sheet: SheetTarget::default(),
            event_buffer: 64,
        }
    }
}

impl TrackerConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|e| {
            TrackerError::Config(format!("{}: {}", path.as_ref().display(), e))
        })
    }
}
