//! Sync configuration

use chatify_store::StoreLayout;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Default chat list time label, e.g. `09:41 PM`
pub const DEFAULT_TIME_LABEL_FORMAT: &str = "%I:%M %p";

/// Configuration shared by all sync components
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Where records live in the backend tree
    pub layout: StoreLayout,

    /// `chrono` format string for the chat list time label (local time)
    pub time_label_format: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            layout: StoreLayout::default(),
            time_label_format: DEFAULT_TIME_LABEL_FORMAT.to_string(),
        }
    }
}

impl SyncConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, SyncError> {
        Ok(toml::from_str(source)?)
    }
}
