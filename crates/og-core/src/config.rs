//! User configuration
//!
//! Settings are a flat list of `{id, value}` booleans persisted by the
//! options page. The content script only reads them; an unset or unknown
//! setting always reads as `false`.

use crate::types::ConfigEntry;

/// Where a storage error was raised, as far as the host could tell us.
/// Every field is optional; missing ones are left out of the log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLocation {
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub stack: Option<String>,
}

impl ErrorLocation {
    /// Base name of the file, `"content/main.js"` -> `"main.js"`.
    pub fn file_name(&self) -> Option<&str> {
        self.file
            .as_deref()
            .map(|file| file.rsplit('/').next().unwrap_or(file))
    }
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{message}")]
    Storage {
        message: String,
        location: ErrorLocation,
    },
    #[error("Malformed config entry at index {index}: {reason}")]
    Malformed { index: usize, reason: String },
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            location: ErrorLocation::default(),
        }
    }

    pub fn location(&self) -> Option<&ErrorLocation> {
        match self {
            Self::Storage { location, .. } => Some(location),
            _ => None,
        }
    }
}

/// The settings loaded for this page.
#[derive(Debug, Clone, Default)]
pub struct Config {
    entries: Option<Vec<ConfigEntry>>,
}

impl Config {
    /// Config that has not been loaded yet. Every lookup reads `false`.
    pub fn unloaded() -> Self {
        Self { entries: None }
    }

    pub fn loaded(entries: Vec<ConfigEntry>) -> Self {
        Self {
            entries: Some(entries),
        }
    }

    /// Parse the persisted JSON form, `[{"id": "...", "value": true}, ...]`.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let values: Vec<serde_json::Value> = serde_json::from_str(text)?;
        let mut entries = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let entry: ConfigEntry = serde_json::from_value(value)
                .map_err(|e| ConfigError::Malformed {
                    index,
                    reason: e.to_string(),
                })?;
            entries.push(entry);
        }
        Ok(Self::loaded(entries))
    }

    pub fn is_loaded(&self) -> bool {
        self.entries.is_some()
    }

    /// Stored value for `id`, if any.
    pub fn find(&self, id: &str) -> Option<bool> {
        self.entries
            .as_ref()?
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.value)
    }

    /// Whether `id` is switched on. Unset and unloaded both read `false`.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.find(id).unwrap_or(false)
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        self.entries.as_deref().unwrap_or(&[])
    }
}
