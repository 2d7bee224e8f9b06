//! Shared data records
//!
//! Both records cross the JS boundary: asset records come from the packaged
//! resource table, config entries from extension storage.

use serde::{Deserialize, Serialize};

// =============================================================================
// Asset Records
// =============================================================================

/// A packaged image and the URI it is loadable from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Namespaced asset id, e.g. `"search_favicon"`
    pub id: String,
    /// Loadable URI, usually `moz-extension://.../resources/...`
    #[serde(rename = "src")]
    pub uri: String,
}

impl AssetRecord {
    pub fn new(id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
        }
    }
}

// =============================================================================
// Config Entries
// =============================================================================

/// One user setting as persisted by the options page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub id: String,
    pub value: bool,
}

impl ConfigEntry {
    pub fn new(id: impl Into<String>, value: bool) -> Self {
        Self { id: id.into(), value }
    }
}
