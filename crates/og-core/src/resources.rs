//! Packaged resource manifest
//!
//! Maps symbolic asset ids to loadable URIs. The table is built once at
//! startup and is read-only afterwards.
//!
//! # Examples
//!
//! ```
//! use og_core::resources::ResourceManifest;
//!
//! let manifest = ResourceManifest::bundled(|path| format!("moz-extension://abc{path}"));
//! assert_eq!(
//!     manifest.resolve("g"),
//!     "moz-extension://abc/resources/google/logos/g.png"
//! );
//! assert_eq!(manifest.resolve("missing"), "");
//! ```

use crate::types::AssetRecord;

/// Asset ids and their paths inside the extension package.
pub const BUNDLED_ASSETS: &[(&str, &str)] = &[
    ("nav", "/resources/google/nav.png"),
    ("maps_favicon", "/resources/google/favicons/maps.ico"),
    ("search_favicon", "/resources/google/favicons/search.ico"),
    ("search_alt_favicon", "/resources/google/favicons/search_alt.ico"),
    ("finance_favicon", "/resources/google/favicons/finance.ico"),
    ("scholar_favicon", "/resources/google/favicons/scholar.ico"),
    ("news_favicon", "/resources/google/favicons/news.ico"),
    ("earth_favicon", "/resources/google/favicons/earth.ico"),
    ("books", "/resources/google/logos/books.png"),
    ("finance_left", "/resources/google/logos/finance_left.png"),
    ("finance_right", "/resources/google/logos/finance_right.png"),
    ("g", "/resources/google/logos/g.png"),
    ("maps", "/resources/google/logos/maps.png"),
    ("maps_watermark_mono", "/resources/google/logos/maps_watermark_mono.png"),
    ("maps_watermark", "/resources/google/logos/maps_watermark.png"),
    ("news_left", "/resources/google/logos/news_left.png"),
    ("news", "/resources/google/logos/news.png"),
    ("news_right", "/resources/google/logos/news_right.png"),
    ("patents", "/resources/google/logos/patents.png"),
    ("scholar", "/resources/google/logos/scholar.png"),
    ("search", "/resources/google/logos/search.png"),
    ("shopping_left", "/resources/google/logos/shopping_left.png"),
    ("shopping", "/resources/google/logos/shopping.png"),
    ("shopping_right", "/resources/google/logos/shopping_right.png"),
    ("trends", "/resources/google/logos/trends.png"),
    ("videos", "/resources/google/logos/videos.png"),
    ("earth", "/resources/google/logos/earth.png"),
];

/// Immutable id -> URI table.
#[derive(Debug, Clone, Default)]
pub struct ResourceManifest {
    records: Vec<AssetRecord>,
}

impl ResourceManifest {
    pub fn new(records: Vec<AssetRecord>) -> Self {
        Self { records }
    }

    /// Build the packaged manifest, turning each package path into a
    /// loadable URI with `get_url` (the host's `runtime.getURL`).
    pub fn bundled<F>(get_url: F) -> Self
    where
        F: Fn(&str) -> String,
    {
        let records = BUNDLED_ASSETS
            .iter()
            .map(|(id, path)| AssetRecord::new(*id, get_url(path)))
            .collect();
        Self { records }
    }

    /// Find the record registered under `id`.
    pub fn find(&self, id: &str) -> Option<&AssetRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// URI for `id`, or the empty string when nothing is registered.
    /// Callers treat `""` as a no-op.
    pub fn resolve(&self, id: &str) -> &str {
        self.find(id).map(|record| record.uri.as_str()).unwrap_or("")
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> ResourceManifest {
        ResourceManifest::bundled(|path| format!("moz-extension://test{path}"))
    }

    #[test]
    fn test_resolves_every_bundled_asset() {
        let manifest = manifest();
        assert_eq!(manifest.len(), BUNDLED_ASSETS.len());
        for (id, path) in BUNDLED_ASSETS {
            assert_eq!(manifest.resolve(id), format!("moz-extension://test{path}"));
        }
    }

    #[test]
    fn test_unknown_id_resolves_empty() {
        let manifest = manifest();
        assert_eq!(manifest.resolve("unknown_id"), "");
        assert_eq!(manifest.resolve(""), "");
        assert!(manifest.find("unknown_id").is_none());
    }

    #[test]
    fn test_bundled_ids_are_unique() {
        let mut ids: Vec<&str> = BUNDLED_ASSETS.iter().map(|(id, _)| *id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), BUNDLED_ASSETS.len());
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = ResourceManifest::default();
        assert!(manifest.is_empty());
        assert_eq!(manifest.resolve("g"), "");
    }
}
