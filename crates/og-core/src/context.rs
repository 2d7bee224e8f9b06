//! Per-page application context
//!
//! Everything that would otherwise be process-wide state: the document,
//! the resource manifest, the loaded config, the logger and the route key.
//! Built once when the content script starts and shared as
//! `Rc<AppContext<D>>` with the router and every page handler.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use crate::config::Config;
use crate::dom::{Document, DomError};
use crate::inject::{self, InjectTiming};
use crate::logger::DebugLog;
use crate::ready::{self, ReadyHandle, Selectors};
use crate::resources::ResourceManifest;
use crate::route::RouteKey;

pub struct AppContext<D: Document> {
    document: Rc<D>,
    resources: ResourceManifest,
    config: RefCell<Config>,
    logger: DebugLog,
    route: RouteKey,
    version: String,
}

impl<D: Document + 'static> AppContext<D> {
    pub fn new(document: Rc<D>, resources: ResourceManifest, route: RouteKey, logger: DebugLog) -> Self {
        Self {
            document,
            resources,
            config: RefCell::new(Config::unloaded()),
            logger,
            route,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Override the version shown in the welcome banner, usually with the
    /// extension manifest's version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn document(&self) -> &Rc<D> {
        &self.document
    }

    pub fn resources(&self) -> &ResourceManifest {
        &self.resources
    }

    pub fn logger(&self) -> &DebugLog {
        &self.logger
    }

    pub fn route(&self) -> &RouteKey {
        &self.route
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn config(&self) -> Ref<'_, Config> {
        self.config.borrow()
    }

    pub(crate) fn set_config(&self, config: Config) {
        *self.config.borrow_mut() = config;
    }

    /// URI of a packaged asset, `""` when unknown.
    pub fn resource(&self, id: &str) -> &str {
        self.resources.resolve(id)
    }

    /// Whether the setting `id` is on. `false` until config has loaded.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.config.borrow().is_enabled(id)
    }

    pub fn log(&self, caller: &str, message: &str) {
        self.logger.log(caller, message);
    }

    pub fn when_ready<S, F>(&self, selectors: S, caller: &str, callback: F) -> Result<ReadyHandle<D::Element>, DomError>
    where
        S: Into<Selectors>,
        F: FnOnce(D::Element) + 'static,
    {
        ready::when_ready(&self.document, selectors, &self.logger, caller, callback)
    }

    pub fn inject_css(&self, styles: &str, timing: InjectTiming) -> Result<(), DomError> {
        inject::inject_css(&self.document, &self.logger, styles, timing)
    }

    pub fn set_favicon(&self, asset_id: &str, timing: InjectTiming) -> Result<(), DomError> {
        inject::set_favicon(&self.document, &self.logger, &self.resources, asset_id, timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use crate::types::ConfigEntry;

    fn context() -> AppContext<MemoryDocument> {
        AppContext::new(
            Rc::new(MemoryDocument::with_head()),
            ResourceManifest::bundled(|path| format!("moz-extension://id{path}")),
            RouteKey::new("www", "/"),
            DebugLog::disabled(),
        )
    }

    #[test]
    fn test_config_reads_false_until_loaded() {
        let ctx = context();
        assert!(!ctx.is_enabled("nav_bar"));
        ctx.set_config(Config::loaded(vec![ConfigEntry::new("nav_bar", true)]));
        assert!(ctx.is_enabled("nav_bar"));
        assert!(ctx.config().is_loaded());
    }

    #[test]
    fn test_helpers_share_document() {
        let ctx = context().with_version("3.1");
        assert_eq!(ctx.version(), "3.1");
        assert_eq!(ctx.resource("nav"), "moz-extension://id/resources/google/nav.png");

        ctx.set_favicon("search_favicon", InjectTiming::Immediate).unwrap();
        ctx.inject_css("body{}", InjectTiming::Immediate).unwrap();
        let head = ctx.document().head().unwrap();
        assert_eq!(ctx.document().children(head).len(), 2);
    }
}
