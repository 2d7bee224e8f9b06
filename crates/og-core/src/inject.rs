//! Style and favicon injection
//!
//! Both helpers build their element up front and append it to `<head>`,
//! either right away or once `<body>` exists. A deferred append always lands
//! after everything the page itself put in its head.

use std::rc::Rc;

use crate::dom::{Document, DomError};
use crate::logger::DebugLog;
use crate::ready::when_ready;
use crate::resources::ResourceManifest;

/// Selector the deferred mode waits for.
pub const BODY_SELECTOR: &str = "body";

/// When to append.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InjectTiming {
    /// Wait until `<body>` exists
    #[default]
    Deferred,
    /// Append now. The caller guarantees `<head>` exists, typically because
    /// it is already inside a readiness callback.
    Immediate,
}

impl InjectTiming {
    pub fn from_immediate(immediate: bool) -> Self {
        if immediate {
            Self::Immediate
        } else {
            Self::Deferred
        }
    }
}

fn append_to_head<D: Document>(doc: &D, element: &D::Element) -> Result<(), DomError> {
    let head = doc.head().ok_or(DomError::MissingHead)?;
    doc.append_child(&head, element)
}

fn place<D>(
    doc: &Rc<D>,
    logger: &DebugLog,
    caller: &str,
    element: D::Element,
    timing: InjectTiming,
) -> Result<(), DomError>
where
    D: Document + 'static,
{
    match timing {
        InjectTiming::Immediate => append_to_head(doc.as_ref(), &element),
        InjectTiming::Deferred => {
            let target = Rc::downgrade(doc);
            let failure_log = logger.clone();
            let caller_name = caller.to_string();
            when_ready(doc, BODY_SELECTOR, logger, caller, move |_body| {
                let Some(doc) = target.upgrade() else {
                    return;
                };
                if let Err(e) = append_to_head(doc.as_ref(), &element) {
                    log::warn!("deferred head append failed: {}", e);
                    failure_log.log_with(&caller_name, || format!("ERROR: {}", e));
                }
            })?;
            Ok(())
        }
    }
}

/// Append a `<style>` holding `styles` verbatim. No escaping is done; the
/// text is always extension-authored.
pub fn inject_css<D>(
    doc: &Rc<D>,
    logger: &DebugLog,
    styles: &str,
    timing: InjectTiming,
) -> Result<(), DomError>
where
    D: Document + 'static,
{
    logger.log("inject_css", "Injecting CSS into document...");
    let style = doc.create_style(styles)?;
    place(doc, logger, "inject_css", style, timing)
}

/// Append `<link rel="icon">` pointing at the asset registered as
/// `asset_id`. An unknown id still appends a link, with an empty href.
pub fn set_favicon<D>(
    doc: &Rc<D>,
    logger: &DebugLog,
    resources: &ResourceManifest,
    asset_id: &str,
    timing: InjectTiming,
) -> Result<(), DomError>
where
    D: Document + 'static,
{
    logger.log_with("set_favicon", || format!("Setting favicon to {}...", asset_id));
    let link = doc.create_link("icon", resources.resolve(asset_id))?;
    place(doc, logger, "set_favicon", link, timing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{MemoryDocument, NodeId};
    use crate::types::AssetRecord;

    fn head_children(doc: &MemoryDocument) -> Vec<NodeId> {
        doc.children(doc.head().unwrap())
    }

    fn manifest() -> ResourceManifest {
        ResourceManifest::new(vec![AssetRecord::new(
            "search_favicon",
            "moz-extension://x/resources/google/favicons/search.ico",
        )])
    }

    #[test]
    fn test_immediate_css_is_verbatim() {
        let doc = Rc::new(MemoryDocument::with_head());
        let css = "#logo > img[src*=\"a&b\"] { content: '<none>'; }";
        inject_css(&doc, &DebugLog::disabled(), css, InjectTiming::Immediate).unwrap();

        let children = head_children(&doc);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.tag(children[0]), "style");
        assert_eq!(doc.text(children[0]), css);
        assert_eq!(doc.observer_count(), 0);
    }

    #[test]
    fn test_deferred_css_waits_for_body() {
        let doc = Rc::new(MemoryDocument::with_head());
        inject_css(&doc, &DebugLog::disabled(), "a{}", InjectTiming::Deferred).unwrap();
        assert!(head_children(&doc).is_empty());
        assert_eq!(doc.observer_count(), 1);

        let html = doc.document_element().unwrap();
        doc.append_new(html, "body").unwrap();
        doc.flush_mutations();

        let children = head_children(&doc);
        assert_eq!(children.len(), 1);
        assert_eq!(doc.text(children[0]), "a{}");
        assert_eq!(doc.observer_count(), 0);
    }

    #[test]
    fn test_deferred_with_body_present_appends_now() {
        let doc = Rc::new(MemoryDocument::with_head());
        let html = doc.document_element().unwrap();
        doc.append_new(html, "body").unwrap();
        inject_css(&doc, &DebugLog::disabled(), "a{}", InjectTiming::default()).unwrap();
        assert_eq!(head_children(&doc).len(), 1);
    }

    #[test]
    fn test_favicon_resolves_asset() {
        let doc = Rc::new(MemoryDocument::with_head());
        set_favicon(&doc, &DebugLog::disabled(), &manifest(), "search_favicon", InjectTiming::Immediate)
            .unwrap();
        let link = head_children(&doc)[0];
        assert_eq!(doc.tag(link), "link");
        assert_eq!(doc.attribute(link, "rel").as_deref(), Some("icon"));
        assert_eq!(
            doc.attribute(link, "href").as_deref(),
            Some("moz-extension://x/resources/google/favicons/search.ico")
        );
    }

    #[test]
    fn test_unknown_favicon_gets_empty_href() {
        let doc = Rc::new(MemoryDocument::with_head());
        set_favicon(&doc, &DebugLog::disabled(), &manifest(), "unknown_id", InjectTiming::Immediate)
            .unwrap();
        let link = head_children(&doc)[0];
        assert_eq!(doc.attribute(link, "href").as_deref(), Some(""));
    }

    #[test]
    fn test_immediate_without_head_fails() {
        let doc = Rc::new(MemoryDocument::new());
        let err = inject_css(&doc, &DebugLog::disabled(), "a{}", InjectTiming::Immediate).unwrap_err();
        assert_eq!(err, DomError::MissingHead);
    }

    #[test]
    fn test_timing_from_flag() {
        assert_eq!(InjectTiming::from_immediate(true), InjectTiming::Immediate);
        assert_eq!(InjectTiming::from_immediate(false), InjectTiming::Deferred);
    }
}
