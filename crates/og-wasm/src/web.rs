//! Live DOM implementation of the core document trait

use og_core::dom::{Document, DomError, MutationCallback, Subscription};
use og_core::logger::{LogRecord, LogSink, BANNER};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

const BANNER_EDGE_STYLE: &str = "background-color:#4d90fe; color:#222";
const BANNER_TEXT_STYLE: &str = "background-color:#4d90fe; color:#fff";

pub(crate) fn js_error(value: JsValue) -> DomError {
    DomError::Operation(describe_js_value(&value))
}

/// Best-effort text for a thrown JS value.
pub(crate) fn describe_js_value(value: &JsValue) -> String {
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.to_string());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

// =============================================================================
// Document
// =============================================================================

pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    /// The document of the current window.
    pub fn current() -> Result<Self, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("No document available"))?;
        Ok(Self::new(document))
    }
}

impl Document for WebDocument {
    type Element = web_sys::Element;

    fn query_selector(&self, selector: &str) -> Option<web_sys::Element> {
        // An invalid selector throws; it simply never matches.
        self.document.query_selector(selector).ok().flatten()
    }

    fn head(&self) -> Option<web_sys::Element> {
        self.document.head().map(web_sys::Element::from)
    }

    fn create_style(&self, css: &str) -> Result<web_sys::Element, DomError> {
        let style = self.document.create_element("style").map_err(js_error)?;
        let text = self.document.create_text_node(css);
        style.append_child(&text).map_err(js_error)?;
        Ok(style)
    }

    fn create_link(&self, rel: &str, href: &str) -> Result<web_sys::Element, DomError> {
        let link = self.document.create_element("link").map_err(js_error)?;
        link.set_attribute("rel", rel).map_err(js_error)?;
        link.set_attribute("href", href).map_err(js_error)?;
        Ok(link)
    }

    fn append_child(&self, parent: &web_sys::Element, child: &web_sys::Element) -> Result<(), DomError> {
        parent.append_child(child).map(|_| ()).map_err(js_error)
    }

    fn observe_child_list(
        &self,
        mut on_batch: MutationCallback,
    ) -> Result<Box<dyn Subscription>, DomError> {
        let closure = Closure::<dyn FnMut()>::new(move || on_batch());
        let observer =
            web_sys::MutationObserver::new(closure.as_ref().unchecked_ref()).map_err(js_error)?;

        let init = web_sys::MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        observer
            .observe_with_options(&self.document, &init)
            .map_err(js_error)?;

        // The handler may disconnect its own observer while running, so the
        // closure must outlive the subscription; the JS GC frees it.
        let _ = closure.into_js_value();

        Ok(Box::new(WebSubscription { observer }))
    }
}

struct WebSubscription {
    observer: web_sys::MutationObserver,
}

impl Subscription for WebSubscription {
    fn disconnect(&self) {
        self.observer.disconnect();
    }
}

// =============================================================================
// Console
// =============================================================================

/// Writes `[Old Google] [caller()] message` to the browser console, with
/// the banner highlighted and error records in red.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn write(&self, record: &LogRecord) {
        let line = format!("%c[%c{}%c]%c {}", BANNER, record);
        let message_style = format!("color:{}; background-color:reset", record.severity.color());
        web_sys::console::log_5(
            &JsValue::from_str(&line),
            &JsValue::from_str(BANNER_EDGE_STYLE),
            &JsValue::from_str(BANNER_TEXT_STYLE),
            &JsValue::from_str(BANNER_EDGE_STYLE),
            &JsValue::from_str(&message_style),
        );
    }
}
