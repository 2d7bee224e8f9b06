//! Browser tests for the live document. Run with `wasm-pack test --headless --firefox`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use og_core::dom::Document;
use og_core::{when_ready, ConfigError, DebugLog, ErrorLocation};
use og_wasm::WebDocument;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().unwrap().document().unwrap()
}

async fn next_microtask() {
    wasm_bindgen_futures::JsFuture::from(js_sys::Promise::resolve(&JsValue::NULL))
        .await
        .unwrap();
}

/// Own data property, shadowing engine accessors such as `stack`.
fn define(target: &js_sys::Object, key: &str, value: JsValue) {
    let descriptor = js_sys::Object::new();
    js_sys::Reflect::set(&descriptor, &"value".into(), &value).unwrap();
    js_sys::Reflect::set(&descriptor, &"writable".into(), &JsValue::TRUE).unwrap();
    js_sys::Reflect::set(&descriptor, &"configurable".into(), &JsValue::TRUE).unwrap();
    js_sys::Reflect::define_property(target, &key.into(), &descriptor).unwrap();
}

fn entry(id: &str, value: JsValue) -> JsValue {
    let object = js_sys::Object::new();
    js_sys::Reflect::set(&object, &"id".into(), &JsValue::from_str(id)).unwrap();
    js_sys::Reflect::set(&object, &"value".into(), &value).unwrap();
    object.into()
}

fn ensure_started() {
    if og_wasm::is_started() {
        return;
    }
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &"debug".into(), &JsValue::FALSE).unwrap();
    let load_config = js_sys::Function::new_no_args("return [];");
    og_wasm::start(options.into(), load_config, js_sys::Object::new().into()).unwrap();
}

#[wasm_bindgen_test]
fn style_is_created_verbatim() {
    let doc = WebDocument::current().unwrap();
    let style = doc.create_style("a > b { color: red }").unwrap();
    assert_eq!(style.tag_name().to_lowercase(), "style");
    assert_eq!(style.text_content().as_deref(), Some("a > b { color: red }"));
}

#[wasm_bindgen_test]
fn link_has_rel_and_href() {
    let doc = WebDocument::current().unwrap();
    let link = doc.create_link("icon", "").unwrap();
    assert_eq!(link.get_attribute("rel").as_deref(), Some("icon"));
    assert_eq!(link.get_attribute("href").as_deref(), Some(""));
}

#[wasm_bindgen_test]
fn invalid_selector_matches_nothing() {
    let doc = WebDocument::current().unwrap();
    assert!(doc.query_selector("div!!").is_none());
}

#[wasm_bindgen_test]
async fn readiness_fires_after_insertion() {
    let doc = Rc::new(WebDocument::current().unwrap());
    let hits = Rc::new(RefCell::new(Vec::new()));
    let sink = hits.clone();

    let handle = when_ready(
        &doc,
        [".og-test-a", ".og-test-b"],
        &DebugLog::disabled(),
        "",
        move |el: web_sys::Element| sink.borrow_mut().push(el.class_name()),
    )
    .unwrap();
    assert!(handle.is_pending());

    let body = document().body().unwrap();
    let b = document().create_element("div").unwrap();
    b.set_class_name("og-test-b");
    let a = document().create_element("div").unwrap();
    a.set_class_name("og-test-a");
    body.append_child(&b).unwrap();
    body.append_child(&a).unwrap();

    // Mutation records are delivered at the next microtask checkpoint.
    next_microtask().await;

    assert_eq!(*hits.borrow(), vec!["og-test-a".to_string()]);
    assert!(!handle.is_pending());
}

#[wasm_bindgen_test]
fn rejected_error_keeps_its_location() {
    let error = js_sys::Error::new("storage unavailable");
    define(&error, "fileName", JsValue::from_str("moz-extension://id/src/config.js"));
    define(&error, "lineNumber", JsValue::from(12));
    define(&error, "columnNumber", JsValue::from(5));
    define(&error, "stack", JsValue::from_str("LoadConfig@config.js:12:5"));

    match og_wasm::config_error(error.into()) {
        ConfigError::Storage { message, location } => {
            assert_eq!(message, "Error: storage unavailable");
            assert_eq!(
                location,
                ErrorLocation {
                    file: Some("moz-extension://id/src/config.js".to_string()),
                    line: Some(12),
                    column: Some(5),
                    stack: Some("LoadConfig@config.js:12:5".to_string()),
                }
            );
            assert_eq!(location.file_name(), Some("config.js"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[wasm_bindgen_test]
fn rejected_string_has_no_location() {
    match og_wasm::config_error(JsValue::from_str("quota exceeded")) {
        ConfigError::Storage { message, location } => {
            assert_eq!(message, "quota exceeded");
            assert_eq!(location, ErrorLocation::default());
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[wasm_bindgen_test]
fn config_array_is_read() {
    let array = js_sys::Array::new();
    array.push(&entry("nav_bar", JsValue::TRUE));
    array.push(&entry("logo", JsValue::FALSE));

    let config = og_wasm::config_from_js(&array.into()).unwrap();
    assert!(config.is_loaded());
    assert!(config.is_enabled("nav_bar"));
    assert!(!config.is_enabled("logo"));
    assert!(!config.is_enabled("missing"));
}

#[wasm_bindgen_test]
fn config_that_is_not_an_array_is_malformed() {
    let object = js_sys::Object::new();
    let result = og_wasm::config_from_js(&object.into());
    assert!(matches!(result, Err(ConfigError::Malformed { index: 0, .. })));
}

#[wasm_bindgen_test]
fn config_entry_without_boolean_is_malformed() {
    let array = js_sys::Array::new();
    array.push(&entry("nav_bar", JsValue::TRUE));
    array.push(&entry("logo", JsValue::from_str("yes")));

    let result = og_wasm::config_from_js(&array.into());
    assert!(matches!(result, Err(ConfigError::Malformed { index: 1, .. })));
}

#[wasm_bindgen_test]
fn selectors_must_be_strings() {
    assert_eq!(
        og_wasm::selectors_from_js(&JsValue::from_str("#logo")).unwrap(),
        vec!["#logo".to_string()]
    );
    assert!(og_wasm::selectors_from_js(&JsValue::from(3)).is_err());
    assert!(og_wasm::selectors_from_js(&js_sys::Array::new().into()).is_err());

    let mixed = js_sys::Array::new();
    mixed.push(&JsValue::from_str("#logo"));
    mixed.push(&JsValue::from(3));
    assert!(og_wasm::selectors_from_js(&mixed.into()).is_err());
}

#[wasm_bindgen_test]
fn exported_wait_rejects_empty_selectors() {
    ensure_started();
    let callback = js_sys::Function::new_no_args("");
    assert!(og_wasm::when_ready(js_sys::Array::new().into(), callback, None).is_err());
}

#[wasm_bindgen_test]
async fn exported_wait_can_be_cancelled() {
    ensure_started();
    let callback = js_sys::Function::new_no_args(
        "globalThis.__og_cancelled_hits = (globalThis.__og_cancelled_hits || 0) + 1;",
    );
    let wait = og_wasm::when_ready(JsValue::from_str(".og-test-cancel"), callback, None).unwrap();
    assert!(wait.is_pending());
    wait.cancel();
    assert!(!wait.is_pending());

    let el = document().create_element("div").unwrap();
    el.set_class_name("og-test-cancel");
    document().body().unwrap().append_child(&el).unwrap();
    next_microtask().await;

    let hits = js_sys::Reflect::get(&js_sys::global(), &"__og_cancelled_hits".into()).unwrap();
    assert!(hits.is_undefined());
}
