//! WebAssembly bindings for Old Google
//!
//! `start` is the content-script entry point. The remaining exports are the
//! helpers the JS page handlers call back into.

mod web;

use std::cell::RefCell;
use std::rc::Rc;

use og_core::{
    logger::DEBUG_DEFAULT, AppContext, Config, ConfigEntry, ConfigError, DebugLog, ErrorLocation,
    Handler, HandlerError, InjectTiming, PageHandlers, ReadyHandle, ResourceManifest, RouteKey,
    Router,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

pub use web::{ConsoleSink, WebDocument};

type WebContext = AppContext<WebDocument>;

thread_local! {
    static CONTEXT: RefCell<Option<Rc<WebContext>>> = const { RefCell::new(None) };
}

fn current_context() -> Option<Rc<WebContext>> {
    CONTEXT.with(|slot| slot.borrow().clone())
}

fn require_context() -> Result<Rc<WebContext>, JsValue> {
    current_context().ok_or_else(|| JsValue::from_str("Not started. Call start() first."))
}

#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// =============================================================================
// Entry Point
// =============================================================================

/// Start the content script.
///
/// `options` may carry `debug` (bool), `version` (string) and `getURL`
/// (the extension's `runtime.getURL`). `load_config` is only called when the
/// page is supported and must return a promise of `[{id, value}]`.
/// `handlers` maps `Replace_*` names to functions.
///
/// Returns whether the page is supported.
#[wasm_bindgen]
pub fn start(options: JsValue, load_config: js_sys::Function, handlers: JsValue) -> Result<bool, JsValue> {
    if current_context().is_some() {
        return Err(JsValue::from_str("Already started. Reload the page to restart."));
    }

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window available"))?;
    let location = window.location();
    let route = RouteKey::from_location(&location.host()?, &location.pathname()?);

    let debug = js_sys::Reflect::get(&options, &"debug".into())
        .ok()
        .and_then(|value| value.as_bool())
        .unwrap_or(DEBUG_DEFAULT);
    let version = js_sys::Reflect::get(&options, &"version".into())
        .ok()
        .and_then(|value| value.as_string());
    let get_url = js_sys::Reflect::get(&options, &"getURL".into())
        .ok()
        .and_then(|value| value.dyn_into::<js_sys::Function>().ok());

    let resources = ResourceManifest::bundled(|path| resolve_url(get_url.as_ref(), path));
    let logger = DebugLog::new(debug, Rc::new(ConsoleSink));
    let mut ctx = AppContext::new(Rc::new(WebDocument::current()?), resources, route, logger);
    if let Some(version) = version {
        ctx = ctx.with_version(version);
    }
    let ctx = Rc::new(ctx);
    CONTEXT.with(|slot| *slot.borrow_mut() = Some(ctx.clone()));

    let mut router = Router::new(ctx);
    if !router.begin() {
        return Ok(false);
    }

    let pending = load_config
        .call0(&JsValue::NULL)
        .map(|value| js_sys::Promise::resolve(&value));

    wasm_bindgen_futures::spawn_local(async move {
        let loaded = match pending {
            Ok(promise) => wasm_bindgen_futures::JsFuture::from(promise)
                .await
                .map_err(config_error)
                .and_then(|value| config_from_js(&value)),
            Err(e) => Err(config_error(e)),
        };
        let mut page_handlers = JsHandlers { object: handlers };
        let phase = router.complete(loaded, &mut page_handlers);
        log::debug!("router finished: {:?}", phase);
    });

    Ok(true)
}

fn resolve_url(get_url: Option<&js_sys::Function>, path: &str) -> String {
    get_url
        .and_then(|f| f.call1(&JsValue::NULL, &JsValue::from_str(path)).ok())
        .and_then(|value| value.as_string())
        .unwrap_or_else(|| path.to_string())
}

// =============================================================================
// Error And Config Conversion
// =============================================================================

/// Location fields of a thrown value. Firefox sets `fileName`,
/// `lineNumber` and `columnNumber`; every engine sets `stack`.
pub fn error_location(value: &JsValue) -> ErrorLocation {
    let field = |name: &str| js_sys::Reflect::get(value, &name.into()).ok();
    let number = |name: &str| field(name).and_then(|v| v.as_f64()).map(|n| n as u32);
    ErrorLocation {
        file: field("fileName").and_then(|v| v.as_string()),
        line: number("lineNumber"),
        column: number("columnNumber"),
        stack: field("stack").and_then(|v| v.as_string()),
    }
}

/// A rejected config load.
pub fn config_error(value: JsValue) -> ConfigError {
    ConfigError::Storage {
        message: web::describe_js_value(&value),
        location: error_location(&value),
    }
}

/// A page handler that threw.
pub fn handler_error(value: JsValue) -> HandlerError {
    HandlerError {
        message: web::describe_js_value(&value),
        location: error_location(&value),
    }
}

/// Settings from the resolved config promise, `[{id: string, value: bool}]`.
pub fn config_from_js(value: &JsValue) -> Result<Config, ConfigError> {
    if !js_sys::Array::is_array(value) {
        return Err(ConfigError::Malformed {
            index: 0,
            reason: "expected an array of {id, value}".to_string(),
        });
    }
    let array = js_sys::Array::from(value);
    let mut entries = Vec::with_capacity(array.length() as usize);
    for (index, item) in array.iter().enumerate() {
        let id = js_sys::Reflect::get(&item, &"id".into())
            .ok()
            .and_then(|v| v.as_string())
            .ok_or_else(|| ConfigError::Malformed {
                index,
                reason: "missing string id".to_string(),
            })?;
        let value = js_sys::Reflect::get(&item, &"value".into())
            .ok()
            .and_then(|v| v.as_bool())
            .ok_or_else(|| ConfigError::Malformed {
                index,
                reason: format!("setting '{}' has no boolean value", id),
            })?;
        entries.push(ConfigEntry { id, value });
    }
    Ok(Config::loaded(entries))
}

// =============================================================================
// Page Handlers
// =============================================================================

struct JsHandlers {
    object: JsValue,
}

impl PageHandlers<WebDocument> for JsHandlers {
    fn run(&mut self, handler: Handler, _ctx: &Rc<WebContext>) -> Result<(), HandlerError> {
        let function = js_sys::Reflect::get(&self.object, &handler.js_name().into())
            .ok()
            .and_then(|value| value.dyn_into::<js_sys::Function>().ok())
            .ok_or_else(|| HandlerError::new(format!("TypeError: {} is not a function", handler)))?;
        function.call0(&JsValue::NULL).map(|_| ()).map_err(handler_error)
    }
}

// =============================================================================
// Helpers For Page Handlers
// =============================================================================

/// A pending or settled `when_ready` wait.
#[wasm_bindgen]
pub struct ReadyWait {
    handle: ReadyHandle<web_sys::Element>,
}

#[wasm_bindgen]
impl ReadyWait {
    pub fn is_pending(&self) -> bool {
        self.handle.is_pending()
    }

    /// Stop waiting. The callback will not run. No-op once settled.
    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

/// A string, or a non-empty array of strings.
pub fn selectors_from_js(value: &JsValue) -> Result<Vec<String>, JsValue> {
    if let Some(single) = value.as_string() {
        return Ok(vec![single]);
    }
    if !js_sys::Array::is_array(value) {
        return Err(JsValue::from_str("selectors must be a string or an array of strings"));
    }
    let selectors = js_sys::Array::from(value)
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_string()
                .ok_or_else(|| JsValue::from_str(&format!("selector {} is not a string", i)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if selectors.is_empty() {
        return Err(JsValue::from_str("selectors must not be empty"));
    }
    Ok(selectors)
}

/// Run `callback(element)` once any selector matches. `selectors` is a
/// string or an array of strings.
#[wasm_bindgen]
pub fn when_ready(
    selectors: JsValue,
    callback: js_sys::Function,
    caller: Option<String>,
) -> Result<ReadyWait, JsValue> {
    let ctx = require_context()?;
    let selectors = selectors_from_js(&selectors)?;
    ctx.when_ready(selectors, caller.as_deref().unwrap_or(""), move |element| {
        if let Err(e) = callback.call1(&JsValue::NULL, &element) {
            log::warn!("readiness callback threw: {}", web::describe_js_value(&e));
        }
    })
    .map(|handle| ReadyWait { handle })
    .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn inject_css(styles: &str, immediate: Option<bool>) -> Result<(), JsValue> {
    let timing = InjectTiming::from_immediate(immediate.unwrap_or(false));
    require_context()?
        .inject_css(styles, timing)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn set_favicon(id: &str, immediate: Option<bool>) -> Result<(), JsValue> {
    let timing = InjectTiming::from_immediate(immediate.unwrap_or(false));
    require_context()?
        .set_favicon(id, timing)
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// URI of a packaged asset, `""` when unknown or before `start`.
#[wasm_bindgen]
pub fn get_resource(id: &str) -> String {
    current_context()
        .map(|ctx| ctx.resource(id).to_string())
        .unwrap_or_default()
}

/// A user setting, `false` when unknown or not loaded yet.
#[wasm_bindgen]
pub fn get_config(id: &str) -> bool {
    current_context()
        .map(|ctx| ctx.is_enabled(id))
        .unwrap_or(false)
}

#[wasm_bindgen]
pub fn debug_log(caller: Option<String>, message: &str) {
    if let Some(ctx) = current_context() {
        ctx.log(caller.as_deref().unwrap_or(""), message);
    }
}

#[wasm_bindgen]
pub fn is_started() -> bool {
    current_context().is_some()
}

/// Route the script computed, as `{subdomain, page, supported}`.
#[wasm_bindgen]
pub fn get_route_info() -> JsValue {
    let result = js_sys::Object::new();
    if let Some(ctx) = current_context() {
        let route = ctx.route();
        let _ = js_sys::Reflect::set(&result, &"subdomain".into(), &JsValue::from_str(&route.subdomain));
        let _ = js_sys::Reflect::set(&result, &"page".into(), &JsValue::from_str(&route.page));
        let _ = js_sys::Reflect::set(&result, &"supported".into(), &JsValue::from(route.is_supported()));
    }
    result.into()
}
