//! Old Google Core Library
//!
//! This crate holds everything the Old Google content script does that is
//! independent of the browser: route computation and dispatch, the DOM
//! readiness primitive, style and favicon injection, resource and config
//! lookups, and diagnostic logging.
//!
//! # Architecture
//!
//! The host page is reached only through the [`dom::Document`] trait. The
//! wasm binding implements it over the live DOM; [`dom::MemoryDocument`]
//! implements it in memory for tests and the CLI simulator. All per-page
//! state lives in one [`AppContext`] shared by the router and the page
//! handlers.
//!
//! # Modules
//!
//! - `url`: allocation-free host and path slicing
//! - `route`: route keys, allow-sets and the dispatch table
//! - `resources`: packaged asset manifest
//! - `config`: user settings and load errors
//! - `logger`: gated diagnostic logging
//! - `dom`: host document abstraction and the in-memory document
//! - `ready`: the readiness primitive
//! - `inject`: style and favicon injection
//! - `context`: per-page application context
//! - `router`: one-shot page router

pub mod config;
pub mod context;
pub mod dom;
pub mod inject;
pub mod logger;
pub mod ready;
pub mod resources;
pub mod route;
pub mod router;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use config::{Config, ConfigError, ErrorLocation};
pub use context::AppContext;
pub use dom::{Document, DomError};
pub use inject::InjectTiming;
pub use logger::{DebugLog, LogRecord, LogSink, Severity};
pub use ready::{when_ready, ReadyHandle, Selectors};
pub use resources::ResourceManifest;
pub use route::{dispatch_plan, Handler, RouteKey};
pub use router::{FatalError, HandlerError, PageHandlers, Phase, Router};
pub use types::{AssetRecord, ConfigEntry};
