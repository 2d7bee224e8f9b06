//! Page router
//!
//! Runs once per page load: Idle until the route is known to be supported
//! and config has loaded, then Dispatched with at most one dispatch plan
//! executed. A config failure is logged once and abandons the load; a
//! handler failure is logged the same way and aborts the rest of the plan.
//!
//! Config loading is asynchronous in the browser, so the router is split in
//! two steps: [`Router::begin`] before the load starts, and
//! [`Router::complete`] with its outcome. [`Router::run`] chains both for
//! synchronous hosts.

use std::rc::Rc;

use crate::config::{Config, ConfigError, ErrorLocation};
use crate::context::AppContext;
use crate::dom::Document;
use crate::route::{dispatch_plan, Handler};

/// Implementation of the page handlers. Each call runs one handler; an
/// error stops the plan.
pub trait PageHandlers<D: Document> {
    fn run(&mut self, handler: Handler, ctx: &Rc<AppContext<D>>) -> Result<(), HandlerError>;
}

/// A page handler that threw.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    pub location: ErrorLocation,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: ErrorLocation::default(),
        }
    }
}

/// Anything that ends the pass early.
#[derive(Debug, thiserror::Error)]
pub enum FatalError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{handler}: {source}")]
    Handler {
        handler: Handler,
        #[source]
        source: HandlerError,
    },
}

impl FatalError {
    pub fn location(&self) -> Option<&ErrorLocation> {
        match self {
            Self::Config(e) => e.location(),
            Self::Handler { source, .. } => Some(&source.location),
        }
    }
}

pub const COPYRIGHT: &str = "Copyright (c) 2021 toydotgame";

/// Where the router is in its single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    /// Handlers run, possibly none
    Dispatched(Vec<Handler>),
    /// Config failed to load; nothing ran
    Abandoned,
    /// `failed` threw after `ran` completed; the rest of the plan was skipped
    Aborted { ran: Vec<Handler>, failed: Handler },
}

pub struct Router<D: Document> {
    ctx: Rc<AppContext<D>>,
    phase: Phase,
}

impl<D: Document + 'static> Router<D> {
    pub fn new(ctx: Rc<AppContext<D>>) -> Self {
        Self {
            ctx,
            phase: Phase::Idle,
        }
    }

    pub fn context(&self) -> &Rc<AppContext<D>> {
        &self.ctx
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Whether this page is one we handle. When `false` the caller must not
    /// load config and the router stays Idle for good.
    pub fn begin(&self) -> bool {
        let route = self.ctx.route();
        if !route.is_supported() {
            log::debug!("unsupported route, not starting: {}", route);
            return false;
        }
        self.ctx.logger().log_with("main", || {
            format!(
                "Welcome to Old Google v{}!\n{}\n{}",
                self.ctx.version(),
                COPYRIGHT,
                route
            )
        });
        true
    }

    /// Finish the pass with the config load outcome. Returns the handlers
    /// that ran. Calling it again after the first time does nothing.
    pub fn complete<H>(&mut self, loaded: Result<Config, ConfigError>, handlers: &mut H) -> &Phase
    where
        H: PageHandlers<D> + ?Sized,
    {
        if self.phase != Phase::Idle {
            return &self.phase;
        }

        let config = match loaded {
            Ok(config) => config,
            Err(e) => {
                let e = FatalError::from(e);
                self.ctx.logger().log_with("main", || fatal_message(&e));
                self.phase = Phase::Abandoned;
                return &self.phase;
            }
        };

        self.ctx.logger().log_with("main", || describe_config(&config));
        self.ctx.set_config(config);

        let plan = dispatch_plan(self.ctx.route());
        for (i, &handler) in plan.iter().enumerate() {
            log::debug!("dispatching {}", handler);
            if let Err(source) = handlers.run(handler, &self.ctx) {
                let e = FatalError::Handler { handler, source };
                self.ctx.logger().log_with("main", || fatal_message(&e));
                self.phase = Phase::Aborted {
                    ran: plan[..i].to_vec(),
                    failed: handler,
                };
                return &self.phase;
            }
        }
        self.phase = Phase::Dispatched(plan);
        &self.phase
    }

    /// `begin`, then load config with `load` and `complete`, for hosts
    /// where loading is synchronous.
    pub fn run<L, H>(&mut self, load: L, handlers: &mut H) -> &Phase
    where
        L: FnOnce() -> Result<Config, ConfigError>,
        H: PageHandlers<D> + ?Sized,
    {
        if !self.begin() {
            return &self.phase;
        }
        self.complete(load(), handlers)
    }
}

/// `ERROR: Fatal error; exiting!` followed by the error, its location and
/// stack as far as they are known.
pub fn fatal_message(error: &FatalError) -> String {
    let mut message = format!("ERROR: Fatal error; exiting!\n{}", error);
    if let Some(location) = error.location() {
        if let Some(file) = location.file_name() {
            message.push_str(&format!(" ({}", file));
            if let Some(line) = location.line {
                message.push_str(&format!(":{}", line));
                if let Some(column) = location.column {
                    message.push_str(&format!(",{}", column));
                }
            }
            message.push(')');
        }
        if let Some(stack) = &location.stack {
            message.push('\n');
            message.push_str(stack);
        }
    }
    message
}

fn describe_config(config: &Config) -> String {
    let mut message = String::from("Config loaded:");
    for entry in config.entries() {
        message.push_str(&format!("\n  {} = {}", entry.id, entry.value));
    }
    message
}
