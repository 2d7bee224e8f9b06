use std::fs;
use std::rc::Rc;

use serde::Serialize;

use og_core::dom::{Document, MemoryDocument};
use og_core::logger::RecordingSink;
use og_core::{
    AppContext, Config, ConfigError, DebugLog, Handler, HandlerError, InjectTiming, PageHandlers,
    Phase, ResourceManifest, RouteKey, Router,
};

pub struct SimulateOptions {
    pub url: String,
    pub config_path: Option<String>,
    pub fail_config: Option<String>,
    pub debug: bool,
    pub base: String,
    pub fail_handler: Option<Handler>,
}

#[derive(Debug, Serialize)]
pub struct InjectedElement {
    pub tag: String,
    pub rel: Option<String>,
    pub href: Option<String>,
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub subdomain: String,
    pub page: String,
    pub supported: bool,
    pub outcome: String,
    pub handlers: Vec<String>,
    pub head: Vec<InjectedElement>,
    pub log: Vec<String>,
    pub pending_observers: usize,
}

/// Favicon each property swaps in, when it has one.
fn favicon_for(handler: Handler) -> Option<&'static str> {
    match handler {
        Handler::Scholar => Some("scholar_favicon"),
        Handler::News => Some("news_favicon"),
        Handler::Earth => Some("earth_favicon"),
        Handler::Maps => Some("maps_favicon"),
        Handler::Finance => Some("finance_favicon"),
        Handler::SearchStyles => Some("search_favicon"),
        _ => None,
    }
}

/// Stand-in for the JS page handlers: swaps the property favicon and tags
/// the page with a marker style, both deferred like the real handlers.
struct StandInHandlers {
    ran: Vec<Handler>,
    failing: Option<Handler>,
}

impl PageHandlers<MemoryDocument> for StandInHandlers {
    fn run(
        &mut self,
        handler: Handler,
        ctx: &Rc<AppContext<MemoryDocument>>,
    ) -> Result<(), HandlerError> {
        self.ran.push(handler);
        if self.failing == Some(handler) {
            return Err(HandlerError::new("Error: simulated handler failure"));
        }
        if let Some(favicon) = favicon_for(handler) {
            ctx.set_favicon(favicon, InjectTiming::Deferred)
                .map_err(|e| HandlerError::new(e.to_string()))?;
        }
        let marker = format!("/* {} */", handler.js_name());
        ctx.inject_css(&marker, InjectTiming::Deferred)
            .map_err(|e| HandlerError::new(e.to_string()))
    }
}

fn load_config(opts: &SimulateOptions) -> Result<Config, ConfigError> {
    if let Some(message) = &opts.fail_config {
        return Err(ConfigError::storage(message.clone()));
    }
    match &opts.config_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| ConfigError::storage(format!("Failed to read '{}': {}", path, e)))?;
            Config::from_json(&text)
        }
        None => Ok(Config::loaded(Vec::new())),
    }
}

pub fn run_simulation(opts: &SimulateOptions) -> SimulationReport {
    let route = RouteKey::from_url(&opts.url);
    let doc = Rc::new(MemoryDocument::with_head());
    let sink = Rc::new(RecordingSink::new());
    let base = opts.base.trim_end_matches('/').to_string();
    let ctx = AppContext::new(
        doc.clone(),
        ResourceManifest::bundled(|path| format!("{}{}", base, path)),
        route.clone(),
        DebugLog::new(opts.debug, sink.clone()),
    );

    let mut router = Router::new(Rc::new(ctx));
    let mut handlers = StandInHandlers {
        ran: Vec::new(),
        failing: opts.fail_handler,
    };
    let outcome = match router.run(|| load_config(opts), &mut handlers) {
        Phase::Idle => "idle",
        Phase::Dispatched(_) => "dispatched",
        Phase::Abandoned => "abandoned",
        Phase::Aborted { .. } => "aborted",
    };

    // The body arrives after the script started; deferred injections land now.
    if let Some(html) = doc.document_element() {
        if let Err(e) = doc.append_new(html, "body") {
            eprintln!("Warning: could not add <body>: {}", e);
        }
    }
    doc.flush_until_idle();

    let head = doc
        .head()
        .map(|head| doc.children(head))
        .unwrap_or_default()
        .into_iter()
        .map(|node| {
            let text = doc.text(node);
            InjectedElement {
                tag: doc.tag(node),
                rel: doc.attribute(node, "rel"),
                href: doc.attribute(node, "href"),
                text: (!text.is_empty()).then_some(text),
            }
        })
        .collect();

    SimulationReport {
        subdomain: route.subdomain.clone(),
        page: route.page.clone(),
        supported: route.is_supported(),
        outcome: outcome.to_string(),
        handlers: handlers.ran.iter().map(|h| h.js_name().to_string()).collect(),
        head,
        log: sink.records().iter().map(|r| r.to_string()).collect(),
        pending_observers: doc.observer_count(),
    }
}

pub fn print_report(report: &SimulationReport) {
    println!("Simulation");
    println!("==================================================");
    println!("  Subdomain:   {}", report.subdomain);
    println!("  Page:        {}", report.page);
    println!("  Supported:   {}", report.supported);
    println!("  Outcome:     {}", report.outcome);
    let handlers = if report.handlers.is_empty() {
        "(none)".to_string()
    } else {
        report.handlers.join(", ")
    };
    println!("  Handlers:    {}", handlers);
    println!();
    println!("<head> after body load:");
    if report.head.is_empty() {
        println!("  (empty)");
    }
    for element in &report.head {
        match (&element.rel, &element.href, &element.text) {
            (Some(rel), href, _) => {
                println!("  <{} rel=\"{}\" href=\"{}\">", element.tag, rel, href.as_deref().unwrap_or(""))
            }
            (None, _, Some(text)) => println!("  <{}>{}</{}>", element.tag, text, element.tag),
            _ => println!("  <{}>", element.tag),
        }
    }
    if !report.log.is_empty() {
        println!();
        println!("Log:");
        for line in &report.log {
            for (i, part) in line.lines().enumerate() {
                let lead = if i == 0 { "  " } else { "    " };
                println!("{}{}", lead, part);
            }
        }
    }
    println!();
    println!("  Observers still waiting: {}", report.pending_observers);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(url: &str) -> SimulateOptions {
        SimulateOptions {
            url: url.to_string(),
            config_path: None,
            fail_config: None,
            debug: true,
            base: "moz-extension://id/".to_string(),
            fail_handler: None,
        }
    }

    #[test]
    fn test_search_home_gets_favicon_and_styles() {
        let report = run_simulation(&options("https://www.google.com/"));
        assert_eq!(report.outcome, "dispatched");
        assert_eq!(report.handlers, vec!["Replace_Search_Styles", "Replace_Search_Home"]);
        assert_eq!(report.head.len(), 3);
        assert_eq!(report.head[0].tag, "link");
        assert_eq!(
            report.head[0].href.as_deref(),
            Some("moz-extension://id/resources/google/favicons/search.ico")
        );
        assert_eq!(report.pending_observers, 0);
    }

    #[test]
    fn test_unsupported_is_idle() {
        let report = run_simulation(&options("https://mail.google.com/mail/u/0"));
        assert_eq!(report.outcome, "idle");
        assert!(report.handlers.is_empty());
        assert!(report.head.is_empty());
        assert!(report.log.is_empty());
    }

    #[test]
    fn test_config_failure_abandons() {
        let mut opts = options("https://patents.google.com/");
        opts.fail_config = Some("storage unavailable".to_string());
        let report = run_simulation(&opts);
        assert_eq!(report.outcome, "abandoned");
        assert!(report.handlers.is_empty());
        assert!(report.log.iter().any(|line| line.contains("Fatal error; exiting!")));
    }

    #[test]
    fn test_failing_handler_stops_plan() {
        let mut opts = options("https://www.google.com/search?q=x");
        opts.fail_handler = Some(Handler::SearchStyles);
        let report = run_simulation(&opts);
        assert_eq!(report.outcome, "aborted");
        assert_eq!(report.handlers, vec!["Replace_Search_Styles"]);
        assert!(report.head.is_empty());
        assert!(report
            .log
            .iter()
            .any(|line| line.contains("Replace_Search_Styles: Error: simulated handler failure")));
    }
}
