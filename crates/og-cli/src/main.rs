//! Old Google CLI
//!
//! CLI tool for checking how a URL is routed, listing the packaged
//! resources, and simulating a page load against an in-memory document.

mod simulate;

use clap::{Parser, Subcommand};
use serde::Serialize;

use og_core::resources::ResourceManifest;
use og_core::route::{dispatch_plan, Handler, RouteKey};

use crate::simulate::{print_report, run_simulation, SimulateOptions};

#[derive(Parser)]
#[command(name = "og-cli")]
#[command(about = "Old Google routing and injection tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the route key and handler plan for a URL
    Route {
        /// Page URL
        url: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List the packaged resource manifest
    Resources {
        /// Extension base URL prepended to each package path
        #[arg(short, long, default_value = "moz-extension://old-google")]
        base: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Run the router against an in-memory page
    Simulate {
        /// Page URL
        url: String,

        /// Config JSON file, `[{"id": "...", "value": true}]`
        #[arg(short, long)]
        config: Option<String>,

        /// Make config loading fail with this message
        #[arg(long)]
        fail_config: Option<String>,

        /// Make this page handler throw, e.g. `Replace_Search_Styles`
        #[arg(long)]
        fail_handler: Option<String>,

        /// Enable diagnostic logging
        #[arg(short, long)]
        debug: bool,

        /// Extension base URL for resources
        #[arg(short, long, default_value = "moz-extension://old-google")]
        base: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct RouteReport<'a> {
    subdomain: &'a str,
    page: &'a str,
    supported: bool,
    handlers: Vec<&'static str>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Route { url, json } => cmd_route(&url, json),
        Commands::Resources { base, json } => cmd_resources(&base, json),
        Commands::Simulate {
            url,
            config,
            fail_config,
            fail_handler,
            debug,
            base,
            json,
        } => parse_handler(fail_handler.as_deref()).and_then(|fail_handler| {
            cmd_simulate(
                SimulateOptions {
                    url,
                    config_path: config,
                    fail_config,
                    debug,
                    base,
                    fail_handler,
                },
                json,
            )
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("Failed to serialize: {}", e))
}

fn parse_handler(name: Option<&str>) -> Result<Option<Handler>, String> {
    match name {
        None => Ok(None),
        Some(name) => Handler::from_js_name(name)
            .map(Some)
            .ok_or_else(|| format!("Unknown page handler '{}'", name)),
    }
}

fn cmd_route(url: &str, json: bool) -> Result<(), String> {
    let route = RouteKey::from_url(url);
    let plan = if route.is_supported() {
        dispatch_plan(&route)
    } else {
        Vec::new()
    };

    if json {
        let report = RouteReport {
            subdomain: &route.subdomain,
            page: &route.page,
            supported: route.is_supported(),
            handlers: plan.iter().map(|h| h.js_name()).collect(),
        };
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    println!("Route for '{}'", url);
    println!("  Subdomain:   {}", route.subdomain);
    println!("  Page:        {}", route.page);
    println!("  Supported:   {}", route.is_supported());
    if plan.is_empty() {
        println!("  Handlers:    (none)");
    } else {
        for (i, handler) in plan.iter().enumerate() {
            println!("  Handler {}:   {}", i + 1, handler);
        }
    }
    Ok(())
}

fn cmd_resources(base: &str, json: bool) -> Result<(), String> {
    let base = base.trim_end_matches('/');
    let manifest = ResourceManifest::bundled(|path| format!("{}{}", base, path));

    if json {
        println!("{}", to_json(&manifest.records())?);
        return Ok(());
    }

    let width = manifest
        .records()
        .iter()
        .map(|record| record.id.len())
        .max()
        .unwrap_or(0);
    println!("{} packaged resources", manifest.len());
    for record in manifest.records() {
        println!("  {:width$}  {}", record.id, record.uri, width = width);
    }
    Ok(())
}

fn cmd_simulate(opts: SimulateOptions, json: bool) -> Result<(), String> {
    if let Some(path) = &opts.config_path {
        if !std::path::Path::new(path).exists() {
            return Err(format!("Config file '{}' does not exist", path));
        }
    }

    let report = run_simulation(&opts);
    if json {
        println!("{}", to_json(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}
