//! Route keys and the dispatch table
//!
//! A route key is `(subdomain, page)`: the leftmost host label and `"/"`
//! plus the first path segment. It is computed once per page load and
//! decides which page handlers run.

use std::fmt;

use crate::url::{extract_host, extract_path, first_path_segment, leftmost_label};

/// Subdomains that start the router on any page.
pub const SUPPORTED_SUBDOMAINS: &[&str] = &[
    "patents", "scholar", "books", "shopping", "news", "trends", "www", "images", "earth",
];

/// Pages that start the router on any subdomain.
pub const SUPPORTED_PAGES: &[&str] = &[
    "/maps", "/videohp", "/finance", "/travel", "/", "/webhp", "/imghp", "/search",
];

// =============================================================================
// Route Key
// =============================================================================

/// Where the content script is running.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub subdomain: String,
    pub page: String,
}

impl RouteKey {
    pub fn new(subdomain: impl Into<String>, page: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            page: page.into(),
        }
    }

    /// From the `host` and `pathname` parts of a location.
    pub fn from_location(host: &str, pathname: &str) -> Self {
        let host = host.to_ascii_lowercase();
        Self {
            subdomain: leftmost_label(&host).to_string(),
            page: format!("/{}", first_path_segment(pathname)),
        }
    }

    /// From a full navigation URL. A URL without a host gives an empty
    /// subdomain, which is never supported by subdomain.
    pub fn from_url(url: &str) -> Self {
        let host = extract_host(url).unwrap_or("");
        Self::from_location(host, extract_path(url))
    }

    /// Whether the router should start at all.
    pub fn is_supported(&self) -> bool {
        SUPPORTED_SUBDOMAINS.contains(&self.subdomain.as_str())
            || SUPPORTED_PAGES.contains(&self.page.as_str())
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subdomain = \"{}\", page = \"{}\"", self.subdomain, self.page)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Page handlers the router can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handler {
    Patents,
    Scholar,
    Books,
    Ngrams,
    Shopping,
    News,
    Trends,
    Earth,
    Maps,
    Videos,
    Finance,
    Travel,
    /// Shared search-page styling, always followed by Home or Results
    SearchStyles,
    SearchHome,
    SearchResults,
}

impl Handler {
    pub const ALL: [Handler; 15] = [
        Self::Patents,
        Self::Scholar,
        Self::Books,
        Self::Ngrams,
        Self::Shopping,
        Self::News,
        Self::Trends,
        Self::Earth,
        Self::Maps,
        Self::Videos,
        Self::Finance,
        Self::Travel,
        Self::SearchStyles,
        Self::SearchHome,
        Self::SearchResults,
    ];

    /// Name of the JS function implementing this handler.
    pub fn js_name(self) -> &'static str {
        match self {
            Self::Patents => "Replace_Patents",
            Self::Scholar => "Replace_Scholar",
            Self::Books => "Replace_Books",
            Self::Ngrams => "Replace_Ngrams",
            Self::Shopping => "Replace_Shopping",
            Self::News => "Replace_News",
            Self::Trends => "Replace_Trends",
            Self::Earth => "Replace_Earth",
            Self::Maps => "Replace_Maps",
            Self::Videos => "Replace_Videos",
            Self::Finance => "Replace_Finance",
            Self::Travel => "Replace_Travel",
            Self::SearchStyles => "Replace_Search_Styles",
            Self::SearchHome => "Replace_Search_Home",
            Self::SearchResults => "Replace_Search_Results",
        }
    }

    pub fn from_js_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|h| h.js_name() == name)
    }
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.js_name())
    }
}

/// Handlers to run for `route`, in order. Empty when nothing applies.
pub fn dispatch_plan(route: &RouteKey) -> Vec<Handler> {
    let page = route.page.as_str();
    match route.subdomain.as_str() {
        "patents" => vec![Handler::Patents],
        "scholar" => vec![Handler::Scholar],
        "books" if page == "/ngrams" => vec![Handler::Ngrams],
        "books" => vec![Handler::Books],
        "shopping" => vec![Handler::Shopping],
        "news" => vec![Handler::News],
        "trends" => vec![Handler::Trends],
        "earth" => vec![Handler::Earth],
        "www" | "images" => match page {
            "/maps" => vec![Handler::Maps],
            "/videohp" => vec![Handler::Videos],
            "/finance" => vec![Handler::Finance],
            "/travel" => vec![Handler::Travel],
            // Newer Books results live under www
            "/books" => vec![Handler::Books],
            "/" | "/webhp" | "/imghp" => vec![Handler::SearchStyles, Handler::SearchHome],
            "/search" => vec![Handler::SearchStyles, Handler::SearchResults],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}
