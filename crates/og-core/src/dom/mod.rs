//! Host document abstraction
//!
//! The core never touches a concrete DOM. Everything it needs from the page
//! goes through [`Document`]: selector queries, element creation, appending,
//! and subtree child-list observation. The wasm binding implements it over
//! `web_sys::Document`; [`memory::MemoryDocument`] implements it in memory.

pub mod memory;
pub mod selector;

pub use memory::{MemoryDocument, NodeId};

/// Error type for host DOM operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Document has no <head> element")]
    MissingHead,
    #[error("DOM operation failed: {0}")]
    Operation(String),
}

/// Called once per delivered mutation batch.
pub type MutationCallback = Box<dyn FnMut()>;

/// A live mutation observation. Disconnecting is idempotent.
pub trait Subscription {
    fn disconnect(&self);
}

/// Everything the core needs from the host page.
pub trait Document {
    /// Handle to an element in this document.
    type Element: Clone + 'static;

    /// First element in document order matching `selector`. An invalid
    /// selector matches nothing.
    fn query_selector(&self, selector: &str) -> Option<Self::Element>;

    /// The `<head>` element, if parsed yet.
    fn head(&self) -> Option<Self::Element>;

    /// A detached `<style>` holding `css` verbatim as a text node.
    fn create_style(&self, css: &str) -> Result<Self::Element, DomError>;

    /// A detached `<link rel=.. href=..>`.
    fn create_link(&self, rel: &str, href: &str) -> Result<Self::Element, DomError>;

    fn append_child(&self, parent: &Self::Element, child: &Self::Element) -> Result<(), DomError>;

    /// Observe child-list mutations anywhere under the document.
    /// `on_batch` runs once per delivered batch until disconnected.
    fn observe_child_list(
        &self,
        on_batch: MutationCallback,
    ) -> Result<Box<dyn Subscription>, DomError>;
}
