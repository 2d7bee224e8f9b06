//! In-memory document
//!
//! A small element tree with selector queries and batched child-list
//! mutation delivery. Mutations made while connected to the document are
//! queued; observers see them only when [`MemoryDocument::flush_mutations`]
//! is called, the same way a browser delivers one batch per microtask
//! checkpoint. Several appends before a flush therefore land in one batch.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::selector::{self, Combinator, Compound, ElementView, SelectorError};
use super::{Document, DomError, MutationCallback, Subscription};

/// Upper bound on rounds in [`MemoryDocument::flush_until_idle`].
const MAX_FLUSH_ROUNDS: usize = 64;

/// Handle to a node in a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// The document node itself. Never matched by selectors.
const ROOT: NodeId = NodeId(0);

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            text: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl ElementView for NodeData {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One child-list change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
}

#[derive(Clone)]
struct Observer {
    active: Rc<Cell<bool>>,
    callback: Rc<RefCell<MutationCallback>>,
}

struct MemorySubscription {
    active: Rc<Cell<bool>>,
}

impl Subscription for MemorySubscription {
    fn disconnect(&self) {
        self.active.set(false);
    }
}

/// Single-threaded in-memory DOM.
pub struct MemoryDocument {
    nodes: RefCell<Vec<NodeData>>,
    pending: RefCell<Vec<MutationRecord>>,
    observers: RefCell<Vec<Observer>>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// A document with no elements at all.
    pub fn new() -> Self {
        Self {
            nodes: RefCell::new(vec![NodeData::new("#document")]),
            pending: RefCell::new(Vec::new()),
            observers: RefCell::new(Vec::new()),
        }
    }

    /// `<html><head></head></html>`: a page whose body has not started
    /// parsing. Building it queues no mutations.
    pub fn with_head() -> Self {
        let doc = Self::new();
        {
            let mut nodes = doc.nodes.borrow_mut();
            nodes.push(NodeData::new("html"));
            nodes.push(NodeData::new("head"));
            let html = NodeId(1);
            let head = NodeId(2);
            nodes[ROOT.0].children.push(html);
            nodes[html.0].parent = Some(ROOT);
            nodes[html.0].children.push(head);
            nodes[head.0].parent = Some(html);
        }
        doc
    }

    // =========================================================================
    // Tree construction
    // =========================================================================

    /// Create a detached element.
    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(NodeData::new(tag));
        NodeId(nodes.len() - 1)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(data) = nodes.get_mut(node.0) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        match data.attrs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => data.attrs.push((name, value.to_string())),
        }
    }

    pub fn set_text(&self, node: NodeId, text: &str) {
        if let Some(data) = self.nodes.borrow_mut().get_mut(node.0) {
            data.text = text.to_string();
        }
    }

    /// Create `<tag>` and append it to `parent` in one step.
    pub fn append_new(&self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        let node = self.create_element(tag);
        self.append(parent, node)?;
        Ok(node)
    }

    /// Append `child` as the last child of `parent`, detaching it from any
    /// previous parent first.
    pub fn append(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let len = self.nodes.borrow().len();
        if parent.0 >= len || child.0 >= len {
            return Err(DomError::Operation("unknown node".to_string()));
        }
        if child == ROOT || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Operation(
                "cannot insert a node into its own subtree".to_string(),
            ));
        }
        self.detach(child);

        let mut nodes = self.nodes.borrow_mut();
        nodes[parent.0].children.push(child);
        nodes[child.0].parent = Some(parent);
        drop(nodes);

        self.record(MutationRecord {
            target: parent,
            added: vec![child],
            removed: Vec::new(),
        });
        Ok(())
    }

    /// Detach `node` from its parent. No-op for detached nodes.
    pub fn remove(&self, node: NodeId) {
        self.detach(node);
    }

    fn detach(&self, node: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent) = nodes.get(node.0).and_then(|n| n.parent) else {
            return;
        };
        nodes[parent.0].children.retain(|c| *c != node);
        nodes[node.0].parent = None;
        drop(nodes);

        self.record(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
        });
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = nodes[id.0].parent;
        }
        false
    }

    /// Whether `node` is attached under the document.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(ROOT, node)
    }

    fn record(&self, record: MutationRecord) {
        // Detached subtrees are not observed.
        if self.is_connected(record.target) {
            self.pending.borrow_mut().push(record);
        }
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn root(&self) -> NodeId {
        ROOT
    }

    pub fn document_element(&self) -> Option<NodeId> {
        self.children(ROOT).into_iter().next()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.query("body").ok().flatten()
    }

    pub fn tag(&self, node: NodeId) -> String {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|n| n.tag.clone())
            .unwrap_or_default()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes
            .borrow()
            .get(node.0)
            .and_then(|n| n.attribute(name).map(str::to_string))
    }

    pub fn text(&self, node: NodeId) -> String {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|n| n.text.clone())
            .unwrap_or_default()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.0).and_then(|n| n.parent)
    }

    /// Connected elements in document order.
    fn preorder(&self) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = nodes[ROOT.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// First connected element matching `selector`, in document order.
    pub fn query(&self, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    /// Every connected element matching `selector`, in document order.
    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = selector::parse(selector)?;
        let order = self.preorder();
        let nodes = self.nodes.borrow();
        Ok(order
            .into_iter()
            .filter(|id| {
                list.selectors
                    .iter()
                    .any(|complex| matches_complex(&nodes, *id, &complex.parts))
            })
            .collect())
    }

    // =========================================================================
    // Mutation delivery
    // =========================================================================

    /// Records queued since the last flush.
    pub fn pending_mutations(&self) -> Vec<MutationRecord> {
        self.pending.borrow().clone()
    }

    /// Number of observers still connected.
    pub fn observer_count(&self) -> usize {
        self.observers
            .borrow()
            .iter()
            .filter(|o| o.active.get())
            .count()
    }

    /// Deliver the queued batch to every connected observer. Returns `false`
    /// when there was nothing to deliver. Mutations made by observers land
    /// in the next batch.
    pub fn flush_mutations(&self) -> bool {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        if batch.is_empty() {
            return false;
        }
        log::trace!("delivering mutation batch of {} record(s)", batch.len());

        self.observers.borrow_mut().retain(|o| o.active.get());
        let observers: Vec<Observer> = self.observers.borrow().clone();
        for observer in observers {
            if observer.active.get() {
                let mut callback = observer.callback.borrow_mut();
                (&mut **callback)();
            }
        }
        true
    }

    /// Flush until no new mutations are produced. Returns the number of
    /// batches delivered.
    pub fn flush_until_idle(&self) -> usize {
        let mut rounds = 0;
        while rounds < MAX_FLUSH_ROUNDS && self.flush_mutations() {
            rounds += 1;
        }
        rounds
    }
}

fn matches_complex(nodes: &[NodeData], node: NodeId, parts: &[(Combinator, Compound)]) -> bool {
    let Some(((combinator, compound), rest)) = parts.split_last() else {
        return true;
    };
    if node == ROOT || !compound.matches(&nodes[node.0]) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }
    match combinator {
        Combinator::Child => match nodes[node.0].parent {
            Some(parent) => matches_complex(nodes, parent, rest),
            None => false,
        },
        Combinator::Descendant => {
            let mut ancestor = nodes[node.0].parent;
            while let Some(id) = ancestor {
                if matches_complex(nodes, id, rest) {
                    return true;
                }
                ancestor = nodes[id.0].parent;
            }
            false
        }
    }
}

impl Document for MemoryDocument {
    type Element = NodeId;

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        match self.query(selector) {
            Ok(found) => found,
            Err(e) => {
                log::trace!("invalid selector {:?}: {}", selector, e);
                None
            }
        }
    }

    fn head(&self) -> Option<NodeId> {
        self.query_selector("head")
    }

    fn create_style(&self, css: &str) -> Result<NodeId, DomError> {
        let style = self.create_element("style");
        self.set_text(style, css);
        Ok(style)
    }

    fn create_link(&self, rel: &str, href: &str) -> Result<NodeId, DomError> {
        let link = self.create_element("link");
        self.set_attribute(link, "rel", rel);
        self.set_attribute(link, "href", href);
        Ok(link)
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), DomError> {
        self.append(*parent, *child)
    }

    fn observe_child_list(
        &self,
        on_batch: MutationCallback,
    ) -> Result<Box<dyn Subscription>, DomError> {
        let active = Rc::new(Cell::new(true));
        self.observers.borrow_mut().push(Observer {
            active: active.clone(),
            callback: Rc::new(RefCell::new(on_batch)),
        });
        Ok(Box::new(MemorySubscription { active }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> (MemoryDocument, NodeId) {
        let doc = MemoryDocument::with_head();
        let html = doc.document_element().unwrap();
        let body = doc.append_new(html, "body").unwrap();
        doc.flush_mutations();
        (doc, body)
    }

    #[test]
    fn test_skeleton() {
        let doc = MemoryDocument::with_head();
        assert!(doc.head().is_some());
        assert!(doc.body().is_none());
        assert!(doc.pending_mutations().is_empty());
    }

    #[test]
    fn test_query_document_order() {
        let (doc, body) = page();
        let first = doc.append_new(body, "div").unwrap();
        doc.set_attribute(first, "class", "logo");
        let wrapper = doc.append_new(body, "div").unwrap();
        let nested = doc.append_new(wrapper, "img").unwrap();
        doc.set_attribute(nested, "class", "logo");

        assert_eq!(doc.query(".logo").unwrap(), Some(first));
        assert_eq!(doc.query("div > img.logo").unwrap(), Some(nested));
        assert_eq!(doc.query("body img").unwrap(), Some(nested));
        assert_eq!(doc.query("head img").unwrap(), None);
        assert_eq!(doc.query_all(".logo").unwrap(), vec![first, nested]);
    }

    #[test]
    fn test_detached_nodes_are_invisible() {
        let (doc, _) = page();
        let loose = doc.create_element("div");
        doc.set_attribute(loose, "id", "loose");
        let child = doc.append_new(loose, "span").unwrap();
        assert!(doc.pending_mutations().is_empty());
        assert_eq!(doc.query("#loose").unwrap(), None);
        assert!(!doc.is_connected(child));
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let (doc, _) = page();
        assert!(doc.query("div!").is_err());
        assert_eq!(doc.query_selector("div!"), None);
    }

    #[test]
    fn test_append_reparents_and_rejects_cycles() {
        let (doc, body) = page();
        let a = doc.append_new(body, "div").unwrap();
        let b = doc.append_new(a, "div").unwrap();
        assert!(doc.append(b, a).is_err());
        doc.append(body, b).unwrap();
        assert_eq!(doc.parent(b), Some(body));
        assert!(doc.children(a).is_empty());
    }

    #[test]
    fn test_batches_and_disconnect() {
        let (doc, body) = page();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let sub = doc
            .observe_child_list(Box::new(move || counter.set(counter.get() + 1)))
            .unwrap();

        doc.append_new(body, "div").unwrap();
        doc.append_new(body, "div").unwrap();
        assert_eq!(doc.pending_mutations().len(), 2);
        assert!(doc.flush_mutations());
        assert_eq!(calls.get(), 1);
        assert!(!doc.flush_mutations());

        sub.disconnect();
        assert_eq!(doc.observer_count(), 0);
        doc.append_new(body, "div").unwrap();
        doc.flush_mutations();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_style_and_link_creation() {
        let doc = MemoryDocument::with_head();
        let style = doc.create_style("a > b { color: red }").unwrap();
        assert_eq!(doc.tag(style), "style");
        assert_eq!(doc.text(style), "a > b { color: red }");
        let link = doc.create_link("icon", "").unwrap();
        assert_eq!(doc.attribute(link, "rel").as_deref(), Some("icon"));
        assert_eq!(doc.attribute(link, "href").as_deref(), Some(""));
    }
}
