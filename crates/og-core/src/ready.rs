//! DOM readiness primitive
//!
//! [`when_ready`] runs a callback exactly once, as soon as any of a list of
//! selectors first matches an element. If one already matches, the callback
//! runs synchronously and no observer is created. Otherwise the whole
//! document subtree is observed and every mutation batch re-scans the list.
//!
//! The scan is in list order: when several selectors match in the same
//! batch, the earliest selector in the list wins, regardless of where the
//! elements sit in the document.
//!
//! The fire-once guarantee is enforced by the observer handler itself: it
//! takes the callback out of shared state and disconnects its own
//! subscription before invoking it. The observer owns the wait, so a wait
//! that never matches stays connected until the page goes away or
//! [`ReadyHandle::cancel`] is called.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::dom::{Document, DomError, Subscription};
use crate::logger::DebugLog;

// =============================================================================
// Selector Lists
// =============================================================================

/// One selector or an ordered list of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectors(Vec<String>);

impl Selectors {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// `"a", "b"` form used in trace lines.
    pub fn describe(&self) -> String {
        format!("\"{}\"", self.0.join("\", \""))
    }
}

impl From<&str> for Selectors {
    fn from(selector: &str) -> Self {
        Self(vec![selector.to_string()])
    }
}

impl From<String> for Selectors {
    fn from(selector: String) -> Self {
        Self(vec![selector])
    }
}

impl From<&[&str]> for Selectors {
    fn from(selectors: &[&str]) -> Self {
        Self(selectors.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Selectors {
    fn from(selectors: [&str; N]) -> Self {
        Self(selectors.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<String>> for Selectors {
    fn from(selectors: Vec<String>) -> Self {
        Self(selectors)
    }
}

/// First element matching any selector, trying selectors in list order.
pub fn first_match<D: Document + ?Sized>(doc: &D, selectors: &Selectors) -> Option<D::Element> {
    selectors
        .as_slice()
        .iter()
        .find_map(|selector| doc.query_selector(selector))
}

// =============================================================================
// Handle
// =============================================================================

type Callback<E> = Box<dyn FnOnce(E)>;

struct Wait<E> {
    callback: Option<Callback<E>>,
    subscription: Option<Box<dyn Subscription>>,
}

impl<E> Wait<E> {
    /// Take the callback and drop the observer. After this the wait is
    /// settled and nothing can fire it again.
    fn settle(&mut self) -> Option<Callback<E>> {
        if let Some(subscription) = self.subscription.take() {
            subscription.disconnect();
        }
        self.callback.take()
    }
}

/// Outcome of a [`when_ready`] call.
///
/// Dropping the handle does not cancel the wait.
pub struct ReadyHandle<E> {
    wait: Option<Rc<RefCell<Wait<E>>>>,
}

impl<E> ReadyHandle<E> {
    fn fired() -> Self {
        Self { wait: None }
    }

    /// `true` until the callback has run or the wait was cancelled.
    pub fn is_pending(&self) -> bool {
        self.wait
            .as_ref()
            .map(|wait| wait.borrow().callback.is_some())
            .unwrap_or(false)
    }

    /// Whether the callback ran synchronously inside [`when_ready`].
    pub fn fired_immediately(&self) -> bool {
        self.wait.is_none()
    }

    /// Stop waiting. The callback will never run. No-op once settled.
    pub fn cancel(&self) {
        if let Some(wait) = &self.wait {
            let callback = wait.borrow_mut().settle();
            drop(callback);
        }
    }
}

impl<E> fmt::Debug for ReadyHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadyHandle")
            .field("pending", &self.is_pending())
            .field("immediate", &self.fired_immediately())
            .finish()
    }
}

// =============================================================================
// Readiness
// =============================================================================

/// Run `callback` once an element matching any of `selectors` exists.
///
/// `caller` only tags the trace lines written to `logger`.
pub fn when_ready<D, S, F>(
    doc: &Rc<D>,
    selectors: S,
    logger: &DebugLog,
    caller: &str,
    callback: F,
) -> Result<ReadyHandle<D::Element>, DomError>
where
    D: Document + 'static,
    S: Into<Selectors>,
    F: FnOnce(D::Element) + 'static,
{
    let selectors = selectors.into();
    logger.log_with(caller, || format!("when_ready({}): Running...", selectors.describe()));

    if let Some(element) = first_match(doc.as_ref(), &selectors) {
        logger.log_with(caller, || format!("when_ready({}): Loaded.", selectors.describe()));
        callback(element);
        return Ok(ReadyHandle::fired());
    }

    let wait = Rc::new(RefCell::new(Wait {
        callback: Some(Box::new(callback) as Callback<D::Element>),
        subscription: None,
    }));

    let on_batch = {
        let doc: Weak<D> = Rc::downgrade(doc);
        let wait = wait.clone();
        let logger = logger.clone();
        let caller = caller.to_string();
        move || {
            let Some(doc) = doc.upgrade() else {
                return;
            };
            if wait.borrow().callback.is_none() {
                return;
            }
            let Some(element) = first_match(doc.as_ref(), &selectors) else {
                return;
            };
            // Release the borrow before running user code, which may start
            // further waits or mutate the document.
            let callback = wait.borrow_mut().settle();
            if let Some(callback) = callback {
                logger.log_with(&caller, || {
                    format!("when_ready({}): Loaded.", selectors.describe())
                });
                callback(element);
            }
        }
    };

    let subscription = doc.observe_child_list(Box::new(on_batch))?;
    wait.borrow_mut().subscription = Some(subscription);

    Ok(ReadyHandle { wait: Some(wait) })
}
