//! Render host abstraction
//!
//! Regions and views never touch a real document. They go through
//! [`RenderHost`], which resolves selectors, replaces container content and
//! binds event handlers. [`MemoryDocument`] keeps all of that in memory and
//! lets tests fire events.

use crate::trace_log;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Handler bound to an element event
pub type EventHandler = Rc<dyn Fn()>;

/// Document operations needed by regions and views
pub trait RenderHost {
    /// Whether an element matches the selector
    fn contains(&self, selector: &str) -> bool;

    /// Replace the content of the matching element
    fn set_content(&self, selector: &str, html: &str);

    /// Remove the content of the matching element
    fn clear(&self, selector: &str);

    /// Bind a handler for an event on the matching element
    fn on(&self, selector: &str, event: &str, handler: EventHandler);

    /// Remove every handler for an event on the matching element
    fn off(&self, selector: &str, event: &str);
}

// ============================================================================
// MemoryDocument
// ============================================================================

#[derive(Default)]
struct DocumentState {
    content: HashMap<String, String>,
    handlers: HashMap<(String, String), Vec<EventHandler>>,
    journal: Vec<String>,
}

impl DocumentState {
    /// `#id` selectors also match elements written into another container
    fn contains(&self, selector: &str) -> bool {
        if self.content.contains_key(selector) {
            return true;
        }
        match selector.strip_prefix('#') {
            Some(id) if !id.is_empty() => {
                let attr = format!("id=\"{}\"", id);
                self.content.values().any(|html| html.contains(&attr))
            }
            _ => false,
        }
    }
}

/// In-memory document
///
/// Containers are registered with [`MemoryDocument::with_container`]. Content
/// written into a container makes any `id="..."` element in it addressable by
/// its `#id` selector, which is how nested regions appear once their parent
/// view renders.
///
/// Like a selector library, operations on a selector that matches nothing do
/// nothing. Clones share the same document.
///
/// # Example
///
/// ```
/// use client_mvc::{MemoryDocument, RenderHost};
///
/// let doc = MemoryDocument::new().with_container("#app");
/// assert!(!doc.contains("#sidebar"));
///
/// doc.set_content("#app", r#"<aside id="sidebar"></aside>"#);
/// assert!(doc.contains("#sidebar"));
/// ```
#[derive(Clone, Default)]
pub struct MemoryDocument {
    state: Rc<RefCell<DocumentState>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty container
    pub fn with_container(self, selector: impl Into<String>) -> Self {
        self.add_container(selector);
        self
    }

    pub fn add_container(&self, selector: impl Into<String>) {
        self.state
            .borrow_mut()
            .content
            .entry(selector.into())
            .or_default();
    }

    /// Remove a container and everything bound to it
    pub fn remove_container(&self, selector: &str) {
        let mut state = self.state.borrow_mut();
        state.content.remove(selector);
        state.handlers.retain(|(bound, _), _| bound != selector);
    }

    /// Current content of a container
    pub fn content(&self, selector: &str) -> Option<String> {
        self.state.borrow().content.get(selector).cloned()
    }

    /// Number of handlers bound for an event
    pub fn handler_count(&self, selector: &str, event: &str) -> usize {
        self.state
            .borrow()
            .handlers
            .get(&(selector.to_string(), event.to_string()))
            .map_or(0, Vec::len)
    }

    /// Fire an event, returning how many handlers ran
    pub fn trigger(&self, selector: &str, event: &str) -> usize {
        // Handlers may bind or unbind while running
        let handlers = self
            .state
            .borrow()
            .handlers
            .get(&(selector.to_string(), event.to_string()))
            .cloned()
            .unwrap_or_default();

        for handler in &handlers {
            handler();
        }
        handlers.len()
    }

    /// Bind and unbind operations in the order they happened
    ///
    /// Entries read `on <selector> <event>` or `off <selector> <event>`.
    pub fn journal(&self) -> Vec<String> {
        self.state.borrow().journal.clone()
    }
}

impl RenderHost for MemoryDocument {
    fn contains(&self, selector: &str) -> bool {
        self.state.borrow().contains(selector)
    }

    fn set_content(&self, selector: &str, html: &str) {
        let mut state = self.state.borrow_mut();
        if state.contains(selector) {
            trace_log!("Setting content of '{}'", selector);
            state.content.insert(selector.to_string(), html.to_string());
        }
    }

    fn clear(&self, selector: &str) {
        if let Some(content) = self.state.borrow_mut().content.get_mut(selector) {
            content.clear();
        }
    }

    fn on(&self, selector: &str, event: &str, handler: EventHandler) {
        let mut state = self.state.borrow_mut();
        if !state.contains(selector) {
            return;
        }
        state
            .handlers
            .entry((selector.to_string(), event.to_string()))
            .or_default()
            .push(handler);
        state.journal.push(format!("on {} {}", selector, event));
    }

    fn off(&self, selector: &str, event: &str) {
        let mut state = self.state.borrow_mut();
        state
            .handlers
            .remove(&(selector.to_string(), event.to_string()));
        state.journal.push(format!("off {} {}", selector, event));
    }
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        let mut containers: Vec<&String> = state.content.keys().collect();
        containers.sort();
        f.debug_struct("MemoryDocument")
            .field("containers", &containers)
            .field("bound_events", &state.handlers.len())
            .finish()
    }
}
