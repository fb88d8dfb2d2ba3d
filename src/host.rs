//! Navigation host capability
//!
//! [`History`](crate::History) never touches a browser directly. Everything it
//! needs from `window.location`, `window.history`, event listeners, timers and
//! the legacy iframe goes through [`NavigationHost`]. A WebAssembly binding
//! implements the trait over `web-sys`; [`MemoryHost`] implements it in memory
//! with a session-history stack, for tests and headless use.
//!
//! The host is the side that observes browser events. History hands it a
//! [`NavigationListener`] when it starts; the host invokes that listener when a
//! listened-for event fires or the polling timer ticks, and drops it when
//! history stops. The listener ends up in
//! [`History::check_url`](crate::History::check_url).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Callback a host invokes when navigation may have happened
pub type NavigationListener = Rc<dyn Fn()>;

/// Browser events that history can listen for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationEvent {
    /// `popstate`, fired on back/forward between history-state entries
    PopState,
    /// `hashchange`, fired when the location hash changes
    HashChange,
}

/// Everything history needs from the browser.
///
/// Methods take `&self`; implementations use interior mutability.
pub trait NavigationHost {
    /// `location.pathname`
    fn pathname(&self) -> String;

    /// `location.search`, including the leading `?` when present
    fn search(&self) -> String;

    /// `location.href`
    fn href(&self) -> String;

    /// Whether `history.pushState` is available
    fn supports_push_state(&self) -> bool;

    /// Whether the `hashchange` event is available
    fn supports_hash_change(&self) -> bool;

    /// Whether the engine needs the hidden iframe to record hash history
    fn is_legacy_engine(&self) -> bool {
        false
    }

    /// `history.pushState({}, title, url)`
    fn push_state(&self, url: &str);

    /// `history.replaceState({}, title, url)`
    fn replace_state(&self, url: &str);

    /// `location.assign(url)`: a full page navigation
    fn assign(&self, url: &str);

    /// `location.replace(url)`
    fn replace(&self, url: &str);

    /// `location.hash = '#' + fragment`
    fn set_hash(&self, fragment: &str);

    /// Invoke `listener` whenever `event` fires, replacing any earlier one
    fn listen(&self, event: NavigationEvent, listener: NavigationListener);

    /// Drop the listener for `event`. Unknown events are ignored.
    fn unlisten(&self, event: NavigationEvent);

    /// Invoke `listener` at a fixed interval
    fn start_timer(&self, interval: Duration, listener: NavigationListener);

    /// Stop the polling timer and drop its listener. A no-op when none is running.
    fn stop_timer(&self);

    /// Create the hidden iframe. Returns false when the host cannot.
    fn create_frame(&self) -> bool {
        false
    }

    /// `location.href` of the hidden iframe, if one exists
    fn frame_href(&self) -> Option<String> {
        None
    }

    /// Update the iframe hash, adding a history entry unless `replace`
    fn set_frame_hash(&self, _fragment: &str, _replace: bool) {}

    /// Remove the hidden iframe. A no-op when none exists.
    fn remove_frame(&self) {}
}

/// The part of `href` after the first `#`, or an empty string
pub fn hash_of(href: &str) -> &str {
    href.split_once('#').map(|(_, hash)| hash).unwrap_or("")
}

// ============================================================================
// Session history
// ============================================================================

/// A linear session-history stack with a cursor
#[derive(Debug, Clone, PartialEq)]
struct SessionHistory {
    entries: Vec<String>,
    current: usize,
}

impl SessionHistory {
    fn new(initial: String) -> Self {
        Self {
            entries: vec![initial],
            current: 0,
        }
    }

    fn current(&self) -> &str {
        &self.entries[self.current]
    }

    /// Truncates forward history and adds a new entry
    fn push(&mut self, url: String) {
        self.entries.truncate(self.current + 1);
        self.entries.push(url);
        self.current += 1;
    }

    fn replace(&mut self, url: String) {
        self.entries[self.current] = url;
    }

    fn back(&mut self) -> bool {
        if self.current > 0 {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    fn forward(&mut self) -> bool {
        if self.current + 1 < self.entries.len() {
            self.current += 1;
            true
        } else {
            false
        }
    }
}

fn split_url(url: &str) -> (&str, &str, &str) {
    let (rest, hash) = url.split_once('#').unwrap_or((url, ""));
    let (path, search) = match rest.find('?') {
        Some(index) => rest.split_at(index),
        None => (rest, ""),
    };
    (path, search, hash)
}

fn strip_hash(url: &str) -> &str {
    url.split_once('#').map(|(rest, _)| rest).unwrap_or(url)
}

// ============================================================================
// MemoryHost
// ============================================================================

struct MemoryState {
    origin: String,
    session: SessionHistory,
    push_state: bool,
    hash_change: bool,
    legacy: bool,
    synchronous: bool,
    listeners: HashMap<NavigationEvent, NavigationListener>,
    timer: Option<(Duration, NavigationListener)>,
    frame: Option<SessionHistory>,
    page_loads: usize,
    state_writes: usize,
    hash_writes: usize,
}

impl MemoryState {
    fn listener(&self, event: NavigationEvent) -> Option<NavigationListener> {
        self.listeners.get(&event).map(Rc::clone)
    }

    /// The `hashchange` listener to run after a programmatic hash write
    fn synchronous_hash_change(&self, previous_hash: &str) -> Option<NavigationListener> {
        if self.synchronous && hash_of(self.session.current()) != previous_hash {
            self.listener(NavigationEvent::HashChange)
        } else {
            None
        }
    }
}

impl fmt::Debug for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryState")
            .field("url", &self.session.current())
            .field("history_len", &self.session.entries.len())
            .field("synchronous", &self.synchronous)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .field("timer", &self.timer.as_ref().map(|(interval, _)| *interval))
            .field("frame", &self.frame.as_ref().map(SessionHistory::current))
            .finish()
    }
}

/// Runs a listener taken out of the state, after its borrow has ended
fn fire(listener: Option<NavigationListener>) -> bool {
    match listener {
        Some(listener) => {
            listener();
            true
        }
        None => false,
    }
}

/// An in-memory browser
///
/// Cloning yields another handle to the same browser, so a test can keep one
/// handle while history owns another.
///
/// # Example
///
/// ```
/// use client_mvc::{MemoryHost, NavigationHost};
///
/// let host = MemoryHost::new("/app/posts?sort=asc#top");
/// assert_eq!(host.pathname(), "/app/posts");
/// assert_eq!(host.search(), "?sort=asc");
/// assert_eq!(host.href(), "http://localhost/app/posts?sort=asc#top");
///
/// host.push_state("/app/users");
/// assert_eq!(host.url(), "/app/users");
/// host.back();
/// assert_eq!(host.url(), "/app/posts?sort=asc#top");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryHost {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryHost {
    /// A modern browser at `url` (path, query and hash, e.g. `/app#home`)
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            state: Rc::new(RefCell::new(MemoryState {
                origin: "http://localhost".to_string(),
                session: SessionHistory::new(url.into()),
                push_state: true,
                hash_change: true,
                legacy: false,
                synchronous: false,
                listeners: HashMap::new(),
                timer: None,
                frame: None,
                page_loads: 0,
                state_writes: 0,
                hash_writes: 0,
            })),
        }
    }

    /// Toggle `history.pushState` support
    pub fn with_push_state(self, supported: bool) -> Self {
        self.state.borrow_mut().push_state = supported;
        self
    }

    /// Toggle `hashchange` support
    pub fn with_hash_change(self, supported: bool) -> Self {
        self.state.borrow_mut().hash_change = supported;
        self
    }

    /// A legacy engine: no push state, no usable `hashchange`, needs the iframe
    pub fn legacy(self) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.push_state = false;
            state.hash_change = false;
            state.legacy = true;
        }
        self
    }

    /// Fire `hashchange` from inside `set_hash` and `replace`, the way a
    /// host that dispatches events synchronously would
    pub fn with_synchronous_events(self) -> Self {
        self.state.borrow_mut().synchronous = true;
        self
    }

    /// Current URL (path, query and hash)
    pub fn url(&self) -> String {
        self.state.borrow().session.current().to_string()
    }

    /// Number of session-history entries
    pub fn history_len(&self) -> usize {
        self.state.borrow().session.entries.len()
    }

    /// Full page loads triggered by `assign`
    pub fn page_loads(&self) -> usize {
        self.state.borrow().page_loads
    }

    /// Calls to `push_state` and `replace_state`
    pub fn state_writes(&self) -> usize {
        self.state.borrow().state_writes
    }

    /// Location writes through `set_hash` and `replace`
    pub fn hash_writes(&self) -> usize {
        self.state.borrow().hash_writes
    }

    /// Whether `event` is being listened for
    pub fn is_listening(&self, event: NavigationEvent) -> bool {
        self.state.borrow().listeners.contains_key(&event)
    }

    /// Interval of the running polling timer
    pub fn timer(&self) -> Option<Duration> {
        self.state.borrow().timer.as_ref().map(|(interval, _)| *interval)
    }

    /// Whether the hidden iframe exists
    pub fn has_frame(&self) -> bool {
        self.state.borrow().frame.is_some()
    }

    /// Hash of the hidden iframe
    pub fn frame_hash(&self) -> Option<String> {
        let state = self.state.borrow();
        state
            .frame
            .as_ref()
            .map(|frame| hash_of(frame.current()).to_string())
    }

    /// Number of entries recorded in the hidden iframe
    pub fn frame_history_len(&self) -> usize {
        let state = self.state.borrow();
        state.frame.as_ref().map_or(0, |frame| frame.entries.len())
    }

    /// Simulate the user entering a URL that stays on the page (hash or
    /// same-document change). Returns the event fired, after its listener ran.
    pub fn visit(&self, url: impl Into<String>) -> Option<NavigationEvent> {
        let url = url.into();
        let listener = {
            let mut state = self.state.borrow_mut();
            let hash_changed = hash_of(&url) != hash_of(state.session.current());
            state.session.push(url);
            if hash_changed {
                state.listener(NavigationEvent::HashChange)
            } else {
                None
            }
        };
        fire(listener).then_some(NavigationEvent::HashChange)
    }

    /// Simulate the back button. Returns the event fired, after its listener ran.
    pub fn back(&self) -> Option<NavigationEvent> {
        self.traverse(SessionHistory::back)
    }

    /// Simulate the forward button. Returns the event fired, after its listener ran.
    pub fn forward(&self) -> Option<NavigationEvent> {
        self.traverse(SessionHistory::forward)
    }

    /// Run one polling-timer tick. Returns false when no timer is running.
    pub fn tick(&self) -> bool {
        let listener = self
            .state
            .borrow()
            .timer
            .as_ref()
            .map(|(_, listener)| Rc::clone(listener));
        fire(listener)
    }

    /// Simulate the back button inside the hidden iframe
    pub fn frame_back(&self) -> bool {
        let mut state = self.state.borrow_mut();
        state.frame.as_mut().is_some_and(SessionHistory::back)
    }

    fn traverse(&self, step: fn(&mut SessionHistory) -> bool) -> Option<NavigationEvent> {
        let (event, listener) = {
            let mut state = self.state.borrow_mut();
            let before = hash_of(state.session.current()).to_string();
            if !step(&mut state.session) {
                return None;
            }
            let hash_changed = hash_of(state.session.current()) != before;

            if let Some(listener) = state.listener(NavigationEvent::PopState) {
                (NavigationEvent::PopState, listener)
            } else if let Some(listener) = state
                .listener(NavigationEvent::HashChange)
                .filter(|_| hash_changed)
            {
                (NavigationEvent::HashChange, listener)
            } else {
                return None;
            }
        };
        listener();
        Some(event)
    }
}

impl NavigationHost for MemoryHost {
    fn pathname(&self) -> String {
        let state = self.state.borrow();
        split_url(state.session.current()).0.to_string()
    }

    fn search(&self) -> String {
        let state = self.state.borrow();
        split_url(state.session.current()).1.to_string()
    }

    fn href(&self) -> String {
        let state = self.state.borrow();
        format!("{}{}", state.origin, state.session.current())
    }

    fn supports_push_state(&self) -> bool {
        self.state.borrow().push_state
    }

    fn supports_hash_change(&self) -> bool {
        self.state.borrow().hash_change
    }

    fn is_legacy_engine(&self) -> bool {
        self.state.borrow().legacy
    }

    fn push_state(&self, url: &str) {
        let mut state = self.state.borrow_mut();
        state.session.push(url.to_string());
        state.state_writes += 1;
    }

    fn replace_state(&self, url: &str) {
        let mut state = self.state.borrow_mut();
        state.session.replace(url.to_string());
        state.state_writes += 1;
    }

    fn assign(&self, url: &str) {
        let mut state = self.state.borrow_mut();
        state.session.push(url.to_string());
        state.page_loads += 1;
    }

    fn replace(&self, url: &str) {
        let listener = {
            let mut state = self.state.borrow_mut();
            let previous_hash = hash_of(state.session.current()).to_string();
            state.session.replace(url.to_string());
            state.hash_writes += 1;
            state.synchronous_hash_change(&previous_hash)
        };
        fire(listener);
    }

    fn set_hash(&self, fragment: &str) {
        let listener = {
            let mut state = self.state.borrow_mut();
            let previous_hash = hash_of(state.session.current()).to_string();
            let url = format!("{}#{}", strip_hash(state.session.current()), fragment);
            if url != state.session.current() {
                state.session.push(url);
            }
            state.hash_writes += 1;
            state.synchronous_hash_change(&previous_hash)
        };
        fire(listener);
    }

    fn listen(&self, event: NavigationEvent, listener: NavigationListener) {
        self.state.borrow_mut().listeners.insert(event, listener);
    }

    fn unlisten(&self, event: NavigationEvent) {
        let removed = self.state.borrow_mut().listeners.remove(&event);
        drop(removed);
    }

    fn start_timer(&self, interval: Duration, listener: NavigationListener) {
        self.state.borrow_mut().timer = Some((interval, listener));
    }

    fn stop_timer(&self) {
        let removed = self.state.borrow_mut().timer.take();
        drop(removed);
    }

    fn create_frame(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.legacy {
            state.frame = Some(SessionHistory::new("about:blank".to_string()));
        }
        state.legacy
    }

    fn frame_href(&self) -> Option<String> {
        let state = self.state.borrow();
        state.frame.as_ref().map(|frame| frame.current().to_string())
    }

    fn set_frame_hash(&self, fragment: &str, replace: bool) {
        let mut state = self.state.borrow_mut();
        if let Some(frame) = state.frame.as_mut() {
            let url = format!("about:blank#{}", fragment);
            if replace {
                frame.replace(url);
            } else {
                frame.push(url);
            }
        }
    }

    fn remove_frame(&self) {
        self.state.borrow_mut().frame = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
