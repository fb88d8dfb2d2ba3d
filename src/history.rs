//! Navigation history
//!
//! [`History`] is the navigation engine shared by every router of an
//! application. It reconciles three browser mechanisms behind one API:
//!
//! - history-state URLs (`pushState` + `popstate`)
//! - hash fragments (`location.hash` + `hashchange`)
//! - polling the hash on a timer, with a hidden iframe recording hash
//!   history on legacy engines
//!
//! The mechanism is chosen once, at [`History::start`], from the requested
//! [`HistoryOptions`] and what the [`NavigationHost`] supports, and is held as
//! a [`NavigationMode`] until [`History::stop`].
//!
//! Routes are registered before `start()`. The most recently registered route
//! is checked first and the first match wins.
//!
//! # Example
//!
//! ```
//! use client_mvc::{compile, History, HistoryOptions, MemoryHost, NavigationMode};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use std::sync::Arc;
//!
//! let host = MemoryHost::new("/#posts/7");
//! let history = History::new(host.clone());
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! history
//!     .route(Arc::new(compile("posts/:id").unwrap()), move |fragment| {
//!         sink.borrow_mut().push(fragment.to_string());
//!     })
//!     .unwrap();
//!
//! assert!(history.start(HistoryOptions::default()).unwrap());
//! assert_eq!(history.mode(), Some(NavigationMode::HashChange));
//! assert_eq!(*seen.borrow(), vec!["posts/7".to_string()]);
//!
//! history.navigate("posts/8", true);
//! assert_eq!(host.url(), "/#posts/8");
//! assert_eq!(seen.borrow().len(), 2);
//! ```

use crate::compiler::CompiledPattern;
use crate::error::{ConfigurationError, Result};
use crate::host::{hash_of, NavigationEvent, NavigationHost, NavigationListener};
use crate::{debug_log, info_log, trace_log, warn_log};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Percent-escapes `decodeURI` leaves encoded
const URI_RESERVED: &[u8] = b";/?:@&=+$,#";

// ============================================================================
// Options
// ============================================================================

/// Options for [`History::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryOptions {
    /// URL prefix the application lives under
    pub root: String,
    /// Use history-state URLs when the host supports them
    pub push_state: bool,
    /// Use hash fragments (natively or by polling)
    pub hash_change: bool,
    /// Skip the initial dispatch
    pub silent: bool,
    /// Polling interval when neither native mechanism is usable
    pub interval: Duration,
}

impl HistoryOptions {
    /// Default polling interval
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = root.into();
        self
    }

    pub fn push_state(mut self, enabled: bool) -> Self {
        self.push_state = enabled;
        self
    }

    pub fn hash_change(mut self, enabled: bool) -> Self {
        self.hash_change = enabled;
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            root: "/".to_string(),
            push_state: false,
            hash_change: true,
            silent: false,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

/// Options for [`History::navigate`]
///
/// A plain `bool` converts to `trigger`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Dispatch the new fragment immediately
    pub trigger: bool,
    /// Replace the current history entry instead of adding one
    pub replace: bool,
}

impl NavigateOptions {
    pub fn trigger() -> Self {
        Self {
            trigger: true,
            replace: false,
        }
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }
}

impl From<bool> for NavigateOptions {
    fn from(trigger: bool) -> Self {
        Self {
            trigger,
            replace: false,
        }
    }
}

// ============================================================================
// Mode
// ============================================================================

/// How navigation is observed and recorded for the lifetime of one `start()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationMode {
    /// History-state URLs, `popstate` listener
    PushState,
    /// Hash URLs, `hashchange` listener
    HashChange,
    /// Hash URLs observed by a timer; `frame` when a hidden iframe mirrors them
    Polling { frame: bool },
    /// No listener; navigation reloads the page
    FullPage,
}

impl NavigationMode {
    /// Whether the location hash carries the fragment
    pub fn uses_hash(self) -> bool {
        matches!(self, Self::HashChange | Self::Polling { .. })
    }

    fn has_frame(self) -> bool {
        matches!(self, Self::Polling { frame: true })
    }
}

impl fmt::Display for NavigationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PushState => write!(f, "push-state"),
            Self::HashChange => write!(f, "hash-change"),
            Self::Polling { frame: true } => write!(f, "polling (iframe)"),
            Self::Polling { frame: false } => write!(f, "polling"),
            Self::FullPage => write!(f, "full-page"),
        }
    }
}

// ============================================================================
// Fragment helpers
// ============================================================================

/// Strip one leading `#` or `/` and any trailing whitespace
pub fn normalize_fragment(fragment: &str) -> String {
    fragment
        .strip_prefix(|c| c == '#' || c == '/')
        .unwrap_or(fragment)
        .trim_end()
        .to_string()
}

/// Normalize a root to `/segment/` form
pub fn normalize_root(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// `decodeURI` that also keeps `%25` encoded. Malformed input is returned as is.
fn decode_fragment(fragment: &str) -> String {
    let bytes = fragment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = bytes
                .get(i + 1..i + 3)
                .filter(|hex| hex.iter().all(u8::is_ascii_hexdigit))
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());

            if let Some(byte) = decoded {
                if byte != b'%' && !URI_RESERVED.contains(&byte) {
                    out.push(byte);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| fragment.to_string())
}

// ============================================================================
// History
// ============================================================================

type RouteCallback = Rc<dyn Fn(&str)>;

struct RouteHandler {
    pattern: Arc<CompiledPattern>,
    callback: RouteCallback,
}

struct HistoryState {
    host: Rc<dyn NavigationHost>,
    handlers: Vec<RouteHandler>,
    fragment: String,
    root: String,
    started: bool,
    mode: Option<NavigationMode>,
    wants_hash_change: bool,
    wants_push_state: bool,
    has_push_state: bool,
}

impl HistoryState {
    fn get_fragment(&self, fragment: Option<&str>, force_push_state: bool) -> String {
        let raw = match fragment {
            Some(fragment) => fragment.to_string(),
            None if self.has_push_state || !self.wants_hash_change || force_push_state => {
                let path = decode_fragment(&format!(
                    "{}{}",
                    self.host.pathname(),
                    self.host.search()
                ));
                let root = self.root.strip_suffix('/').unwrap_or(&self.root);
                path.strip_prefix(root).unwrap_or(&path).to_string()
            }
            None => hash_of(&self.host.href()).to_string(),
        };
        normalize_fragment(&raw)
    }

    fn at_root(&self) -> bool {
        let mut path = self.host.pathname();
        if !path.ends_with('/') {
            path.push('/');
        }
        path == self.root
    }

    /// The pathname is the root itself or lies below it
    fn match_root(&self) -> bool {
        let path = decode_fragment(&self.host.pathname());
        let bare = self.root.strip_suffix('/').unwrap_or(&self.root);
        path == bare || path.starts_with(&self.root)
    }

    fn frame_fragment(&self) -> Option<String> {
        let href = self.host.frame_href()?;
        Some(self.get_fragment(Some(hash_of(&href)), false))
    }

    /// The iframe is requested for legacy engines; `start` creates it
    fn select_mode(&self) -> NavigationMode {
        let legacy = self.host.is_legacy_engine();

        if self.has_push_state {
            NavigationMode::PushState
        } else if self.wants_hash_change && self.host.supports_hash_change() && !legacy {
            NavigationMode::HashChange
        } else if self.wants_hash_change {
            NavigationMode::Polling { frame: legacy }
        } else {
            NavigationMode::FullPage
        }
    }

    /// Location rewrite needed when the URL style differs from the mode.
    /// Records the fragment the rewrite lands on.
    fn reconcile(&mut self) -> Option<Reconcile> {
        if !(self.wants_hash_change && self.wants_push_state) {
            return None;
        }

        if !self.has_push_state && !self.at_root() {
            // Loaded under a history-state URL the host cannot keep
            let fragment = self.get_fragment(None, true);
            let url = format!("{}#{}", self.root, fragment);
            debug_log!("Redirecting to hash URL '{}'", url);
            self.fragment = fragment;
            Some(Reconcile::ToHash(url))
        } else if self.has_push_state && self.at_root() {
            let hash = hash_of(&self.host.href()).to_string();
            if hash.is_empty() {
                return None;
            }
            let fragment = normalize_fragment(&hash);
            let url = format!("{}{}", self.root, fragment);
            debug_log!("Converting hash URL to '{}'", url);
            self.fragment = fragment;
            Some(Reconcile::ToPath(url))
        } else {
            None
        }
    }
}

enum Reconcile {
    /// `location.replace` to the hash form; the page reloads
    ToHash(String),
    /// `replaceState` to the history-state form
    ToPath(String),
}

fn write_hash(host: &dyn NavigationHost, fragment: &str, replace: bool) {
    if replace {
        let url = format!("{}{}#{}", host.pathname(), host.search(), fragment);
        host.replace(&url);
    } else {
        host.set_hash(fragment);
    }
}

/// The navigation engine
///
/// Cloning yields another handle to the same history. Create one per
/// application and pass it to every [`Router`](crate::Router).
#[derive(Clone)]
pub struct History {
    state: Rc<RefCell<HistoryState>>,
}

impl History {
    /// Create a stopped history over `host`
    pub fn new(host: impl NavigationHost + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(HistoryState {
                host: Rc::new(host),
                handlers: Vec::new(),
                fragment: String::new(),
                root: "/".to_string(),
                started: false,
                mode: None,
                wants_hash_change: true,
                wants_push_state: false,
                has_push_state: false,
            })),
        }
    }

    /// Register a route handler, checked before every handler registered earlier
    ///
    /// The callback receives the normalized fragment. Registration is only
    /// allowed while history is stopped.
    pub fn route<F>(&self, pattern: Arc<CompiledPattern>, callback: F) -> Result<()>
    where
        F: Fn(&str) + 'static,
    {
        let mut state = self.state.borrow_mut();
        if state.started {
            warn_log!(
                "Rejected route '{}': history is already started",
                pattern.source()
            );
            return Err(ConfigurationError::RegistrationWhileStarted {
                pattern: pattern.source().to_string(),
            }
            .into());
        }

        trace_log!("Registering route handler '{}'", pattern.source());
        state.handlers.insert(
            0,
            RouteHandler {
                pattern,
                callback: Rc::new(callback),
            },
        );
        Ok(())
    }

    /// Start observing navigation and dispatch the current fragment
    ///
    /// Returns whether the initial dispatch matched a route. Fails if history
    /// is already started.
    pub fn start(&self, options: HistoryOptions) -> Result<bool> {
        let (host, mode, fragment, root, reconcile) = {
            let mut state = self.state.borrow_mut();
            if state.started {
                warn_log!("History has already been started");
                return Err(ConfigurationError::AlreadyStarted.into());
            }

            state.started = true;
            state.root = normalize_root(&options.root);
            state.wants_hash_change = options.hash_change;
            state.wants_push_state = options.push_state;
            state.has_push_state = options.push_state && state.host.supports_push_state();

            let fragment = state.get_fragment(None, false);
            let mode = state.select_mode();
            state.mode = Some(mode);
            state.fragment = fragment.clone();
            let reconcile = state.reconcile();

            (
                Rc::clone(&state.host),
                mode,
                fragment,
                state.root.clone(),
                reconcile,
            )
        };

        // Host calls below may fire listeners, so no borrow is held
        let mode = if mode.has_frame() && !host.create_frame() {
            let fallback = NavigationMode::Polling { frame: false };
            self.state.borrow_mut().mode = Some(fallback);
            fallback
        } else {
            mode
        };

        match mode {
            NavigationMode::PushState => host.listen(NavigationEvent::PopState, self.listener()),
            NavigationMode::HashChange => {
                host.listen(NavigationEvent::HashChange, self.listener())
            }
            NavigationMode::Polling { frame } => {
                if frame {
                    host.set_frame_hash(&fragment, false);
                }
                host.start_timer(options.interval, self.listener());
            }
            NavigationMode::FullPage => {}
        }
        info_log!("History started in {} mode at root '{}'", mode, root);

        match reconcile {
            Some(Reconcile::ToHash(url)) => {
                host.replace(&url);
                return Ok(true);
            }
            Some(Reconcile::ToPath(url)) => host.replace_state(&url),
            None => {}
        }

        if options.silent {
            return Ok(false);
        }
        Ok(self.load_url(None))
    }

    /// Stop observing navigation
    ///
    /// Listeners, timer and iframe are released even if they were never
    /// created. Registered routes are kept.
    pub fn stop(&self) {
        let host = {
            let mut state = self.state.borrow_mut();
            state.started = false;
            state.mode = None;
            Rc::clone(&state.host)
        };
        host.unlisten(NavigationEvent::PopState);
        host.unlisten(NavigationEvent::HashChange);
        host.stop_timer();
        host.remove_frame();
        info_log!("History stopped");
    }

    /// The callback registered with the host. It holds a weak reference, so
    /// the host never keeps history alive.
    fn listener(&self) -> NavigationListener {
        let state = Rc::downgrade(&self.state);
        Rc::new(move || {
            if let Some(state) = state.upgrade() {
                History { state }.check_url();
            }
        })
    }

    /// Dispatch a fragment (the current one when `None`) to the first matching route
    ///
    /// Returns false when the location is outside the root or no route matches.
    pub fn load_url(&self, fragment: Option<&str>) -> bool {
        let matched = {
            let mut state = self.state.borrow_mut();
            if !state.match_root() {
                debug_log!(
                    "Path '{}' is outside root '{}'",
                    state.host.pathname(),
                    state.root
                );
                return false;
            }

            let fragment = state.get_fragment(fragment, false);
            state.fragment = fragment.clone();
            state
                .handlers
                .iter()
                .find(|handler| handler.pattern.matches(&fragment))
                .map(|handler| {
                    debug_log!(
                        "Dispatching '{}' to route '{}'",
                        fragment,
                        handler.pattern.source()
                    );
                    Rc::clone(&handler.callback)
                })
                .map(|callback| (callback, fragment))
        };

        match matched {
            Some((callback, fragment)) => {
                callback(&fragment);
                true
            }
            None => {
                debug_log!("No route matches the current fragment");
                false
            }
        }
    }

    /// Compare the location with the current fragment and dispatch on change
    ///
    /// The listener registered with the host calls this when a listened-for
    /// event fires or the polling timer ticks. Returns whether the fragment
    /// changed.
    pub fn check_url(&self) -> bool {
        let (current, has_frame) = {
            let state = self.state.borrow();
            let Some(mode) = state.mode else {
                return false;
            };

            let mut current = state.get_fragment(None, false);
            if current == state.fragment && mode.has_frame() {
                if let Some(frame) = state.frame_fragment() {
                    current = frame;
                }
            }
            if current == state.fragment {
                return false;
            }
            (current, mode.has_frame())
        };

        trace_log!("Location changed to '{}'", current);
        if has_frame {
            self.navigate(&current, NavigateOptions::default());
        }
        self.load_url(None);
        true
    }

    /// Entry point for hosts that forward browser events by hand instead of
    /// invoking the registered listener
    pub fn handle_event(&self, event: NavigationEvent) -> bool {
        trace_log!("Received {:?}", event);
        self.check_url()
    }

    /// Save a fragment into the browser history
    ///
    /// Does nothing when stopped or when `fragment` is already current.
    /// Returns whether the location was updated. With `trigger`, the new
    /// fragment is dispatched afterwards (except in full-page mode, where the
    /// page itself is reloaded).
    pub fn navigate(&self, fragment: &str, options: impl Into<NavigateOptions>) -> bool {
        let options = options.into();

        let (host, mode, url, fragment) = {
            let mut state = self.state.borrow_mut();
            let Some(mode) = state.mode.filter(|_| state.started) else {
                return false;
            };

            let normalized = state.get_fragment(Some(fragment), false);
            let mut url = format!("{}{}", state.root, normalized);
            let fragment = normalized
                .split_once('#')
                .map(|(path, _)| path.to_string())
                .unwrap_or(normalized);

            if state.fragment == fragment {
                trace_log!("Already at '{}'", fragment);
                return false;
            }
            state.fragment = fragment.clone();

            if fragment.is_empty() && url != "/" {
                url.pop();
            }
            (Rc::clone(&state.host), mode, url, fragment)
        };

        match mode {
            NavigationMode::PushState => {
                if options.replace {
                    host.replace_state(&url);
                } else {
                    host.push_state(&url);
                }
            }
            NavigationMode::HashChange | NavigationMode::Polling { .. } => {
                write_hash(host.as_ref(), &fragment, options.replace);
                let frame_differs = mode.has_frame()
                    && self.state.borrow().frame_fragment().as_deref() != Some(fragment.as_str());
                if frame_differs {
                    host.set_frame_hash(&fragment, options.replace);
                }
            }
            NavigationMode::FullPage => {
                debug_log!("Loading '{}'", url);
                host.assign(&url);
                return true;
            }
        }
        debug_log!("Navigated to '{}' ({})", fragment, mode);

        if options.trigger {
            self.load_url(Some(&fragment));
        }
        true
    }

    /// Whether history is started
    pub fn is_started(&self) -> bool {
        self.state.borrow().started
    }

    /// The mode selected at start, `None` when stopped
    pub fn mode(&self) -> Option<NavigationMode> {
        self.state.borrow().mode
    }

    /// The current fragment
    pub fn fragment(&self) -> String {
        self.state.borrow().fragment.clone()
    }

    /// The normalized root
    pub fn root(&self) -> String {
        self.state.borrow().root.clone()
    }

    /// Whether the location pathname is the root
    pub fn at_root(&self) -> bool {
        self.state.borrow().at_root()
    }

    /// The fragment the location currently points at
    pub fn current_fragment(&self) -> String {
        self.state.borrow().get_fragment(None, false)
    }

    /// Number of registered route handlers
    pub fn route_count(&self) -> usize {
        self.state.borrow().handlers.len()
    }
}

impl fmt::Debug for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("History")
            .field("fragment", &state.fragment)
            .field("root", &state.root)
            .field("started", &state.started)
            .field("mode", &state.mode)
            .field("routes", &state.handlers.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
