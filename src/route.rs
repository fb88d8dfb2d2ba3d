//! Route definition and named route registry

use crate::compiler::CompiledPattern;
use crate::params::{RouteArgs, RouteParams};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Route callback, invoked with the arguments extracted from the fragment
pub type Handler = Rc<dyn Fn(&RouteArgs)>;

// ============================================================================
// RoutePattern
// ============================================================================

/// A route pattern, either as written or already compiled
#[derive(Debug, Clone)]
pub enum RoutePattern {
    /// Pattern text, compiled on registration
    Source(String),
    /// A pattern compiled ahead of time
    Compiled(Arc<CompiledPattern>),
}

impl RoutePattern {
    /// The pattern text
    pub fn source(&self) -> &str {
        match self {
            Self::Source(source) => source,
            Self::Compiled(compiled) => compiled.source(),
        }
    }
}

impl From<&str> for RoutePattern {
    fn from(source: &str) -> Self {
        Self::Source(source.to_string())
    }
}

impl From<String> for RoutePattern {
    fn from(source: String) -> Self {
        Self::Source(source)
    }
}

impl From<CompiledPattern> for RoutePattern {
    fn from(compiled: CompiledPattern) -> Self {
        Self::Compiled(Arc::new(compiled))
    }
}

impl From<Arc<CompiledPattern>> for RoutePattern {
    fn from(compiled: Arc<CompiledPattern>) -> Self {
        Self::Compiled(compiled)
    }
}

// ============================================================================
// Route
// ============================================================================

/// A pattern bound to a callback
///
/// # Example
///
/// ```
/// use client_mvc::Route;
///
/// let route = Route::new("posts/:id/:pref", |args| {
///     println!("{} ordered from {:?}", args.get(0).unwrap_or(""), args.get(1));
/// })
/// .named("post");
///
/// assert_eq!(route.name(), Some("post"));
/// assert!(route.has_callback());
/// ```
#[derive(Clone)]
pub struct Route {
    name: Option<String>,
    pattern: RoutePattern,
    callback: Option<Handler>,
}

impl Route {
    /// Create a route with a callback
    pub fn new<F>(pattern: impl Into<RoutePattern>, callback: F) -> Self
    where
        F: Fn(&RouteArgs) + 'static,
    {
        Self {
            name: None,
            pattern: pattern.into(),
            callback: Some(Rc::new(callback)),
        }
    }

    /// Create a route with no callback yet
    ///
    /// Registering it fails until [`Route::to`] supplies one.
    pub fn unbound(pattern: impl Into<RoutePattern>) -> Self {
        Self {
            name: None,
            pattern: pattern.into(),
            callback: None,
        }
    }

    /// Set the route name used for reverse lookup
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the callback
    pub fn to<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RouteArgs) + 'static,
    {
        self.callback = Some(Rc::new(callback));
        self
    }

    /// Route name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Route pattern
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Route callback
    pub fn callback(&self) -> Option<&Handler> {
        self.callback.as_ref()
    }

    /// Whether a callback is set
    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    pub(crate) fn into_parts(self) -> (Option<String>, RoutePattern, Option<Handler>) {
        (self.name, self.pattern, self.callback)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("pattern", &self.pattern.source())
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

// ============================================================================
// NamedRouteRegistry
// ============================================================================

/// Registry for named routes
#[derive(Clone, Debug, Default)]
pub struct NamedRouteRegistry {
    routes: HashMap<String, Arc<CompiledPattern>>,
}

impl NamedRouteRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named route; a later registration under the same name wins
    pub fn register(&mut self, name: impl Into<String>, pattern: Arc<CompiledPattern>) {
        self.routes.insert(name.into(), pattern);
    }

    /// Get the compiled pattern for a named route
    pub fn get(&self, name: &str) -> Option<&Arc<CompiledPattern>> {
        self.routes.get(name)
    }

    /// Check if a route name exists
    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    /// Generate a fragment for a named route
    ///
    /// # Example
    ///
    /// ```
    /// use client_mvc::{compile, NamedRouteRegistry, RouteParams};
    /// use std::sync::Arc;
    ///
    /// let mut registry = NamedRouteRegistry::new();
    /// registry.register("post", Arc::new(compile("posts/:id").unwrap()));
    ///
    /// let params = RouteParams::new().with("id", "123");
    /// assert_eq!(registry.url_for("post", &params), Some("posts/123".to_string()));
    /// ```
    pub fn url_for(&self, name: &str, params: &RouteParams) -> Option<String> {
        self.get(name)?.reverse(params)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Get number of registered routes
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
