//! Router
//!
//! A [`Router`] compiles its routes and registers them with the shared
//! [`History`]. When history dispatches a fragment to one of them, the router
//! extracts the route arguments and hands the callback to its
//! [`RouteExecutor`], the place for cross-cutting route logic.

use crate::compiler::RouteCompiler;
use crate::error::{ConfigurationError, Result};
use crate::history::{History, NavigateOptions};
use crate::params::{RouteArgs, RouteParams};
use crate::route::{Handler, NamedRouteRegistry, Route, RoutePattern};
use crate::{debug_log, error_log, warn_log};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

// ============================================================================
// RouteExecutor
// ============================================================================

/// Runs a matched route's callback
///
/// The default implementation invokes the callback and reports whether there
/// was one. Implement this to add checks or logging around every route.
///
/// # Example
///
/// ```
/// use client_mvc::{Handler, RouteArgs, RouteExecutor};
/// use std::cell::Cell;
///
/// struct RequireLogin {
///     logged_in: Cell<bool>,
/// }
///
/// impl RouteExecutor for RequireLogin {
///     fn execute(&self, callback: Option<&Handler>, args: &RouteArgs) -> bool {
///         if !self.logged_in.get() && args.fragment() != "login" {
///             return false;
///         }
///         match callback {
///             Some(callback) => {
///                 callback(args);
///                 true
///             }
///             None => false,
///         }
///     }
/// }
/// ```
pub trait RouteExecutor {
    fn execute(&self, callback: Option<&Handler>, args: &RouteArgs) -> bool {
        match callback {
            Some(callback) => {
                callback(args);
                true
            }
            None => false,
        }
    }
}

/// Executor that calls the route callback and nothing else
#[derive(Debug, Clone, Copy, Default)]
pub struct InvokeCallback;

impl RouteExecutor for InvokeCallback {}

// ============================================================================
// Router
// ============================================================================

type InitHook = Box<dyn FnOnce(&Router) -> Result<()>>;

/// Owns a set of routes and binds them to history
pub struct Router {
    name: String,
    history: History,
    compiler: RouteCompiler,
    named: RefCell<NamedRouteRegistry>,
    executor: Rc<dyn RouteExecutor>,
}

impl Router {
    /// A router with no routes and the default executor
    pub fn new(history: History) -> Self {
        Self {
            name: "router".to_string(),
            history,
            compiler: RouteCompiler::new(),
            named: RefCell::new(NamedRouteRegistry::new()),
            executor: Rc::new(InvokeCallback),
        }
    }

    /// Start building a router
    pub fn builder(history: History) -> RouterBuilder {
        RouterBuilder::new(history)
    }

    /// Register a route with history
    ///
    /// The pattern is compiled unless it already is. Fails when the route has
    /// no callback, the pattern is invalid, or history is started.
    pub fn route(&self, route: Route) -> Result<&Self> {
        let (name, pattern, callback) = route.into_parts();

        let compiled = match pattern {
            RoutePattern::Source(source) => self.compiler.compile(&source)?,
            RoutePattern::Compiled(compiled) => compiled,
        };

        let Some(callback) = callback else {
            warn_log!("Route '{}' has no callback", compiled.source());
            return Err(ConfigurationError::MissingCallback {
                pattern: compiled.source().to_string(),
            }
            .into());
        };

        let executor = Rc::clone(&self.executor);
        let matcher = compiled.clone();
        self.history.route(compiled.clone(), move |fragment| {
            if let Some(args) = matcher.extract(fragment) {
                executor.execute(Some(&callback), &args);
            }
        })?;

        debug_log!(
            "{} bound route '{}'{}",
            self.name,
            compiled.source(),
            name.as_deref()
                .map(|n| format!(" as '{}'", n))
                .unwrap_or_default()
        );
        if let Some(name) = name {
            self.named.borrow_mut().register(name, compiled);
        }
        Ok(self)
    }

    /// Run a callback through this router's executor
    pub fn execute(&self, callback: Option<&Handler>, args: &RouteArgs) -> bool {
        self.executor.execute(callback, args)
    }

    /// Navigate through the shared history
    pub fn navigate(&self, fragment: &str, options: impl Into<NavigateOptions>) -> &Self {
        self.history.navigate(fragment, options);
        self
    }

    /// Build the fragment for a named route
    pub fn url_for(&self, name: &str, params: &RouteParams) -> Option<String> {
        self.named.borrow().url_for(name, params)
    }

    /// Names of the named routes, sorted
    pub fn route_names(&self) -> Vec<String> {
        self.named.borrow().names()
    }

    /// Router name, for diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// The compiler used for this router's patterns
    pub fn compiler(&self) -> &RouteCompiler {
        &self.compiler
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.name)
            .field("named_routes", &self.named.borrow().names())
            .field("history", &self.history)
            .finish()
    }
}

// ============================================================================
// RouterBuilder
// ============================================================================

/// Builder for [`Router`]
///
/// Routes given to [`RouterBuilder::routes`] are bound in declaration order,
/// so a later route is checked before an earlier one: declare catch-all
/// routes first and specific routes after them.
///
/// # Example
///
/// ```
/// use client_mvc::{History, HistoryOptions, MemoryHost, Route, Router};
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let hits = Rc::new(RefCell::new(Vec::new()));
/// let (a, b) = (Rc::clone(&hits), Rc::clone(&hits));
///
/// let history = History::new(MemoryHost::new("/#posts/42/amazon"));
/// let router = Router::builder(history)
///     .name("my router")
///     .routes(vec![
///         Route::new("*action", move |args| {
///             a.borrow_mut().push(format!("at {}", args.get(0).unwrap_or("")));
///         }),
///         Route::new("posts/:id/:pref", move |args| {
///             b.borrow_mut().push(format!("{} from {}", args.get(0).unwrap(), args.get(1).unwrap()));
///         }),
///     ])
///     .on_init(|router| router.history().start(HistoryOptions::default()).map(|_| ()))
///     .build()
///     .unwrap();
///
/// assert_eq!(*hits.borrow(), vec!["42 from amazon".to_string()]);
/// # drop(router);
/// ```
pub struct RouterBuilder {
    name: String,
    history: History,
    routes: Vec<Route>,
    executor: Rc<dyn RouteExecutor>,
    compiler: RouteCompiler,
    init: Option<InitHook>,
}

impl RouterBuilder {
    fn new(history: History) -> Self {
        Self {
            name: "router".to_string(),
            history,
            routes: Vec::new(),
            executor: Rc::new(InvokeCallback),
            compiler: RouteCompiler::new(),
            init: None,
        }
    }

    /// Router name, for diagnostics
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a route
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Add routes in declaration order
    pub fn routes(mut self, routes: impl IntoIterator<Item = Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Use a custom executor
    pub fn executor(mut self, executor: impl RouteExecutor + 'static) -> Self {
        self.executor = Rc::new(executor);
        self
    }

    /// Use a specific compiler (e.g. one with a larger cache)
    pub fn compiler(mut self, compiler: RouteCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Hook run once all routes are bound
    pub fn on_init<F>(mut self, init: F) -> Self
    where
        F: FnOnce(&Router) -> Result<()> + 'static,
    {
        self.init = Some(Box::new(init));
        self
    }

    /// Bind the routes and run the init hook
    pub fn build(self) -> Result<Router> {
        let router = Router {
            name: self.name,
            history: self.history,
            compiler: self.compiler,
            named: RefCell::new(NamedRouteRegistry::new()),
            executor: self.executor,
        };

        for route in self.routes {
            let source = route.pattern().source().to_string();
            if let Err(e) = router.route(route) {
                error_log!("{} failed to bind route '{}': {}", router.name, source, e);
                return Err(e);
            }
        }

        if let Some(init) = self.init {
            init(&router)?;
        }
        Ok(router)
    }
}

// ============================================================================
// Tests
// ============================================================================
