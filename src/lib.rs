//! # client-mvc
//!
//! A lightweight client-side MVC framework with:
//!
//! - **Route Patterns** - `:name` parameters, `*splat` remainders and `(optional)` groups
//! - **Routers** - Named routes, bulk registration and an overridable route executor
//! - **History** - One navigation API over history-state URLs, hash changes and polling
//! - **Regions** - Containers that host one view at a time and manage its events
//! - **Controllers** - View/region pairs, with authentication-aware variants
//!
//! The framework never touches a browser directly. Location access goes
//! through [`NavigationHost`] and document access through [`RenderHost`];
//! [`MemoryHost`] and [`MemoryDocument`] implement both in memory.
//!
//! # Quick Start
//!
//! ```
//! use client_mvc::*;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let host = MemoryHost::new("/#posts/42");
//! let history = History::new(host.clone());
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//!
//! let router = Router::builder(history.clone())
//!     .route(
//!         Route::new("posts/:id", move |args| {
//!             log.borrow_mut().push(args.get(0).unwrap_or_default().to_string());
//!         })
//!         .named("post"),
//!     )
//!     .build()
//!     .unwrap();
//!
//! history.start(HistoryOptions::default()).unwrap();
//! router.navigate("posts/7", NavigateOptions::trigger());
//!
//! assert_eq!(*seen.borrow(), vec!["42".to_string(), "7".to_string()]);
//! assert_eq!(host.url(), "/#posts/7");
//! ```
//!
//! # Navigation Modes
//!
//! [`History::start`] picks a [`NavigationMode`] once from the options and the
//! host's capabilities:
//!
//! ```
//! use client_mvc::{History, HistoryOptions, MemoryHost, NavigationMode};
//!
//! let history = History::new(MemoryHost::new("/"));
//! history.start(HistoryOptions::new().push_state(true)).unwrap();
//! assert_eq!(history.mode(), Some(NavigationMode::PushState));
//! ```
//!
//! # Regions and Views
//!
//! ```
//! use client_mvc::*;
//! use std::rc::Rc;
//!
//! let doc = MemoryDocument::new().with_container("#app");
//! let region = Region::default_region(Rc::new(doc.clone())).into_handle();
//!
//! let mut controller = Controller::new(region);
//! controller
//!     .init(Rc::new(View::new("<h1>Home</h1>")), None)
//!     .unwrap();
//!
//! assert_eq!(doc.content("#app").as_deref(), Some("<h1>Home</h1>"));
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Uses the standard `log` crate for logging
//! - `tracing` - Uses the `tracing` crate for structured logging (mutually exclusive with `log`)
//! - `cache` (default) - LRU cache of compiled route patterns

#![cfg_attr(docsrs, feature(doc_cfg))]
// Lints are configured in Cargo.toml [lints] section

// Logging abstraction
pub mod logging;

// Cache (optional)
#[cfg(feature = "cache")]
pub mod cache;

// Routing
pub mod compiler;
pub mod history;
pub mod host;
pub mod params;
pub mod route;
pub mod router;

// Error handling
pub mod error;

// Presentation
pub mod controller;
pub mod document;
pub mod region;
pub mod view;

// Re-export main types for convenient access
#[cfg(feature = "cache")]
pub use cache::{CacheStats, PatternCache};
pub use compiler::{compile, CompiledPattern, RouteCompiler};
pub use controller::{AuthController, Authenticator, Controller, SecuredController};
pub use document::{EventHandler, MemoryDocument, RenderHost};
pub use error::{ConfigurationError, Error, Result};
pub use history::{
    normalize_fragment, normalize_root, History, HistoryOptions, NavigateOptions, NavigationMode,
};
pub use host::{hash_of, MemoryHost, NavigationEvent, NavigationHost, NavigationListener};
pub use params::{QueryParams, RouteArgs, RouteParams};
pub use region::{Region, RegionHandle, ViewHandle};
pub use route::{Handler, NamedRouteRegistry, Route, RoutePattern};
pub use router::{InvokeCallback, RouteExecutor, Router, RouterBuilder};
pub use view::{Renderable, View, ViewBuilder, ViewData, ViewEvent};
