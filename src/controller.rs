//! Controllers
//!
//! A [`Controller`] pairs a view with the region it renders into. Controllers
//! are created with the application's default region, used whenever
//! [`Controller::init`] is not given one.
//!
//! [`AuthController`] holds its view without rendering it and answers whether
//! a user is logged in through an [`Authenticator`]. [`SecuredController`]
//! shows the auth controller's view instead of its own until that answer is
//! yes.

use crate::error::{ConfigurationError, Error, Result};
use crate::region::{RegionHandle, ViewHandle};
use crate::{debug_log, info_log};
use std::fmt;
use std::rc::Rc;

// ============================================================================
// Controller
// ============================================================================

/// Renders a view into a region
pub struct Controller {
    name: String,
    default_region: RegionHandle,
    region: Option<RegionHandle>,
    view: Option<ViewHandle>,
}

impl Controller {
    pub fn new(default_region: RegionHandle) -> Self {
        Self {
            name: "controller".to_string(),
            default_region,
            region: None,
            view: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Store the view and region, then render
    pub fn init(&mut self, view: ViewHandle, region: Option<RegionHandle>) -> Result<ViewHandle> {
        self.store(view, region);
        self.show_view(None)
    }

    /// Render into the stored region, replacing the stored view if one is given
    pub fn show_view(&mut self, view: Option<ViewHandle>) -> Result<ViewHandle> {
        if view.is_some() {
            self.view = view;
        }
        let view = self.view.clone().ok_or_else(|| Error::NoView {
            controller: self.name.clone(),
        })?;
        let region = self.region();

        debug_log!("Controller '{}' showing view '{}'", self.name, view.name());
        let rendered = region.borrow_mut().render_view(view);
        Ok(rendered)
    }

    pub(crate) fn store(&mut self, view: ViewHandle, region: Option<RegionHandle>) {
        self.view = Some(view);
        self.region = region;
    }

    /// The stored region, or the default region
    pub fn region(&self) -> RegionHandle {
        Rc::clone(self.region.as_ref().unwrap_or(&self.default_region))
    }

    pub fn view(&self) -> Option<&ViewHandle> {
        self.view.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("view", &self.view.as_ref().map(|view| view.name().to_string()))
            .field("region", &self.region().borrow().name().to_string())
            .finish()
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Answers whether a user is logged in
///
/// `is_authenticated` must be implemented; the default fails with
/// [`ConfigurationError::NotImplemented`].
///
/// # Example
///
/// ```
/// use client_mvc::{Authenticator, Result};
/// use std::cell::Cell;
///
/// #[derive(Default)]
/// struct Session {
///     logged_in: Cell<bool>,
/// }
///
/// impl Authenticator for Session {
///     fn is_authenticated(&self) -> Result<bool> {
///         Ok(self.logged_in.get())
///     }
///
///     fn log_in(&self) {
///         self.logged_in.set(true);
///     }
/// }
///
/// let session = Session::default();
/// session.log_in();
/// assert!(session.is_authenticated().unwrap());
/// ```
pub trait Authenticator {
    fn name(&self) -> &str {
        "auth controller"
    }

    fn is_authenticated(&self) -> Result<bool> {
        Err(ConfigurationError::NotImplemented {
            owner: self.name().to_string(),
            method: "is_authenticated",
        }
        .into())
    }

    fn log_in(&self) {}

    fn log_out(&self) {}
}

/// Controller for the login view
pub struct AuthController<A: Authenticator> {
    controller: Controller,
    authenticator: A,
}

impl<A: Authenticator> AuthController<A> {
    pub fn new(default_region: RegionHandle, authenticator: A) -> Self {
        let controller = Controller::new(default_region).named(authenticator.name());
        Self {
            controller,
            authenticator,
        }
    }

    /// Store the view and region without rendering
    pub fn init(&mut self, view: ViewHandle, region: Option<RegionHandle>) {
        self.controller.store(view, region);
    }

    pub fn show_view(&mut self, view: Option<ViewHandle>) -> Result<ViewHandle> {
        self.controller.show_view(view)
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        self.authenticator.is_authenticated()
    }

    pub fn log_in(&self) {
        info_log!("{} logging in", self.authenticator.name());
        self.authenticator.log_in();
    }

    pub fn log_out(&self) {
        info_log!("{} logging out", self.authenticator.name());
        self.authenticator.log_out();
    }

    pub fn authenticator(&self) -> &A {
        &self.authenticator
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}

impl<A: Authenticator> fmt::Debug for AuthController<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthController")
            .field("controller", &self.controller)
            .finish_non_exhaustive()
    }
}

/// Controller whose view requires authentication
#[derive(Debug)]
pub struct SecuredController {
    controller: Controller,
}

impl SecuredController {
    pub fn new(default_region: RegionHandle) -> Self {
        Self {
            controller: Controller::new(default_region).named("secured controller"),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.controller = self.controller.named(name);
        self
    }

    /// Render the view, or the auth controller's view when not logged in
    ///
    /// The view and region are stored either way, so a later
    /// [`SecuredController::show_view`] renders them.
    pub fn init<A: Authenticator>(
        &mut self,
        view: ViewHandle,
        region: Option<RegionHandle>,
        auth: &mut AuthController<A>,
    ) -> Result<ViewHandle> {
        if auth.is_authenticated()? {
            self.controller.init(view, region)
        } else {
            info_log!(
                "'{}' requires authentication, showing '{}'",
                self.controller.name(),
                auth.controller().name()
            );
            self.controller.store(view, region);
            auth.show_view(None)
        }
    }

    pub fn show_view(&mut self, view: Option<ViewHandle>) -> Result<ViewHandle> {
        self.controller.show_view(view)
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}
