//! Views
//!
//! A view produces the content a region writes into its container and the
//! events to bind once that content is in place. Implement [`Renderable`]
//! for custom views, or configure a [`View`] through [`View::builder`].

use crate::document::{EventHandler, RenderHost};
use crate::trace_log;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;

/// Template used when a view is given none
pub const DEFAULT_TEMPLATE: &str = "<p>Default view template</p>";

// ============================================================================
// ViewData
// ============================================================================

/// Data attached to a view
#[derive(Clone)]
pub enum ViewData {
    /// A fixed value
    Static(Value),
    /// A value produced each time it is read
    Lazy(Rc<dyn Fn() -> Value>),
}

impl ViewData {
    /// Produce a lazily computed value
    pub fn lazy<F>(producer: F) -> Self
    where
        F: Fn() -> Value + 'static,
    {
        Self::Lazy(Rc::new(producer))
    }

    /// The current value
    pub fn resolve(&self) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Lazy(producer) => producer(),
        }
    }
}

impl From<Value> for ViewData {
    fn from(value: Value) -> Self {
        Self::Static(value)
    }
}

impl fmt::Debug for ViewData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Lazy(_) => f.write_str("Lazy(..)"),
        }
    }
}

// ============================================================================
// ViewEvent
// ============================================================================

/// An event handler for an element of a view's content
#[derive(Clone)]
pub struct ViewEvent {
    selector: String,
    event: String,
    handler: EventHandler,
}

impl ViewEvent {
    pub fn new<F>(selector: impl Into<String>, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self {
            selector: selector.into(),
            event: event.into(),
            handler: Rc::new(handler),
        }
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn bind(&self, document: &dyn RenderHost) {
        document.on(&self.selector, &self.event, Rc::clone(&self.handler));
    }

    pub fn clear(&self, document: &dyn RenderHost) {
        document.off(&self.selector, &self.event);
    }
}

impl fmt::Debug for ViewEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewEvent")
            .field("selector", &self.selector)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Renderable
// ============================================================================

/// Something a region can render
///
/// Only [`Renderable::render_content`] is required. Event binding defaults to
/// walking [`Renderable::events`].
pub trait Renderable {
    /// Name for diagnostics
    fn name(&self) -> &str {
        "view"
    }

    /// Content to write into the region's container
    fn render_content(&self) -> String;

    /// Called after the content is written and before events are bound
    fn after_render(&self) {}

    fn events(&self) -> &[ViewEvent] {
        &[]
    }

    fn bind_events(&self, document: &dyn RenderHost) {
        for event in self.events() {
            event.bind(document);
        }
    }

    fn clear_events(&self, document: &dyn RenderHost) {
        for event in self.events() {
            event.clear(document);
        }
    }
}

// ============================================================================
// View
// ============================================================================

type ContentRenderer = Rc<dyn Fn(&View) -> String>;
type AfterRender = Rc<dyn Fn()>;

/// A configurable view
///
/// Without a renderer the template is rendered as is.
///
/// # Example
///
/// ```
/// use client_mvc::{Renderable, View, ViewData};
/// use serde_json::json;
///
/// let view = View::builder("greeting")
///     .template("<p>Hello</p>")
///     .data(ViewData::Static(json!({ "user": "sam" })))
///     .renderer(|view| {
///         let user = view.data().and_then(|d| d["user"].as_str().map(String::from));
///         format!("<p>Hello {}</p>", user.unwrap_or_default())
///     })
///     .on("#logout", "click", || {})
///     .build();
///
/// assert_eq!(view.render_content(), "<p>Hello sam</p>");
/// assert_eq!(view.events().len(), 1);
/// ```
#[derive(Clone)]
pub struct View {
    name: String,
    template: String,
    data: Option<ViewData>,
    events: Vec<ViewEvent>,
    renderer: Option<ContentRenderer>,
    after_render: Option<AfterRender>,
}

impl View {
    /// A view rendering a static template
    pub fn new(template: impl Into<String>) -> Self {
        Self::builder("view").template(template).build()
    }

    pub fn builder(name: impl Into<String>) -> ViewBuilder {
        ViewBuilder::new(name)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// The view data, produced now if it is lazy
    pub fn data(&self) -> Option<Value> {
        self.data.as_ref().map(ViewData::resolve)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::builder("view").build()
    }
}

impl Renderable for View {
    fn name(&self) -> &str {
        &self.name
    }

    fn render_content(&self) -> String {
        trace_log!("Rendering view '{}'", self.name);
        match &self.renderer {
            Some(renderer) => renderer(self),
            None => self.template.clone(),
        }
    }

    fn after_render(&self) {
        if let Some(hook) = &self.after_render {
            hook();
        }
    }

    fn events(&self) -> &[ViewEvent] {
        &self.events
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("data", &self.data)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// Builder for [`View`]
pub struct ViewBuilder {
    view: View,
}

impl ViewBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            view: View {
                name: name.into(),
                template: DEFAULT_TEMPLATE.to_string(),
                data: None,
                events: Vec::new(),
                renderer: None,
                after_render: None,
            },
        }
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.view.template = template.into();
        self
    }

    pub fn data(mut self, data: impl Into<ViewData>) -> Self {
        self.view.data = Some(data.into());
        self
    }

    /// Add an event binding
    pub fn event(mut self, event: ViewEvent) -> Self {
        self.view.events.push(event);
        self
    }

    /// Shorthand for [`ViewBuilder::event`]
    pub fn on<F>(self, selector: impl Into<String>, event: impl Into<String>, handler: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.event(ViewEvent::new(selector, event, handler))
    }

    /// Produce content from the view instead of the raw template
    pub fn renderer<F>(mut self, renderer: F) -> Self
    where
        F: Fn(&View) -> String + 'static,
    {
        self.view.renderer = Some(Rc::new(renderer));
        self
    }

    pub fn after_render<F>(mut self, hook: F) -> Self
    where
        F: Fn() + 'static,
    {
        self.view.after_render = Some(Rc::new(hook));
        self
    }

    pub fn build(self) -> View {
        self.view
    }
}
