//! Regions
//!
//! A region is a named container that hosts at most one view at a time.
//! Rendering a new view always disposes the previous one first, so its events
//! are unbound before the next view's events are bound.

use crate::document::RenderHost;
use crate::error::{Error, Result};
use crate::view::Renderable;
use crate::{debug_log, warn_log};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Shared view reference
pub type ViewHandle = Rc<dyn Renderable>;

/// Shared region reference
pub type RegionHandle = Rc<RefCell<Region>>;

/// Name of the default region
pub const DEFAULT_REGION_NAME: &str = "region";

/// Container of the default region
pub const DEFAULT_CONTAINER: &str = "#app";

/// A rendering container
///
/// # Example
///
/// ```
/// use client_mvc::{MemoryDocument, Region, View};
/// use std::rc::Rc;
///
/// let doc = MemoryDocument::new().with_container("#app");
/// let mut region = Region::default_region(Rc::new(doc.clone()));
///
/// region.render_view(Rc::new(View::new("<p>home</p>")));
/// assert_eq!(doc.content("#app").as_deref(), Some("<p>home</p>"));
///
/// region.dispose_view().unwrap();
/// assert!(region.current_view().is_none());
/// ```
pub struct Region {
    name: String,
    container: String,
    document: Rc<dyn RenderHost>,
    parent: Option<(RegionHandle, ViewHandle)>,
    current_view: Option<ViewHandle>,
}

impl Region {
    pub fn new(
        name: impl Into<String>,
        container: impl Into<String>,
        document: Rc<dyn RenderHost>,
    ) -> Self {
        Self {
            name: name.into(),
            container: container.into(),
            document,
            parent: None,
            current_view: None,
        }
    }

    /// The top-level region, rendering into `#app`
    pub fn default_region(document: Rc<dyn RenderHost>) -> Self {
        Self::new(DEFAULT_REGION_NAME, DEFAULT_CONTAINER, document)
    }

    /// Nest this region inside a view rendered by another region
    ///
    /// When this region's container is missing, `view` is rendered into
    /// `region` first so that the container exists.
    pub fn with_parent(mut self, region: RegionHandle, view: ViewHandle) -> Self {
        self.parent = Some((region, view));
        self
    }

    pub fn into_handle(self) -> RegionHandle {
        Rc::new(RefCell::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn current_view(&self) -> Option<&ViewHandle> {
        self.current_view.as_ref()
    }

    pub fn parent_region(&self) -> Option<&RegionHandle> {
        self.parent.as_ref().map(|(region, _)| region)
    }

    /// Whether the container exists in the document
    pub fn is_available(&self) -> bool {
        self.document.contains(&self.container)
    }

    /// Render a view into this region and make it current
    pub fn render_view(&mut self, view: ViewHandle) -> ViewHandle {
        if self.current_view.is_some() {
            self.dispose_current();
        }

        if !self.is_available() {
            match &self.parent {
                Some((region, parent_view)) => {
                    debug_log!(
                        "Region '{}' unavailable, rendering parent view '{}'",
                        self.name,
                        parent_view.name()
                    );
                    region.borrow_mut().render_view(Rc::clone(parent_view));
                }
                None => {
                    warn_log!(
                        "Region '{}' has no container '{}' and no parent",
                        self.name,
                        self.container
                    );
                }
            }
        }

        self.document
            .set_content(&self.container, &view.render_content());
        view.after_render();
        view.bind_events(self.document.as_ref());
        debug_log!("Region '{}' rendered view '{}'", self.name, view.name());

        self.current_view = Some(Rc::clone(&view));
        view
    }

    /// Unbind the current view's events and clear the container
    pub fn dispose_view(&mut self) -> Result<()> {
        if self.current_view.is_none() {
            return Err(Error::NoCurrentView {
                region: self.name.clone(),
            });
        }
        self.dispose_current();
        Ok(())
    }

    fn dispose_current(&mut self) {
        if let Some(view) = self.current_view.take() {
            view.clear_events(self.document.as_ref());
            self.document.clear(&self.container);
            debug_log!("Region '{}' disposed view '{}'", self.name, view.name());
        }
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("container", &self.container)
            .field(
                "current_view",
                &self.current_view.as_ref().map(|view| view.name().to_string()),
            )
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::view::View;

    fn document() -> MemoryDocument {
        MemoryDocument::new().with_container("#app")
    }

    #[test]
    fn test_default_region() {
        let region = Region::default_region(Rc::new(document()));
        assert_eq!(region.name(), "region");
        assert_eq!(region.container(), "#app");
        assert!(region.is_available());
        assert!(region.current_view().is_none());
    }

    #[test]
    fn test_render_replaces_previous_view() {
        let doc = document();
        let mut region = Region::default_region(Rc::new(doc.clone()));

        let v = View::builder("v")
            .template(r#"<button id="a">a</button>"#)
            .on("#a", "click", || {})
            .build();
        let w = View::builder("w")
            .template(r#"<button id="b">b</button>"#)
            .on("#b", "click", || {})
            .build();

        region.render_view(Rc::new(v));
        region.render_view(Rc::new(w));

        assert_eq!(
            doc.journal(),
            vec![
                "on #a click".to_string(),
                "off #a click".to_string(),
                "on #b click".to_string(),
            ]
        );
        assert_eq!(
            doc.content("#app").as_deref(),
            Some(r#"<button id="b">b</button>"#)
        );
        assert_eq!(region.current_view().unwrap().name(), "w");
    }

    #[test]
    fn test_dispose_without_view_fails() {
        let mut region = Region::default_region(Rc::new(document()));
        let error = region.dispose_view().unwrap_err();
        assert!(error.is_invalid_state());
        assert_eq!(
            error,
            Error::NoCurrentView {
                region: "region".to_string()
            }
        );
    }

    #[test]
    fn test_dispose_clears_container() {
        let doc = document();
        let mut region = Region::default_region(Rc::new(doc.clone()));
        region.render_view(Rc::new(View::new("<p>x</p>")));

        region.dispose_view().unwrap();
        assert_eq!(doc.content("#app").as_deref(), Some(""));
        assert!(region.dispose_view().is_err());
    }

    #[test]
    fn test_missing_container_renders_parent_first() {
        let doc = document();
        let shared: Rc<dyn RenderHost> = Rc::new(doc.clone());

        let parent = Region::default_region(Rc::clone(&shared)).into_handle();
        let layout: ViewHandle = Rc::new(View::new(r#"<main id="content"></main>"#));
        let mut child = Region::new("content", "#content", shared)
            .with_parent(Rc::clone(&parent), layout);

        assert!(!child.is_available());
        child.render_view(Rc::new(View::new("<p>page</p>")));

        assert!(child.is_available());
        assert_eq!(doc.content("#content").as_deref(), Some("<p>page</p>"));
        assert_eq!(parent.borrow().current_view().unwrap().name(), "view");
    }

    #[test]
    fn test_missing_container_without_parent_renders_nothing() {
        let doc = MemoryDocument::new();
        let mut region = Region::new("orphan", "#nowhere", Rc::new(doc.clone()));

        region.render_view(Rc::new(View::new("<p>lost</p>")));
        assert_eq!(doc.content("#nowhere"), None);
        assert!(region.current_view().is_some());
    }

    #[test]
    fn test_after_render_runs_before_events_bind() {
        let doc = document();
        let order = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&order);
        let probe = doc.clone();

        let view = View::builder("ordered")
            .template(r#"<a id="link"></a>"#)
            .after_render(move || {
                log.borrow_mut()
                    .push(format!("after_render bound={}", probe.handler_count("#link", "click")));
            })
            .on("#link", "click", || {})
            .build();

        let mut region = Region::default_region(Rc::new(doc.clone()));
        region.render_view(Rc::new(view));

        assert_eq!(*order.borrow(), vec!["after_render bound=0".to_string()]);
        assert_eq!(doc.handler_count("#link", "click"), 1);
    }
}
