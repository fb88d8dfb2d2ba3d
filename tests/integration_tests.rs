//! Integration tests for client_mvc
//!
//! These tests drive the public API end to end: routers bound to history,
//! navigation through the in-memory host, and views rendered into regions by
//! controllers.

use client_mvc::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

type Log = Rc<RefCell<Vec<String>>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn recorder(log: &Log, label: &'static str) -> impl Fn(&RouteArgs) + 'static {
    let log = Rc::clone(log);
    move |args: &RouteArgs| {
        let values: Vec<String> = args
            .values()
            .iter()
            .map(|value| value.clone().unwrap_or_else(|| "null".to_string()))
            .collect();
        log.borrow_mut()
            .push(format!("{}[{}]", label, values.join(", ")));
    }
}

// ============================================================================
// Route Compilation Tests
// ============================================================================

#[test]
fn test_named_parameters_are_extracted_in_order() {
    let pattern = compile("posts/:id/:pref").unwrap();
    let args = pattern.extract("posts/42/amazon").unwrap();

    assert_eq!(args.get(0), Some("42"));
    assert_eq!(args.get(1), Some("amazon"));
    assert_eq!(args.query(), None);
    assert_eq!(args.named("pref"), Some("amazon"));
}

#[test]
fn test_splat_spans_segments() {
    let pattern = compile("search/*query").unwrap();
    let args = pattern.extract("search/a/b/c").unwrap();

    assert_eq!(args.get(0), Some("a/b/c"));
    assert!(!pattern.matches("searching/a"));
}

#[test]
fn test_optional_segment_and_query() {
    let pattern = compile("docs/:section(/:subsection)").unwrap();

    let args = pattern.extract("docs/faq").unwrap();
    assert_eq!(args.get(0), Some("faq"));
    assert_eq!(args.get(1), None);

    let args = pattern.extract("docs/faq/install?lang=en&v=2").unwrap();
    assert_eq!(args.get(1), Some("install"));
    assert_eq!(args.query(), Some("lang=en&v=2"));
    assert_eq!(args.query_params().get("lang"), Some(&"en".to_string()));
}

#[test]
fn test_parameters_are_percent_decoded() {
    let pattern = compile("users/:name").unwrap();
    let args = pattern.extract("users/j%C3%BCrgen%20m").unwrap();
    assert_eq!(args.get(0), Some("jürgen m"));
}

#[test]
fn test_named_parameter_round_trip() {
    let pattern = compile("teams/:team/players/:player").unwrap();
    let params = RouteParams::new()
        .with("team", "red")
        .with("player", "9");

    let fragment = pattern.reverse(&params).unwrap();
    assert_eq!(fragment, "teams/red/players/9");
    assert_eq!(pattern.params(&fragment), Some(params));
}

#[test]
fn test_invalid_pattern_is_a_configuration_error() {
    let error = compile("docs/(:page").unwrap_err();
    assert!(error.is_configuration());
}

// ============================================================================
// Router Tests
// ============================================================================

#[test]
fn test_bulk_routes_dispatch_last_declared_match() {
    init_logging();
    let log: Log = Rc::default();
    let history = History::new(MemoryHost::new("/#posts/42/amazon"));

    let _router = Router::builder(history.clone())
        .routes(vec![
            Route::new("*path", recorder(&log, "r1")),
            Route::new("about", recorder(&log, "r2")),
            Route::new("posts/:id/:pref", recorder(&log, "r3")),
        ])
        .build()
        .unwrap();

    assert!(history.start(HistoryOptions::default()).unwrap());
    assert_eq!(*log.borrow(), vec!["r3[42, amazon, null]".to_string()]);
}

#[test]
fn test_routers_share_one_history() {
    let log: Log = Rc::default();
    let history = History::new(MemoryHost::new("/"));

    let blog = Router::builder(history.clone())
        .name("blog")
        .route(Route::new("posts/:id", recorder(&log, "post")).named("post"))
        .build()
        .unwrap();
    let shop = Router::builder(history.clone())
        .name("shop")
        .route(Route::new("cart", recorder(&log, "cart")))
        .build()
        .unwrap();
    assert_eq!(history.route_count(), 2);

    history.start(HistoryOptions::default()).unwrap();
    shop.navigate("cart", true);
    blog.navigate("posts/3", true);

    assert_eq!(
        *log.borrow(),
        vec!["cart[null]".to_string(), "post[3, null]".to_string()]
    );
    assert_eq!(blog.route_names(), vec!["post".to_string()]);
    assert!(shop.route_names().is_empty());
}

#[test]
fn test_router_rejects_route_without_callback() {
    let history = History::new(MemoryHost::new("/"));
    let result = Router::builder(history)
        .route(Route::unbound("posts/:id"))
        .build();

    assert!(matches!(
        result,
        Err(Error::Configuration(ConfigurationError::MissingCallback { .. }))
    ));
}

#[test]
fn test_executor_wraps_every_route() {
    struct Counting(Rc<Cell<usize>>);

    impl RouteExecutor for Counting {
        fn execute(&self, callback: Option<&Handler>, args: &RouteArgs) -> bool {
            self.0.set(self.0.get() + 1);
            match callback {
                Some(callback) => {
                    callback(args);
                    true
                }
                None => false,
            }
        }
    }

    let log: Log = Rc::default();
    let count = Rc::new(Cell::new(0));
    let history = History::new(MemoryHost::new("/#a"));

    Router::builder(history.clone())
        .executor(Counting(Rc::clone(&count)))
        .routes(vec![
            Route::new("a", recorder(&log, "a")),
            Route::new("b", recorder(&log, "b")),
        ])
        .build()
        .unwrap();

    history.start(HistoryOptions::default()).unwrap();
    history.navigate("b", true);

    assert_eq!(count.get(), 2);
    assert_eq!(log.borrow().len(), 2);
}

// ============================================================================
// History Lifecycle Tests
// ============================================================================

#[test]
fn test_second_start_fails_and_restart_dispatches() {
    let log: Log = Rc::default();
    let history = History::new(MemoryHost::new("/#home"));
    Router::builder(history.clone())
        .route(Route::new("home", recorder(&log, "home")))
        .build()
        .unwrap();

    history.start(HistoryOptions::default()).unwrap();
    assert_eq!(
        history.start(HistoryOptions::default()),
        Err(Error::Configuration(ConfigurationError::AlreadyStarted))
    );

    history.stop();
    assert!(!history.is_started());
    assert!(history.start(HistoryOptions::default()).unwrap());
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn test_mode_follows_capabilities() {
    let cases = [
        (MemoryHost::new("/"), HistoryOptions::new().push_state(true), NavigationMode::PushState),
        (MemoryHost::new("/"), HistoryOptions::new(), NavigationMode::HashChange),
        (
            MemoryHost::new("/").with_hash_change(false),
            HistoryOptions::new(),
            NavigationMode::Polling { frame: false },
        ),
        (
            MemoryHost::new("/").legacy(),
            HistoryOptions::new(),
            NavigationMode::Polling { frame: true },
        ),
        (
            MemoryHost::new("/"),
            HistoryOptions::new().hash_change(false),
            NavigationMode::FullPage,
        ),
    ];

    for (host, options, expected) in cases {
        let history = History::new(host);
        history.start(options).unwrap();
        assert_eq!(history.mode(), Some(expected));
    }
}

#[test]
fn test_polling_timer_uses_interval() {
    let host = MemoryHost::new("/").with_hash_change(false);
    let history = History::new(host.clone());

    history
        .start(HistoryOptions::new().interval(Duration::from_millis(100)))
        .unwrap();
    assert_eq!(host.timer(), Some(Duration::from_millis(100)));

    history.stop();
    assert_eq!(host.timer(), None);
}

#[test]
fn test_stop_releases_listeners() {
    let host = MemoryHost::new("/");
    let history = History::new(host.clone());

    history.start(HistoryOptions::new().push_state(true)).unwrap();
    assert!(host.is_listening(NavigationEvent::PopState));

    history.stop();
    assert!(!host.is_listening(NavigationEvent::PopState));
}

// ============================================================================
// Navigation Tests
// ============================================================================

#[test]
fn test_same_fragment_updates_location_once() {
    let host = MemoryHost::new("/");
    let history = History::new(host.clone());
    history.start(HistoryOptions::default()).unwrap();

    assert!(history.navigate("posts/1", false));
    assert!(!history.navigate("posts/1", false));
    assert_eq!(host.hash_writes(), 1);
    assert_eq!(host.url(), "/#posts/1");
}

#[test]
fn test_push_state_back_and_forward() {
    let log: Log = Rc::default();
    let host = MemoryHost::new("/app/");
    let history = History::new(host.clone());
    Router::builder(history.clone())
        .route(Route::new("*page", recorder(&log, "page")))
        .build()
        .unwrap();

    history
        .start(HistoryOptions::new().root("app").push_state(true))
        .unwrap();
    history.navigate("one", true);
    history.navigate("two", true);
    assert_eq!(host.url(), "/app/two");

    assert_eq!(host.back(), Some(NavigationEvent::PopState));
    assert_eq!(history.fragment(), "one");

    assert_eq!(host.forward(), Some(NavigationEvent::PopState));
    assert_eq!(history.fragment(), "two");
    assert_eq!(
        *log.borrow(),
        vec![
            "page[null, null]".to_string(),
            "page[one, null]".to_string(),
            "page[two, null]".to_string(),
            "page[one, null]".to_string(),
            "page[two, null]".to_string(),
        ]
    );
}

#[test]
fn test_hash_change_from_address_bar() {
    let log: Log = Rc::default();
    let host = MemoryHost::new("/");
    let history = History::new(host.clone());
    Router::builder(history.clone())
        .route(Route::new("posts/:id", recorder(&log, "post")))
        .build()
        .unwrap();
    history.start(HistoryOptions::default()).unwrap();

    assert_eq!(host.visit("/#posts/5"), Some(NavigationEvent::HashChange));
    assert!(!history.check_url());
    assert_eq!(*log.borrow(), vec!["post[5, null]".to_string()]);
}

#[test]
fn test_polling_picks_up_change_on_tick() {
    let log: Log = Rc::default();
    let host = MemoryHost::new("/").with_hash_change(false);
    let history = History::new(host.clone());
    Router::builder(history.clone())
        .route(Route::new("inbox", recorder(&log, "inbox")))
        .build()
        .unwrap();
    history.start(HistoryOptions::default()).unwrap();

    assert_eq!(host.visit("/#inbox"), None);
    assert!(log.borrow().is_empty());

    assert!(host.tick());
    assert_eq!(*log.borrow(), vec!["inbox[null]".to_string()]);
    assert!(!history.check_url());
}

#[test]
fn test_hash_url_becomes_push_state_url() {
    let host = MemoryHost::new("/#posts/9");
    let history = History::new(host.clone());

    history
        .start(HistoryOptions::new().push_state(true))
        .unwrap();
    assert_eq!(host.url(), "/posts/9");
    assert_eq!(history.fragment(), "posts/9");
}

// ============================================================================
// Region and Controller Tests
// ============================================================================

#[test]
fn test_render_swaps_events_between_views() {
    let doc = MemoryDocument::new().with_container("#app");
    let mut region = Region::default_region(Rc::new(doc.clone()));

    let v = View::builder("v")
        .template(r#"<button id="save">save</button>"#)
        .on("#save", "click", || {})
        .build();
    let w = View::builder("w")
        .template(r#"<button id="cancel">cancel</button>"#)
        .on("#cancel", "click", || {})
        .build();

    region.render_view(Rc::new(v));
    region.render_view(Rc::new(w));

    let journal = doc.journal();
    let unbound = journal.iter().position(|e| e == "off #save click").unwrap();
    let bound = journal.iter().position(|e| e == "on #cancel click").unwrap();
    assert!(unbound < bound);
    assert_eq!(
        doc.content("#app").as_deref(),
        Some(r#"<button id="cancel">cancel</button>"#)
    );
    assert_eq!(doc.trigger("#save", "click"), 0);
}

#[test]
fn test_dispose_empty_region_is_invalid_state() {
    let doc = MemoryDocument::new().with_container("#app");
    let mut region = Region::default_region(Rc::new(doc));

    let error = region.dispose_view().unwrap_err();
    assert!(error.is_invalid_state());
}

#[test]
fn test_route_renders_view_through_controller() {
    let doc = MemoryDocument::new().with_container("#app");
    let region = Region::default_region(Rc::new(doc.clone())).into_handle();
    let controller = Rc::new(RefCell::new(Controller::new(region).named("posts")));

    let history = History::new(MemoryHost::new("/#posts/12"));
    let posts = Rc::clone(&controller);
    Router::builder(history.clone())
        .route(Route::new("posts/:id", move |args| {
            let id = args.get(0).unwrap_or_default().to_string();
            let view = View::builder("post")
                .data(ViewData::Static(serde_json::json!({ "id": id })))
                .renderer(|view| {
                    let data = view.data().unwrap_or_default();
                    format!("<article>post {}</article>", data["id"].as_str().unwrap_or(""))
                })
                .build();
            posts.borrow_mut().init(Rc::new(view), None).unwrap();
        }))
        .build()
        .unwrap();

    history.start(HistoryOptions::default()).unwrap();
    assert_eq!(doc.content("#app").as_deref(), Some("<article>post 12</article>"));

    history.navigate("posts/13", true);
    assert_eq!(doc.content("#app").as_deref(), Some("<article>post 13</article>"));
}

#[test]
fn test_secured_controller_shows_login_until_authenticated() {
    struct Session(Cell<bool>);

    impl Authenticator for Session {
        fn is_authenticated(&self) -> Result<bool> {
            Ok(self.0.get())
        }

        fn log_in(&self) {
            self.0.set(true);
        }
    }

    let doc = MemoryDocument::new().with_container("#app");
    let region = Region::default_region(Rc::new(doc.clone())).into_handle();

    let mut auth = AuthController::new(Rc::clone(&region), Session(Cell::new(false)));
    auth.init(Rc::new(View::new("<form>login</form>")), None);
    assert_eq!(doc.content("#app").as_deref(), Some(""));

    let mut admin = SecuredController::new(Rc::clone(&region)).named("admin");
    admin
        .init(Rc::new(View::new("<p>admin</p>")), None, &mut auth)
        .unwrap();
    assert_eq!(doc.content("#app").as_deref(), Some("<form>login</form>"));

    auth.log_in();
    let mut admin = SecuredController::new(region).named("admin");
    admin
        .init(Rc::new(View::new("<p>admin</p>")), None, &mut auth)
        .unwrap();
    assert_eq!(doc.content("#app").as_deref(), Some("<p>admin</p>"));
}

#[test]
fn test_unimplemented_authenticator_blocks_secured_controller() {
    struct Pending;

    impl Authenticator for Pending {}

    let doc = MemoryDocument::new().with_container("#app");
    let region = Region::default_region(Rc::new(doc)).into_handle();
    let mut auth = AuthController::new(Rc::clone(&region), Pending);
    let mut secured = SecuredController::new(region);

    let result = secured.init(Rc::new(View::default()), None, &mut auth);
    assert!(matches!(
        result,
        Err(Error::Configuration(ConfigurationError::NotImplemented { .. }))
    ));
}
