use super::*;
use crate::deferred::{capability, DeferredRegistry, SlotKey};
use crate::host::Store;
use crate::logging::{BufferLayer, LogBuffer, LogLevel};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use tokio::task::LocalSet;
use tracing_subscriber::layer::SubscriberExt;

const WINDOW: Size = Size {
    width: 1280.0,
    height: 800.0,
};

async fn booted() -> DemoApp {
    let mut app = DemoApp::assemble(&default_layouts(), "#app").unwrap();
    app.boot(WINDOW).await.unwrap();
    app
}

fn state(app: &DemoApp, path: &str) -> VisibilityState {
    app.root().find(path).unwrap().state()
}

fn style(app: &DemoApp, path: &str) -> Option<String> {
    let node = app.root().find(path)?.node()?;
    app.dom().get_attribute(node, "style")
}

#[tokio::test]
async fn boot_activates_only_the_dashboard() {
    LocalSet::new()
        .run_until(async {
            let app = booted().await;

            for path in ["", "topnav", "sidebar", "content", "content.dashboard"] {
                assert_eq!(state(&app, path), VisibilityState::Visible, "{path}");
            }
            for path in ["content.company", "content.deck", "content.library"] {
                let panel = app.root().find(path).unwrap();
                assert_eq!(panel.state(), VisibilityState::Hidden, "{path}");
                assert!(!panel.is_initialized(), "{path}");
            }

            assert_eq!(
                style(&app, "topnav").as_deref(),
                Some("position:absolute;left:0px;top:0px;width:1280px;height:56px")
            );
            assert_eq!(
                app.dom().html_of("content-dashboard").as_deref(),
                Some("<h2>Dashboard</h2><p>4 decks</p>")
            );
            assert!(app.scheduler().failures().is_empty());
        })
        .await;
}

#[tokio::test]
async fn saving_a_deck_updates_header_then_leftnav() {
    let buffer = LogBuffer::new();
    let subscriber = tracing_subscriber::registry().with(BufferLayer::new(buffer.clone()));
    let _guard = tracing::subscriber::set_default(subscriber);

    LocalSet::new()
        .run_until(async {
            let mut app = booted().await;
            let handled = app
                .click("#content-dashboard", Some("Board update"))
                .await
                .unwrap();
            assert_eq!(handled, 1);

            assert_eq!(
                app.dom().html_of("topnav").as_deref(),
                Some("<header><h1>Decks</h1><span class=\"count\">5</span></header>")
            );
            assert!(app
                .dom()
                .html_of("sidebar")
                .is_some_and(|html| html.contains("deck (5)")));
            assert_eq!(
                app.store().peek(DECKS_KEY).and_then(|d| d.as_array().map(Vec::len)),
                Some(5)
            );
        })
        .await;

    let updates: Vec<String> = buffer
        .get_all()
        .into_iter()
        .filter(|e| e.message == "count updated")
        .map(|e| e.fields)
        .collect();
    assert_eq!(updates, ["view=Header count=5", "view=LeftNav count=5"]);

    let mut published: Vec<String> = buffer
        .get_all()
        .into_iter()
        .filter(|e| e.message == "updateCount published")
        .map(|e| e.fields)
        .collect();
    published.sort();
    assert_eq!(published, ["view=Header", "view=LeftNav"]);
    assert!(buffer.at_least(LogLevel::Warn).is_empty());
}

/// Reads always fail; writes go through to the wrapped store
struct UnreadableStore(MemoryStore);

impl Store for UnreadableStore {
    fn fetch(&self, key: &str) -> LocalBoxFuture<'static, anyhow::Result<Value>> {
        let key = key.to_string();
        futures::future::ready(Err(anyhow::anyhow!("read of '{key}' timed out"))).boxed_local()
    }

    fn save(&self, key: &str, value: Value) -> LocalBoxFuture<'static, anyhow::Result<Value>> {
        self.0.save(key, value)
    }

    fn remove(&self, key: &str) -> LocalBoxFuture<'static, anyhow::Result<Value>> {
        self.0.remove(key)
    }
}

#[tokio::test]
async fn failed_deck_load_leaves_stored_decks_alone() {
    let store = seed_store();
    let registry = DeferredRegistry::new();
    let header = Rc::new(RefCell::new(Vec::new()));
    let log = header.clone();
    registry
        .resolve(
            SlotKey::new("Header", "updateCount"),
            capability(move |arg: Value| {
                log.borrow_mut().push(arg);
                futures::future::ready(Ok(()))
            }),
        )
        .unwrap();

    let err = add_deck(
        Rc::new(UnreadableStore(store.clone())),
        registry,
        "New".to_string(),
    )
    .await
    .unwrap_err();

    assert!(format!("{err:#}").starts_with("loading decks"));
    assert_eq!(
        store.peek(DECKS_KEY).and_then(|d| d.as_array().map(Vec::len)),
        Some(4)
    );
    assert!(header.borrow().is_empty());
}

#[tokio::test]
async fn reshowing_the_header_keeps_its_capability() {
    LocalSet::new()
        .run_until(async {
            let mut app = booted().await;
            app.root().make_hidden("topnav").await.unwrap();
            app.root().make_visible("topnav").await.unwrap();
            assert!(app.scheduler().failures().is_empty());

            app.click("#content-dashboard", Some("Retro")).await.unwrap();
            assert!(app
                .dom()
                .html_of("topnav")
                .is_some_and(|html| html.contains("<span class=\"count\">5</span>")));
        })
        .await;
}

#[tokio::test]
async fn sidebar_click_switches_content() {
    LocalSet::new()
        .run_until(async {
            let mut app = booted().await;
            app.click("#sidebar", Some("deck")).await.unwrap();

            assert_eq!(state(&app, "content.deck"), VisibilityState::Visible);
            assert_eq!(state(&app, "content.dashboard"), VisibilityState::Hidden);
            assert_eq!(state(&app, "topnav"), VisibilityState::Visible);
            assert!(app
                .dom()
                .html_of("content-deck")
                .is_some_and(|html| html.contains("<li>Roadmap</li>")));
            assert!(app.dom().html_of("content-dashboard").is_none());
        })
        .await;
}

#[tokio::test]
async fn failed_navigation_is_recorded_not_retried() {
    LocalSet::new()
        .run_until(async {
            let store = seed_store();
            store.fail_on(views::LIBRARY_KEY);
            let mut app = DemoApp::assemble_with(&default_layouts(), "#app", store).unwrap();
            app.boot(WINDOW).await.unwrap();

            app.navigate("content.library").await;
            app.navigate("nowhere").await;

            let failures = app.scheduler().failures();
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].action, "navigate content.library");
            assert!(matches!(
                &failures[0].error,
                PanelError::VisibilityTransition { panel, reason }
                    if panel == "content.library" && reason.starts_with("loading library")
            ));
            assert_eq!(
                failures[1].error,
                PanelError::UnknownPanel("nowhere".into())
            );

            assert_eq!(state(&app, "content"), VisibilityState::Visible);
            assert_eq!(state(&app, "content.library"), VisibilityState::Hidden);
            assert!(app.dom().html_of("content-library").is_none());
        })
        .await;
}

#[tokio::test]
async fn resize_repositions_visible_panels() {
    LocalSet::new()
        .run_until(async {
            let mut app = booted().await;
            app.handle().resize(Size::new(800.0, 600.0));
            app.resize(Size::new(1000.0, 700.0)).await;

            assert_eq!(
                style(&app, "sidebar").as_deref(),
                Some("position:absolute;left:0px;top:56px;width:220px;height:644px")
            );
            assert_eq!(
                style(&app, "content").as_deref(),
                Some("position:absolute;left:220px;top:56px;width:780px;height:644px")
            );
            assert_eq!(style(&app, "content.deck"), None);

            let layout = app.scheduler().layout();
            assert_eq!(layout.borrow().window(), Some(Size::new(1000.0, 700.0)));
        })
        .await;
}

#[tokio::test]
async fn shutdown_tears_everything_down() {
    LocalSet::new()
        .run_until(async {
            let mut app = booted().await;
            app.shutdown().await;

            assert!(app.scheduler().is_stopped());
            for panel in app.root().walk() {
                assert_eq!(panel.state(), VisibilityState::Hidden, "{}", panel.label());
            }
            assert_eq!(app.dom().snapshot(), "#app\n");
            assert_eq!(app.dom().total_listeners(), 0);
        })
        .await;
}

#[test]
fn missing_mount_point_is_an_error() {
    let err = DemoApp::assemble(&default_layouts(), "#root").err().unwrap();
    assert!(err.to_string().contains("#root"));
}

#[test]
fn missing_layout_node_is_an_error() {
    let layouts: Vec<_> = default_layouts()
        .into_iter()
        .filter(|spec| spec.name != "sidebar")
        .collect();
    let err = DemoApp::assemble(&layouts, "#app").err().unwrap();
    assert!(format!("{err:#}").contains("unknown layout 'sidebar'"));
}

#[tokio::test]
async fn report_lists_states_and_elements() {
    LocalSet::new()
        .run_until(async {
            let app = booted().await;
            let report = app.report();
            assert!(report.contains("● AppMain (Visible)"));
            assert!(report.contains("○ library (Hidden)"));
            assert!(report.contains("#content-dashboard"));
            assert!(!report.contains("failures:"));
        })
        .await;
}
