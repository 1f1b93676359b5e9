use super::*;
use crate::host::{Dom, DomEvent, MemoryDom};
use crate::layout::{Geometry, LayoutTree, Placement, Size};
use anyhow::anyhow;
use futures::channel::oneshot;
use futures::FutureExt;
use std::cell::Cell;

#[derive(Clone, Default)]
struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }
}

enum Before {
    Ready,
    Fail(&'static str),
    /// Settles when the paired sender fires
    Gate(Option<oneshot::Receiver<Result<(), String>>>),
}

/// Leaf that journals every hook call
struct Probe {
    name: &'static str,
    journal: Journal,
    before: Before,
    fail_init: bool,
}

impl Probe {
    fn new(name: &'static str, journal: &Journal) -> Self {
        Self {
            name,
            journal: journal.clone(),
            before: Before::Ready,
            fail_init: false,
        }
    }

    fn failing(mut self, reason: &'static str) -> Self {
        self.before = Before::Fail(reason);
        self
    }

    fn gated(mut self) -> (Self, oneshot::Sender<Result<(), String>>) {
        let (tx, rx) = oneshot::channel();
        self.before = Before::Gate(Some(rx));
        (self, tx)
    }

    fn broken_init(mut self) -> Self {
        self.fail_init = true;
        self
    }
}

impl View for Probe {
    fn init(&mut self, _ctx: &MountContext) -> anyhow::Result<()> {
        self.journal.push(format!("{}.init", self.name));
        if self.fail_init {
            return Err(anyhow!("missing model"));
        }
        Ok(())
    }

    fn before(&mut self, surface: &Surface) -> Completion {
        self.journal.push(format!("{}.before", self.name));
        let rendered = surface.set_html(&format!("<p>{}</p>", self.name));
        let journal = self.journal.clone();
        let _ = surface.on("click", move |_: &DomEvent| journal.push("click"));

        match &mut self.before {
            Before::Ready => futures::future::ready(rendered).boxed_local(),
            Before::Fail(reason) => {
                let reason = *reason;
                futures::future::ready(Err(anyhow!(reason))).boxed_local()
            }
            Before::Gate(rx) => {
                let rx = rx.take();
                async move {
                    let rx = rx.ok_or_else(|| anyhow!("gate already used"))?;
                    match rx.await {
                        Ok(Ok(())) => Ok(()),
                        Ok(Err(reason)) => Err(anyhow!(reason)),
                        Err(_) => Err(anyhow!("gate dropped")),
                    }
                }
                .boxed_local()
            }
        }
    }

    fn after(&mut self, _surface: &Surface) {
        self.journal.push(format!("{}.after", self.name));
    }

    fn teardown(&mut self, _surface: &Surface) {
        self.journal.push(format!("{}.teardown", self.name));
    }
}

fn mount(root: &Panel, dom: &MemoryDom, layout: LayoutTree) {
    let context = MountContext::builder(Rc::new(dom.clone())).build();
    root.seed(Mount {
        context,
        layout: layout.into_shared(),
        root_node: None,
    });
}

fn app(journal: &Journal) -> Panel {
    PanelSpec::container("AppMain")
        .child(PanelSpec::leaf("topnav", Probe::new("topnav", journal)))
        .child(PanelSpec::leaf("sidebar", Probe::new("sidebar", journal)))
        .child(
            PanelSpec::container("content")
                .exclusive()
                .activate(["dashboard"])
                .child(PanelSpec::leaf("dashboard", Probe::new("dashboard", journal)))
                .child(PanelSpec::leaf("deck", Probe::new("deck", journal))),
        )
        .build()
        .unwrap()
}

#[tokio::test]
async fn lazy_activation_leaves_inactive_children_uninitialized() {
    let journal = Journal::default();
    let dom = MemoryDom::new();
    let root = app(&journal);
    mount(&root, &dom, LayoutTree::new());

    root.show().await.unwrap();

    for path in ["", "topnav", "sidebar", "content", "content.dashboard"] {
        assert_eq!(root.find(path).unwrap().state(), VisibilityState::Visible, "{path}");
    }
    let deck = root.find("content.deck").unwrap();
    assert_eq!(deck.state(), VisibilityState::Hidden);
    assert!(!deck.is_initialized());
    assert_eq!(journal.count("deck.init"), 0);
    assert_eq!(dom.html_of("content-dashboard").as_deref(), Some("<p>dashboard</p>"));
    assert!(dom.html_of("content-deck").is_none());
}

#[tokio::test]
async fn make_visible_is_idempotent() {
    let journal = Journal::default();
    let dom = MemoryDom::new();
    let root = app(&journal);
    mount(&root, &dom, LayoutTree::new());
    root.show().await.unwrap();

    let content = root.find("content").unwrap();
    content.make_visible("deck").await.unwrap();
    content.make_visible("deck").await.unwrap();

    assert_eq!(journal.count("deck.init"), 1);
    assert_eq!(journal.count("deck.before"), 1);
    assert_eq!(journal.count("deck.after"), 1);
}

#[tokio::test]
async fn hide_then_show_round_trip() {
    let journal = Journal::default();
    let dom = MemoryDom::new();
    let root = app(&journal);
    mount(&root, &dom, LayoutTree::new());
    root.show().await.unwrap();

    let dashboard = root.find("content.dashboard").unwrap();
    let node = dashboard.node().unwrap();
    assert_eq!(dom.listener_count(node), 1);

    let content = root.find("content").unwrap();
    content.make_hidden("dashboard").await.unwrap();
    assert_eq!(dashboard.state(), VisibilityState::Hidden);
    assert!(dashboard.node().is_none());
    assert!(!dom.contains(node));
    assert_eq!(journal.count("dashboard.teardown"), 1);

    content.make_visible("dashboard").await.unwrap();
    assert_eq!(dashboard.state(), VisibilityState::Visible);
    assert_eq!(journal.count("dashboard.init"), 1);
    assert_eq!(journal.count("dashboard.before"), 2);
    assert_eq!(dom.listener_count(dashboard.node().unwrap()), 1);
}

#[tokio::test]
async fn make_hidden_on_never_shown_child_is_noop() {
    let journal = Journal::default();
    let root = app(&journal);
    mount(&root, &MemoryDom::new(), LayoutTree::new());
    root.show().await.unwrap();

    root.find("content")
        .unwrap()
        .make_hidden("deck")
        .await
        .unwrap();
    assert_eq!(journal.count("deck.teardown"), 0);
}

#[tokio::test]
async fn slot_errors() {
    let journal = Journal::default();
    let root = app(&journal);
    mount(&root, &MemoryDom::new(), LayoutTree::new());

    assert_eq!(
        root.make_visible("topnav").await.unwrap_err(),
        PanelError::ContainerHidden {
            container: "AppMain".into(),
            slot: "topnav".into()
        }
    );

    root.show().await.unwrap();
    assert!(matches!(
        root.make_visible("footer").await,
        Err(PanelError::UnknownSlot { slot, .. }) if slot == "footer"
    ));
    assert_eq!(
        root.find("topnav").unwrap().make_visible("x").await.unwrap_err(),
        PanelError::NotAContainer("topnav".into())
    );
}

#[tokio::test]
async fn failing_child_fails_aggregate_and_unwinds_siblings() {
    let journal = Journal::default();
    let dom = MemoryDom::new();
    let (slow, gate) = Probe::new("slow", &journal).gated();
    let root = PanelSpec::container("AppMain")
        .child(PanelSpec::leaf("slow", slow))
        .child(PanelSpec::leaf("ok", Probe::new("ok", &journal)))
        .child(PanelSpec::leaf("bad", Probe::new("bad", &journal).failing("network down")))
        .build()
        .unwrap();
    mount(&root, &dom, LayoutTree::new());

    let release = async move {
        tokio::task::yield_now().await;
        let _ = gate.send(Ok(()));
    };
    let (result, ()) = tokio::join!(root.show(), release);

    assert_eq!(
        result.unwrap_err(),
        PanelError::VisibilityTransition {
            panel: "bad".into(),
            reason: "network down".into()
        }
    );
    for panel in root.walk() {
        assert_eq!(panel.state(), VisibilityState::Hidden, "{}", panel.label());
        assert!(panel.node().is_none());
    }
    assert_eq!(dom.total_listeners(), 0);
    assert_eq!(dom.snapshot(), "");
    assert_eq!(journal.count("ok.after"), 1);
    assert_eq!(journal.count("ok.teardown"), 1);
    assert_eq!(journal.count("slow.teardown"), 1);
}

#[tokio::test]
async fn failing_child_leaves_visible_parent_intact() {
    let journal = Journal::default();
    let root = PanelSpec::container("AppMain")
        .activate(["home"])
        .child(PanelSpec::leaf("home", Probe::new("home", &journal)))
        .child(PanelSpec::leaf("bad", Probe::new("bad", &journal).failing("boom")))
        .build()
        .unwrap();
    mount(&root, &MemoryDom::new(), LayoutTree::new());
    root.show().await.unwrap();

    let err = root.make_visible("bad").await.unwrap_err();
    assert_eq!(err.panel(), Some("bad"));
    assert_eq!(root.state(), VisibilityState::Visible);
    assert_eq!(root.find("home").unwrap().state(), VisibilityState::Visible);
    assert_eq!(root.find("bad").unwrap().state(), VisibilityState::Hidden);
}

#[tokio::test]
async fn second_show_awaits_in_flight_transition() {
    let journal = Journal::default();
    let (slow, gate) = Probe::new("slow", &journal).gated();
    let root = PanelSpec::container("AppMain")
        .activate(Vec::<String>::new())
        .child(PanelSpec::leaf("slow", slow))
        .build()
        .unwrap();
    mount(&root, &MemoryDom::new(), LayoutTree::new());
    root.show().await.unwrap();

    let first = root.make_visible("slow");
    let second = root.make_visible("slow");
    let release = async move {
        tokio::task::yield_now().await;
        assert_eq!(
            root.find("slow").unwrap().state(),
            VisibilityState::Showing
        );
        let _ = gate.send(Ok(()));
    };
    let (a, b, ()) = tokio::join!(first, second, release);

    a.unwrap();
    b.unwrap();
    assert_eq!(journal.count("slow.before"), 1);
}

#[tokio::test]
async fn hide_during_show_waits_then_tears_down() {
    let journal = Journal::default();
    let (slow, gate) = Probe::new("slow", &journal).gated();
    let root = PanelSpec::container("AppMain")
        .activate(Vec::<String>::new())
        .child(PanelSpec::leaf("slow", slow))
        .build()
        .unwrap();
    mount(&root, &MemoryDom::new(), LayoutTree::new());
    root.show().await.unwrap();

    let show = root.make_visible("slow");
    let hide = root.make_hidden("slow");
    let release = async move {
        tokio::task::yield_now().await;
        let _ = gate.send(Ok(()));
    };
    let (shown, hidden, ()) = tokio::join!(show, hide, release);

    shown.unwrap();
    hidden.unwrap();
    assert_eq!(root.find("slow").unwrap().state(), VisibilityState::Hidden);
    assert_eq!(
        journal.entries(),
        ["slow.init", "slow.before", "slow.after", "slow.teardown"]
    );
}

#[tokio::test]
async fn init_failure_is_sticky() {
    let journal = Journal::default();
    let root = PanelSpec::container("AppMain")
        .activate(Vec::<String>::new())
        .child(PanelSpec::leaf("broken", Probe::new("broken", &journal).broken_init()))
        .build()
        .unwrap();
    mount(&root, &MemoryDom::new(), LayoutTree::new());
    root.show().await.unwrap();

    let first = root.make_visible("broken").await.unwrap_err();
    let second = root.make_visible("broken").await.unwrap_err();

    assert!(matches!(&first, PanelError::Initialization { panel, reason }
        if panel == "broken" && reason == "missing model"));
    assert_eq!(first, second);
    assert_eq!(journal.count("broken.init"), 1);
    assert_eq!(journal.count("broken.before"), 0);
    assert_eq!(root.find("broken").unwrap().state(), VisibilityState::Hidden);
}

#[tokio::test]
async fn unmounted_root_fails_to_initialize() {
    let journal = Journal::default();
    let root = app(&journal);
    assert!(matches!(
        root.show().await,
        Err(PanelError::Initialization { .. })
    ));
}

#[tokio::test]
async fn switch_to_hides_visible_siblings() {
    let journal = Journal::default();
    let root = app(&journal);
    mount(&root, &MemoryDom::new(), LayoutTree::new());
    root.show().await.unwrap();

    let content = root.find("content").unwrap();
    content.switch_to("deck").await.unwrap();

    assert_eq!(root.find("content.deck").unwrap().state(), VisibilityState::Visible);
    assert_eq!(
        root.find("content.dashboard").unwrap().state(),
        VisibilityState::Hidden
    );
    assert_eq!(root.find("topnav").unwrap().state(), VisibilityState::Visible);
}

#[tokio::test]
async fn layout_ref_places_element() {
    let mut layout = LayoutTree::new();
    layout
        .register_layout("topnav", |_| Geometry::new(10.0, 20.0, 100.0, 800.0), None)
        .unwrap();
    layout.recompute(Size::new(1280.0, 800.0));

    let dom = MemoryDom::new();
    let journal = Journal::default();
    let root = PanelSpec::container("AppMain")
        .child(PanelSpec::leaf("topnav", Probe::new("topnav", &journal)).layout("topnav"))
        .child(PanelSpec::leaf("body", Probe::new("body", &journal)))
        .build()
        .unwrap();
    mount(&root, &dom, layout);
    root.show().await.unwrap();

    let topnav = root.find("topnav").unwrap().node().unwrap();
    assert_eq!(
        dom.get_attribute(topnav, "style").as_deref(),
        Some("position:absolute;left:10px;top:20px;width:100px;height:800px")
    );
    let body = root.find("body").unwrap().node().unwrap();
    assert_eq!(
        dom.get_attribute(body, "style"),
        Some(Placement::FullBleed.to_style())
    );
}

struct Scoped {
    seen: Rc<Cell<bool>>,
}

impl View for Scoped {
    fn init(&mut self, ctx: &MountContext) -> anyhow::Result<()> {
        self.seen.set(ctx.require_setting("section")? == "deck");
        Ok(())
    }

    fn before(&mut self, _surface: &Surface) -> Completion {
        ready()
    }
}

struct Sections;

impl ContainerView for Sections {
    fn child_context(&self, slot: &str, ctx: &MountContext) -> MountContext {
        ctx.with_setting("section", serde_json::json!(slot))
    }
}

#[tokio::test]
async fn container_injects_child_context() {
    let seen = Rc::new(Cell::new(false));
    let root = PanelSpec::container("AppMain")
        .view(Sections)
        .child(PanelSpec::leaf("deck", Scoped { seen: seen.clone() }))
        .build()
        .unwrap();
    mount(&root, &MemoryDom::new(), LayoutTree::new());

    root.show().await.unwrap();
    assert!(seen.get());
}

/// Container chrome that journals its own hooks
struct Chrome {
    name: &'static str,
    journal: Journal,
}

impl ContainerView for Chrome {
    fn before(&mut self, _surface: &Surface) -> Completion {
        self.journal.push(format!("{}.before", self.name));
        ready()
    }

    fn teardown(&mut self, _surface: &Surface) {
        self.journal.push(format!("{}.teardown", self.name));
    }
}

#[tokio::test]
async fn show_during_hide_waits_then_shows_again() {
    let journal = Journal::default();
    let (slow, gate) = Probe::new("slow", &journal).gated();
    let root = PanelSpec::container("AppMain")
        .child(
            PanelSpec::container("section")
                .view(Chrome {
                    name: "section",
                    journal: journal.clone(),
                })
                .activate(Vec::<String>::new())
                .child(PanelSpec::leaf("slow", slow)),
        )
        .build()
        .unwrap();
    mount(&root, &MemoryDom::new(), LayoutTree::new());
    root.show().await.unwrap();

    let section = root.find("section").unwrap();
    let showing = section.make_visible("slow");
    let hiding = root.make_hidden("section");
    let reshow = root.make_visible("section");
    let watched = section.clone();
    let release = async move {
        tokio::task::yield_now().await;
        assert_eq!(watched.state(), VisibilityState::Hiding);
        let _ = gate.send(Ok(()));
    };
    let (shown, hidden, reshown, ()) = tokio::join!(showing, hiding, reshow, release);

    shown.unwrap();
    hidden.unwrap();
    reshown.unwrap();
    assert_eq!(section.state(), VisibilityState::Visible);
    assert!(section.node().is_some());
    assert_eq!(journal.count("section.before"), 2);
    assert_eq!(journal.count("section.teardown"), 1);
    assert_eq!(root.find("section.slow").unwrap().state(), VisibilityState::Hidden);
    assert_eq!(journal.count("slow.teardown"), 1);
}

#[tokio::test]
async fn failing_grandchild_fails_every_ancestor() {
    let journal = Journal::default();
    let dom = MemoryDom::new();
    let (slow, gate) = Probe::new("slow", &journal).gated();
    let root = PanelSpec::container("AppMain")
        .child(PanelSpec::leaf("side", Probe::new("side", &journal)))
        .child(
            PanelSpec::container("outer").child(
                PanelSpec::container("inner")
                    .child(PanelSpec::leaf("slow", slow))
                    .child(PanelSpec::leaf(
                        "bad",
                        Probe::new("bad", &journal).failing("network down"),
                    )),
            ),
        )
        .build()
        .unwrap();
    mount(&root, &dom, LayoutTree::new());

    let outer = root.find("outer").unwrap();
    let inner = root.find("outer.inner").unwrap();
    let release = async move {
        tokio::task::yield_now().await;
        let _ = gate.send(Ok(()));
    };
    let (top, middle, bottom, ()) = tokio::join!(root.show(), outer.show(), inner.show(), release);

    let expected = PanelError::VisibilityTransition {
        panel: "outer.inner.bad".into(),
        reason: "network down".into(),
    };
    assert_eq!(top.unwrap_err(), expected);
    assert_eq!(middle.unwrap_err(), expected);
    assert_eq!(bottom.unwrap_err(), expected);

    for panel in root.walk() {
        assert_eq!(panel.state(), VisibilityState::Hidden, "{}", panel.label());
        assert!(panel.node().is_none(), "{}", panel.label());
    }
    assert_eq!(dom.snapshot(), "");
    assert_eq!(dom.total_listeners(), 0);
    assert_eq!(journal.count("side.teardown"), 1);
    assert_eq!(journal.count("slow.after"), 1);
    assert_eq!(journal.count("slow.teardown"), 1);
}
