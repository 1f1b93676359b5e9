// Views of the demo application
//
// Header and LeftNav both show the number of decks. Neither knows who changes
// it: each registers an `updateCount` slot at init, binds its capability once
// its element exists, and the dashboard invokes both, Header first, after a
// deck is saved.

use super::Tasks;
use crate::deferred::{capability, Capability, Deferred, DeferredRegistry, SlotKey};
use crate::host::{DomEvent, Placeholders, Router, Store};
use crate::panel::{Completion, MountContext, Surface, View};
use anyhow::{anyhow, Context, Result};
use futures::FutureExt;
use serde_json::{json, Value};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

pub const DECKS_KEY: &str = "decks";
pub const LIBRARY_KEY: &str = "library";

/// A rendered counter that a capability can update after mount
struct Badge {
    view: &'static str,
    template: Placeholders,
    data: Value,
    surface: Option<Surface>,
}

type SharedBadge = Rc<RefCell<Badge>>;

fn badge(view: &'static str, template: &str, data: Value) -> SharedBadge {
    Rc::new(RefCell::new(Badge {
        view,
        template: Placeholders::new(template),
        data,
        surface: None,
    }))
}

impl Badge {
    fn render(&self) -> Result<()> {
        match &self.surface {
            Some(surface) if surface.is_attached() => surface.render(&self.template, &self.data),
            _ => Ok(()),
        }
    }
}

/// Apply an `updateCount` argument to a badge and re-render it
fn apply_count(target: &SharedBadge, arg: &Value) -> Result<()> {
    let count = arg
        .get("count")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("updateCount expects a numeric 'count'"))?;
    let mut badge = target.borrow_mut();
    badge.data["count"] = json!(count);
    badge.render()?;
    debug!(view = badge.view, count, "count updated");
    Ok(())
}

/// The `<view>.updateCount` slot a badge view publishes into
struct CountSlot {
    registry: DeferredRegistry,
    key: SlotKey,
    slot: Deferred<Capability>,
}

impl CountSlot {
    /// Register the pending slot. Callers that invoke it early wait for
    /// [`CountSlot::publish`].
    fn register(registry: &DeferredRegistry, view: &'static str) -> Self {
        let key = SlotKey::new(view, "updateCount");
        let slot = registry.register(&key);
        slot.then(move |_| debug!(view, "updateCount published"));
        Self {
            registry: registry.clone(),
            key,
            slot,
        }
    }

    /// Bind the capability to `badge`. Only the first show resolves.
    fn publish(&self, badge: &SharedBadge) -> Result<()> {
        if self.slot.is_resolved() {
            return Ok(());
        }
        let target = badge.clone();
        self.registry.resolve(
            &self.key,
            capability(move |arg: Value| futures::future::ready(apply_count(&target, &arg))),
        )?;
        Ok(())
    }
}

fn publish_and_mount(
    count: Option<&CountSlot>,
    badge: &SharedBadge,
    surface: &Surface,
) -> Completion {
    let mounted = mount_badge(badge, surface);
    match count.map_or(Ok(()), |slot| slot.publish(badge)) {
        Ok(()) => mounted,
        Err(err) => futures::future::ready(Err(err)).boxed_local(),
    }
}

fn mount_badge(badge: &SharedBadge, surface: &Surface) -> Completion {
    let mut state = badge.borrow_mut();
    state.surface = Some(surface.clone());
    let rendered = state.render();
    futures::future::ready(rendered).boxed_local()
}

/// Title bar with the deck count
pub struct Header {
    badge: SharedBadge,
    count: Option<CountSlot>,
}

impl Header {
    pub fn new(count: usize) -> Self {
        Self {
            badge: badge(
                "Header",
                "<header><h1>{{title}}</h1><span class=\"count\">{{count}}</span></header>",
                json!({ "title": "Decks", "count": count }),
            ),
            count: None,
        }
    }
}

impl View for Header {
    fn init(&mut self, ctx: &MountContext) -> Result<()> {
        if let Some(title) = ctx.setting("title") {
            self.badge.borrow_mut().data["title"] = title.clone();
        }
        self.count = Some(CountSlot::register(ctx.registry(), "Header"));
        Ok(())
    }

    fn before(&mut self, surface: &Surface) -> Completion {
        publish_and_mount(self.count.as_ref(), &self.badge, surface)
    }

    fn teardown(&mut self, _surface: &Surface) {
        self.badge.borrow_mut().surface = None;
    }
}

/// Navigation list. A click whose detail carries `value` navigates there.
pub struct LeftNav {
    badge: SharedBadge,
    count: Option<CountSlot>,
    router: Option<Rc<dyn Router>>,
}

impl LeftNav {
    pub fn new(count: usize) -> Self {
        Self {
            badge: badge(
                "LeftNav",
                "<nav><a>dashboard</a><a>company</a><a>deck ({{count}})</a><a>library</a></nav>",
                json!({ "count": count }),
            ),
            count: None,
            router: None,
        }
    }
}

impl View for LeftNav {
    fn init(&mut self, ctx: &MountContext) -> Result<()> {
        self.router = Some(ctx.router()?);
        self.count = Some(CountSlot::register(ctx.registry(), "LeftNav"));
        Ok(())
    }

    fn before(&mut self, surface: &Surface) -> Completion {
        if let Some(router) = self.router.clone() {
            let bound = surface.on("click", move |event: &DomEvent| {
                if let Some(view) = event.detail.get("value").and_then(Value::as_str) {
                    router.navigate_to(view);
                }
            });
            if let Err(err) = bound {
                return futures::future::ready(Err(err)).boxed_local();
            }
        }
        publish_and_mount(self.count.as_ref(), &self.badge, surface)
    }

    fn teardown(&mut self, _surface: &Surface) {
        self.badge.borrow_mut().surface = None;
    }
}

fn deck_titles(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Save a new deck, then refresh Header before LeftNav
pub async fn add_deck(
    store: Rc<dyn Store>,
    registry: DeferredRegistry,
    title: String,
) -> Result<()> {
    let stored = store.fetch(DECKS_KEY).await.context("loading decks")?;
    let mut decks = deck_titles(&stored);
    decks.push(title);
    let count = decks.len();

    let save = store.save(DECKS_KEY, json!(decks));
    registry
        .sequence()
        .after(async move { save.await.map(|_| ()).context("saving decks") })
        .invoke(SlotKey::new("Header", "updateCount"), json!({ "count": count }))
        .invoke(SlotKey::new("LeftNav", "updateCount"), json!({ "count": count }))
        .run()
        .await?;
    Ok(())
}

/// Landing page. Clicking it adds a deck named by the click's `value`.
pub struct Dashboard {
    tasks: Tasks,
    store: Option<Rc<dyn Store>>,
    registry: DeferredRegistry,
}

impl Dashboard {
    pub fn new(tasks: Tasks) -> Self {
        Self {
            tasks,
            store: None,
            registry: DeferredRegistry::new(),
        }
    }
}

impl View for Dashboard {
    fn init(&mut self, ctx: &MountContext) -> Result<()> {
        self.store = Some(ctx.store()?);
        self.registry = ctx.registry().clone();
        Ok(())
    }

    fn before(&mut self, surface: &Surface) -> Completion {
        let Some(store) = self.store.clone() else {
            return futures::future::ready(Err(anyhow!("dashboard has no store"))).boxed_local();
        };

        let tasks = self.tasks.clone();
        let registry = self.registry.clone();
        let listener_store = store.clone();
        let bound = surface.on("click", move |event: &DomEvent| {
            let title = event
                .detail
                .get("value")
                .and_then(Value::as_str)
                .unwrap_or("Untitled")
                .to_string();
            tasks.spawn(
                "add deck",
                add_deck(listener_store.clone(), registry.clone(), title),
            );
        });
        if let Err(err) = bound {
            return futures::future::ready(Err(err)).boxed_local();
        }

        let surface = surface.clone();
        async move {
            let decks = deck_titles(&store.fetch(DECKS_KEY).await?);
            surface.render(
                &Placeholders::new("<h2>Dashboard</h2><p>{{count}} decks</p>"),
                &json!({ "count": decks.len() }),
            )
        }
        .boxed_local()
    }
}

/// Deck list, rendered from the store each time it is shown
#[derive(Default)]
pub struct Deck {
    store: Option<Rc<dyn Store>>,
}

impl View for Deck {
    fn init(&mut self, ctx: &MountContext) -> Result<()> {
        self.store = Some(ctx.store()?);
        Ok(())
    }

    fn before(&mut self, surface: &Surface) -> Completion {
        let store = self.store.clone();
        let surface = surface.clone();
        async move {
            let store = store.ok_or_else(|| anyhow!("deck has no store"))?;
            let decks = store.fetch(DECKS_KEY).await?;
            let list = |data: &Value| -> Result<String> {
                let items: String = deck_titles(data)
                    .iter()
                    .map(|title| format!("<li>{title}</li>"))
                    .collect();
                Ok(format!("<ul>{items}</ul>"))
            };
            surface.render(&list, &decks)
        }
        .boxed_local()
    }
}

/// Static page rendered from the `company` setting
#[derive(Default)]
pub struct Company {
    name: String,
}

impl View for Company {
    fn init(&mut self, ctx: &MountContext) -> Result<()> {
        self.name = ctx
            .setting("company")
            .and_then(Value::as_str)
            .unwrap_or("Company")
            .to_string();
        Ok(())
    }

    fn before(&mut self, surface: &Surface) -> Completion {
        let rendered = surface.render(
            &Placeholders::new("<h2>{{name}}</h2>"),
            &json!({ "name": self.name }),
        );
        futures::future::ready(rendered).boxed_local()
    }
}

/// Shared documents; the store lookup can fail, which surfaces as a failed
/// transition
#[derive(Default)]
pub struct Library {
    store: Option<Rc<dyn Store>>,
}

impl View for Library {
    fn init(&mut self, ctx: &MountContext) -> Result<()> {
        self.store = Some(ctx.store()?);
        Ok(())
    }

    fn before(&mut self, surface: &Surface) -> Completion {
        let store = self.store.clone();
        let surface = surface.clone();
        async move {
            let store = store.ok_or_else(|| anyhow!("library has no store"))?;
            let items = store
                .fetch(LIBRARY_KEY)
                .await
                .context("loading library")?;
            surface.render(
                &Placeholders::new("<h2>Library</h2><p>{{total}} documents</p>"),
                &json!({ "total": items.as_array().map_or(0, Vec::len) }),
            )
        }
        .boxed_local()
    }
}
