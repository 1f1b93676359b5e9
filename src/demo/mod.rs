// Demo mode: the deck-manager sample application on an in-memory host
//
// Assembles a small application shell around the scheduler so the binary
// (and the tests) can drive it without a browser:
//
//   AppMain
//   ├── topnav    Header   (layout "topnav")
//   ├── sidebar   LeftNav  (layout "sidebar")
//   └── content   exclusive switcher (layout "content"), boots with dashboard
//       ├── dashboard
//       ├── company
//       ├── deck
//       └── library
//
// Run with: panelkit demo 'click:#content-dashboard=Roadmap' --trace

mod views;

pub use views::{add_deck, Company, Dashboard, Deck, Header, LeftNav, Library, DECKS_KEY};

use crate::error::PanelError;
use crate::host::{Dom, MemoryDom, MemoryStore, Router};
use crate::layout::{LayoutSpec, LayoutTree, Size};
use crate::panel::{MountContext, Panel, PanelSpec, VisibilityState};
use crate::scheduler::{host_channel, HostEvent, HostHandle, Scheduler};
use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::fmt::Write as _;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

/// Host element the demo mounts into
pub const HOST_ELEMENT: &str = "app";

/// Background work started from event listeners.
///
/// Listeners are synchronous; anything async they start is spawned on the
/// current `LocalSet` and tracked here so the driver can wait for it.
#[derive(Clone, Default)]
pub struct Tasks {
    handles: Rc<RefCell<Vec<JoinHandle<()>>>>,
}

impl Tasks {
    pub fn spawn<F>(&self, label: &'static str, work: F)
    where
        F: Future<Output = Result<()>> + 'static,
    {
        let handle = tokio::task::spawn_local(async move {
            if let Err(err) = work.await {
                warn!(task = label, error = %format!("{err:#}"), "background task failed");
            }
        });
        self.handles.borrow_mut().push(handle);
    }

    pub fn pending(&self) -> usize {
        self.handles.borrow().len()
    }

    /// Wait for every tracked task, including ones spawned meanwhile.
    /// Returns how many finished.
    pub async fn settle(&self) -> usize {
        let mut finished = 0;
        loop {
            let batch = std::mem::take(&mut *self.handles.borrow_mut());
            if batch.is_empty() {
                return finished;
            }
            for handle in batch {
                if let Err(err) = handle.await {
                    warn!(error = %err, "background task panicked or was cancelled");
                }
                finished += 1;
            }
        }
    }
}

/// Default layout nodes used when the config declares none
pub fn default_layouts() -> Vec<LayoutSpec> {
    vec![
        LayoutSpec::new("topnav", None).sized("100%", "56"),
        LayoutSpec::new("sidebar", None).at("0", "56").sized("220", "100%-56"),
        LayoutSpec::new("content", None)
            .at("220", "56")
            .sized("100%-220", "100%-56"),
    ]
}

/// Seed data for the in-memory store
pub fn seed_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert(
        DECKS_KEY,
        json!(["Quarterly review", "Onboarding", "Roadmap", "Hiring plan"]),
    );
    store.insert(views::LIBRARY_KEY, json!(["Brand guide", "Templates"]));
    store
}

/// The demo view tree
pub fn app_spec(initial_count: usize, tasks: Tasks) -> PanelSpec {
    PanelSpec::container("AppMain")
        .child(PanelSpec::leaf("topnav", Header::new(initial_count)).layout("topnav"))
        .child(PanelSpec::leaf("sidebar", LeftNav::new(initial_count)).layout("sidebar"))
        .child(
            PanelSpec::container("content")
                .layout("content")
                .exclusive()
                .activate(["dashboard"])
                .child(PanelSpec::leaf("dashboard", Dashboard::new(tasks)))
                .child(PanelSpec::leaf("company", Company::default()))
                .child(PanelSpec::leaf("deck", Deck::default()))
                .child(PanelSpec::leaf("library", Library::default())),
        )
        .into()
}

/// The demo application wired to an in-memory host
pub struct DemoApp {
    scheduler: Scheduler,
    dom: MemoryDom,
    store: MemoryStore,
    tasks: Tasks,
    handle: HostHandle,
    events: mpsc::UnboundedReceiver<HostEvent>,
}

impl DemoApp {
    /// Build the app with the given layout nodes, mounted at `mount`
    pub fn assemble(layouts: &[LayoutSpec], mount: &str) -> Result<Self> {
        Self::assemble_with(layouts, mount, seed_store())
    }

    pub fn assemble_with(layouts: &[LayoutSpec], mount: &str, store: MemoryStore) -> Result<Self> {
        let dom = MemoryDom::new();
        dom.create_element(None, HOST_ELEMENT);

        let layout = LayoutTree::from_specs(layouts).context("invalid layout declaration")?;
        let (handle, events) = host_channel();
        let tasks = Tasks::default();

        let initial_count = match store.peek(DECKS_KEY) {
            Some(Value::Array(decks)) => decks.len(),
            _ => 0,
        };
        let root = PanelSpec::build(app_spec(initial_count, tasks.clone()))
            .context("invalid view tree")?;

        let context = MountContext::builder(Rc::new(dom.clone()))
            .router(Rc::new(handle.clone()))
            .store(Rc::new(store.clone()))
            .setting("title", json!("Decks"))
            .setting("company", json!("Acme Presentations"))
            .build();

        let scheduler = Scheduler::new(root, layout, context).context("invalid view tree")?;
        if scheduler.mount_at(mount).is_none() {
            bail!("mount point '{mount}' not found");
        }

        Ok(Self {
            scheduler,
            dom,
            store,
            tasks,
            handle,
            events,
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn root(&self) -> &Panel {
        self.scheduler.root()
    }

    pub fn dom(&self) -> &MemoryDom {
        &self.dom
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn handle(&self) -> &HostHandle {
        &self.handle
    }

    pub async fn boot(&mut self, window: Size) -> Result<(), PanelError> {
        let result = self.scheduler.boot(window).await;
        self.pump().await;
        result
    }

    pub async fn navigate(&mut self, path: &str) {
        self.handle.navigate_to(path);
        self.pump().await;
    }

    pub async fn resize(&mut self, window: Size) {
        self.handle.resize(window);
        self.pump().await;
    }

    /// Dispatch a click on the element matching `selector`, with `value` as
    /// the event detail's `value`
    pub async fn click(&mut self, selector: &str, value: Option<&str>) -> Result<usize> {
        let Some(node) = self.dom.query(selector) else {
            bail!("no element matches '{selector}'");
        };
        let detail = value.map_or(Value::Null, |v| json!({ "value": v }));
        let handled = self.dom.dispatch(node, "click", detail);
        self.pump().await;
        Ok(handled)
    }

    pub async fn shutdown(&mut self) {
        self.handle.shutdown();
        self.pump().await;
    }

    /// Run background tasks and queued host events until both are idle
    pub async fn pump(&mut self) {
        loop {
            let finished = self.tasks.settle().await;
            let handled = self.scheduler.drain(&mut self.events).await;
            if finished == 0 && handled == 0 && self.tasks.pending() == 0 {
                break;
            }
        }
    }

    /// Panel states, element tree and recorded failures
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "panels:");
        for panel in self.root().walk() {
            let depth = panel.path().matches('.').count() + usize::from(!panel.path().is_empty());
            let marker = match panel.state() {
                VisibilityState::Visible => "●",
                VisibilityState::Hidden => "○",
                VisibilityState::Showing | VisibilityState::Hiding => "◐",
            };
            let _ = writeln!(
                out,
                "  {}{} {} ({:?})",
                "  ".repeat(depth),
                marker,
                panel.name(),
                panel.state()
            );
        }

        let _ = writeln!(out, "elements:");
        for line in self.dom.snapshot().lines() {
            let _ = writeln!(out, "  {line}");
        }

        let failures = self.scheduler.failures();
        if !failures.is_empty() {
            let _ = writeln!(out, "failures:");
            for failure in failures {
                let _ = writeln!(
                    out,
                    "  {} {}: {}",
                    failure.at.format("%H:%M:%S%.3f"),
                    failure.action,
                    failure.error
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests;
