//! Scheduler: boots the view tree and serializes host events.
//!
//! Host events (navigation requests, window resizes, shutdown) arrive on an
//! unbounded channel and are handled one at a time on the UI task. A queued
//! burst of resizes is coalesced to the last size before it is applied.
//! Failed transitions are logged and recorded, never retried.

mod resize;

pub use resize::{ResizeCoordinator, ResizeReport};

use crate::deferred::DeferredRegistry;
use crate::error::{DeclarationError, PanelError};
use crate::host::{NodeId, Router};
use crate::layout::{LayoutTree, SharedLayout, Size};
use crate::panel::{Mount, MountContext, Panel};
use chrono::{DateTime, Utc};
use std::cell::{Cell, RefCell};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events delivered by the host environment
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Resize(Size),
    Navigate(String),
    Shutdown,
}

/// Sending half of the host event channel.
///
/// Also the [`Router`] handed to panels: a navigation request from a view is
/// queued and handled after the current event finishes.
#[derive(Debug, Clone)]
pub struct HostHandle {
    tx: mpsc::UnboundedSender<HostEvent>,
}

/// Create the host event channel
pub fn host_channel() -> (HostHandle, mpsc::UnboundedReceiver<HostEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HostHandle { tx }, rx)
}

impl HostHandle {
    fn send(&self, event: HostEvent) {
        if let Err(err) = self.tx.send(event) {
            warn!(event = ?err.0, "host event dropped: scheduler is gone");
        }
    }

    pub fn resize(&self, window: Size) {
        self.send(HostEvent::Resize(window));
    }

    pub fn shutdown(&self) {
        self.send(HostEvent::Shutdown);
    }
}

impl Router for HostHandle {
    fn navigate_to(&self, view: &str) {
        self.send(HostEvent::Navigate(view.to_string()));
    }
}

/// A transition that failed while the scheduler drove it
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub at: DateTime<Utc>,
    /// What was being attempted (`boot`, `navigate content.deck`)
    pub action: String,
    pub error: PanelError,
}

/// Owns the view tree's root and the layout tree
pub struct Scheduler {
    root: Panel,
    layout: SharedLayout,
    context: MountContext,
    resize: ResizeCoordinator,
    mount_node: Cell<Option<NodeId>>,
    failures: RefCell<Vec<Failure>>,
    stopped: Cell<bool>,
}

impl Scheduler {
    /// Fails if any panel references a layout node that is not registered
    pub fn new(
        root: Panel,
        layout: LayoutTree,
        context: MountContext,
    ) -> Result<Self, DeclarationError> {
        for panel in root.walk() {
            if let Some(layout_ref) = panel.layout_ref() {
                if !layout.contains(layout_ref) {
                    return Err(DeclarationError::UnknownLayout {
                        panel: panel.label().to_string(),
                        layout: layout_ref.to_string(),
                    });
                }
            }
        }

        let layout = layout.into_shared();
        Ok(Self {
            resize: ResizeCoordinator::new(layout.clone(), root.clone()),
            root,
            layout,
            context,
            mount_node: Cell::new(None),
            failures: RefCell::new(Vec::new()),
            stopped: Cell::new(false),
        })
    }

    pub fn root(&self) -> &Panel {
        &self.root
    }

    pub fn layout(&self) -> SharedLayout {
        self.layout.clone()
    }

    pub fn registry(&self) -> &DeferredRegistry {
        self.context.registry()
    }

    /// Attach the root under the host element matching `selector`.
    /// Must be called before [`boot`](Self::boot); returns `None` when
    /// nothing matches.
    pub fn mount_at(&self, selector: &str) -> Option<NodeId> {
        let node = self.context.dom().query(selector);
        self.mount_node.set(node);
        node
    }

    /// Compute the layout for `window` and show the root
    pub async fn boot(&self, window: Size) -> Result<(), PanelError> {
        self.root.seed(Mount {
            context: self.context.clone(),
            layout: self.layout.clone(),
            root_node: self.mount_node.get(),
        });
        self.layout.borrow_mut().recompute(window);
        info!(window = %window, root = %self.root.label(), "booting view tree");

        let result = self.root.boot().await;
        self.record("boot", &result);
        result
    }

    /// Panel at a dotted path from the root, or the first panel with that
    /// name in declaration order for a bare name
    pub fn find(&self, path: &str) -> Result<Panel, PanelError> {
        let found = if path.is_empty() || path == self.root.name() {
            Some(self.root.clone())
        } else if path.contains('.') {
            self.root.find(path)
        } else {
            self.root.find_named(path)
        };
        found.ok_or_else(|| PanelError::UnknownPanel(path.to_string()))
    }

    /// Show the panel at `path` and every ancestor on the way down.
    /// Exclusive containers hide the siblings of the path they switch to.
    pub async fn navigate(&self, path: &str) -> Result<(), PanelError> {
        let result = self.navigate_inner(path).await;
        self.record(&format!("navigate {path}"), &result);
        if result.is_ok() {
            info!(path, "navigated");
        }
        result
    }

    async fn navigate_inner(&self, path: &str) -> Result<(), PanelError> {
        let target = self.find(path)?;

        let mut chain = vec![target];
        while let Some(parent) = chain.last().and_then(Panel::parent) {
            chain.push(parent);
        }
        chain.reverse();

        self.root.show().await?;
        for pair in chain.windows(2) {
            let (parent, child) = (&pair[0], &pair[1]);
            if parent.is_exclusive() {
                parent.switch_to(child.name()).await?;
            } else {
                parent.make_visible(child.name()).await?;
            }
        }
        Ok(())
    }

    /// Recompute geometry and push it to on-screen panels
    pub fn resize(&self, window: Size) -> ResizeReport {
        self.resize.on_resize(window)
    }

    /// Failures recorded so far, oldest first
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.borrow().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }

    fn record(&self, action: &str, result: &Result<(), PanelError>) {
        if let Err(error) = result {
            warn!(action, error = %error, "transition failed");
            self.failures.borrow_mut().push(Failure {
                at: Utc::now(),
                action: action.to_string(),
                error: error.clone(),
            });
        }
    }

    /// Handle one event. Returns `false` once shut down.
    pub async fn handle(&self, event: HostEvent) -> bool {
        if self.is_stopped() {
            return false;
        }
        match event {
            HostEvent::Resize(window) => {
                self.resize(window);
            }
            HostEvent::Navigate(path) => {
                // Recorded in failures(); the loop keeps going
                let _ = self.navigate(&path).await;
            }
            HostEvent::Shutdown => {
                info!("shutting down view tree");
                let _ = self.root.hide().await;
                self.stopped.set(true);
                return false;
            }
        }
        true
    }

    /// Handle whatever is queued right now, including events queued while
    /// handling. Returns the number of events handled.
    pub async fn drain(&self, events: &mut mpsc::UnboundedReceiver<HostEvent>) -> usize {
        let mut handled = 0;
        while let Ok(first) = events.try_recv() {
            for event in coalesce(first, events) {
                handled += 1;
                if !self.handle(event).await {
                    return handled;
                }
            }
        }
        handled
    }

    /// Handle events until shutdown or until every sender is dropped
    pub async fn run(&self, events: &mut mpsc::UnboundedReceiver<HostEvent>) -> usize {
        let mut handled = 0;
        while let Some(first) = events.recv().await {
            for event in coalesce(first, events) {
                handled += 1;
                if !self.handle(event).await {
                    return handled;
                }
            }
        }
        debug!(handled, "host channel closed");
        handled
    }
}

/// Take `first` plus everything already queued, collapsing consecutive
/// resizes into the latest one
fn coalesce(
    first: HostEvent,
    events: &mut mpsc::UnboundedReceiver<HostEvent>,
) -> Vec<HostEvent> {
    let mut batch = vec![first];
    while let Ok(next) = events.try_recv() {
        let merge = matches!(
            (batch.last(), &next),
            (Some(HostEvent::Resize(_)), HostEvent::Resize(_))
        );
        if merge {
            debug!(event = ?next, "coalescing resize");
            batch.pop();
        }
        batch.push(next);
    }
    batch
}
