//! Show/hide transitions.
//!
//! A transition is stored in the panel's phase as a shared future so every
//! concurrent request for the same direction awaits the same work, and a
//! request for the opposite direction waits for it to settle first.

use super::{Body, InitState, Mount, Panel, Phase, Surface, Transition, VisibilityState};
use crate::error::PanelError;
use crate::layout::Placement;
use futures::future::{join_all, try_join_all, FutureExt};
use tracing::{debug, error, info, warn};

enum Next {
    Start,
    Join(super::InFlight),
    Wait(super::InFlight),
}

impl Panel {
    /// Ask the child in `slot` to become visible.
    ///
    /// Resolves once the child's whole activated subtree is mounted. Calling it
    /// for a child that is already visible returns a settled completion.
    pub fn make_visible(&self, slot: &str) -> Transition {
        let child = self.slot(slot).and_then(|child| {
            self.require_shown(slot)?;
            Ok(child)
        });
        match child {
            Ok(child) => child.show(),
            Err(err) => futures::future::ready(Err(err)).boxed_local(),
        }
    }

    /// Tear the child in `slot` down. Safe on a child that was never shown.
    pub fn make_hidden(&self, slot: &str) -> Transition {
        match self.slot(slot) {
            Ok(child) => child.hide(),
            Err(err) => futures::future::ready(Err(err)).boxed_local(),
        }
    }

    /// Hide every other visible child, then show `slot`
    pub fn switch_to(&self, slot: &str) -> Transition {
        let this = self.clone();
        let slot = slot.to_string();
        async move {
            let target = this.slot(&slot)?;
            this.require_shown(&slot)?;
            let siblings = this
                .children()
                .into_iter()
                .filter(|child| child != &target && child.state() != VisibilityState::Hidden)
                .map(|child| child.hide());
            try_join_all(siblings).await?;
            target.show().await
        }
        .boxed_local()
    }

    fn require_shown(&self, slot: &str) -> Result<(), PanelError> {
        match self.state() {
            VisibilityState::Visible | VisibilityState::Showing => Ok(()),
            _ => Err(PanelError::ContainerHidden {
                container: self.label().to_string(),
                slot: slot.to_string(),
            }),
        }
    }

    /// Hand the root its mount context and stage. Ignored once set.
    pub(crate) fn seed(&self, mount: Mount) {
        let _ = self.inner.mount.set(mount);
    }

    pub(crate) fn show(&self) -> Transition {
        let this = self.clone();
        async move {
            loop {
                let next = match &*this.inner.phase.borrow() {
                    Phase::Visible => return Ok(()),
                    Phase::Hidden => Next::Start,
                    Phase::Showing(in_flight) => Next::Join(in_flight.clone()),
                    Phase::Hiding(in_flight) => Next::Wait(in_flight.clone()),
                };
                match next {
                    Next::Start => break,
                    Next::Join(in_flight) => return in_flight.await,
                    Next::Wait(in_flight) => {
                        let _ = in_flight.await;
                    }
                }
            }

            this.ensure_init()?;
            let in_flight = this.clone().run_show().boxed_local().shared();
            *this.inner.phase.borrow_mut() = Phase::Showing(in_flight.clone());
            debug!(panel = %this.label(), "showing");
            in_flight.await
        }
        .boxed_local()
    }

    pub(crate) fn hide(&self) -> Transition {
        let this = self.clone();
        async move {
            loop {
                let next = match &*this.inner.phase.borrow() {
                    Phase::Hidden => return Ok(()),
                    Phase::Visible => Next::Start,
                    Phase::Hiding(in_flight) => Next::Join(in_flight.clone()),
                    Phase::Showing(in_flight) => Next::Wait(in_flight.clone()),
                };
                match next {
                    Next::Start => break,
                    Next::Join(in_flight) => return in_flight.await,
                    Next::Wait(in_flight) => {
                        let _ = in_flight.await;
                    }
                }
            }

            let in_flight = this.clone().run_hide().boxed_local().shared();
            *this.inner.phase.borrow_mut() = Phase::Hiding(in_flight.clone());
            debug!(panel = %this.label(), "hiding");
            in_flight.await
        }
        .boxed_local()
    }

    /// Run `init` the first time the panel is activated
    fn ensure_init(&self) -> Result<(), PanelError> {
        match &*self.inner.init.borrow() {
            InitState::Ready => return Ok(()),
            InitState::Failed(err) => return Err(err.clone()),
            InitState::Pending => {}
        }

        let result = self.run_init();
        *self.inner.init.borrow_mut() = match &result {
            Ok(()) => InitState::Ready,
            Err(err) => {
                error!(panel = %self.label(), error = %err, "initialization failed");
                InitState::Failed(err.clone())
            }
        };
        result
    }

    fn run_init(&self) -> Result<(), PanelError> {
        let failed = |reason: String| PanelError::Initialization {
            panel: self.label().to_string(),
            reason,
        };

        if self.inner.mount.get().is_none() {
            let parent = self
                .parent()
                .ok_or_else(|| failed("panel was never mounted".to_string()))?;
            let parent_mount = parent
                .inner
                .mount
                .get()
                .ok_or_else(|| failed("parent was never initialized".to_string()))?;
            let context = match &parent.inner.body {
                Body::Container(c) => c
                    .view
                    .borrow()
                    .child_context(&self.inner.name, &parent_mount.context),
                Body::Leaf(_) => parent_mount.context.clone(),
            };
            let _ = self.inner.mount.set(Mount {
                context,
                ..parent_mount.clone()
            });
        }

        let mount = self
            .inner
            .mount
            .get()
            .ok_or_else(|| failed("panel was never mounted".to_string()))?;
        let outcome = match &self.inner.body {
            Body::Leaf(view) => view.borrow_mut().init(&mount.context),
            Body::Container(c) => c.view.borrow_mut().init(&mount.context),
        };
        outcome.map_err(|e| failed(format!("{e:#}")))?;

        let _ = self
            .inner
            .surface
            .set(Surface::new(self.label(), mount.context.dom()));
        Ok(())
    }

    fn surface(&self) -> Option<&Surface> {
        self.inner.surface.get()
    }

    /// Placement from the layout node, or full-bleed without one
    pub(crate) fn placement(&self) -> Placement {
        let geometry = self.inner.layout.as_deref().and_then(|name| {
            self.inner
                .mount
                .get()
                .and_then(|mount| mount.layout.borrow().geometry(name))
        });
        match geometry {
            Some(geometry) => Placement::Absolute(geometry),
            None => Placement::FullBleed,
        }
    }

    /// Re-apply the layout node's geometry to the rendered element
    pub(crate) fn apply_geometry(&self) -> bool {
        if self.inner.layout.is_none() {
            return false;
        }
        match self.surface() {
            Some(surface) if surface.is_attached() => {
                surface.place(self.placement());
                true
            }
            _ => false,
        }
    }

    async fn run_show(self) -> Result<(), PanelError> {
        match self.mount_subtree().await {
            Ok(()) => {
                *self.inner.phase.borrow_mut() = Phase::Visible;
                if let Some(surface) = self.surface() {
                    match &self.inner.body {
                        Body::Leaf(view) => view.borrow_mut().after(surface),
                        Body::Container(c) => c.view.borrow_mut().after(surface),
                    }
                }
                debug!(panel = %self.label(), "visible");
                Ok(())
            }
            Err(err) => {
                self.unwind().await;
                *self.inner.phase.borrow_mut() = Phase::Hidden;
                warn!(panel = %self.label(), error = %err, "visibility transition failed");
                Err(err)
            }
        }
    }

    async fn mount_subtree(&self) -> Result<(), PanelError> {
        let surface = self.surface().cloned().ok_or_else(|| PanelError::Initialization {
            panel: self.label().to_string(),
            reason: "panel has no element".to_string(),
        })?;

        let parent_node = match self.parent() {
            Some(parent) => parent.node(),
            None => self.inner.mount.get().and_then(|mount| mount.root_node),
        };
        surface.attach(parent_node);
        surface.place(self.placement());

        let rejected = |e: anyhow::Error| PanelError::VisibilityTransition {
            panel: self.label().to_string(),
            reason: format!("{e:#}"),
        };

        match &self.inner.body {
            Body::Leaf(view) => {
                let completion = view.borrow_mut().before(&surface);
                completion.await.map_err(rejected)
            }
            Body::Container(c) => {
                let chrome = c.view.borrow_mut().before(&surface);
                chrome.await.map_err(rejected)?;

                let active = c.view.borrow_mut().activate(&c.activation);
                let children = active
                    .iter()
                    .map(|slot| self.slot(slot))
                    .collect::<Result<Vec<_>, _>>()?;
                try_join_all(children.iter().map(Panel::show)).await?;
                Ok(())
            }
        }
    }

    /// Tear down whatever part of the subtree got mounted
    async fn unwind(&self) {
        let mounted = self
            .children()
            .into_iter()
            .filter(|child| child.state() != VisibilityState::Hidden)
            .map(|child| child.hide());
        join_all(mounted).await;
        self.teardown();
    }

    async fn run_hide(self) -> Result<(), PanelError> {
        let visible = self
            .children()
            .into_iter()
            .filter(|child| child.state() != VisibilityState::Hidden)
            .map(|child| child.hide());
        let results = join_all(visible).await;

        self.teardown();
        *self.inner.phase.borrow_mut() = Phase::Hidden;
        debug!(panel = %self.label(), "hidden");

        results.into_iter().collect()
    }

    fn teardown(&self) {
        let Some(surface) = self.surface() else {
            return;
        };
        if surface.is_attached() {
            match &self.inner.body {
                Body::Leaf(view) => view.borrow_mut().teardown(surface),
                Body::Container(c) => c.view.borrow_mut().teardown(surface),
            }
        }
        surface.detach();
    }

    /// Initialize and show the root, logging the outcome
    pub(crate) async fn boot(&self) -> Result<(), PanelError> {
        let result = self.show().await;
        if result.is_ok() {
            info!(panel = %self.label(), "view tree booted");
        }
        result
    }
}
