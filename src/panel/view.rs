//! Lifecycle hooks supplied by the application.
//!
//! Leaf panels implement [`View`]; container panels may supply a
//! [`ContainerView`] to render their own chrome and choose which children to
//! activate. Hooks never see other panels' elements.

use super::{MountContext, Surface};
use anyhow::Result;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use std::future::Future;

/// Completion of a `before()` hook
pub type Completion = LocalBoxFuture<'static, Result<()>>;

/// An already-settled successful completion
pub fn ready() -> Completion {
    futures::future::ready(Ok(())).boxed_local()
}

/// Hooks of a leaf panel
pub trait View {
    /// Called once, synchronously, the first time the panel is activated.
    /// Store what you need from `ctx`; the element does not exist yet.
    fn init(&mut self, _ctx: &MountContext) -> Result<()> {
        Ok(())
    }

    /// Render into `surface` and bind listeners. The panel becomes visible
    /// when the returned completion fulfills.
    fn before(&mut self, surface: &Surface) -> Completion;

    /// Post-mount work once `before` fulfilled
    fn after(&mut self, _surface: &Surface) {}

    /// Called before the element is removed. Listeners bound through the
    /// surface are unbound automatically afterwards.
    fn teardown(&mut self, _surface: &Surface) {}
}

/// Hooks of a container panel
pub trait ContainerView {
    fn init(&mut self, _ctx: &MountContext) -> Result<()> {
        Ok(())
    }

    /// Render the container's own chrome. Runs before any child is shown.
    fn before(&mut self, _surface: &Surface) -> Completion {
        ready()
    }

    /// Pick the children to show when this container becomes visible.
    /// `declared` is the default activation set from the declaration.
    fn activate(&mut self, declared: &[String]) -> Vec<String> {
        declared.to_vec()
    }

    /// Context injected into the child in `slot` at its `init`
    fn child_context(&self, _slot: &str, ctx: &MountContext) -> MountContext {
        ctx.clone()
    }

    fn after(&mut self, _surface: &Surface) {}

    fn teardown(&mut self, _surface: &Surface) {}
}

/// Container without chrome
#[derive(Debug, Default, Clone, Copy)]
pub struct Frame;

impl ContainerView for Frame {}

/// Leaf view built from a `before` closure
pub struct FnView<F> {
    before: F,
}

impl<F, Fut> FnView<F>
where
    F: FnMut(&Surface) -> Fut,
    Fut: Future<Output = Result<()>> + 'static,
{
    pub fn new(before: F) -> Self {
        Self { before }
    }
}

impl<F, Fut> View for FnView<F>
where
    F: FnMut(&Surface) -> Fut,
    Fut: Future<Output = Result<()>> + 'static,
{
    fn before(&mut self, surface: &Surface) -> Completion {
        (self.before)(surface).boxed_local()
    }
}
