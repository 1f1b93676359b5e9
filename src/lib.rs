// panelkit - panel lifecycle, layout and deferred-method plumbing for
// single-page UI composition
//
// Architecture:
// - Panel tree: containers and leaves with lazy init and coalesced
//   show/hide transitions
// - Layout tree: declarative rectangles recomputed top-down on resize
// - Deferred registry: capabilities published by views, awaited by others
// - Scheduler: boots the tree and serializes host events (navigate,
//   resize, shutdown) on a single UI task
// - Host seams: DOM helper, templates, store and router, with in-memory
//   implementations used by the demo and the tests

pub mod config;
pub mod deferred;
pub mod demo;
pub mod error;
pub mod host;
pub mod layout;
pub mod logging;
pub mod panel;
pub mod scheduler;

pub use error::{DeclarationError, DeferredError, LayoutError, PanelError};
pub use panel::{Panel, PanelSpec, VisibilityState};
pub use scheduler::{HostEvent, HostHandle, Scheduler};
