//! Deferred slots: resolve-once handoff points for cross-view communication.
//!
//! A consumer view publishes a capability (a callback bound to itself) into
//! a named slot; producers that only know the slot's key invoke it. Calls
//! made before the slot resolves wait behind the resolution; they are neither
//! lost nor reordered ahead of it.
//!
//! [`Deferred`] is the underlying promise primitive, [`DeferredRegistry`] the
//! keyed table, and [`Sequence`] chains invocations strictly left to right.

mod registry;
mod sequence;

pub use registry::{capability, Capability, DeferredRegistry, SlotKey};
pub use sequence::Sequence;

use futures::channel::oneshot;
use futures::future::Shared;
use futures::FutureExt;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Resolution state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Resolved,
}

type Continuation<T> = Box<dyn FnOnce(T)>;

struct Inner<T: Clone> {
    value: RefCell<Option<T>>,
    sender: RefCell<Option<oneshot::Sender<T>>>,
    receiver: Shared<oneshot::Receiver<T>>,
    continuations: RefCell<Vec<Continuation<T>>>,
}

/// A resolve-once value. Clones share the same slot.
pub struct Deferred<T: Clone> {
    inner: Rc<Inner<T>>,
}

impl<T: Clone> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .field("continuations", &self.inner.continuations.borrow().len())
            .finish()
    }
}

impl<T: Clone + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> Deferred<T> {
    pub fn new() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(None),
                sender: RefCell::new(Some(sender)),
                receiver: receiver.shared(),
                continuations: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> SlotState {
        if self.inner.value.borrow().is_some() {
            SlotState::Resolved
        } else {
            SlotState::Pending
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.state() == SlotState::Resolved
    }

    /// The payload, if resolved
    pub fn peek(&self) -> Option<T> {
        self.inner.value.borrow().clone()
    }

    /// Resolve the slot. A second resolution hands the rejected value back
    /// and leaves the first payload untouched.
    pub fn resolve(&self, value: T) -> Result<(), T> {
        if self.is_resolved() {
            return Err(value);
        }
        *self.inner.value.borrow_mut() = Some(value.clone());

        if let Some(sender) = self.inner.sender.borrow_mut().take() {
            // Nobody waiting is fine; the value is kept in `value` too
            let _ = sender.send(value.clone());
        }

        // Run continuations attached while pending, in attach order
        let pending = std::mem::take(&mut *self.inner.continuations.borrow_mut());
        for continuation in pending {
            continuation(value.clone());
        }
        Ok(())
    }

    /// Attach work that runs once with the payload: immediately if already
    /// resolved, otherwise right after resolution.
    pub fn then<F>(&self, continuation: F)
    where
        F: FnOnce(T) + 'static,
    {
        let ready = self.peek();
        match ready {
            Some(value) => continuation(value),
            None => self
                .inner
                .continuations
                .borrow_mut()
                .push(Box::new(continuation)),
        }
    }

    /// Wait for the payload. The returned future does not keep the slot
    /// alive: it yields `None` once every handle is dropped unresolved.
    pub fn wait(&self) -> impl Future<Output = Option<T>> + 'static {
        let ready = self.peek();
        let receiver = self.inner.receiver.clone();
        async move {
            match ready {
                Some(value) => Some(value),
                None => receiver.await.ok(),
            }
        }
    }
}
