//! Named deferred slots holding capabilities.

use super::{Deferred, Sequence, SlotState};
use crate::error::DeferredError;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

/// Permission to invoke behavior owned by another view
pub type Capability = Rc<dyn Fn(Value) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

/// Wrap an async callback as a [`Capability`]
pub fn capability<F, Fut>(f: F) -> Capability
where
    F: Fn(Value) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<()>> + 'static,
{
    Rc::new(move |arg| f(arg).boxed_local())
}

/// Builds keys in the `<ViewName>.<capability>` convention
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey(String);

impl SlotKey {
    pub fn new(view: &str, capability: &str) -> Self {
        Self(format!("{view}.{capability}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SlotKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Keyed table of deferred capabilities.
///
/// One instance lives for the whole application and is handed to every panel
/// through its mount context; tests build their own. Clones share the table.
#[derive(Clone, Default)]
pub struct DeferredRegistry {
    slots: Rc<RefCell<HashMap<String, Deferred<Capability>>>>,
}

impl fmt::Debug for DeferredRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.keys();
        keys.sort();
        f.debug_struct("DeferredRegistry").field("slots", &keys).finish()
    }
}

impl DeferredRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the slot for `key`. Registering an existing key returns
    /// the existing slot, pending or resolved.
    pub fn register(&self, key: impl AsRef<str>) -> Deferred<Capability> {
        let key = key.as_ref();
        let mut slots = self.slots.borrow_mut();
        if let Some(existing) = slots.get(key) {
            tracing::trace!(key, state = ?existing.state(), "slot already registered");
            return existing.clone();
        }
        tracing::debug!(key, "slot registered");
        let slot = Deferred::new();
        slots.insert(key.to_string(), slot.clone());
        slot
    }

    pub fn lookup(&self, key: impl AsRef<str>) -> Result<Deferred<Capability>, DeferredError> {
        let key = key.as_ref();
        self.slots
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| DeferredError::MissingSlot {
                key: key.to_string(),
            })
    }

    pub fn state(&self, key: impl AsRef<str>) -> Option<SlotState> {
        self.slots.borrow().get(key.as_ref()).map(|slot| slot.state())
    }

    pub fn keys(&self) -> Vec<String> {
        self.slots.borrow().keys().cloned().collect()
    }

    /// Resolve `key` with a capability, registering it if needed.
    ///
    /// A second resolution is rejected and reported; the first capability
    /// stays wired.
    pub fn resolve(&self, key: impl AsRef<str>, cap: Capability) -> Result<(), DeferredError> {
        let key = key.as_ref();
        let slot = self.register(key);
        match slot.resolve(cap) {
            Ok(()) => {
                tracing::debug!(key, "slot resolved");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(key, "duplicate resolution rejected; keeping first capability");
                Err(DeferredError::DuplicateResolution {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Call the capability behind `key` with `arg`.
    ///
    /// The key must be registered now. If the slot is still pending the call
    /// waits for the resolution and then runs exactly once; it fails with
    /// `Abandoned` if every handle to the slot goes away first.
    pub fn invoke(
        &self,
        key: impl AsRef<str>,
        arg: Value,
    ) -> LocalBoxFuture<'static, Result<(), DeferredError>> {
        let key = key.as_ref().to_string();
        let slot = match self.lookup(&key) {
            Ok(slot) => slot,
            Err(err) => {
                tracing::error!(key = %key, "invoked a slot that was never registered");
                return futures::future::ready(Err(err)).boxed_local();
            }
        };

        if !slot.is_resolved() {
            tracing::trace!(key = %key, "invocation queued behind pending slot");
        }
        let payload = slot.wait();

        async move {
            let Some(cap) = payload.await else {
                tracing::warn!(key = %key, "slot dropped before it resolved");
                return Err(DeferredError::Abandoned { key });
            };
            cap(arg).await.map_err(|e| DeferredError::Invocation {
                key: key.clone(),
                reason: format!("{e:#}"),
            })
        }
        .boxed_local()
    }

    /// Start an ordered chain of steps
    pub fn sequence(&self) -> Sequence {
        Sequence::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{BufferLayer, LogBuffer, LogLevel};
    use serde_json::json;
    use tracing_subscriber::layer::SubscriberExt;

    fn recorder(log: Rc<RefCell<Vec<Value>>>) -> Capability {
        capability(move |arg| {
            let log = log.clone();
            async move {
                log.borrow_mut().push(arg);
                Ok(())
            }
        })
    }

    #[test]
    fn register_is_idempotent() {
        let registry = DeferredRegistry::new();
        let a = registry.register("Header.updateCount");
        let b = registry.register(SlotKey::new("Header", "updateCount"));

        a.resolve(recorder(Rc::default())).unwrap_or_else(|_| panic!("first resolve"));
        assert!(b.is_resolved());
        assert_eq!(registry.keys(), vec!["Header.updateCount".to_string()]);
    }

    #[test]
    fn duplicate_resolution_keeps_first_and_is_reported() {
        let buffer = LogBuffer::new();
        let subscriber = tracing_subscriber::registry().with(BufferLayer::new(buffer.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let registry = DeferredRegistry::new();
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));

        registry.resolve("Header.updateCount", recorder(first.clone())).unwrap();
        let err = registry
            .resolve("Header.updateCount", recorder(second.clone()))
            .unwrap_err();
        assert_eq!(
            err,
            DeferredError::DuplicateResolution {
                key: "Header.updateCount".into()
            }
        );

        futures::executor::block_on(registry.invoke("Header.updateCount", json!(1))).unwrap();
        assert_eq!(*first.borrow(), vec![json!(1)]);
        assert!(second.borrow().is_empty());

        assert!(buffer
            .get_all()
            .iter()
            .any(|e| e.level == LogLevel::Warn && e.message.contains("duplicate resolution")));
    }

    #[tokio::test]
    async fn missing_slot_is_surfaced() {
        let registry = DeferredRegistry::new();
        let err = registry.invoke("Nobody.listens", json!(null)).await.unwrap_err();
        assert_eq!(
            err,
            DeferredError::MissingSlot {
                key: "Nobody.listens".into()
            }
        );
    }

    #[tokio::test]
    async fn invoke_before_resolution_waits_for_it() {
        let registry = DeferredRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        registry.register("LeftNav.updateCount");

        let call = registry.invoke("LeftNav.updateCount", json!(5));
        let resolver = {
            let registry = registry.clone();
            let log = log.clone();
            async move {
                tokio::task::yield_now().await;
                assert!(log.borrow().is_empty(), "call ran before resolution");
                registry
                    .resolve("LeftNav.updateCount", recorder(log))
                    .unwrap();
            }
        };

        let (result, ()) = tokio::join!(call, resolver);
        result.unwrap();
        assert_eq!(*log.borrow(), vec![json!(5)]);
    }

    #[tokio::test]
    async fn pending_invocation_fails_once_the_registry_is_gone() {
        let registry = DeferredRegistry::new();
        registry.register("Header.updateCount");

        let call = registry.invoke("Header.updateCount", json!({ "count": 1 }));
        drop(registry);

        let result = tokio::time::timeout(std::time::Duration::from_millis(200), call)
            .await
            .expect("abandoned invocation should not hang");
        assert_eq!(
            result,
            Err(DeferredError::Abandoned {
                key: "Header.updateCount".into()
            })
        );
    }

    #[tokio::test]
    async fn each_invocation_calls_exactly_once() {
        let registry = DeferredRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        registry.resolve("Deck.refresh", recorder(log.clone())).unwrap();

        for _ in 0..3 {
            registry.lookup("Deck.refresh").unwrap();
        }
        registry.invoke("Deck.refresh", json!("x")).await.unwrap();
        registry.invoke("Deck.refresh", json!("y")).await.unwrap();

        assert_eq!(*log.borrow(), vec![json!("x"), json!("y")]);
    }

    #[tokio::test]
    async fn capability_failure_is_reported() {
        let registry = DeferredRegistry::new();
        registry
            .resolve(
                "Library.reload",
                capability(|_| async { Err::<(), _>(anyhow::anyhow!("offline")) }),
            )
            .unwrap();

        let err = registry.invoke("Library.reload", json!(null)).await.unwrap_err();
        assert_eq!(
            err,
            DeferredError::Invocation {
                key: "Library.reload".into(),
                reason: "offline".into()
            }
        );
    }
}
