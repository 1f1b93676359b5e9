//! Initialization-time data a parent injects into its children.

use crate::deferred::DeferredRegistry;
use crate::host::{Dom, Router, Store};
use anyhow::{anyhow, Result};
use serde_json::{Map, Value};
use std::fmt;
use std::rc::Rc;

struct Services {
    dom: Rc<dyn Dom>,
    registry: DeferredRegistry,
    router: Option<Rc<dyn Router>>,
    store: Option<Rc<dyn Store>>,
    settings: Map<String, Value>,
}

/// Read-only services and settings handed to `init`.
///
/// The DOM helper is not exposed here; panels reach their own element
/// through [`Surface`](super::Surface) only.
#[derive(Clone)]
pub struct MountContext {
    services: Rc<Services>,
}

impl fmt::Debug for MountContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountContext")
            .field("registry", &self.services.registry)
            .field("router", &self.services.router.is_some())
            .field("store", &self.services.store.is_some())
            .field("settings", &self.services.settings)
            .finish()
    }
}

impl MountContext {
    pub fn builder(dom: Rc<dyn Dom>) -> MountContextBuilder {
        MountContextBuilder {
            dom,
            registry: DeferredRegistry::new(),
            router: None,
            store: None,
            settings: Map::new(),
        }
    }

    pub(crate) fn dom(&self) -> Rc<dyn Dom> {
        self.services.dom.clone()
    }

    pub fn registry(&self) -> &DeferredRegistry {
        &self.services.registry
    }

    /// The router, or an error naming the missing service
    pub fn router(&self) -> Result<Rc<dyn Router>> {
        self.services
            .router
            .clone()
            .ok_or_else(|| anyhow!("required context 'router' is missing"))
    }

    pub fn store(&self) -> Result<Rc<dyn Store>> {
        self.services
            .store
            .clone()
            .ok_or_else(|| anyhow!("required context 'store' is missing"))
    }

    pub fn setting(&self, key: &str) -> Option<&Value> {
        self.services.settings.get(key)
    }

    pub fn require_setting(&self, key: &str) -> Result<&Value> {
        self.setting(key)
            .ok_or_else(|| anyhow!("required setting '{key}' is missing"))
    }

    /// A copy of this context with extra settings layered on top, for
    /// containers that scope data to one child.
    pub fn with_setting(&self, key: &str, value: Value) -> MountContext {
        let mut settings = self.services.settings.clone();
        settings.insert(key.to_string(), value);
        MountContext {
            services: Rc::new(Services {
                dom: self.services.dom.clone(),
                registry: self.services.registry.clone(),
                router: self.services.router.clone(),
                store: self.services.store.clone(),
                settings,
            }),
        }
    }
}

pub struct MountContextBuilder {
    dom: Rc<dyn Dom>,
    registry: DeferredRegistry,
    router: Option<Rc<dyn Router>>,
    store: Option<Rc<dyn Store>>,
    settings: Map<String, Value>,
}

impl MountContextBuilder {
    pub fn registry(mut self, registry: DeferredRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn router(mut self, router: Rc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    pub fn store(mut self, store: Rc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn setting(mut self, key: &str, value: Value) -> Self {
        self.settings.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> MountContext {
        MountContext {
            services: Rc::new(Services {
                dom: self.dom,
                registry: self.registry,
                router: self.router,
                store: self.store,
                settings: self.settings,
            }),
        }
    }
}
