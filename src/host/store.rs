//! Data/model seam: CRUD-style operations, each returning one eventual result.

use anyhow::{anyhow, Result};
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

pub trait Store {
    fn fetch(&self, key: &str) -> LocalBoxFuture<'static, Result<Value>>;

    /// Persist `value` and resolve with what was stored
    fn save(&self, key: &str, value: Value) -> LocalBoxFuture<'static, Result<Value>>;

    fn remove(&self, key: &str) -> LocalBoxFuture<'static, Result<Value>>;
}

/// In-memory store with optional simulated latency and injected failures
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Rc<RefCell<HashMap<String, Value>>>,
    failing: Rc<RefCell<HashSet<String>>>,
    latency: Duration,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.data.borrow_mut().insert(key.to_string(), value);
    }

    /// Current value, bypassing latency and injected failures
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.data.borrow().get(key).cloned()
    }

    /// Every later operation on `key` rejects
    pub fn fail_on(&self, key: &str) {
        self.failing.borrow_mut().insert(key.to_string());
    }

    fn op<F>(&self, key: &str, apply: F) -> LocalBoxFuture<'static, Result<Value>>
    where
        F: FnOnce(&mut HashMap<String, Value>) -> Result<Value> + 'static,
    {
        let data = self.data.clone();
        let failing = self.failing.clone();
        let latency = self.latency;
        let key = key.to_string();

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            if failing.borrow().contains(&key) {
                return Err(anyhow!("store rejected operation on '{key}'"));
            }
            let mut data = data.borrow_mut();
            apply(&mut *data)
        }
        .boxed_local()
    }
}

impl Store for MemoryStore {
    fn fetch(&self, key: &str) -> LocalBoxFuture<'static, Result<Value>> {
        let k = key.to_string();
        self.op(key, move |data| {
            data.get(&k).cloned().ok_or_else(|| anyhow!("no record '{k}'"))
        })
    }

    fn save(&self, key: &str, value: Value) -> LocalBoxFuture<'static, Result<Value>> {
        let k = key.to_string();
        self.op(key, move |data| {
            data.insert(k, value.clone());
            Ok(value)
        })
    }

    fn remove(&self, key: &str) -> LocalBoxFuture<'static, Result<Value>> {
        let k = key.to_string();
        self.op(key, move |data| {
            data.remove(&k).ok_or_else(|| anyhow!("no record '{k}'"))
        })
    }
}
