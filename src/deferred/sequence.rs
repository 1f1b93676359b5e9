// Ordered cross-view updates
//
// Invoking several slots concurrently gives no ordering guarantee. When the
// order matters (refresh the primary view before its satellite counters),
// chain the calls: each step starts only after the previous one completed.

use super::DeferredRegistry;
use crate::error::DeferredError;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::future::Future;

enum Step {
    /// Upstream work (e.g. a model save) the next steps depend on
    After(LocalBoxFuture<'static, anyhow::Result<()>>),
    Invoke { key: String, arg: Value },
}

/// A left-to-right chain of awaits and slot invocations
#[must_use = "a sequence does nothing until `run` is awaited"]
pub struct Sequence {
    registry: DeferredRegistry,
    steps: Vec<Step>,
}

impl Sequence {
    pub(super) fn new(registry: DeferredRegistry) -> Self {
        Self {
            registry,
            steps: Vec::new(),
        }
    }

    pub fn after<F>(mut self, upstream: F) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        self.steps.push(Step::After(upstream.boxed_local()));
        self
    }

    pub fn invoke(mut self, key: impl AsRef<str>, arg: Value) -> Self {
        self.steps.push(Step::Invoke {
            key: key.as_ref().to_string(),
            arg,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order, stopping at the first failure
    pub async fn run(self) -> Result<(), DeferredError> {
        for (index, step) in self.steps.into_iter().enumerate() {
            match step {
                Step::After(upstream) => {
                    upstream.await.map_err(|e| DeferredError::Upstream {
                        reason: format!("{e:#}"),
                    })?;
                }
                Step::Invoke { key, arg } => {
                    tracing::trace!(step = index, key = %key, "sequence invoking");
                    self.registry.invoke(&key, arg).await?;
                }
            }
        }
        Ok(())
    }
}
