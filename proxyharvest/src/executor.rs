//! Bounded probe executor
//!
//! Fans probes out under a global concurrency ceiling and fans the results
//! back in as an unordered stream.
//!
//! - Clones share one semaphore, so discovery and pruning together never
//!   exceed the ceiling.
//! - Each probe runs in its own task and is wrapped in `catch_unwind`; a
//!   failing or panicking unit becomes a failed `ProbeResult` and never
//!   affects its siblings.
//! - Dropping `ProbeResults` aborts every probe still outstanding.

use crate::error::ProbeError;
use crate::probe::Prober;
use crate::types::{Endpoint, ProbeMode, ProbeResult};
use futures::FutureExt;
use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

/// Default concurrency ceiling
pub const DEFAULT_CONCURRENCY: usize = 200;

/// Concurrency-limited fan-out/fan-in of probes.
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    permits: Arc<Semaphore>,
    limit: usize,
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl BoundedExecutor {
    /// Create an executor admitting at most `limit` probes at once.
    ///
    /// A limit of zero is raised to one, and a limit above
    /// `Semaphore::MAX_PERMITS` is lowered to it.
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Concurrency ceiling.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of probes currently holding a permit.
    pub fn in_flight(&self) -> usize {
        self.limit - self.permits.available_permits()
    }

    /// Start probing every endpoint and return the result stream.
    ///
    /// Every endpoint is submitted immediately, but a probe only starts once
    /// it holds a permit.
    pub fn spawn<I>(&self, endpoints: I, prober: Arc<dyn Prober>, mode: ProbeMode) -> ProbeResults
    where
        I: IntoIterator<Item = Endpoint>,
    {
        let mut tasks = JoinSet::new();
        let mut total = 0;

        for endpoint in endpoints {
            total += 1;
            let permits = Arc::clone(&self.permits);
            let prober = Arc::clone(&prober);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ProbeResult::failed(
                            endpoint,
                            ProbeError::Request("executor closed".to_string()),
                        )
                    }
                };

                let outcome = AssertUnwindSafe(prober.probe(&endpoint))
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(result) => result.apply_mode(mode),
                    Err(panic) => ProbeResult::failed(
                        endpoint,
                        ProbeError::Panicked(panic_message(panic.as_ref())),
                    ),
                }
            });
        }

        ProbeResults { tasks, total }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Unordered stream of probe results.
#[derive(Debug)]
pub struct ProbeResults {
    tasks: JoinSet<ProbeResult>,
    total: usize,
}

impl ProbeResults {
    /// Number of endpoints submitted.
    pub fn len(&self) -> usize {
        self.total
    }

    /// True when nothing was submitted.
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Next completed result, in completion order.
    ///
    /// Returns `None` once every probe has finished.
    pub async fn next(&mut self) -> Option<ProbeResult> {
        loop {
            match self.tasks.join_next().await? {
                Ok(result) => return Some(result),
                // Probes catch their own panics, so only cancellation lands here.
                Err(e) => warn!(error = %e, "Probe task did not complete"),
            }
        }
    }

    /// Wait for every probe and return all results.
    pub async fn collect(mut self) -> Vec<ProbeResult> {
        let mut results = Vec::with_capacity(self.total);
        while let Some(result) = self.next().await {
            results.push(result);
        }
        results
    }

    /// Wait for every probe and return the endpoints that passed.
    pub async fn collect_passed(mut self) -> HashSet<Endpoint> {
        let mut passed = HashSet::new();
        while let Some(result) = self.next().await {
            if result.passed() {
                passed.insert(result.endpoint);
            }
        }
        passed
    }
}
