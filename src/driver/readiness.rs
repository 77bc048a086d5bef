//! Readiness Waiter
//!
//! Polls a Deployment's available replica count until it reaches the desired
//! count. The wait is bounded by a deadline and can be cut short through a
//! cancellation token; poll intervals grow exponentially up to a cap.

use crate::config::DriverConfig;
use crate::domain::ports::ClusterApiRef;
use crate::error::{Error, Result};
use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const BACKOFF_MULTIPLIER: f64 = 1.5;
const BACKOFF_JITTER: f64 = 0.1;

/// Blocks until a workload is available or its deadline passes
#[derive(Clone)]
pub struct ReadinessWaiter {
    api: ClusterApiRef,
    timeout: Duration,
    initial_interval: Duration,
    max_interval: Duration,
}

impl ReadinessWaiter {
    pub fn new(api: ClusterApiRef, config: &DriverConfig) -> Self {
        Self {
            api,
            timeout: config.readiness_timeout(),
            initial_interval: config.poll_interval(),
            max_interval: config.max_poll_interval(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(BACKOFF_MULTIPLIER)
            .with_randomization_factor(BACKOFF_JITTER)
            // the deadline is tracked on the tokio clock below
            .with_max_elapsed_time(None)
            .build()
    }

    /// Wait until `namespace/name` reports at least `desired` available
    /// replicas. Returns how long the wait took.
    ///
    /// A Deployment the API does not know yet counts as zero available.
    pub async fn wait_until_ready(
        &self,
        namespace: &str,
        name: &str,
        desired: i32,
        cancel: &CancellationToken,
    ) -> Result<Duration> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut backoff = self.backoff();
        let mut ready = 0;

        info!(
            "Waiting up to {:?} for {}/{} to reach {} available replicas",
            self.timeout, namespace, name, desired
        );

        loop {
            // A hung request may neither outlive the deadline nor ignore cancellation
            let poll = tokio::time::timeout_at(
                deadline,
                self.api.available_replicas(namespace, name),
            );
            let polled = tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(namespace, name)),
                polled = poll => polled,
            };

            ready = match polled {
                Ok(Ok(available)) => available,
                Ok(Err(Error::ResourceNotFound { .. })) => {
                    debug!("{}/{} not visible yet", namespace, name);
                    0
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!("{}/{} readiness query hit the deadline", namespace, name);
                    return Err(self.unready(namespace, name, ready, desired));
                }
            };

            if ready >= desired {
                let waited = started.elapsed();
                info!(
                    "{}/{} ready ({}/{}) after {:?}",
                    namespace, name, ready, desired, waited
                );
                return Ok(waited);
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "{}/{} not ready after {:?} ({}/{})",
                    namespace, name, self.timeout, ready, desired
                );
                return Err(self.unready(namespace, name, ready, desired));
            }

            let interval = backoff
                .next_backoff()
                .unwrap_or(self.max_interval)
                .min(deadline - now);
            debug!(
                "{}/{} at {}/{} available, polling again in {:?}",
                namespace, name, ready, desired, interval
            );

            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled(namespace, name)),
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    fn unready(&self, namespace: &str, name: &str, ready: i32, desired: i32) -> Error {
        Error::DependencyUnready {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ready,
            desired,
            timeout: self.timeout,
        }
    }
}

fn cancelled(namespace: &str, name: &str) -> Error {
    Error::Cancelled {
        operation: format!("waiting for {}/{}", namespace, name),
    }
}
