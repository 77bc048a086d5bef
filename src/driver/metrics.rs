//! Driver metrics
//!
//! Each driver owns its registry so separate instances never share counters.

use crate::error::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Counters and timings for lifecycle callbacks
#[derive(Clone)]
pub struct DriverMetrics {
    registry: Registry,
    callbacks: IntCounterVec,
    readiness_wait: HistogramVec,
}

impl DriverMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let callbacks = IntCounterVec::new(
            Opts::new(
                "swift_driver_callbacks_total",
                "Lifecycle callbacks handled, by outcome",
            ),
            &["callback", "outcome"],
        )?;
        let readiness_wait = HistogramVec::new(
            HistogramOpts::new(
                "swift_driver_readiness_wait_seconds",
                "Time spent waiting for dependency workloads",
            )
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
            &["workload"],
        )?;

        registry.register(Box::new(callbacks.clone()))?;
        registry.register(Box::new(readiness_wait.clone()))?;

        Ok(Self {
            registry,
            callbacks,
            readiness_wait,
        })
    }

    /// Count one finished callback
    pub fn record_callback<T>(&self, callback: &str, result: &Result<T>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(_) => "error",
        };
        self.callbacks.with_label_values(&[callback, outcome]).inc();
    }

    pub fn record_readiness_wait(&self, workload: &str, waited: Duration) {
        self.readiness_wait
            .with_label_values(&[workload])
            .observe(waited.as_secs_f64());
    }

    /// Number of callbacks seen with a given outcome
    pub fn callback_count(&self, callback: &str, outcome: &str) -> u64 {
        self.callbacks.with_label_values(&[callback, outcome]).get()
    }

    /// Prometheus text exposition of every metric in the registry
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| crate::error::Error::Internal(format!("metrics not UTF-8: {}", e)))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
