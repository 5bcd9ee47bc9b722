//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for AppRoute:
//! - Rotation event counts by operation
//! - Ingestion error counts
//! - Tracked file gauge
//! - Handler latency histogram and failure counts

use async_trait::async_trait;
use prometheus::{Counter, CounterVec, Gauge, Histogram, HistogramOpts, Opts, Registry};
use std::sync::Arc;

use approute_core::{FileOp, Result, RotationEvent, RotationHandler};

/// Metrics collector for AppRoute
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Rotation events handled, by operation (updated/removed)
    pub rotation_events_total: CounterVec,
    /// Ingestion errors surfaced on the store's error channel
    pub rotation_errors_total: Counter,
    /// Files currently tracked by the store
    pub tracked_files: Gauge,
    /// Rotation handler invocation duration
    pub handler_duration_seconds: Histogram,
    /// Rotation handler invocations that returned an error
    pub handler_failures_total: Counter,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> std::result::Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let rotation_events_total = CounterVec::new(
            Opts::new(
                "approute_rotation_events_total",
                "Rotation events handled, by operation",
            ),
            &["op"],
        )?;

        let rotation_errors_total = Counter::with_opts(Opts::new(
            "approute_rotation_errors_total",
            "Ingestion errors reported by the file store",
        ))?;

        let tracked_files = Gauge::with_opts(Opts::new(
            "approute_tracked_files",
            "Files currently tracked by the file store",
        ))?;

        let handler_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "approute_handler_duration_seconds",
                "Rotation handler invocation duration in seconds",
            )
            .buckets(vec![0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25]),
        )?;

        let handler_failures_total = Counter::with_opts(Opts::new(
            "approute_handler_failures_total",
            "Rotation handler invocations that returned an error",
        ))?;

        registry.register(Box::new(rotation_events_total.clone()))?;
        registry.register(Box::new(rotation_errors_total.clone()))?;
        registry.register(Box::new(tracked_files.clone()))?;
        registry.register(Box::new(handler_duration_seconds.clone()))?;
        registry.register(Box::new(handler_failures_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            rotation_events_total,
            rotation_errors_total,
            tracked_files,
            handler_duration_seconds,
            handler_failures_total,
        })
    }

    /// Get the Prometheus registry for exposition
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

fn op_label(op: FileOp) -> &'static str {
    match op {
        FileOp::Updated => "updated",
        FileOp::Removed => "removed",
    }
}

/// Metrics-recording decorator over any [`RotationHandler`].
///
/// Records per-operation event counts, invocation latency, and failures,
/// then delegates to the wrapped handler.
pub struct RecordedHandler<H> {
    inner: H,
    metrics: Arc<Metrics>,
}

impl<H> RecordedHandler<H> {
    pub fn new(inner: H, metrics: Arc<Metrics>) -> Self {
        Self { inner, metrics }
    }
}

#[async_trait]
impl<H: RotationHandler> RotationHandler for RecordedHandler<H> {
    async fn on_rotation(&self, event: &RotationEvent) -> Result<()> {
        self.metrics
            .rotation_events_total
            .with_label_values(&[op_label(event.op)])
            .inc();

        let timer = self.metrics.handler_duration_seconds.start_timer();
        let result = self.inner.on_rotation(event).await;
        timer.observe_duration();

        if result.is_err() {
            self.metrics.handler_failures_total.inc();
        }
        result
    }
}
