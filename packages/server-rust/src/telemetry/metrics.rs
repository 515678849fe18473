//! Request metrics: one sample per call, recorded without blocking the caller.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Counter of completed calls, labelled by service, method and code.
pub const REQUESTS_TOTAL: &str = "guestlist_requests_total";

/// Call latency histogram in seconds.
pub const REQUEST_LATENCY: &str = "guestlist_request_latency_seconds";

/// Outcome of one call as seen by the metrics decorator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSample {
    pub service: &'static str,
    pub method: &'static str,
    pub code: u16,
    pub latency: Duration,
}

/// Metrics destination. Implementations must not block.
pub trait MetricsSink: Send + Sync + fmt::Debug {
    fn record(&self, sample: RequestSample);
}

/// Writes samples straight into the global `metrics` recorder.
#[derive(Debug, Clone, Default)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn record(&self, sample: RequestSample) {
        let labels = [
            ("service", sample.service.to_string()),
            ("method", sample.method.to_string()),
            ("code", sample.code.to_string()),
        ];
        counter!(REQUESTS_TOTAL, &labels).increment(1);
        histogram!(REQUEST_LATENCY, &labels).record(sample.latency.as_secs_f64());
    }
}

/// Bounded queue in front of another sink, drained by a background task.
///
/// A full queue drops the sample. Samples still queued when the runtime
/// shuts down are lost.
#[derive(Debug, Clone)]
pub struct QueuedMetrics {
    tx: mpsc::Sender<RequestSample>,
}

impl QueuedMetrics {
    /// Spawns the drain task on the current runtime.
    #[must_use]
    pub fn spawn(inner: Arc<dyn MetricsSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<RequestSample>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(sample) = rx.recv().await {
                inner.record(sample);
            }
        });
        (Self { tx }, handle)
    }
}

impl MetricsSink for QueuedMetrics {
    fn record(&self, sample: RequestSample) {
        if let Err(e) = self.tx.try_send(sample) {
            tracing::trace!(error = %e, "metrics sample dropped");
        }
    }
}

/// Installs the global Prometheus recorder with its scrape listener.
///
/// # Errors
///
/// Returns an error if a recorder is already installed or the listener
/// cannot bind.
pub fn install_prometheus(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install prometheus exporter: {e}"))?;

    describe_counter!(REQUESTS_TOTAL, "Total number of completed calls");
    describe_histogram!(REQUEST_LATENCY, "Call latency in seconds");

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
