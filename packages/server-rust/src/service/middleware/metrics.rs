//! Metrics decorator: one [`RequestSample`] per call.
//!
//! A call whose future is dropped before completing is recorded with the
//! [`CANCELLED`] code.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};

use crate::service::classify::{classify_result, CANCELLED};
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::telemetry::{MetricsSink, RequestSample};

#[derive(Debug, Clone)]
pub struct MetricsLayer {
    sink: Arc<dyn MetricsSink>,
}

impl MetricsLayer {
    #[must_use]
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            sink: Arc::clone(&self.sink),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
    sink: Arc<dyn MetricsSink>,
}

/// Pending sample for one call. Recorded exactly once.
struct SampleGuard {
    sink: Arc<dyn MetricsSink>,
    service: &'static str,
    method: &'static str,
    start: Instant,
    recorded: bool,
}

impl SampleGuard {
    fn finish(mut self, code: u16) {
        self.record(code);
    }

    fn record(&mut self, code: u16) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        self.sink.record(RequestSample {
            service: self.service,
            method: self.method,
            code,
            latency: self.start.elapsed(),
        });
    }
}

impl Drop for SampleGuard {
    fn drop(&mut self) {
        self.record(CANCELLED);
    }
}

impl<S> Service<Operation> for MetricsService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let guard = SampleGuard {
            sink: Arc::clone(&self.sink),
            service: op.service_name(),
            method: op.method_name(),
            start: Instant::now(),
            recorded: false,
        };

        let fut = self.inner.call(op);

        Box::pin(async move {
            let result = fut.await;
            guard.finish(classify_result(&result).as_u16());
            result
        })
    }
}
