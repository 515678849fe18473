//! Tracing decorator: a child span per call, closed exactly once.
//!
//! The span context is written into the operation's `RequestContext` so the
//! inner services see the child span as their parent.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::telemetry::{SpanGuard, Tracer};

#[derive(Debug, Clone)]
pub struct TracingLayer {
    tracer: Arc<dyn Tracer>,
}

impl TracingLayer {
    #[must_use]
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { tracer }
    }
}

impl<S> Layer<S> for TracingLayer {
    type Service = TracingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TracingService {
            inner,
            tracer: Arc::clone(&self.tracer),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingService<S> {
    inner: S,
    tracer: Arc<dyn Tracer>,
}

impl<S> Service<Operation> for TracingService<S>
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

    fn call(&mut self, mut op: Operation) -> Self::Future {
        let method = op.method_name();
        let guard = SpanGuard::open(Arc::clone(&self.tracer), method, op.ctx().trace.as_ref());
        let context = guard.context().clone();

        let span = info_span!(
            "operation",
            method,
            service = op.service_name(),
            call_id = op.ctx().call_id,
            trace_id = %context.trace_id,
            span_id = %context.span_id,
        );
        op.ctx_mut().trace = Some(context);

        let fut = self.inner.call(op);

        Box::pin(
            async move {
                let result = fut.await;
                guard.finish(result.as_ref().err().map(ToString::to_string));
                result
            }
            .instrument(span),
        )
    }
}
