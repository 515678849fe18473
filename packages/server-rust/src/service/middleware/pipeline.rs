//! Pipeline composition: wraps the router in the decorator chain.

use std::sync::Arc;

use tower::util::BoxCloneService;
use tower::{Layer, Service};

use super::logging::LoggingLayer;
use super::metrics::MetricsLayer;
use super::reporting::ReportingLayer;
use super::trace::TracingLayer;
use crate::service::endpoint::BoxOperationService;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::telemetry::{ErrorReporter, MetricsSink, Tracer};

/// Sinks injected into the decorators. `None` leaves the decorator out.
#[derive(Debug, Clone, Default)]
pub struct Collaborators {
    pub metrics: Option<Arc<dyn MetricsSink>>,
    pub tracer: Option<Arc<dyn Tracer>>,
    pub reporter: Option<Arc<dyn ErrorReporter>>,
}

/// Builds the operation pipeline around `core`.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` (optional)
/// 2. `LoggingLayer` (always)
/// 3. `TracingLayer` (optional)
/// 4. `ReportingLayer` (optional)
#[must_use]
pub fn build_operation_pipeline<S>(core: S, collaborators: &Collaborators) -> BoxOperationService
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
{
    let mut svc = BoxCloneService::new(core);

    if let Some(reporter) = &collaborators.reporter {
        svc = BoxCloneService::new(ReportingLayer::new(Arc::clone(reporter)).layer(svc));
    }
    if let Some(tracer) = &collaborators.tracer {
        svc = BoxCloneService::new(TracingLayer::new(Arc::clone(tracer)).layer(svc));
    }
    svc = BoxCloneService::new(LoggingLayer.layer(svc));
    if let Some(sink) = &collaborators.metrics {
        svc = BoxCloneService::new(MetricsLayer::new(Arc::clone(sink)).layer(svc));
    }

    svc
}
