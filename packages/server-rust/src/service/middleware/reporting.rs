//! Error-reporting decorator. Successful calls pass through untouched.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::service::classify::classify;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::telemetry::{ErrorReport, ErrorReporter};

#[derive(Debug, Clone)]
pub struct ReportingLayer {
    reporter: Arc<dyn ErrorReporter>,
}

impl ReportingLayer {
    #[must_use]
    pub fn new(reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { reporter }
    }
}

impl<S> Layer<S> for ReportingLayer {
    type Service = ReportingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ReportingService {
            inner,
            reporter: Arc::clone(&self.reporter),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportingService<S> {
    inner: S,
    reporter: Arc<dyn ErrorReporter>,
}

impl<S> Service<Operation> for ReportingService<S>
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
        let method = op.method_name();
        let service = op.service_name();
        let request: BTreeMap<_, _> = op.report_fields().into_iter().collect();
        let reporter = Arc::clone(&self.reporter);

        let fut = self.inner.call(op);

        Box::pin(async move {
            let result = fut.await;
            if let Err(e) = &result {
                reporter.report(ErrorReport {
                    message: e.to_string(),
                    kind: e.kind(),
                    tags: BTreeMap::from([
                        ("method", method.to_string()),
                        ("service", service.to_string()),
                        ("code", classify(Some(e)).as_u16().to_string()),
                    ]),
                    request,
                });
            }
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use guestlist_core::{ErrorKind, SearchUserRequest, SearchUserResponse};
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::{RequestContext, TransportKind};
    use crate::telemetry::reporter::testing::RecordingReporter;

    fn op() -> Operation {
        Operation::SearchUser {
            ctx: RequestContext::new(4, TransportKind::Http),
            request: SearchUserRequest {
                surname: "smith".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn error_is_reported_with_tags_and_request_fields() {
        let reporter = Arc::new(RecordingReporter::default());
        let svc = ReportingLayer::new(reporter.clone()).layer(tower::service_fn(|_op: Operation| async {
            Err::<OperationResponse, _>(OperationError::ConnectionUnavailable("db down".into()))
        }));

        svc.oneshot(op()).await.unwrap_err();

        let reports = reporter.reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ErrorKind::ConnectionUnavailable);
        assert_eq!(reports[0].tags["method"], "SearchUser");
        assert_eq!(reports[0].tags["code"], "500");
        assert_eq!(reports[0].request["surname"], "smith");
    }

    #[tokio::test]
    async fn success_is_not_reported() {
        let reporter = Arc::new(RecordingReporter::default());
        let svc = ReportingLayer::new(reporter.clone()).layer(tower::service_fn(|_op: Operation| async {
            Ok::<_, OperationError>(OperationResponse::SearchUser(SearchUserResponse::found(
                Vec::new(),
            )))
        }));

        svc.oneshot(op()).await.unwrap();
        assert!(reporter.reports.lock().is_empty());
    }
}
