//! Access logging decorator.
//!
//! Emits one event per call on the `guestlist::access` target. Level depends
//! on the outcome: INFO on success, WARN on `NotFound`, ERROR otherwise. A
//! call dropped before completing logs a WARN with the [`CANCELLED`] code.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use guestlist_core::{ErrorKind, Field};
use tower::{Layer, Service};

use crate::service::classify::{classify_result, CANCELLED};
use crate::service::operation::{Operation, OperationError, OperationResponse};

#[derive(Debug, Clone, Default)]
pub struct LoggingLayer;

impl<S> Layer<S> for LoggingLayer {
    type Service = LoggingService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoggingService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingService<S> {
    inner: S,
}

/// `key=value` pairs joined by spaces.
fn render_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ")
}

impl<S> Service<Operation> for LoggingService<S>
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
        let ctx = op.ctx();
        let entry = AccessLog {
            method: op.method_name(),
            service: op.service_name(),
            call_id: ctx.call_id,
            transport: ctx.transport.as_str(),
            url: ctx.url.clone(),
            fields: op.log_fields(),
            start: Instant::now(),
            written: false,
        };

        let fut = self.inner.call(op);

        Box::pin(async move {
            let result = fut.await;
            entry.finish(&result);
            result
        })
    }
}

/// The access-log line for one call. Written exactly once: by `finish`, or
/// as a cancellation on drop.
struct AccessLog {
    method: &'static str,
    service: &'static str,
    call_id: u64,
    transport: &'static str,
    url: Option<String>,
    fields: Vec<Field>,
    start: Instant,
    written: bool,
}

impl AccessLog {
    fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn finish(mut self, result: &Result<OperationResponse, OperationError>) {
        self.written = true;
        let code = classify_result(result).as_u16();
        let elapsed_ms = self.elapsed_ms();

        if let Ok(resp) = result {
            self.fields.extend(resp.log_fields());
        }
        let extra = render_fields(&self.fields);
        let (method, service, call_id, transport) =
            (self.method, self.service, self.call_id, self.transport);
        let url = self.url.as_deref();

        match result {
            Ok(_) => tracing::info!(
                target: "guestlist::access",
                method, service, code, elapsed_ms, transport, url, call_id,
                fields = %extra,
                "call completed"
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => tracing::warn!(
                target: "guestlist::access",
                method, service, code, elapsed_ms, transport, url, call_id,
                fields = %extra,
                error = %e,
                "call failed"
            ),
            Err(e) => tracing::error!(
                target: "guestlist::access",
                method, service, code, elapsed_ms, transport, url, call_id,
                fields = %extra,
                error = %e,
                "call failed"
            ),
        }
    }
}

impl Drop for AccessLog {
    fn drop(&mut self) {
        if self.written {
            return;
        }
        self.written = true;
        let extra = render_fields(&self.fields);
        tracing::warn!(
            target: "guestlist::access",
            method = self.method,
            service = self.service,
            code = CANCELLED,
            elapsed_ms = self.elapsed_ms(),
            transport = self.transport,
            url = self.url.as_deref(),
            call_id = self.call_id,
            fields = %extra,
            "call cancelled"
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::fmt::Write as _;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::Context;
    use tracing_subscriber::Layer;

    /// One captured event: level, target and all fields rendered as
    /// `name=value`.
    #[derive(Debug, Clone)]
    pub struct Captured {
        pub level: Level,
        pub target: String,
        pub fields: String,
    }

    /// Subscriber layer that records every event.
    #[derive(Debug, Clone, Default)]
    pub struct CaptureLayer {
        pub events: Arc<Mutex<Vec<Captured>>>,
    }

    struct Render<'a>(&'a mut String);

    impl Visit for Render<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
            let _ = write!(self.0, "{}={:?} ", field.name(), value);
        }

        fn record_str(&mut self, field: &Field, value: &str) {
            let _ = write!(self.0, "{}={} ", field.name(), value);
        }
    }

    impl<S: Subscriber> Layer<S> for CaptureLayer {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = String::new();
            event.record(&mut Render(&mut fields));
            self.events.lock().push(Captured {
                level: *event.metadata().level(),
                target: event.metadata().target().to_string(),
                fields,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use guestlist_core::{LivenessResponse, SearchUserRequest};
    use tower::ServiceExt;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    use super::testing::CaptureLayer;
    use super::*;
    use crate::service::operation::{RequestContext, TransportKind};

    fn op() -> Operation {
        Operation::SearchUser {
            ctx: RequestContext::new(5, TransportKind::Http).with_url("/user/search?surname=smi"),
            request: SearchUserRequest {
                surname: "smi".to_string(),
            },
        }
    }

    fn run_with(outcome: Result<OperationResponse, OperationError>) -> Vec<super::testing::Captured> {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        let svc = LoggingLayer.layer(tower::service_fn(move |_op: Operation| {
            let outcome = outcome.clone();
            async move { outcome }
        }));

        tracing::subscriber::with_default(subscriber, || {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let _ = rt.block_on(svc.oneshot(op()));
        });

        let events = capture.events.lock().clone();
        events
            .into_iter()
            .filter(|e| e.target == "guestlist::access")
            .collect()
    }

    #[test]
    fn success_logs_info_with_fields() {
        let events = run_with(Ok(OperationResponse::Liveness(LivenessResponse {
            status: "ok".to_string(),
        })));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::INFO);
        assert!(events[0].fields.contains("code=200"));
        assert!(events[0].fields.contains("surname=smi"));
        assert!(events[0].fields.contains("method=SearchUser"));
    }

    #[test]
    fn not_found_logs_warn() {
        let events = run_with(Err(OperationError::NotFound("user 3 not found".into())));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
        assert!(events[0].fields.contains("code=404"));
    }

    #[test]
    fn other_errors_log_error() {
        let events = run_with(Err(OperationError::ConnectionUnavailable("down".into())));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::ERROR);
        assert!(events[0].fields.contains("code=500"));
    }

    #[test]
    fn render_fields_joins_pairs() {
        let fields = vec![("id", "5".to_string()), ("checkin", "true".to_string())];
        assert_eq!(render_fields(&fields), "id=5 checkin=true");
        assert_eq!(render_fields(&[]), "");
    }

    #[test]
    fn abandoned_call_logs_cancellation_once() {
        let capture = CaptureLayer::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        let svc = LoggingLayer.layer(tower::service_fn(|_op: Operation| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, OperationError>(OperationResponse::Liveness(LivenessResponse {
                status: "ok".to_string(),
            }))
        }));

        tracing::subscriber::with_default(subscriber, || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let outcome = rt.block_on(async move {
                tokio::time::timeout(Duration::from_millis(20), svc.oneshot(op())).await
            });
            assert!(outcome.is_err());
        });

        let events: Vec<_> = capture
            .events
            .lock()
            .iter()
            .filter(|e| e.target == "guestlist::access")
            .cloned()
            .collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].level, Level::WARN);
        assert!(events[0].fields.contains("code=499"));
        assert!(events[0].fields.contains("method=SearchUser"));
    }
}
