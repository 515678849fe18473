//! HTTP handlers for the guest directory.
//!
//! `AppState` is the shared state carried through axum extractors. Every
//! handler funnels into [`serve`], which builds the `RequestContext`, opens
//! the transport span and dispatches through the pipeline.

pub mod context;
pub mod error;
pub mod health;
pub mod user;

pub use context::HttpInfo;
pub use error::HttpError;
pub use health::{liveness_handler, readiness_handler, version_handler};
pub use user::{search_user_handler, update_user_handler};

use std::sync::Arc;

use axum::Json;
use tokio::time::Instant;

use super::{NetworkConfig, ShutdownController};
use crate::service::{Dispatcher, Endpoint, RequestContext, TransportKind};
use crate::telemetry::{SpanGuard, Tracer};

/// Shared application state passed to all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
    /// Opens the per-request server span. `None` disables transport spans.
    pub tracer: Option<Arc<dyn Tracer>>,
}

/// Runs one typed request through the pipeline.
async fn serve<E: Endpoint>(
    state: &AppState,
    info: HttpInfo,
    request: E,
) -> Result<Json<E::Response>, HttpError> {
    let _in_flight = state.shutdown.in_flight_guard();
    let span = state
        .tracer
        .as_ref()
        .map(|tracer| SpanGuard::open(Arc::clone(tracer), "http.server", info.parent.as_ref()));
    let trace = span.as_ref().map(|s| s.context().clone()).or(info.parent);

    let ctx = RequestContext::new(state.dispatcher.next_call_id(), TransportKind::Http)
        .with_remote_addr(info.remote_addr)
        .with_method(info.method)
        .with_url(info.url)
        .with_protocol(info.protocol)
        .with_trace(trace)
        .with_deadline(Some(Instant::now() + state.config.request_timeout));

    let result = state.dispatcher.serve(ctx, request).await;

    if let Some(span) = span {
        span.finish(result.as_ref().err().map(ToString::to_string));
    }
    result.map(Json).map_err(HttpError::from)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::service::domain::{BuildInfo, HealthService, UserService};
    use crate::service::{build_operation_pipeline, service_names, Collaborators, OperationRouter};
    use crate::storage::{MemoryUserStore, UserStore};

    /// State over a real pipeline and the given store.
    pub fn state_with(store: Arc<MemoryUserStore>) -> AppState {
        state_with_collaborators(store, &Collaborators::default())
    }

    /// Like [`state_with`], with a tracer on the pipeline and the transport.
    pub fn traced_state_with(store: Arc<MemoryUserStore>, tracer: Arc<dyn Tracer>) -> AppState {
        let collaborators = Collaborators {
            tracer: Some(tracer),
            ..Collaborators::default()
        };
        state_with_collaborators(store, &collaborators)
    }

    fn state_with_collaborators(
        store: Arc<MemoryUserStore>,
        collaborators: &Collaborators,
    ) -> AppState {
        let shutdown = Arc::new(ShutdownController::new());
        let store: Arc<dyn UserStore> = store;

        let mut router = OperationRouter::new();
        router.register(service_names::USER, UserService::new(Arc::clone(&store)));
        router.register(
            service_names::HEALTH,
            HealthService::new(
                Arc::clone(&shutdown),
                store,
                BuildInfo {
                    version: "0.1.0".to_string(),
                    commit: "test".to_string(),
                    build_time: "now".to_string(),
                },
            ),
        );

        AppState {
            dispatcher: Dispatcher::new(build_operation_pipeline(router, collaborators)),
            shutdown,
            config: Arc::new(NetworkConfig::default()),
            tracer: collaborators.tracer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::testing::traced_state_with;
    use super::*;
    use crate::storage::MemoryUserStore;
    use crate::telemetry::tracer::testing::RecordingTracer;

    #[tokio::test]
    async fn caller_trace_reaches_operation_span() {
        let tracer = Arc::new(RecordingTracer::default());
        let router = Router::new()
            .route("/liveness", get(liveness_handler))
            .with_state(traced_state_with(Arc::new(MemoryUserStore::new()), tracer.clone()));

        let resp = router
            .oneshot(
                Request::builder()
                    .uri("/liveness")
                    .header(
                        "traceparent",
                        "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let finished = tracer.finished.lock();
        assert_eq!(finished.len(), 2);
        let server = finished.iter().find(|s| s.name == "http.server").unwrap();
        let operation = finished.iter().find(|s| s.name == "Liveness").unwrap();

        for span in [server, operation] {
            assert_eq!(span.context.trace_id.to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
        }
        assert_eq!(
            server.context.parent_id.map(|id| id.to_string()).as_deref(),
            Some("00f067aa0ba902b7")
        );
        assert_eq!(operation.context.parent_id, Some(server.context.span_id));
    }
}
