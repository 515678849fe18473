//! Probe endpoints: `/liveness`, `/readiness`, `/version`.
//!
//! Probes go through the same pipeline as user calls, so they are logged and
//! counted like any other method.

use axum::extract::State;
use axum::Json;
use guestlist_core::{
    LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse, VersionRequest,
    VersionResponse,
};

use super::{serve, AppState, HttpError, HttpInfo};

/// Always 200 while the process is serving.
pub async fn liveness_handler(
    State(state): State<AppState>,
    info: HttpInfo,
) -> Result<Json<LivenessResponse>, HttpError> {
    serve(&state, info, LivenessRequest {}).await
}

/// 200 only while Ready and storage is reachable, 500 otherwise.
pub async fn readiness_handler(
    State(state): State<AppState>,
    info: HttpInfo,
) -> Result<Json<ReadinessResponse>, HttpError> {
    serve(&state, info, ReadinessRequest {}).await
}

pub async fn version_handler(
    State(state): State<AppState>,
    info: HttpInfo,
) -> Result<Json<VersionResponse>, HttpError> {
    serve(&state, info, VersionRequest {}).await
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;
    use crate::network::handlers::testing::state_with;
    use crate::storage::MemoryUserStore;

    fn info(path: &str) -> HttpInfo {
        HttpInfo {
            remote_addr: Some(SocketAddr::from(([127, 0, 0, 1], 5555))),
            method: "GET".to_string(),
            url: path.to_string(),
            protocol: "HTTP/1.1".to_string(),
            parent: None,
        }
    }

    #[tokio::test]
    async fn liveness_returns_ok() {
        let state = state_with(Arc::new(MemoryUserStore::new()));
        let Json(resp) = liveness_handler(State(state), info("/liveness")).await.unwrap();
        assert_eq!(resp.status, "ok");
    }

    #[tokio::test]
    async fn readiness_fails_until_ready() {
        let state = state_with(Arc::new(MemoryUserStore::new()));

        let err = readiness_handler(State(state.clone()), info("/readiness"))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        state.shutdown.set_ready();
        let Json(resp) = readiness_handler(State(state.clone()), info("/readiness"))
            .await
            .unwrap();
        assert_eq!(resp.status, "ready");
        assert_eq!(state.shutdown.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn version_reports_build() {
        let state = state_with(Arc::new(MemoryUserStore::new()));
        let Json(resp) = version_handler(State(state), info("/version")).await.unwrap();
        assert_eq!(resp.version, "0.1.0");
        assert_eq!(resp.commit, "test");
    }
}
