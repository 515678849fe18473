//! Liveness, readiness and version probes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use guestlist_core::{LivenessResponse, ReadinessResponse, VersionResponse};
use tower::Service;

use crate::network::{HealthState, ShutdownController};
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::storage::UserStore;

/// Build metadata reported by the version probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub build_time: String,
}

impl BuildInfo {
    /// Crate version plus `GUESTLIST_COMMIT` / `GUESTLIST_BUILD_TIME` captured
    /// at compile time.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: option_env!("GUESTLIST_COMMIT").unwrap_or("unknown").to_string(),
            build_time: option_env!("GUESTLIST_BUILD_TIME")
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

#[derive(Clone)]
pub struct HealthService {
    shutdown: Arc<ShutdownController>,
    store: Arc<dyn UserStore>,
    build: BuildInfo,
}

impl HealthService {
    #[must_use]
    pub fn new(shutdown: Arc<ShutdownController>, store: Arc<dyn UserStore>, build: BuildInfo) -> Self {
        Self {
            shutdown,
            store,
            build,
        }
    }

    #[must_use]
    pub fn liveness(&self) -> LivenessResponse {
        LivenessResponse {
            status: "ok".to_string(),
        }
    }

    /// Ready only while the server is `Ready` and storage answers a ping.
    ///
    /// # Errors
    ///
    /// `ConnectionUnavailable` otherwise.
    pub async fn readiness(&self) -> Result<ReadinessResponse, OperationError> {
        let state = self.shutdown.health_state();
        if state != HealthState::Ready {
            return Err(OperationError::ConnectionUnavailable(format!(
                "server is {}",
                state.as_str()
            )));
        }
        self.store
            .ping()
            .await
            .map_err(|e| OperationError::ConnectionUnavailable(e.to_string()))?;
        Ok(ReadinessResponse {
            status: "ready".to_string(),
        })
    }

    #[must_use]
    pub fn version(&self) -> VersionResponse {
        VersionResponse {
            build_time: self.build.build_time.clone(),
            version: self.build.version.clone(),
            commit: self.build.commit.clone(),
        }
    }
}

impl Service<Operation> for HealthService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let svc = self.clone();
        Box::pin(async move {
            match op {
                Operation::Liveness { .. } => Ok(OperationResponse::Liveness(svc.liveness())),
                Operation::Readiness { .. } => {
                    svc.readiness().await.map(OperationResponse::Readiness)
                }
                Operation::Version { .. } => Ok(OperationResponse::Version(svc.version())),
                other => Err(OperationError::WrongService {
                    method: other.method_name(),
                }),
            }
        })
    }
}
