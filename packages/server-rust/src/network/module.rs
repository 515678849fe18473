//! HTTP server with deferred startup.
//!
//! `new()` assembles state, `start()` binds the listener, and `serve()`
//! accepts connections until shutdown. Binding separately lets the caller
//! learn the port and bring up the RPC listener before either serves.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    liveness_handler, readiness_handler, search_user_handler, update_user_handler,
    version_handler, AppState,
};
use super::middleware::{build_http_layers, with_rate_limit};
use super::shutdown::ShutdownController;
use crate::service::Dispatcher;
use crate::telemetry::Tracer;

pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    dispatcher: Dispatcher,
    shutdown: Arc<ShutdownController>,
    tracer: Option<Arc<dyn Tracer>>,
}

impl NetworkModule {
    #[must_use]
    pub fn new(
        config: NetworkConfig,
        dispatcher: Dispatcher,
        shutdown: Arc<ShutdownController>,
        tracer: Option<Arc<dyn Tracer>>,
    ) -> Self {
        Self {
            config,
            listener: None,
            dispatcher,
            shutdown,
            tracer,
        }
    }

    /// Assembles the axum router with all routes and middleware.
    ///
    /// Routes:
    /// - `GET /user/search?surname=`
    /// - `PUT /user`
    /// - `GET /liveness`, `GET /readiness`, `GET /version`
    pub fn build_router(&self) -> Router {
        let state = AppState {
            dispatcher: self.dispatcher.clone(),
            shutdown: Arc::clone(&self.shutdown),
            config: Arc::new(self.config.clone()),
            tracer: self.tracer.clone(),
        };

        let mut router = Router::new()
            .route("/user/search", get(search_user_handler))
            .route("/user", put(update_user_handler))
            .route("/liveness", get(liveness_handler))
            .route("/readiness", get(readiness_handler))
            .route("/version", get(version_handler));

        if let Some(limit) = &self.config.rate_limit {
            router = with_rate_limit(router, limit);
        }

        router
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the TCP listener and returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("HTTP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves, then waits for in-flight calls.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called or the server fails.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        self.shutdown.trigger_shutdown();
        if self.shutdown.wait_for_drain(self.config.drain_timeout).await {
            info!("HTTP server drained");
        } else {
            warn!(
                in_flight = self.shutdown.in_flight_count(),
                "HTTP drain timeout expired"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::network::handlers::testing::state_with;
    use crate::storage::MemoryUserStore;

    fn module() -> NetworkModule {
        let state = state_with(Arc::new(MemoryUserStore::new()));
        NetworkModule::new(
            NetworkConfig {
                host: "127.0.0.1".to_string(),
                ..NetworkConfig::default()
            },
            state.dispatcher,
            state.shutdown,
            None,
        )
    }

    #[tokio::test]
    async fn start_binds_to_os_assigned_port() {
        let mut module = module();
        let port = module.start().await.expect("start should succeed");
        assert!(port > 0);
        assert!(module.listener.is_some());
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let err = module().serve(std::future::pending::<()>()).await.unwrap_err();
        assert!(err.to_string().contains("start()"));
    }

    #[tokio::test]
    async fn serves_liveness_then_shuts_down() {
        let mut module = module();
        let controller = Arc::clone(&module.shutdown);
        let port = module.start().await.unwrap();

        let stop = Arc::clone(&controller);
        let server = tokio::spawn(module.serve(async move { stop.wait_for_shutdown().await }));

        let body = reqwest::get(format!("http://127.0.0.1:{port}/liveness"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, r#"{"status":"ok"}"#);

        controller.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(controller.health_state(), crate::network::HealthState::Stopped);
    }
}
