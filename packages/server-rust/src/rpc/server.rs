//! RPC server with deferred startup, mirroring the HTTP module.
//!
//! Connections are served concurrently, one task each. Calls on a single
//! connection are answered in order.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use guestlist_core::{ErrorKind, RpcCall, RpcError, RpcReply, RpcRequest, RpcResponse};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use super::codec::{RpcCodec, DEFAULT_MAX_FRAME_LENGTH};
use crate::network::ShutdownController;
use crate::service::{Dispatcher, OperationError, RequestContext, TransportKind};
use crate::telemetry::{SpanGuard, TraceContext, Tracer};

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub host: String,
    /// 0 means OS-assigned.
    pub port: u16,
    /// Connections with no incoming frame for this long are closed.
    pub idle_timeout: Duration,
    pub max_frame_length: usize,
    /// Deadline applied to each call.
    pub request_timeout: Duration,
    pub drain_timeout: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            idle_timeout: Duration::from_secs(60),
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            request_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(30),
        }
    }
}

/// State shared by every connection task.
struct Connections {
    config: RpcConfig,
    dispatcher: Dispatcher,
    shutdown: Arc<ShutdownController>,
    tracer: Option<Arc<dyn Tracer>>,
}

pub struct RpcServer {
    listener: Option<TcpListener>,
    shared: Arc<Connections>,
}

impl RpcServer {
    #[must_use]
    pub fn new(
        config: RpcConfig,
        dispatcher: Dispatcher,
        shutdown: Arc<ShutdownController>,
        tracer: Option<Arc<dyn Tracer>>,
    ) -> Self {
        Self {
            listener: None,
            shared: Arc::new(Connections {
                config,
                dispatcher,
                shutdown,
                tracer,
            }),
        }
    }

    /// Binds the listener and returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let config = &self.shared.config;
        let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
        let port = listener.local_addr()?.port();

        info!("RPC listener bound to {}:{}", config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Accepts connections until `shutdown` resolves, then drains.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let shared = self.shared;
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "RPC connection accepted");
                        connections.spawn(serve_connection(Arc::clone(&shared), stream, peer));
                    }
                    Err(e) => warn!(error = %e, "RPC accept failed"),
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }
        drop(listener);

        shared.shutdown.trigger_shutdown();
        if shared.shutdown.wait_for_drain(shared.config.drain_timeout).await {
            info!("RPC server drained");
        } else {
            warn!(
                in_flight = shared.shutdown.in_flight_count(),
                "RPC drain timeout expired"
            );
        }
        connections.shutdown().await;
        Ok(())
    }
}

async fn serve_connection(shared: Arc<Connections>, stream: TcpStream, peer: SocketAddr) {
    let codec = RpcCodec::<RpcRequest, RpcResponse>::new(shared.config.max_frame_length);
    let mut framed = Framed::new(stream, codec);
    let mut shutdown_rx = shared.shutdown.shutdown_receiver();

    loop {
        let next = tokio::select! {
            next = tokio::time::timeout(shared.config.idle_timeout, framed.next()) => next,
            _ = shutdown_rx.wait_for(|triggered| *triggered) => break,
        };

        let frame = match next {
            Err(_) => {
                debug!(%peer, "RPC connection idle, closing");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                warn!(%peer, error = %e, "RPC connection failed");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        let response = match frame {
            Ok(request) => handle_call(&shared, request, peer).await,
            Err(e) => {
                warn!(%peer, error = %e, "malformed RPC frame");
                RpcResponse {
                    call_id: 0,
                    result: Err(RpcError::new(ErrorKind::InvalidArgument, e.to_string())),
                }
            }
        };

        if let Err(e) = framed.send(response).await {
            warn!(%peer, error = %e, "RPC reply failed");
            break;
        }
    }
}

async fn handle_call(shared: &Connections, request: RpcRequest, peer: SocketAddr) -> RpcResponse {
    let _in_flight = shared.shutdown.in_flight_guard();
    let method = request.call.method();
    let parent = TraceContext::extract(&request.metadata);
    let span = shared
        .tracer
        .as_ref()
        .map(|tracer| SpanGuard::open(Arc::clone(tracer), "rpc.server", parent.as_ref()));
    let trace = span.as_ref().map(|s| s.context().clone()).or(parent);

    let ctx = RequestContext::new(shared.dispatcher.next_call_id(), TransportKind::Rpc)
        .with_remote_addr(Some(peer))
        .with_method(method)
        .with_protocol("msgpack-rpc")
        .with_trace(trace)
        .with_deadline(Some(Instant::now() + shared.config.request_timeout));

    let dispatcher = &shared.dispatcher;
    let result: Result<RpcReply, OperationError> = match request.call {
        RpcCall::SearchUser(req) => dispatcher.serve(ctx, req).await.map(RpcReply::SearchUser),
        RpcCall::UpdateUser(req) => dispatcher.serve(ctx, req).await.map(RpcReply::UpdateUser),
        RpcCall::Liveness(req) => dispatcher.serve(ctx, req).await.map(RpcReply::Liveness),
        RpcCall::Readiness(req) => dispatcher.serve(ctx, req).await.map(RpcReply::Readiness),
        RpcCall::Version(req) => dispatcher.serve(ctx, req).await.map(RpcReply::Version),
    };

    if let Some(span) = span {
        span.finish(result.as_ref().err().map(ToString::to_string));
    }

    RpcResponse {
        call_id: request.call_id,
        result: result.map_err(|e| RpcError::new(e.kind(), e.to_string())),
    }
}
