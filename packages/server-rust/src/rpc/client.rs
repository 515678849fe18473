//! RPC client for the binary transport.
//!
//! One request in flight at a time per client, matching the server's
//! in-order handling of a connection.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use guestlist_core::{
    LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse, RpcCall, RpcError,
    RpcReply, RpcRequest, RpcResponse, SearchUserRequest, SearchUserResponse, UpdateUserRequest,
    UpdateUserResponse, VersionRequest, VersionResponse, WireError,
};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use super::codec::{RpcCodec, RpcCodecError};
use crate::telemetry::TraceContext;

#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error(transparent)]
    Codec(#[from] RpcCodecError),
    #[error("malformed reply: {0}")]
    Wire(#[from] WireError),
    #[error("connection closed by server")]
    Closed,
    #[error("reply for call {got}, expected {expected}")]
    CallIdMismatch { expected: u64, got: u64 },
    #[error("reply does not match method {method}")]
    UnexpectedReply { method: &'static str },
    #[error("remote error: {0}")]
    Remote(RpcError),
}

impl From<std::io::Error> for RpcClientError {
    fn from(e: std::io::Error) -> Self {
        Self::Codec(RpcCodecError::Io(e))
    }
}

pub struct RpcClient {
    framed: Framed<TcpStream, RpcCodec<RpcResponse, RpcRequest>>,
    next_call_id: u64,
}

impl RpcClient {
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(addr: SocketAddr) -> Result<Self, RpcClientError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self {
            framed: Framed::new(stream, RpcCodec::default()),
            next_call_id: 1,
        })
    }

    /// Sends one call and waits for its reply.
    ///
    /// # Errors
    ///
    /// Transport failures, or [`RpcClientError::Remote`] when the server
    /// answered with an error.
    pub async fn call(&mut self, call: RpcCall) -> Result<RpcReply, RpcClientError> {
        let request = RpcRequest::new(self.next_call_id, call);
        self.send(request).await
    }

    /// Like [`Self::call`], with `parent` sent as the caller's trace.
    ///
    /// # Errors
    ///
    /// As [`Self::call`].
    pub async fn call_traced(
        &mut self,
        call: RpcCall,
        parent: &TraceContext,
    ) -> Result<RpcReply, RpcClientError> {
        let mut request = RpcRequest::new(self.next_call_id, call);
        parent.inject(&mut request.metadata);
        self.send(request).await
    }

    async fn send(&mut self, request: RpcRequest) -> Result<RpcReply, RpcClientError> {
        let call_id = request.call_id;
        self.next_call_id += 1;

        self.framed.send(request).await?;
        let response = self.framed.next().await.ok_or(RpcClientError::Closed)???;

        if response.call_id != call_id {
            return Err(RpcClientError::CallIdMismatch {
                expected: call_id,
                got: response.call_id,
            });
        }
        response.result.map_err(RpcClientError::Remote)
    }

    /// # Errors
    ///
    /// As [`Self::call`].
    pub async fn search_user(
        &mut self,
        surname: impl Into<String>,
    ) -> Result<SearchUserResponse, RpcClientError> {
        let call = RpcCall::SearchUser(SearchUserRequest {
            surname: surname.into(),
        });
        match self.call(call).await? {
            RpcReply::SearchUser(resp) => Ok(resp),
            _ => Err(RpcClientError::UnexpectedReply {
                method: "SearchUser",
            }),
        }
    }

    /// # Errors
    ///
    /// As [`Self::call`].
    pub async fn update_user(
        &mut self,
        request: UpdateUserRequest,
    ) -> Result<UpdateUserResponse, RpcClientError> {
        match self.call(RpcCall::UpdateUser(request)).await? {
            RpcReply::UpdateUser(resp) => Ok(resp),
            _ => Err(RpcClientError::UnexpectedReply {
                method: "UpdateUser",
            }),
        }
    }

    /// # Errors
    ///
    /// As [`Self::call`].
    pub async fn liveness(&mut self) -> Result<LivenessResponse, RpcClientError> {
        match self.call(RpcCall::Liveness(LivenessRequest {})).await? {
            RpcReply::Liveness(resp) => Ok(resp),
            _ => Err(RpcClientError::UnexpectedReply { method: "Liveness" }),
        }
    }

    /// # Errors
    ///
    /// As [`Self::call`].
    pub async fn readiness(&mut self) -> Result<ReadinessResponse, RpcClientError> {
        match self.call(RpcCall::Readiness(ReadinessRequest {})).await? {
            RpcReply::Readiness(resp) => Ok(resp),
            _ => Err(RpcClientError::UnexpectedReply {
                method: "Readiness",
            }),
        }
    }

    /// # Errors
    ///
    /// As [`Self::call`].
    pub async fn version(&mut self) -> Result<VersionResponse, RpcClientError> {
        match self.call(RpcCall::Version(VersionRequest {})).await? {
            RpcReply::Version(resp) => Ok(resp),
            _ => Err(RpcClientError::UnexpectedReply { method: "Version" }),
        }
    }
}
