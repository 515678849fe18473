//! RPC envelopes carried inside length-delimited frames.
//!
//! A frame body is a named `MsgPack` map. Requests look like
//! `{callId, call: {method, payload}, metadata?}`; responses echo the `callId`
//! and carry either `{Ok: reply}` or `{Err: {kind, message}}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::health::{
    LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse, VersionRequest,
    VersionResponse,
};
use super::user::{SearchUserRequest, SearchUserResponse, UpdateUserRequest, UpdateUserResponse};
use crate::error::ErrorKind;

/// One remote method invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "payload")]
pub enum RpcCall {
    SearchUser(SearchUserRequest),
    UpdateUser(UpdateUserRequest),
    Liveness(LivenessRequest),
    Readiness(ReadinessRequest),
    Version(VersionRequest),
}

impl RpcCall {
    /// Method name as written on the wire.
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::SearchUser(_) => "SearchUser",
            Self::UpdateUser(_) => "UpdateUser",
            Self::Liveness(_) => "Liveness",
            Self::Readiness(_) => "Readiness",
            Self::Version(_) => "Version",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    pub call_id: u64,
    pub call: RpcCall,
    /// Call metadata such as the caller's `traceparent`. Omitted when empty.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl RpcRequest {
    #[must_use]
    pub fn new(call_id: u64, call: RpcCall) -> Self {
        Self {
            call_id,
            call,
            metadata: HashMap::new(),
        }
    }
}

/// Successful result of an [`RpcCall`], one variant per method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcReply {
    SearchUser(SearchUserResponse),
    UpdateUser(UpdateUserResponse),
    Liveness(LivenessResponse),
    Readiness(ReadinessResponse),
    Version(VersionResponse),
}

/// Failure of an [`RpcCall`]: the error class plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RpcError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
    pub call_id: u64,
    pub result: Result<RpcReply, RpcError>,
}

/// Frame body (de)serialization failure.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("failed to encode frame: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Serializes a frame body as a named `MsgPack` map.
///
/// # Errors
///
/// Returns [`WireError::Encode`] if the value cannot be represented.
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, WireError> {
    Ok(rmp_serde::to_vec_named(value)?)
}

/// Deserializes a frame body produced by [`to_bytes`].
///
/// # Errors
///
/// Returns [`WireError::Decode`] on malformed input or a schema mismatch.
pub fn from_bytes<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    Ok(rmp_serde::from_slice(bytes)?)
}
