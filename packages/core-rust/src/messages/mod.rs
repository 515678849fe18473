//! Wire message schemas for the guest directory.
//!
//! The same structs are used for JSON (HTTP) and named-field `MsgPack`
//! (RPC, via `rmp_serde::to_vec_named()`). Field names are camelCase on both
//! wires.

pub mod health;
pub mod rpc;
pub mod user;

use serde::{Deserialize, Serialize};

pub use health::{
    LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse, VersionRequest,
    VersionResponse,
};
pub use rpc::{RpcCall, RpcError, RpcReply, RpcRequest, RpcResponse, WireError};
pub use user::{
    SearchUserRequest, SearchUserResponse, UpdateData, UpdateUserRequest, UpdateUserResponse,
    UserRecord,
};

/// Outcome marker embedded in user responses.
///
/// Successful calls always carry `status == true`; failed calls never produce
/// a response body, so a `Status` with `status == false` is not emitted by the
/// server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Status {
    pub status: bool,
    pub message: String,
}

impl Status {
    /// The success marker: `{status: true, message: "OK"}`.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: true,
            message: "OK".to_string(),
        }
    }
}
