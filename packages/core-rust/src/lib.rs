//! Guest directory core: wire messages, error kinds, request validation, and
//! the opt-in diagnostics capability shared by the HTTP and RPC transports.

pub mod describe;
pub mod error;
pub mod messages;
pub mod validate;

pub use describe::{Describe, Field};
pub use error::ErrorKind;
pub use messages::{
    LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse, RpcCall, RpcError,
    RpcReply, RpcRequest, RpcResponse, SearchUserRequest, SearchUserResponse, Status, UpdateData,
    UpdateUserRequest, UpdateUserResponse, UserRecord, VersionRequest, VersionResponse, WireError,
};
pub use validate::{Validate, ValidationError};

