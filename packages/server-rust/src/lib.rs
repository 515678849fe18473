//! Guest directory server: one decorated operation pipeline behind an HTTP
//! (axum) transport and a length-prefixed `MsgPack` RPC transport.

pub mod app;
pub mod config;
pub mod network;
pub mod rpc;
pub mod service;
pub mod storage;
pub mod telemetry;

pub use service::{Dispatcher, Operation, OperationError, OperationResponse};
pub use storage::{StoreError, UserStore};
