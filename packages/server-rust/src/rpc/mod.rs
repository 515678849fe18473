//! Binary RPC transport: length-prefixed `MsgPack` frames over TCP.
//!
//! Each frame is a 4-byte big-endian length followed by a named-field
//! `MsgPack` body (see `guestlist_core::messages::rpc`).

pub mod client;
pub mod codec;
pub mod server;

pub use client::{RpcClient, RpcClientError};
pub use codec::{RpcCodec, RpcCodecError};
pub use server::{RpcConfig, RpcServer};
