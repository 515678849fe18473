//! Frame codec: `LengthDelimitedCodec` framing plus `MsgPack` bodies.

use std::io;
use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use guestlist_core::messages::rpc::{from_bytes, to_bytes};
use guestlist_core::WireError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Largest accepted frame body unless configured otherwise.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// Connection-level failure. Any of these ends the connection.
#[derive(Debug, thiserror::Error)]
pub enum RpcCodecError {
    #[error("rpc io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Decodes `In` frames and encodes `Out` frames.
///
/// A frame whose body fails to deserialize is yielded as `Some(Err(_))`
/// so the connection can answer it and keep going. Framing errors are
/// returned as the decoder error and are fatal.
#[derive(Debug)]
pub struct RpcCodec<In, Out> {
    framing: LengthDelimitedCodec,
    _marker: PhantomData<fn(Out) -> In>,
}

impl<In, Out> RpcCodec<In, Out> {
    #[must_use]
    pub fn new(max_frame_length: usize) -> Self {
        Self {
            framing: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .max_frame_length(max_frame_length)
                .new_codec(),
            _marker: PhantomData,
        }
    }
}

impl<In, Out> Default for RpcCodec<In, Out> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_LENGTH)
    }
}

impl<In: DeserializeOwned, Out> Decoder for RpcCodec<In, Out> {
    type Item = Result<In, WireError>;
    type Error = RpcCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self.framing.decode(src)?.map(|frame| from_bytes(&frame)))
    }
}

impl<In, Out: Serialize> Encoder<Out> for RpcCodec<In, Out> {
    type Error = RpcCodecError;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = to_bytes(&item)?;
        self.framing.encode(Bytes::from(body), dst)?;
        Ok(())
    }
}
