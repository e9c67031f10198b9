// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! RPC frame envelope and stream codec.
//!
//! Every message on the socket is one [`Frame`]: a client call carrying a
//! correlation id and a namespaced method, a server reply echoing that id, or
//! a server-originated event. Frames are protobuf-encoded and carried
//! length-prefixed by [`tokio_util::codec::LengthDelimitedCodec`]; method
//! payloads are nested protobuf messages in the `body` bytes.

use bytes::{Bytes, BytesMut};
use prost::Message;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Errors produced while encoding or decoding the wire stream.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("remote failure: {0}")]
    Remote(String),

    #[error("connection closed")]
    Closed,
}

/// Empty request/response body for methods with nothing to say.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Empty {}

/// A client→server method call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Call {
    /// Correlation id, unique per connection while the call is in flight.
    #[prost(uint32, tag = "1")]
    pub id: u32,
    /// Namespaced method, e.g. `mediapipeline.load`.
    #[prost(string, tag = "2")]
    pub method: ::prost::alloc::string::String,
    #[prost(bytes = "bytes", tag = "3")]
    pub body: Bytes,
}

/// A server→client reply to a [`Call`] with the same id.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Reply {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(bool, tag = "2")]
    pub ok: bool,
    /// Failure reason when `ok` is false.
    #[prost(string, tag = "3")]
    pub error: ::prost::alloc::string::String,
    #[prost(bytes = "bytes", tag = "4")]
    pub body: Bytes,
}

/// A server-originated notification, not correlated with any call.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    /// Namespaced event name, e.g. `mediapipeline.need_media_data`.
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(bytes = "bytes", tag = "2")]
    pub body: Bytes,
}

/// The envelope: exactly one of call, reply or event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Frame {
    #[prost(oneof = "frame::Kind", tags = "1, 2, 3")]
    pub kind: Option<frame::Kind>,
}

pub mod frame {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Call(super::Call),
        #[prost(message, tag = "2")]
        Reply(super::Reply),
        #[prost(message, tag = "3")]
        Event(super::Event),
    }
}

impl Frame {
    /// Builds a call frame, serializing `request` into the body.
    pub fn call<M: Message>(id: u32, method: &str, request: &M) -> Self {
        Self {
            kind: Some(frame::Kind::Call(Call {
                id,
                method: method.to_string(),
                body: encode_body(request),
            })),
        }
    }

    /// Builds a successful reply frame.
    pub fn reply_ok<M: Message>(id: u32, response: &M) -> Self {
        Self {
            kind: Some(frame::Kind::Reply(Reply {
                id,
                ok: true,
                error: String::new(),
                body: encode_body(response),
            })),
        }
    }

    /// Builds a successful reply from an already-encoded body.
    pub fn reply_ok_raw(id: u32, body: Bytes) -> Self {
        Self {
            kind: Some(frame::Kind::Reply(Reply { id, ok: true, error: String::new(), body })),
        }
    }

    /// Builds a failed reply frame carrying only the error text.
    pub fn reply_err(id: u32, error: impl Into<String>) -> Self {
        Self {
            kind: Some(frame::Kind::Reply(Reply {
                id,
                ok: false,
                error: error.into(),
                body: Bytes::new(),
            })),
        }
    }

    /// Builds an event frame.
    pub fn event<M: Message>(name: &str, payload: &M) -> Self {
        Self {
            kind: Some(frame::Kind::Event(Event { name: name.to_string(), body: encode_body(payload) })),
        }
    }
}

fn encode_body<M: Message>(msg: &M) -> Bytes {
    let mut buf = BytesMut::with_capacity(msg.encoded_len());
    // encoded_len reserved the exact capacity, encode cannot fail
    msg.encode(&mut buf).unwrap_or_default();
    buf.freeze()
}

/// Decodes a nested method payload out of a frame body.
pub fn decode_body<M: Message + Default>(body: &Bytes) -> Result<M, IpcError> {
    Ok(M::decode(body.clone())?)
}

/// Frame codec over a length-delimited byte stream.
///
/// Length prefixes are u32 big-endian, the `LengthDelimitedCodec` default,
/// with a 16 MiB ceiling to bound a misbehaving peer.
pub struct FrameCodec {
    inner: LengthDelimitedCodec,
}

const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    pub fn new() -> Self {
        let mut inner = LengthDelimitedCodec::new();
        inner.set_max_frame_length(MAX_FRAME_BYTES);
        Self { inner }
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = IpcError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(bytes) => Ok(Some(Frame::decode(bytes.freeze())?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = IpcError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut buf = BytesMut::with_capacity(frame.encoded_len());
        frame.encode(&mut buf).map_err(|e| IpcError::Malformed(e.to_string()))?;
        self.inner.encode(buf.freeze(), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip_through_codec() {
        let call = Frame::call(7, "mediapipeline.play", &crate::mediapipeline::PlayRequest {
            session_id: 3,
        });

        let mut codec = FrameCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(call.clone(), &mut buf).unwrap();

        // A partial buffer decodes to None, the full buffer to the frame.
        let mut partial = BytesMut::from(&buf[..2]);
        assert!(codec.decode(&mut partial).unwrap().is_none());

        let decoded = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded, call);
        let Some(frame::Kind::Call(inner)) = decoded.kind else {
            panic!("expected a call frame");
        };
        assert_eq!(inner.method, "mediapipeline.play");
        let request: crate::mediapipeline::PlayRequest = decode_body(&inner.body).unwrap();
        assert_eq!(request.session_id, 3);
    }

    #[test]
    fn test_reply_err_carries_reason() {
        let reply = Frame::reply_err(9, "Operation failed");
        let Some(frame::Kind::Reply(inner)) = reply.kind else {
            panic!("expected a reply frame");
        };
        assert!(!inner.ok);
        assert_eq!(inner.error, "Operation failed");
        assert!(inner.body.is_empty());
    }
}
