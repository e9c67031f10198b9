// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The client end of the RPC channel.
//!
//! One connection per application: a framed UNIX-socket stream with a reader
//! task routing replies to their waiting callers by correlation id and
//! fanning server events out to the application's event loop.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bridgekit_proto::rpc::{self, frame, Frame, FrameCodec, IpcError};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use prost::Message;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite};

/// A channel capable of carrying method calls. The façades depend on this
/// trait so tests can substitute an in-memory server.
#[async_trait::async_trait]
pub trait RpcChannel: Send + Sync {
    async fn call(&self, method: &str, body: Bytes) -> Result<Bytes, IpcError>;
}

/// Typed call helper shared by every façade.
pub async fn call<Req, Resp>(
    channel: &dyn RpcChannel,
    method: &str,
    request: &Req,
) -> Result<Resp, IpcError>
where
    Req: Message,
    Resp: Message + Default,
{
    let body = channel.call(method, Bytes::from(request.encode_to_vec())).await?;
    Ok(Resp::decode(body)?)
}

type PendingMap = Mutex<HashMap<u32, oneshot::Sender<Result<Bytes, IpcError>>>>;

struct ConnectionInner {
    write_tx: mpsc::Sender<Frame>,
    pending: PendingMap,
    next_id: AtomicU32,
}

/// A live connection to the session server.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Connects to the server socket. Returns the connection plus the stream
    /// of server events for the application's event loop.
    pub async fn connect(
        path: impl AsRef<Path>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<rpc::Event>), IpcError> {
        let stream = UnixStream::connect(path).await?;
        Ok(Self::from_stream(stream))
    }

    /// Wraps an already-established stream (used by tests with socket pairs).
    pub fn from_stream(stream: UnixStream) -> (Self, mpsc::UnboundedReceiver<rpc::Event>) {
        let (read_half, write_half) = stream.into_split();
        let mut framed_read = FramedRead::new(read_half, FrameCodec::new());
        let mut framed_write = FramedWrite::new(write_half, FrameCodec::new());

        let (write_tx, mut write_rx) = mpsc::channel::<Frame>(32);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(ConnectionInner {
            write_tx,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(1),
        });

        tokio::spawn(async move {
            while let Some(frame) = write_rx.recv().await {
                if let Err(e) = framed_write.send(frame).await {
                    tracing::warn!(error = %e, "write to server failed");
                    break;
                }
            }
        });

        let reader_inner = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while let Some(next) = framed_read.next().await {
                let Some(inner) = reader_inner.upgrade() else { break };
                match next {
                    Ok(Frame { kind: Some(frame::Kind::Reply(reply)) }) => {
                        let waiter = {
                            let mut pending =
                                inner.pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                            pending.remove(&reply.id)
                        };
                        if let Some(waiter) = waiter {
                            let result = if reply.ok {
                                Ok(reply.body)
                            } else {
                                Err(IpcError::Remote(reply.error))
                            };
                            let _ = waiter.send(result);
                        } else {
                            tracing::debug!(id = reply.id, "reply without a waiting call");
                        }
                    }
                    Ok(Frame { kind: Some(frame::Kind::Event(event)) }) => {
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {
                        tracing::warn!("server sent a non-reply, non-event frame");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "read from server failed");
                        break;
                    }
                }
            }
            // Connection gone: fail every in-flight call.
            if let Some(inner) = reader_inner.upgrade() {
                let mut pending =
                    inner.pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                for (_, waiter) in pending.drain() {
                    let _ = waiter.send(Err(IpcError::Closed));
                }
            }
        });

        (Self { inner }, event_rx)
    }
}

#[async_trait::async_trait]
impl RpcChannel for Connection {
    async fn call(&self, method: &str, body: Bytes) -> Result<Bytes, IpcError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (done_tx, done_rx) = oneshot::channel();
        {
            let mut pending =
                self.inner.pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            pending.insert(id, done_tx);
        }
        let frame = Frame {
            kind: Some(frame::Kind::Call(rpc::Call { id, method: method.to_string(), body })),
        };
        if self.inner.write_tx.send(frame).await.is_err() {
            let mut pending =
                self.inner.pending.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            pending.remove(&id);
            return Err(IpcError::Closed);
        }
        done_rx.await.map_err(|_| IpcError::Closed)?
    }
}
