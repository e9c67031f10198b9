// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The IPC multiplexer.
//!
//! One accept loop on the daemon socket; per connection, a reader task
//! dispatching calls to the module services and a writer task draining the
//! connection's outbound frame channel (replies and events share it, so
//! ordering towards one client is total). When a client drops, everything it
//! owned — sessions, web-audio players, media-keys instances, controls — is
//! torn down deterministically before the connection task exits.

use std::path::Path;
use std::sync::Arc;

use bridgekit_proto::rpc::{frame, Frame, FrameCodec};
use futures::{SinkExt, StreamExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::services::{self, ClientResources};
use crate::state::ServerState;

/// Binds the daemon socket, replacing a stale one from a previous run.
pub fn bind(path: &Path) -> std::io::Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    UnixListener::bind(path)
}

/// Accept loop; runs until the listener errors or the task is aborted.
pub async fn run(state: Arc<ServerState>, listener: UnixListener) {
    tracing::info!("session server accepting connections");
    let mut connection_seq = 0u64;
    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                connection_seq += 1;
                let connection_id = connection_seq;
                tracing::info!(connection_id, "client connected");
                let state = state.clone();
                tokio::spawn(async move {
                    handle_connection(state, stream, connection_id).await;
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                break;
            }
        }
    }
}

/// Pumps one client connection until it disconnects or the server stops.
pub async fn handle_connection(state: Arc<ServerState>, stream: UnixStream, connection_id: u64) {
    let (read_half, write_half) = stream.into_split();
    let mut framed_read = FramedRead::new(read_half, FrameCodec::new());
    let mut framed_write = FramedWrite::new(write_half, FrameCodec::new());

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Frame>();
    let writer = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            if let Err(e) = framed_write.send(frame).await {
                tracing::debug!(error = %e, "write to client failed");
                break;
            }
        }
    });

    let mut resources = ClientResources::default();
    while let Some(next) = framed_read.next().await {
        match next {
            Ok(Frame { kind: Some(frame::Kind::Call(call)) }) => {
                let reply =
                    services::dispatch(&state, &mut resources, &frame_tx, call).await;
                if frame_tx.send(reply).is_err() {
                    break;
                }
            }
            Ok(_) => {
                tracing::warn!(connection_id, "client sent a non-call frame, ignoring");
            }
            Err(e) => {
                tracing::debug!(connection_id, error = %e, "read from client failed");
                break;
            }
        }
    }

    tracing::info!(connection_id, "client disconnected, tearing down resources");
    services::teardown(&state, resources).await;
    drop(frame_tx);
    let _ = writer.await;
}
