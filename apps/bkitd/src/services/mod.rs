// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Module services exported to every client connection.
//!
//! The dispatcher routes a call by its method namespace; each service
//! decodes its own request, talks to the engine or registries, and encodes
//! its reply. Per-connection ownership is tracked in [`ClientResources`] so
//! a disconnect tears down exactly what that client created.

pub mod control;
pub mod media_keys;
pub mod media_pipeline;
pub mod server_manager;
pub mod web_audio;

use std::sync::Arc;

use bridgekit_core::types::SessionId;
use bridgekit_proto::rpc::{Call, Frame};
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::state::ServerState;

/// Everything one client connection owns.
#[derive(Debug, Default)]
pub struct ClientResources {
    pub sessions: Vec<SessionId>,
    pub web_audio_players: Vec<i32>,
    pub media_keys: Vec<i32>,
    pub controls: Vec<i32>,
}

/// Outbound frame channel of one connection.
pub type EventSender = mpsc::UnboundedSender<Frame>;

/// Result type every service handler returns: an encoded response body.
pub type ServiceResult = Result<Bytes, String>;

/// Routes one call to its module service and wraps the outcome in a reply
/// frame.
pub async fn dispatch(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    events: &EventSender,
    call: Call,
) -> Frame {
    let result = match call.method.split_once('.') {
        Some(("mediapipeline", _)) => {
            media_pipeline::handle(state, resources, events, &call.method, &call.body).await
        }
        Some(("webaudio", _)) => {
            web_audio::handle(state, resources, events, &call.method, &call.body).await
        }
        Some(("mediakeys", _)) => {
            media_keys::handle(state, resources, events, &call.method, &call.body).await
        }
        Some(("control", _)) => {
            control::handle(state, resources, events, &call.method, &call.body)
        }
        Some(("servermanager", _)) => {
            server_manager::handle(state, events, &call.method, &call.body)
        }
        _ => Err(format!("unknown method {}", call.method)),
    };
    match result {
        Ok(body) => Frame::reply_ok_raw(call.id, body),
        Err(error) => {
            tracing::debug!(method = %call.method, %error, "call failed");
            Frame::reply_err(call.id, error)
        }
    }
}

/// Destroys everything a disconnected client owned, in dependency order:
/// players and sessions first (they hold arena slots), registries last.
pub async fn teardown(state: &Arc<ServerState>, resources: ClientResources) {
    for handle in resources.web_audio_players {
        let entry = state.web_audio.lock().unwrap_or_else(std::sync::PoisonError::into_inner).remove(handle);
        if let Some(entry) = entry {
            let _ = entry.handle.shutdown_and_wait().await;
        }
    }
    for session_id in resources.sessions {
        let entry = state
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(session_id);
        if let Some(entry) = entry {
            let _ = entry.handle.shutdown_and_wait().await;
        }
    }
    for handle in resources.media_keys {
        let entry = state
            .media_keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(handle);
        if let Some(entry) = entry {
            for key_session_id in entry.key_sessions {
                let _ = state.cdm.close_key_session(key_session_id);
            }
        }
    }
    for control_id in resources.controls {
        state.controls.remove_control(control_id);
    }
}

/// Decodes a request body, mapping the failure into the service error shape.
pub fn decode<M: prost::Message + Default>(body: &Bytes) -> Result<M, String> {
    M::decode(body.clone()).map_err(|e| format!("malformed request: {e}"))
}

/// Encodes a response body.
pub fn encode<M: prost::Message>(message: &M) -> Bytes {
    Bytes::from(message.encode_to_vec())
}

/// The canonical empty response.
pub fn empty() -> Bytes {
    encode(&bridgekit_proto::rpc::Empty {})
}
