// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Server-manager module service: lifecycle state transitions and the
//! heartbeat trigger, driven by the managing process over its own
//! connection.

use std::sync::Arc;

use bridgekit_core::types::ApplicationState;
use bridgekit_proto::rpc::Frame;
use bridgekit_proto::servermanager as pb;
use bytes::Bytes;

use crate::heartbeat::{self, Handler};
use crate::services::{decode, empty, EventSender, ServiceResult};
use crate::state::ServerState;

pub fn handle(
    state: &Arc<ServerState>,
    events: &EventSender,
    method: &str,
    body: &Bytes,
) -> ServiceResult {
    match method {
        pb::methods::SET_STATE => {
            let request: pb::SetStateRequest = decode(body)?;
            let app_state = match pb::SessionServerState::try_from(request.state) {
                Ok(pb::SessionServerState::Active) => ApplicationState::Running,
                Ok(pb::SessionServerState::Inactive | pb::SessionServerState::NotRunning) => {
                    ApplicationState::Inactive
                }
                _ => ApplicationState::Unknown,
            };
            state.controls.set_application_state(app_state);
            let _ = events.send(Frame::event(
                pb::events::STATE_CHANGED,
                &pb::StateChangedEvent { state: request.state },
            ));
            Ok(empty())
        }
        pb::methods::PING => {
            let request: pb::PingRequest = decode(body)?;
            start_ping(state, events, request.id);
            Ok(empty())
        }
        _ => Err(format!("unknown method {method}")),
    }
}

/// Arms a heartbeat across every control and session worker; the outcome
/// goes back to the manager as an ack event when the procedure finishes or
/// times out.
fn start_ping(state: &Arc<ServerState>, events: &EventSender, ping_id: u32) {
    let workers = state
        .sessions
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .handles();
    let (procedure, complete_rx) = state
        .controls
        .ping(ping_id, workers.iter().map(|(session_id, _)| Handler::Worker(*session_id)));

    // Probe each session actor: a drained Ping task proves the worker is
    // still serving its queue.
    for (session_id, handle) in workers {
        let procedure = procedure.clone();
        tokio::spawn(async move {
            if handle.enqueue_and_wait(bridgekit_engine::PlayerTask::Ping).await.is_ok() {
                procedure.ack(Handler::Worker(session_id), ping_id);
            }
        });
    }

    let state = state.clone();
    let events = events.clone();
    let timeout = state.config.heartbeat_timeout();
    tokio::spawn(async move {
        let success = heartbeat::wait(complete_rx, timeout).await;
        if !success {
            tracing::warn!(
                ping_id,
                outstanding = procedure.outstanding(),
                "heartbeat timed out"
            );
        }
        state.controls.finish_ping(ping_id);
        let _ = events.send(Frame::event(
            pb::events::ACK,
            &pb::AckEvent { id: ping_id, success },
        ));
    });
}
