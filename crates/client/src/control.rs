// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Client control handle: application-state subscription and liveness acks.
//!
//! Registering yields a control id and the current application state. The
//! state is published through a `watch` channel so every session object can
//! gate its data flow on it without extra plumbing; pings are answered on
//! the ack method with the ping's own id.

use std::sync::Arc;

use bridgekit_core::types::ApplicationState;
use bridgekit_proto::control as pb;
use bridgekit_proto::rpc::IpcError;
use bytes::Bytes;
use prost::Message;
use tokio::sync::watch;

use crate::connection::{call, RpcChannel};

/// Client-side registration with the server's control service.
pub struct ControlClient {
    channel: Arc<dyn RpcChannel>,
    control_id: i32,
    state_tx: watch::Sender<ApplicationState>,
}

impl ControlClient {
    /// Registers with the server and seeds the application-state watch.
    pub async fn register(channel: Arc<dyn RpcChannel>) -> Result<Self, IpcError> {
        let response: pb::RegisterClientResponse =
            call(channel.as_ref(), pb::methods::REGISTER_CLIENT, &pb::RegisterClientRequest {})
                .await?;
        let initial = application_state_from_wire(response.application_state);
        let (state_tx, _) = watch::channel(initial);
        tracing::info!(control_id = response.control_id, state = ?initial, "control registered");
        Ok(Self { channel, control_id: response.control_id, state_tx })
    }

    pub const fn control_id(&self) -> i32 {
        self.control_id
    }

    /// Watch endpoint session objects subscribe to.
    pub fn application_state(&self) -> watch::Receiver<ApplicationState> {
        self.state_tx.subscribe()
    }

    /// Fetches the shared-memory disclosure for mapping the arena.
    pub async fn get_shared_memory(&self) -> Result<(String, u32), IpcError> {
        let response: pb::GetSharedMemoryResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_SHARED_MEMORY,
            &pb::GetSharedMemoryRequest {},
        )
        .await?;
        Ok((response.name, response.size))
    }

    /// Digests a control event. State changes update the watch; pings are
    /// acked back with their id.
    pub async fn handle_event(&self, name: &str, body: &Bytes) -> Result<(), IpcError> {
        match name {
            pb::events::APPLICATION_STATE => {
                if let Ok(event) = pb::ApplicationStateChangeEvent::decode(body.clone()) {
                    let state = application_state_from_wire(event.application_state);
                    tracing::info!(state = ?state, "application state changed");
                    let _ = self.state_tx.send(state);
                }
                Ok(())
            }
            pb::events::PING => {
                let event = pb::PingEvent::decode(body.clone())
                    .map_err(|e| IpcError::Malformed(e.to_string()))?;
                if event.control_id != self.control_id {
                    return Ok(());
                }
                let _: bridgekit_proto::rpc::Empty = call(
                    self.channel.as_ref(),
                    pb::methods::ACK,
                    &pb::AckRequest { control_id: self.control_id, id: event.id },
                )
                .await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Deregisters the control.
    pub async fn unregister(&self) -> Result<(), IpcError> {
        let _: bridgekit_proto::rpc::Empty = call(
            self.channel.as_ref(),
            pb::methods::UNREGISTER_CLIENT,
            &pb::UnregisterClientRequest { control_id: self.control_id },
        )
        .await?;
        Ok(())
    }
}

fn application_state_from_wire(state: i32) -> ApplicationState {
    match pb::ApplicationState::try_from(state) {
        Ok(pb::ApplicationState::Inactive) => ApplicationState::Inactive,
        Ok(pb::ApplicationState::Running) => ApplicationState::Running,
        _ => ApplicationState::Unknown,
    }
}
