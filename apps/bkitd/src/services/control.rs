// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Control module service: client registration, shared-memory disclosure
//! and ack routing.

use std::sync::Arc;

use bridgekit_proto::control as pb;
use bytes::Bytes;

use crate::control_service::application_state_to_wire;
use crate::services::{decode, empty, encode, ClientResources, EventSender, ServiceResult};
use crate::state::ServerState;

pub fn handle(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    events: &EventSender,
    method: &str,
    body: &Bytes,
) -> ServiceResult {
    match method {
        pb::methods::REGISTER_CLIENT => {
            let _request: pb::RegisterClientRequest = decode(body)?;
            let control_id = state.mint_control_id();
            let Some(app_state) = state.controls.add_control(control_id, events.clone()) else {
                return Err(format!("control {control_id} already registered"));
            };
            resources.controls.push(control_id);
            Ok(encode(&pb::RegisterClientResponse {
                control_id,
                application_state: application_state_to_wire(app_state) as i32,
            }))
        }
        pb::methods::UNREGISTER_CLIENT => {
            let request: pb::UnregisterClientRequest = decode(body)?;
            if !state.controls.remove_control(request.control_id) {
                return Err(format!("control {} not found", request.control_id));
            }
            resources.controls.retain(|id| *id != request.control_id);
            Ok(empty())
        }
        pb::methods::GET_SHARED_MEMORY => {
            let _request: pb::GetSharedMemoryRequest = decode(body)?;
            Ok(encode(&pb::GetSharedMemoryResponse {
                name: state.arena_name.clone(),
                size: state.arena_size,
            }))
        }
        pb::methods::ACK => {
            let request: pb::AckRequest = decode(body)?;
            if state.controls.ack(request.control_id, request.id) {
                Ok(empty())
            } else {
                Err(format!(
                    "ack {} from control {} not accepted",
                    request.id, request.control_id
                ))
            }
        }
        _ => Err(format!("unknown method {method}")),
    }
}
