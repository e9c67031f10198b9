// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Media-keys module service: key-session CRUD and DRM store queries over
//! the CDM seam. Also answers the media-keys-capabilities queries. License
//! request blobs go back to the client as license-request events, matching
//! the EME flow.

use std::sync::Arc;

use bridgekit_proto::mediakeys as pb;
use bridgekit_proto::rpc::Frame;
use bytes::Bytes;

use crate::services::{decode, empty, encode, ClientResources, EventSender, ServiceResult};
use crate::state::ServerState;

pub async fn handle(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    events: &EventSender,
    method: &str,
    body: &Bytes,
) -> ServiceResult {
    match method {
        pb::methods::GENERATE_REQUEST => {
            let request: pb::GenerateRequestRequest = decode(body)?;
            generate_request(state, events, &request)
        }
        pb::methods::CREATE_MEDIA_KEYS => {
            let request: pb::CreateMediaKeysRequest = decode(body)?;
            if !state.cdm.supports_key_system(&request.key_system) {
                return Err(format!("key system {} is not supported", request.key_system));
            }
            let handle = state
                .media_keys
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .create(request.key_system);
            resources.media_keys.push(handle);
            tracing::info!(media_keys_handle = handle, "created media keys");
            Ok(encode(&pb::CreateMediaKeysResponse { media_keys_handle: handle }))
        }
        pb::methods::DESTROY_MEDIA_KEYS => {
            let request: pb::DestroyMediaKeysRequest = decode(body)?;
            let entry = state
                .media_keys
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(request.media_keys_handle)
                .ok_or_else(|| format!("media keys {} not found", request.media_keys_handle))?;
            resources.media_keys.retain(|h| *h != request.media_keys_handle);
            for key_session_id in entry.key_sessions {
                let _ = state.cdm.close_key_session(key_session_id);
            }
            Ok(empty())
        }
        pb::methods::CREATE_KEY_SESSION => {
            let request: pb::CreateKeySessionRequest = decode(body)?;
            let key_system = {
                let registry =
                    state.media_keys.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                registry.get(request.media_keys_handle).map_err(|e| e.to_string())?.key_system.clone()
            };
            let key_session_id =
                state.cdm.open_key_session(&key_system).map_err(|e| e.to_string())?;
            state
                .media_keys
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get_mut(request.media_keys_handle)
                .map_err(|e| e.to_string())?
                .key_sessions
                .push(key_session_id);
            tracing::info!(
                media_keys_handle = request.media_keys_handle,
                key_session_id,
                "created key session"
            );
            Ok(encode(&pb::CreateKeySessionResponse { key_session_id }))
        }
        pb::methods::CLOSE_KEY_SESSION => {
            let request: pb::CloseKeySessionRequest = decode(body)?;
            state.cdm.close_key_session(request.key_session_id).map_err(|e| e.to_string())?;
            if let Ok(entry) = state
                .media_keys
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get_mut(request.media_keys_handle)
            {
                entry.key_sessions.retain(|id| *id != request.key_session_id);
            }
            Ok(empty())
        }
        pb::methods::REMOVE_KEY_SESSION | pb::methods::RELEASE_KEY_SESSION => {
            // The soft CDM holds no persistent license state beyond the
            // session entry itself.
            let _request: pb::RemoveKeySessionRequest = decode(body)?;
            Ok(empty())
        }
        pb::methods::LOAD_SESSION => {
            let _request: pb::LoadSessionRequest = decode(body)?;
            Ok(empty())
        }
        pb::methods::UPDATE_SESSION => {
            let request: pb::UpdateSessionRequest = decode(body)?;
            state
                .cdm
                .update_session(request.key_session_id, &request.response_data)
                .map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::CONTAINS_KEY => {
            let request: pb::ContainsKeyRequest = decode(body)?;
            Ok(encode(&pb::ContainsKeyResponse {
                contains_key: state.cdm.contains_key(request.key_session_id, &request.key_id),
            }))
        }
        pb::methods::SELECT_KEY_ID => {
            // Key selection is client-side bookkeeping (the key-id map);
            // the CDM needs no notification.
            let _request: pb::SelectKeyIdRequest = decode(body)?;
            Ok(empty())
        }
        pb::methods::SET_DRM_HEADER => {
            let request: pb::SetDrmHeaderRequest = decode(body)?;
            state
                .cdm
                .set_drm_header(request.key_session_id, &request.request_data)
                .map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::DELETE_DRM_STORE => {
            let _request: pb::DeleteDrmStoreRequest = decode(body)?;
            state.cdm.delete_drm_store().map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::DELETE_KEY_STORE => {
            let _request: pb::DeleteKeyStoreRequest = decode(body)?;
            state.cdm.delete_key_store().map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::GET_DRM_STORE_HASH => {
            let _request: pb::GetDrmStoreHashRequest = decode(body)?;
            let hash = state.cdm.drm_store_hash().map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetDrmStoreHashResponse { hash: hash.into() }))
        }
        pb::methods::GET_KEY_STORE_HASH => {
            let _request: pb::GetKeyStoreHashRequest = decode(body)?;
            let hash = state.cdm.key_store_hash().map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetKeyStoreHashResponse { hash: hash.into() }))
        }
        pb::methods::GET_LDL_SESSIONS_LIMIT => {
            let _request: pb::GetLdlSessionsLimitRequest = decode(body)?;
            Ok(encode(&pb::GetLdlSessionsLimitResponse {
                ldl_limit: state.cdm.ldl_sessions_limit(),
            }))
        }
        pb::methods::GET_LAST_DRM_ERROR => {
            let request: pb::GetLastDrmErrorRequest = decode(body)?;
            Ok(encode(&pb::GetLastDrmErrorResponse {
                error_code: state.cdm.last_drm_error(request.key_session_id),
            }))
        }
        pb::methods::GET_DRM_TIME => {
            let _request: pb::GetDrmTimeRequest = decode(body)?;
            Ok(encode(&pb::GetDrmTimeResponse { drm_time: state.cdm.drm_time() }))
        }
        pb::methods::GET_CDM_KEY_SESSION_ID => {
            let request: pb::GetCdmKeySessionIdRequest = decode(body)?;
            let cdm_key_session_id = state
                .cdm
                .cdm_key_session_id(request.key_session_id)
                .map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetCdmKeySessionIdResponse { cdm_key_session_id }))
        }
        pb::methods::GET_SUPPORTED_KEY_SYSTEMS => {
            let _request: pb::GetSupportedKeySystemsRequest = decode(body)?;
            Ok(encode(&pb::GetSupportedKeySystemsResponse {
                key_systems: state.cdm.supported_key_systems(),
            }))
        }
        pb::methods::SUPPORTS_KEY_SYSTEM => {
            let request: pb::SupportsKeySystemRequest = decode(body)?;
            Ok(encode(&pb::SupportsKeySystemResponse {
                is_supported: state.cdm.supports_key_system(&request.key_system),
            }))
        }
        pb::methods::GET_SUPPORTED_KEY_SYSTEM_VERSION => {
            let request: pb::GetSupportedKeySystemVersionRequest = decode(body)?;
            let version =
                state.cdm.key_system_version(&request.key_system).map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetSupportedKeySystemVersionResponse { version }))
        }
        pb::methods::IS_SERVER_CERTIFICATE_SUPPORTED => {
            let request: pb::IsServerCertificateSupportedRequest = decode(body)?;
            Ok(encode(&pb::IsServerCertificateSupportedResponse {
                is_supported: state.cdm.server_certificate_supported(&request.key_system),
            }))
        }
        _ => Err(format!("unknown method {method}")),
    }
}

/// Runs `generate_request` and pushes the challenge back as a
/// license-request event on the owning connection.
pub fn generate_request(
    state: &Arc<ServerState>,
    events: &EventSender,
    request: &pb::GenerateRequestRequest,
) -> ServiceResult {
    let challenge = state
        .cdm
        .generate_request(request.key_session_id, &request.init_data)
        .map_err(|e| e.to_string())?;
    let event = pb::LicenseRequestEvent {
        media_keys_handle: request.media_keys_handle,
        key_session_id: request.key_session_id,
        request_data: challenge.into(),
        url: String::new(),
    };
    let _ = events.send(Frame::event(pb::events::LICENSE_REQUEST, &event));
    Ok(empty())
}
