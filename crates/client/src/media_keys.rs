// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Client media-keys façade.
//!
//! Forwards key-session operations to the server-side CDM and, for key
//! systems that select keys per session (Netflix flavours), maintains the
//! process-wide key-id map used to stamp outgoing encrypted segments.

use std::sync::Arc;

use bridgekit_core::keyid::{uses_key_id_map, KeyIdMap};
use bridgekit_proto::mediakeys as pb;
use bridgekit_proto::rpc::IpcError;
use bytes::Bytes;

use crate::connection::{call, RpcChannel};

/// Key-session flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySessionType {
    Temporary,
    PersistentLicense,
    PersistentReleaseMessage,
}

/// Initialization-data formats accepted by `generate_request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitDataType {
    Cenc,
    KeyIds,
    WebM,
    DrmHeader,
}

/// Client handle to one server-side media-keys instance.
pub struct MediaKeys {
    channel: Arc<dyn RpcChannel>,
    handle: i32,
    key_id_map: Arc<KeyIdMap>,
    tracks_key_ids: bool,
}

impl MediaKeys {
    /// Creates a media-keys instance for a key system.
    pub async fn create(
        channel: Arc<dyn RpcChannel>,
        key_system: &str,
        key_id_map: Arc<KeyIdMap>,
    ) -> Result<Self, IpcError> {
        let response: pb::CreateMediaKeysResponse = call(
            channel.as_ref(),
            pb::methods::CREATE_MEDIA_KEYS,
            &pb::CreateMediaKeysRequest { key_system: key_system.to_string() },
        )
        .await?;
        Ok(Self {
            channel,
            handle: response.media_keys_handle,
            key_id_map,
            tracks_key_ids: uses_key_id_map(key_system),
        })
    }

    pub const fn handle(&self) -> i32 {
        self.handle
    }

    /// Creates a key session; key-id-mapped systems get an (empty) map entry
    /// immediately so segment stamping can begin as soon as a key arrives.
    pub async fn create_key_session(
        &self,
        session_type: KeySessionType,
        is_ldl: bool,
    ) -> Result<i32, IpcError> {
        let response: pb::CreateKeySessionResponse = call(
            self.channel.as_ref(),
            pb::methods::CREATE_KEY_SESSION,
            &pb::CreateKeySessionRequest {
                media_keys_handle: self.handle,
                session_type: match session_type {
                    KeySessionType::Temporary => pb::KeySessionType::Temporary,
                    KeySessionType::PersistentLicense => pb::KeySessionType::PersistentLicense,
                    KeySessionType::PersistentReleaseMessage => {
                        pb::KeySessionType::PersistentReleaseMessage
                    }
                } as i32,
                is_ldl,
            },
        )
        .await?;
        if self.tracks_key_ids {
            self.key_id_map.add_session(response.key_session_id);
        }
        Ok(response.key_session_id)
    }

    pub async fn generate_request(
        &self,
        key_session_id: i32,
        init_data_type: InitDataType,
        init_data: Bytes,
    ) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::GENERATE_REQUEST,
            &pb::GenerateRequestRequest {
                media_keys_handle: self.handle,
                key_session_id,
                init_data_type: match init_data_type {
                    InitDataType::Cenc => pb::InitDataType::Cenc,
                    InitDataType::KeyIds => pb::InitDataType::KeyIds,
                    InitDataType::WebM => pb::InitDataType::WebM,
                    InitDataType::DrmHeader => pb::InitDataType::Drmheader,
                } as i32,
                init_data,
            },
        )
        .await
    }

    pub async fn load_session(&self, key_session_id: i32) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::LOAD_SESSION,
            &pb::LoadSessionRequest { media_keys_handle: self.handle, key_session_id },
        )
        .await
    }

    /// Forwards an opaque license response blob.
    pub async fn update_session(
        &self,
        key_session_id: i32,
        response_data: Bytes,
    ) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::UPDATE_SESSION,
            &pb::UpdateSessionRequest {
                media_keys_handle: self.handle,
                key_session_id,
                response_data,
            },
        )
        .await
    }

    /// Selects the active key of a session; mapped systems remember it for
    /// segment stamping.
    pub async fn select_key_id(
        &self,
        key_session_id: i32,
        key_id: Bytes,
    ) -> Result<(), IpcError> {
        if self.tracks_key_ids {
            self.key_id_map.update_key(key_session_id, key_id.clone());
        }
        self.unit_call(
            pb::methods::SELECT_KEY_ID,
            &pb::SelectKeyIdRequest { media_keys_handle: self.handle, key_session_id, key_id },
        )
        .await
    }

    pub async fn close_key_session(&self, key_session_id: i32) -> Result<(), IpcError> {
        if self.tracks_key_ids {
            self.key_id_map.erase(key_session_id);
        }
        self.unit_call(
            pb::methods::CLOSE_KEY_SESSION,
            &pb::CloseKeySessionRequest { media_keys_handle: self.handle, key_session_id },
        )
        .await
    }

    pub async fn remove_key_session(&self, key_session_id: i32) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::REMOVE_KEY_SESSION,
            &pb::RemoveKeySessionRequest { media_keys_handle: self.handle, key_session_id },
        )
        .await
    }

    pub async fn contains_key(&self, key_session_id: i32, key_id: Bytes) -> Result<bool, IpcError> {
        let response: pb::ContainsKeyResponse = call(
            self.channel.as_ref(),
            pb::methods::CONTAINS_KEY,
            &pb::ContainsKeyRequest { media_keys_handle: self.handle, key_session_id, key_id },
        )
        .await?;
        Ok(response.contains_key)
    }

    pub async fn set_drm_header(
        &self,
        key_session_id: i32,
        request_data: Bytes,
    ) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_DRM_HEADER,
            &pb::SetDrmHeaderRequest { media_keys_handle: self.handle, key_session_id, request_data },
        )
        .await
    }

    pub async fn get_drm_store_hash(&self) -> Result<Bytes, IpcError> {
        let response: pb::GetDrmStoreHashResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_DRM_STORE_HASH,
            &pb::GetDrmStoreHashRequest { media_keys_handle: self.handle },
        )
        .await?;
        Ok(response.hash)
    }

    pub async fn get_key_store_hash(&self) -> Result<Bytes, IpcError> {
        let response: pb::GetKeyStoreHashResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_KEY_STORE_HASH,
            &pb::GetKeyStoreHashRequest { media_keys_handle: self.handle },
        )
        .await?;
        Ok(response.hash)
    }

    pub async fn get_ldl_sessions_limit(&self) -> Result<u32, IpcError> {
        let response: pb::GetLdlSessionsLimitResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_LDL_SESSIONS_LIMIT,
            &pb::GetLdlSessionsLimitRequest { media_keys_handle: self.handle },
        )
        .await?;
        Ok(response.ldl_limit)
    }

    pub async fn get_last_drm_error(&self, key_session_id: i32) -> Result<u32, IpcError> {
        let response: pb::GetLastDrmErrorResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_LAST_DRM_ERROR,
            &pb::GetLastDrmErrorRequest { media_keys_handle: self.handle, key_session_id },
        )
        .await?;
        Ok(response.error_code)
    }

    pub async fn get_drm_time(&self) -> Result<u64, IpcError> {
        let response: pb::GetDrmTimeResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_DRM_TIME,
            &pb::GetDrmTimeRequest { media_keys_handle: self.handle },
        )
        .await?;
        Ok(response.drm_time)
    }

    pub async fn get_cdm_key_session_id(&self, key_session_id: i32) -> Result<String, IpcError> {
        let response: pb::GetCdmKeySessionIdResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_CDM_KEY_SESSION_ID,
            &pb::GetCdmKeySessionIdRequest { media_keys_handle: self.handle, key_session_id },
        )
        .await?;
        Ok(response.cdm_key_session_id)
    }

    async fn unit_call<Req: prost::Message>(
        &self,
        method: &str,
        request: &Req,
    ) -> Result<(), IpcError> {
        let _: bridgekit_proto::rpc::Empty =
            call(self.channel.as_ref(), method, request).await?;
        Ok(())
    }
}
