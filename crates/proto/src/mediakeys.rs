// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Media-keys module messages: CDM key-session CRUD and the DRM store
//! queries. License blobs are opaque; the broker forwards them untouched.

use bytes::Bytes;

/// Method names exported by the media-keys module service.
pub mod methods {
    pub const CREATE_MEDIA_KEYS: &str = "mediakeys.create_media_keys";
    pub const DESTROY_MEDIA_KEYS: &str = "mediakeys.destroy_media_keys";
    pub const CREATE_KEY_SESSION: &str = "mediakeys.create_key_session";
    pub const GENERATE_REQUEST: &str = "mediakeys.generate_request";
    pub const LOAD_SESSION: &str = "mediakeys.load_session";
    pub const UPDATE_SESSION: &str = "mediakeys.update_session";
    pub const CLOSE_KEY_SESSION: &str = "mediakeys.close_key_session";
    pub const REMOVE_KEY_SESSION: &str = "mediakeys.remove_key_session";
    pub const RELEASE_KEY_SESSION: &str = "mediakeys.release_key_session";
    pub const CONTAINS_KEY: &str = "mediakeys.contains_key";
    pub const SELECT_KEY_ID: &str = "mediakeys.select_key_id";
    pub const SET_DRM_HEADER: &str = "mediakeys.set_drm_header";
    pub const DELETE_DRM_STORE: &str = "mediakeys.delete_drm_store";
    pub const DELETE_KEY_STORE: &str = "mediakeys.delete_key_store";
    pub const GET_DRM_STORE_HASH: &str = "mediakeys.get_drm_store_hash";
    pub const GET_KEY_STORE_HASH: &str = "mediakeys.get_key_store_hash";
    pub const GET_LDL_SESSIONS_LIMIT: &str = "mediakeys.get_ldl_sessions_limit";
    pub const GET_LAST_DRM_ERROR: &str = "mediakeys.get_last_drm_error";
    pub const GET_DRM_TIME: &str = "mediakeys.get_drm_time";
    pub const GET_CDM_KEY_SESSION_ID: &str = "mediakeys.get_cdm_key_session_id";
    pub const GET_SUPPORTED_KEY_SYSTEMS: &str = "mediakeys.get_supported_key_systems";
    pub const SUPPORTS_KEY_SYSTEM: &str = "mediakeys.supports_key_system";
    pub const GET_SUPPORTED_KEY_SYSTEM_VERSION: &str = "mediakeys.get_supported_key_system_version";
    pub const IS_SERVER_CERTIFICATE_SUPPORTED: &str = "mediakeys.is_server_certificate_supported";
}

/// Event names emitted by the media-keys module service.
pub mod events {
    pub const LICENSE_REQUEST: &str = "mediakeys.license_request";
    pub const LICENSE_RENEWAL: &str = "mediakeys.license_renewal";
    pub const KEY_STATUSES_CHANGED: &str = "mediakeys.key_statuses_changed";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeySessionType {
    UnknownSessionType = 0,
    Temporary = 1,
    PersistentLicense = 2,
    PersistentReleaseMessage = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum InitDataType {
    UnknownDataType = 0,
    Cenc = 1,
    KeyIds = 2,
    WebM = 3,
    Drmheader = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum KeyStatus {
    Usable = 0,
    Expired = 1,
    OutputRestricted = 2,
    Pending = 3,
    InternalError = 4,
    Released = 5,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateMediaKeysRequest {
    #[prost(string, tag = "1")]
    pub key_system: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreateMediaKeysResponse {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DestroyMediaKeysRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreateKeySessionRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(enumeration = "KeySessionType", tag = "2")]
    pub session_type: i32,
    #[prost(bool, tag = "3")]
    pub is_ldl: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreateKeySessionResponse {
    #[prost(int32, tag = "1")]
    pub key_session_id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GenerateRequestRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    #[prost(enumeration = "InitDataType", tag = "3")]
    pub init_data_type: i32,
    #[prost(bytes = "bytes", tag = "4")]
    pub init_data: Bytes,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct LoadSessionRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateSessionRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    /// Opaque license response blob.
    #[prost(bytes = "bytes", tag = "3")]
    pub response_data: Bytes,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CloseKeySessionRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RemoveKeySessionRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ReleaseKeySessionRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ContainsKeyRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    #[prost(bytes = "bytes", tag = "3")]
    pub key_id: Bytes,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ContainsKeyResponse {
    #[prost(bool, tag = "1")]
    pub contains_key: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SelectKeyIdRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    #[prost(bytes = "bytes", tag = "3")]
    pub key_id: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SetDrmHeaderRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    #[prost(bytes = "bytes", tag = "3")]
    pub request_data: Bytes,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DeleteDrmStoreRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DeleteKeyStoreRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetDrmStoreHashRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetDrmStoreHashResponse {
    #[prost(bytes = "bytes", tag = "1")]
    pub hash: Bytes,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetKeyStoreHashRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetKeyStoreHashResponse {
    #[prost(bytes = "bytes", tag = "1")]
    pub hash: Bytes,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetLdlSessionsLimitRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetLdlSessionsLimitResponse {
    #[prost(uint32, tag = "1")]
    pub ldl_limit: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetLastDrmErrorRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetLastDrmErrorResponse {
    #[prost(uint32, tag = "1")]
    pub error_code: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetDrmTimeRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetDrmTimeResponse {
    #[prost(uint64, tag = "1")]
    pub drm_time: u64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetCdmKeySessionIdRequest {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetCdmKeySessionIdResponse {
    #[prost(string, tag = "1")]
    pub cdm_key_session_id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LicenseRequestEvent {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    #[prost(bytes = "bytes", tag = "3")]
    pub request_data: Bytes,
    #[prost(string, tag = "4")]
    pub url: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LicenseRenewalEvent {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    #[prost(bytes = "bytes", tag = "3")]
    pub renewal_data: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyStatusPair {
    #[prost(bytes = "bytes", tag = "1")]
    pub key_id: Bytes,
    #[prost(enumeration = "KeyStatus", tag = "2")]
    pub status: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetSupportedKeySystemsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSupportedKeySystemsResponse {
    #[prost(string, repeated, tag = "1")]
    pub key_systems: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SupportsKeySystemRequest {
    #[prost(string, tag = "1")]
    pub key_system: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SupportsKeySystemResponse {
    #[prost(bool, tag = "1")]
    pub is_supported: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSupportedKeySystemVersionRequest {
    #[prost(string, tag = "1")]
    pub key_system: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSupportedKeySystemVersionResponse {
    #[prost(string, tag = "1")]
    pub version: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IsServerCertificateSupportedRequest {
    #[prost(string, tag = "1")]
    pub key_system: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct IsServerCertificateSupportedResponse {
    #[prost(bool, tag = "1")]
    pub is_supported: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyStatusesChangedEvent {
    #[prost(int32, tag = "1")]
    pub media_keys_handle: i32,
    #[prost(int32, tag = "2")]
    pub key_session_id: i32,
    #[prost(message, repeated, tag = "3")]
    pub key_statuses: Vec<KeyStatusPair>,
}
