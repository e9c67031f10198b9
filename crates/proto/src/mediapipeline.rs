// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Media-pipeline module messages: session lifecycle, source management,
//! playback control, the need-data/have-data ticket flow and the event set
//! the server pushes back.

use bytes::Bytes;

/// Method names exported by the media-pipeline module service.
pub mod methods {
    pub const CREATE_SESSION: &str = "mediapipeline.create_session";
    pub const DESTROY_SESSION: &str = "mediapipeline.destroy_session";
    pub const LOAD: &str = "mediapipeline.load";
    pub const ATTACH_SOURCE: &str = "mediapipeline.attach_source";
    pub const REMOVE_SOURCE: &str = "mediapipeline.remove_source";
    pub const ALL_SOURCES_ATTACHED: &str = "mediapipeline.all_sources_attached";
    pub const PLAY: &str = "mediapipeline.play";
    pub const PAUSE: &str = "mediapipeline.pause";
    pub const STOP: &str = "mediapipeline.stop";
    pub const SET_POSITION: &str = "mediapipeline.set_position";
    pub const GET_POSITION: &str = "mediapipeline.get_position";
    pub const SET_PLAYBACK_RATE: &str = "mediapipeline.set_playback_rate";
    pub const SET_VIDEO_WINDOW: &str = "mediapipeline.set_video_window";
    pub const SET_VOLUME: &str = "mediapipeline.set_volume";
    pub const GET_VOLUME: &str = "mediapipeline.get_volume";
    pub const SET_MUTE: &str = "mediapipeline.set_mute";
    pub const SET_IMMEDIATE_OUTPUT: &str = "mediapipeline.set_immediate_output";
    pub const RENDER_FRAME: &str = "mediapipeline.render_frame";
    pub const FLUSH: &str = "mediapipeline.flush";
    pub const SET_SOURCE_POSITION: &str = "mediapipeline.set_source_position";
    pub const HAVE_DATA: &str = "mediapipeline.have_data";
    pub const GET_SUPPORTED_MIME_TYPES: &str = "mediapipeline.get_supported_mime_types";
    pub const IS_MIME_TYPE_SUPPORTED: &str = "mediapipeline.is_mime_type_supported";
}

/// Event names emitted by the media-pipeline module service.
pub mod events {
    pub const NEED_MEDIA_DATA: &str = "mediapipeline.need_media_data";
    pub const PLAYBACK_STATE: &str = "mediapipeline.playback_state";
    pub const NETWORK_STATE: &str = "mediapipeline.network_state";
    pub const POSITION: &str = "mediapipeline.position";
    pub const QOS: &str = "mediapipeline.qos";
    pub const SOURCE_FLUSHED: &str = "mediapipeline.source_flushed";
    pub const BUFFERING_PROGRESS: &str = "mediapipeline.buffering_progress";
    pub const EOS_NOTIFICATION: &str = "mediapipeline.eos_notification";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum MediaSourceType {
    UnknownSource = 0,
    Audio = 1,
    Video = 2,
    Text = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PlaybackState {
    UnknownState = 0,
    Idle = 1,
    Buffering = 2,
    Playing = 3,
    Paused = 4,
    Seeking = 5,
    SeekDone = 6,
    Stopped = 7,
    EndOfStream = 8,
    Failure = 9,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NetworkState {
    UnknownNetworkState = 0,
    NetworkIdle = 1,
    NetworkBuffering = 2,
    Buffered = 3,
    FetchError = 4,
    DecodeError = 5,
}

/// Status finalising a need-data ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum HaveDataStatus {
    HaveDataOk = 0,
    HaveDataEos = 1,
    HaveDataError = 2,
    HaveDataNoAvailableSamples = 3,
}

/// Shared-memory sub-range snapshot republished with every ticket.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ShmInfo {
    #[prost(uint32, tag = "1")]
    pub metadata_offset: u32,
    #[prost(uint32, tag = "2")]
    pub max_metadata_bytes: u32,
    #[prost(uint32, tag = "3")]
    pub media_data_offset: u32,
    #[prost(uint32, tag = "4")]
    pub max_media_bytes: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreateSessionRequest {
    #[prost(uint32, tag = "1")]
    pub max_width: u32,
    #[prost(uint32, tag = "2")]
    pub max_height: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreateSessionResponse {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DestroySessionRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LoadRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    /// Pipeline flavour, currently always MSE.
    #[prost(string, tag = "2")]
    pub media_type: String,
    #[prost(string, tag = "3")]
    pub mime_type: String,
    #[prost(string, tag = "4")]
    pub url: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AudioConfig {
    #[prost(uint32, tag = "1")]
    pub sample_rate: u32,
    #[prost(uint32, tag = "2")]
    pub channels: u32,
    #[prost(uint32, optional, tag = "3")]
    pub sample_size: Option<u32>,
    #[prost(bool, optional, tag = "4")]
    pub is_big_endian: Option<bool>,
    #[prost(bool, optional, tag = "5")]
    pub is_signed: Option<bool>,
    #[prost(bool, optional, tag = "6")]
    pub is_float: Option<bool>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct VideoConfig {
    #[prost(uint32, tag = "1")]
    pub width: u32,
    #[prost(uint32, tag = "2")]
    pub height: u32,
    #[prost(double, optional, tag = "3")]
    pub frame_rate: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttachSourceRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(enumeration = "MediaSourceType", tag = "2")]
    pub source_type: i32,
    #[prost(string, tag = "3")]
    pub mime_type: String,
    #[prost(bool, tag = "4")]
    pub has_drm: bool,
    #[prost(message, optional, tag = "5")]
    pub audio_config: Option<AudioConfig>,
    #[prost(message, optional, tag = "6")]
    pub video_config: Option<VideoConfig>,
    /// Caption format for text sources ("webvtt", "ttml", "cc").
    #[prost(string, optional, tag = "7")]
    pub text_format: Option<String>,
    #[prost(bytes = "bytes", optional, tag = "8")]
    pub codec_data: Option<Bytes>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AttachSourceResponse {
    #[prost(int32, tag = "1")]
    pub source_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RemoveSourceRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AllSourcesAttachedRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PlayRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PauseRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct StopRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetPositionRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    /// Target position in nanoseconds.
    #[prost(int64, tag = "2")]
    pub position: i64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetPositionRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetPositionResponse {
    #[prost(int64, tag = "1")]
    pub position: i64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetPlaybackRateRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(double, tag = "2")]
    pub rate: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetVideoWindowRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub x: i32,
    #[prost(int32, tag = "3")]
    pub y: i32,
    #[prost(uint32, tag = "4")]
    pub width: u32,
    #[prost(uint32, tag = "5")]
    pub height: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetVolumeRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(double, tag = "2")]
    pub volume: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetVolumeRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetVolumeResponse {
    #[prost(double, tag = "1")]
    pub volume: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetMuteRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, optional, tag = "2")]
    pub source_id: Option<i32>,
    #[prost(bool, tag = "3")]
    pub mute: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetImmediateOutputRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
    #[prost(bool, tag = "3")]
    pub immediate_output: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RenderFrameRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct FlushRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
    #[prost(bool, tag = "3")]
    pub reset_time: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetSourcePositionRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
    #[prost(int64, tag = "3")]
    pub position: i64,
    #[prost(bool, tag = "4")]
    pub reset_time: bool,
    #[prost(double, tag = "5")]
    pub applied_rate: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct HaveDataRequest {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(enumeration = "HaveDataStatus", tag = "2")]
    pub status: i32,
    /// Segments written against the ticket.
    #[prost(uint32, tag = "3")]
    pub num_frames: u32,
    #[prost(uint32, tag = "4")]
    pub request_id: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct NeedMediaDataEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
    #[prost(uint32, tag = "3")]
    pub request_id: u32,
    /// Upper bound on segments the ticket authorises.
    #[prost(uint32, tag = "4")]
    pub frame_count: u32,
    #[prost(message, optional, tag = "5")]
    pub shm_info: Option<ShmInfo>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PlaybackStateChangeEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(enumeration = "PlaybackState", tag = "2")]
    pub state: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct NetworkStateChangeEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(enumeration = "NetworkState", tag = "2")]
    pub state: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PositionChangeEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int64, tag = "2")]
    pub position: i64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct QosEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
    #[prost(uint64, tag = "3")]
    pub processed: u64,
    #[prost(uint64, tag = "4")]
    pub dropped: u64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SourceFlushedEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct BufferingProgressEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(uint32, tag = "2")]
    pub percent: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct EosNotificationEvent {
    #[prost(int32, tag = "1")]
    pub session_id: i32,
    #[prost(int32, tag = "2")]
    pub source_id: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetSupportedMimeTypesRequest {
    #[prost(enumeration = "MediaSourceType", tag = "1")]
    pub source_type: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetSupportedMimeTypesResponse {
    #[prost(string, repeated, tag = "1")]
    pub mime_types: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct IsMimeTypeSupportedRequest {
    #[prost(string, tag = "1")]
    pub mime_type: String,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct IsMimeTypeSupportedResponse {
    #[prost(bool, tag = "1")]
    pub is_supported: bool,
}
