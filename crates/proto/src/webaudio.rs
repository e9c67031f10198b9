// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Web-audio module messages: low-latency PCM playback over a dedicated
//! shared-memory ring with a reserve-then-commit write-window protocol.

/// Method names exported by the web-audio module service.
pub mod methods {
    pub const CREATE_PLAYER: &str = "webaudio.create_player";
    pub const DESTROY_PLAYER: &str = "webaudio.destroy_player";
    pub const PLAY: &str = "webaudio.play";
    pub const PAUSE: &str = "webaudio.pause";
    pub const SET_EOS: &str = "webaudio.set_eos";
    pub const GET_BUFFER_AVAILABLE: &str = "webaudio.get_buffer_available";
    pub const GET_BUFFER_DELAY: &str = "webaudio.get_buffer_delay";
    pub const WRITE_BUFFER: &str = "webaudio.write_buffer";
    pub const GET_DEVICE_INFO: &str = "webaudio.get_device_info";
    pub const SET_VOLUME: &str = "webaudio.set_volume";
    pub const GET_VOLUME: &str = "webaudio.get_volume";
}

/// Event names emitted by the web-audio module service.
pub mod events {
    pub const PLAYER_STATE: &str = "webaudio.player_state";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum WebAudioPlayerState {
    UnknownState = 0,
    Idle = 1,
    Playing = 2,
    Paused = 3,
    EndOfStream = 4,
    Failure = 5,
}

/// Raw PCM description for `audio/x-raw` players.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PcmConfig {
    #[prost(uint32, tag = "1")]
    pub rate: u32,
    #[prost(uint32, tag = "2")]
    pub channels: u32,
    #[prost(uint32, tag = "3")]
    pub sample_size: u32,
    #[prost(bool, tag = "4")]
    pub is_big_endian: bool,
    #[prost(bool, tag = "5")]
    pub is_signed: bool,
    #[prost(bool, tag = "6")]
    pub is_float: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreatePlayerRequest {
    #[prost(string, tag = "1")]
    pub audio_mime_type: String,
    #[prost(uint32, tag = "2")]
    pub priority: u32,
    #[prost(message, optional, tag = "3")]
    pub pcm: Option<PcmConfig>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CreatePlayerResponse {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct DestroyPlayerRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PlayRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PauseRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetEosRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

/// A reserved write window in the ring, frame-aligned byte ranges. The wrap
/// segment is used when the free space crosses the end of the region.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct WebAudioShmInfo {
    #[prost(uint32, tag = "1")]
    pub offset_main: u32,
    #[prost(uint32, tag = "2")]
    pub length_main: u32,
    #[prost(uint32, tag = "3")]
    pub offset_wrap: u32,
    #[prost(uint32, tag = "4")]
    pub length_wrap: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetBufferAvailableRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetBufferAvailableResponse {
    #[prost(uint32, tag = "1")]
    pub available_frames: u32,
    #[prost(message, optional, tag = "2")]
    pub shm_info: Option<WebAudioShmInfo>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetBufferDelayRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetBufferDelayResponse {
    /// Frames queued ahead of the sink, including stored frames.
    #[prost(uint32, tag = "1")]
    pub delay_frames: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct WriteBufferRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
    #[prost(uint32, tag = "2")]
    pub number_of_frames: u32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetDeviceInfoRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetDeviceInfoResponse {
    #[prost(uint32, tag = "1")]
    pub preferred_frames: u32,
    #[prost(uint32, tag = "2")]
    pub maximum_frames: u32,
    #[prost(bool, tag = "3")]
    pub support_deferred_play: bool,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SetVolumeRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
    #[prost(double, tag = "2")]
    pub volume: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetVolumeRequest {
    #[prost(int32, tag = "1")]
    pub handle: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GetVolumeResponse {
    #[prost(double, tag = "1")]
    pub volume: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PlayerStateEvent {
    #[prost(int32, tag = "1")]
    pub handle: i32,
    #[prost(enumeration = "WebAudioPlayerState", tag = "2")]
    pub state: i32,
}
