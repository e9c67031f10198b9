// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Client web-audio player.
//!
//! Thin wrapper over the web-audio module: reserve a write window, copy PCM
//! into the disclosed shared-memory ranges (main, then wrap), commit the
//! frame count. The server drains to the sink and retries backpressured
//! frames on its own timer.

use std::sync::{Arc, Mutex};

use bridgekit_core::types::PcmConfig;
use bridgekit_proto::rpc::IpcError;
use bridgekit_proto::webaudio as pb;
use bridgekit_shm::SharedMemoryArena;
use prost::Message;

use crate::connection::{call, RpcChannel};

/// Client handle to one server-side web-audio player.
pub struct WebAudioPlayer {
    channel: Arc<dyn RpcChannel>,
    handle: i32,
    pcm: PcmConfig,
    arena: Arc<Mutex<SharedMemoryArena>>,
}

impl WebAudioPlayer {
    /// Creates a player for a raw PCM mime type.
    pub async fn create(
        channel: Arc<dyn RpcChannel>,
        arena: Arc<Mutex<SharedMemoryArena>>,
        audio_mime_type: &str,
        priority: u32,
        pcm: PcmConfig,
    ) -> Result<Self, IpcError> {
        let response: pb::CreatePlayerResponse = call(
            channel.as_ref(),
            pb::methods::CREATE_PLAYER,
            &pb::CreatePlayerRequest {
                audio_mime_type: audio_mime_type.to_string(),
                priority,
                pcm: Some(pb::PcmConfig {
                    rate: pcm.rate,
                    channels: pcm.channels,
                    sample_size: pcm.sample_size,
                    is_big_endian: pcm.is_big_endian,
                    is_signed: pcm.is_signed,
                    is_float: pcm.is_float,
                }),
            },
        )
        .await?;
        tracing::info!(handle = response.handle, "created web-audio player");
        Ok(Self { channel, handle: response.handle, pcm, arena })
    }

    pub const fn handle(&self) -> i32 {
        self.handle
    }

    pub async fn play(&self) -> Result<(), IpcError> {
        self.unit_call(pb::methods::PLAY, &pb::PlayRequest { handle: self.handle }).await
    }

    pub async fn pause(&self) -> Result<(), IpcError> {
        self.unit_call(pb::methods::PAUSE, &pb::PauseRequest { handle: self.handle }).await
    }

    pub async fn set_eos(&self) -> Result<(), IpcError> {
        self.unit_call(pb::methods::SET_EOS, &pb::SetEosRequest { handle: self.handle }).await
    }

    pub async fn get_device_info(&self) -> Result<pb::GetDeviceInfoResponse, IpcError> {
        call(
            self.channel.as_ref(),
            pb::methods::GET_DEVICE_INFO,
            &pb::GetDeviceInfoRequest { handle: self.handle },
        )
        .await
    }

    pub async fn get_buffer_delay(&self) -> Result<u32, IpcError> {
        let response: pb::GetBufferDelayResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_BUFFER_DELAY,
            &pb::GetBufferDelayRequest { handle: self.handle },
        )
        .await?;
        Ok(response.delay_frames)
    }

    pub async fn set_volume(&self, volume: f64) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_VOLUME,
            &pb::SetVolumeRequest { handle: self.handle, volume },
        )
        .await
    }

    pub async fn get_volume(&self) -> Result<f64, IpcError> {
        let response: pb::GetVolumeResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_VOLUME,
            &pb::GetVolumeRequest { handle: self.handle },
        )
        .await?;
        Ok(response.volume)
    }

    /// Reserves the current free window.
    pub async fn get_buffer_available(
        &self,
    ) -> Result<(u32, pb::WebAudioShmInfo), IpcError> {
        let response: pb::GetBufferAvailableResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_BUFFER_AVAILABLE,
            &pb::GetBufferAvailableRequest { handle: self.handle },
        )
        .await?;
        let shm = response
            .shm_info
            .ok_or_else(|| IpcError::Malformed("buffer window without shm info".to_string()))?;
        Ok((response.available_frames, shm))
    }

    /// Commits `frames` of the reserved window.
    pub async fn write_buffer(&self, frames: u32) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::WRITE_BUFFER,
            &pb::WriteBufferRequest { handle: self.handle, number_of_frames: frames },
        )
        .await
    }

    /// Convenience write path: reserves a window, copies as much of `data`
    /// as fits (frame-aligned, main range then wrap range), commits it, and
    /// returns the number of frames written.
    pub async fn write_frames(&self, data: &[u8]) -> Result<u32, IpcError> {
        let bytes_per_frame = self.pcm.bytes_per_frame().max(1) as usize;
        let (available_frames, window) = self.get_buffer_available().await?;

        let writable_frames = (data.len() / bytes_per_frame).min(available_frames as usize);
        let mut remaining = &data[..writable_frames * bytes_per_frame];
        {
            let mut arena = self.arena.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let buf = arena.as_mut_slice();
            for (offset, len) in [
                (window.offset_main as usize, window.length_main as usize),
                (window.offset_wrap as usize, window.length_wrap as usize),
            ] {
                if remaining.is_empty() {
                    break;
                }
                let n = remaining.len().min(len);
                buf[offset..offset + n].copy_from_slice(&remaining[..n]);
                remaining = &remaining[n..];
            }
        }
        let frames = writable_frames as u32;
        if frames > 0 {
            self.write_buffer(frames).await?;
        }
        Ok(frames)
    }

    pub async fn destroy(&self) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::DESTROY_PLAYER,
            &pb::DestroyPlayerRequest { handle: self.handle },
        )
        .await
    }

    async fn unit_call<Req: Message>(&self, method: &str, request: &Req) -> Result<(), IpcError> {
        let _: bridgekit_proto::rpc::Empty =
            call(self.channel.as_ref(), method, request).await?;
        Ok(())
    }
}
