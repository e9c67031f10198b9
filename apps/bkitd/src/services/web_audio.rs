// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Web-audio module service: player lifecycle and the buffer-window
//! protocol, bridged onto the web-audio ring actor.

use std::sync::Arc;

use bridgekit_core::types::PcmConfig;
use bridgekit_engine::{BoundedSink, WebAudioPlayerActor};
use bridgekit_proto::webaudio as pb;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::services::{decode, empty, encode, ClientResources, EventSender, ServiceResult};
use crate::state::{ServerState, WebAudioEntry};

pub async fn handle(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    events: &EventSender,
    method: &str,
    body: &Bytes,
) -> ServiceResult {
    match method {
        pb::methods::CREATE_PLAYER => create_player(state, resources, events, body),
        pb::methods::DESTROY_PLAYER => {
            let request: pb::DestroyPlayerRequest = decode(body)?;
            let entry = state
                .web_audio
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .remove(request.handle)
                .ok_or_else(|| format!("web-audio player {} not found", request.handle))?;
            resources.web_audio_players.retain(|h| *h != request.handle);
            entry.handle.shutdown_and_wait().await.map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::PLAY => {
            let request: pb::PlayRequest = decode(body)?;
            player_of(state, request.handle)?.play().await.map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::PAUSE => {
            let request: pb::PauseRequest = decode(body)?;
            player_of(state, request.handle)?.pause().await.map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::SET_EOS => {
            let request: pb::SetEosRequest = decode(body)?;
            player_of(state, request.handle)?.set_eos().await.map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::GET_BUFFER_AVAILABLE => {
            let request: pb::GetBufferAvailableRequest = decode(body)?;
            let (available_frames, shm_info) = player_of(state, request.handle)?
                .get_buffer_available()
                .await
                .map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetBufferAvailableResponse {
                available_frames,
                shm_info: Some(shm_info),
            }))
        }
        pb::methods::GET_BUFFER_DELAY => {
            let request: pb::GetBufferDelayRequest = decode(body)?;
            let delay_frames = player_of(state, request.handle)?
                .get_buffer_delay()
                .await
                .map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetBufferDelayResponse { delay_frames }))
        }
        pb::methods::WRITE_BUFFER => {
            let request: pb::WriteBufferRequest = decode(body)?;
            player_of(state, request.handle)?
                .write_buffer(request.number_of_frames)
                .await
                .map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::GET_DEVICE_INFO => {
            let request: pb::GetDeviceInfoRequest = decode(body)?;
            let info = player_of(state, request.handle)?
                .get_device_info()
                .await
                .map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetDeviceInfoResponse {
                preferred_frames: info.preferred_frames,
                maximum_frames: info.maximum_frames,
                support_deferred_play: info.support_deferred_play,
            }))
        }
        pb::methods::SET_VOLUME => {
            let request: pb::SetVolumeRequest = decode(body)?;
            player_of(state, request.handle)?
                .set_volume(request.volume)
                .await
                .map_err(|e| e.to_string())?;
            Ok(empty())
        }
        pb::methods::GET_VOLUME => {
            let request: pb::GetVolumeRequest = decode(body)?;
            let volume =
                player_of(state, request.handle)?.get_volume().await.map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetVolumeResponse { volume }))
        }
        _ => Err(format!("unknown method {method}")),
    }
}

fn create_player(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    events: &EventSender,
    body: &Bytes,
) -> ServiceResult {
    let request: pb::CreatePlayerRequest = decode(body)?;
    let pcm = request.pcm.map_or_else(PcmConfig::default, |pcm| PcmConfig {
        rate: pcm.rate,
        channels: pcm.channels,
        sample_size: pcm.sample_size,
        is_big_endian: pcm.is_big_endian,
        is_signed: pcm.is_signed,
        is_float: pcm.is_float,
    });

    let (handle_id, slot) = state
        .web_audio
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .allocate()
        .map_err(|e| e.to_string())?;
    let Some(region) = state.layout.web_audio_region(slot) else {
        state
            .web_audio
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .release_slot(slot);
        return Err("arena has no web-audio region for the allocated slot".to_string());
    };

    // Device sink seam: the software sink accepts everything; a platform
    // build swaps in the hardware-backed implementation.
    let sink = Box::new(BoundedSink::new(usize::MAX));
    let (state_tx, mut state_rx) = mpsc::unbounded_channel();
    let handle = WebAudioPlayerActor::spawn(
        handle_id,
        region,
        &pcm,
        sink,
        state.arena.clone(),
        state_tx,
    );
    let events = events.clone();
    tokio::spawn(async move {
        while let Some(player_state) = state_rx.recv().await {
            let event = pb::PlayerStateEvent {
                handle: handle_id,
                state: player_state_to_wire(player_state) as i32,
            };
            if events
                .send(bridgekit_proto::rpc::Frame::event(pb::events::PLAYER_STATE, &event))
                .is_err()
            {
                break;
            }
        }
    });

    state
        .web_audio
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .insert(handle_id, WebAudioEntry { handle, slot });
    resources.web_audio_players.push(handle_id);
    tracing::info!(
        handle = handle_id,
        slot,
        mime_type = %request.audio_mime_type,
        "created web-audio player"
    );
    Ok(encode(&pb::CreatePlayerResponse { handle: handle_id }))
}

fn player_state_to_wire(state: bridgekit_engine::WebAudioState) -> pb::WebAudioPlayerState {
    use bridgekit_engine::WebAudioState as S;
    match state {
        S::Idle => pb::WebAudioPlayerState::Idle,
        S::Playing => pb::WebAudioPlayerState::Playing,
        S::Paused => pb::WebAudioPlayerState::Paused,
        S::EndOfStream => pb::WebAudioPlayerState::EndOfStream,
        S::Failure => pb::WebAudioPlayerState::Failure,
    }
}

fn player_of(
    state: &Arc<ServerState>,
    handle: i32,
) -> Result<bridgekit_engine::WebAudioHandle, String> {
    state
        .web_audio
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(handle)
        .map_err(|e| e.to_string())
}
