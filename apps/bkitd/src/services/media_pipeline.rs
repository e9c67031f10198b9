// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Media-pipeline module service: session lifecycle, playback control and
//! the ticket flow, bridged onto the session's player actor. Also answers
//! the pipeline-capabilities queries.

use std::sync::Arc;
use std::time::SystemTime;

use bridgekit_core::types::{
    MediaSourceStatus, SourceConfig, TextTrackFormat, VideoGeometry,
};
use bridgekit_engine::pipeline::{bus_channel, sim::SimPipeline};
use bridgekit_engine::{PlayerActor, PlayerEvent, PlayerTask, SourceSpec, TaskOutcome};
use bridgekit_proto::mediapipeline as pb;
use bridgekit_proto::rpc::Frame;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::services::{decode, empty, encode, ClientResources, EventSender, ServiceResult};
use crate::session::SessionEntry;
use crate::state::ServerState;

/// Container formats the pipeline backend can demux, per source type.
const AUDIO_MIME_TYPES: &[&str] =
    &["audio/mp4", "audio/aac", "audio/x-eac3", "audio/x-opus", "audio/b-wav"];
const VIDEO_MIME_TYPES: &[&str] =
    &["video/mp4", "video/h264", "video/h265", "video/x-av1", "video/x-vp9"];
const TEXT_MIME_TYPES: &[&str] = &["text/vtt", "text/ttml"];

pub async fn handle(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    events: &EventSender,
    method: &str,
    body: &Bytes,
) -> ServiceResult {
    match method {
        pb::methods::CREATE_SESSION => create_session(state, resources, events, body),
        pb::methods::DESTROY_SESSION => destroy_session(state, resources, body).await,
        pb::methods::GET_SUPPORTED_MIME_TYPES => {
            let request: pb::GetSupportedMimeTypesRequest = decode(body)?;
            let mime_types = match pb::MediaSourceType::try_from(request.source_type) {
                Ok(pb::MediaSourceType::Audio) => AUDIO_MIME_TYPES,
                Ok(pb::MediaSourceType::Video) => VIDEO_MIME_TYPES,
                Ok(pb::MediaSourceType::Text) => TEXT_MIME_TYPES,
                _ => &[],
            };
            Ok(encode(&pb::GetSupportedMimeTypesResponse {
                mime_types: mime_types.iter().map(ToString::to_string).collect(),
            }))
        }
        pb::methods::IS_MIME_TYPE_SUPPORTED => {
            let request: pb::IsMimeTypeSupportedRequest = decode(body)?;
            let is_supported = AUDIO_MIME_TYPES
                .iter()
                .chain(VIDEO_MIME_TYPES)
                .chain(TEXT_MIME_TYPES)
                .any(|m| *m == request.mime_type);
            Ok(encode(&pb::IsMimeTypeSupportedResponse { is_supported }))
        }
        _ => session_scoped(state, method, body).await,
    }
}

fn create_session(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    events: &EventSender,
    body: &Bytes,
) -> ServiceResult {
    let _request: pb::CreateSessionRequest = decode(body)?;
    let (session_id, slot) = state
        .sessions
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .allocate()
        .map_err(|e| e.to_string())?;
    use bridgekit_core::types::MediaType;
    let (Some(audio), Some(video), Some(text)) = (
        state.layout.partition(slot, MediaType::Audio),
        state.layout.partition(slot, MediaType::Video),
        state.layout.partition(slot, MediaType::Text),
    ) else {
        state
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .release_slot(slot);
        return Err("arena has no partitions for the allocated slot".to_string());
    };
    let partitions = bridgekit_shm::arena::SessionPartitions { audio, video, text };

    let (bus_tx, bus_rx) = bus_channel();
    let backend = Box::new(SimPipeline::new(bus_tx));
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let handle =
        PlayerActor::spawn(session_id, backend, bus_rx, state.arena.clone(), partitions, event_tx);

    spawn_event_forwarder(session_id, event_rx, events.clone());

    state.sessions.lock().unwrap_or_else(std::sync::PoisonError::into_inner).insert(
        session_id,
        SessionEntry { handle, slot, created_at: SystemTime::now() },
    );
    resources.sessions.push(session_id);
    if let Some(record) =
        state.profiler.record_with_info("create_session", session_id.to_string())
    {
        state.profiler.log(record);
    }
    tracing::info!(session_id, slot, "created media session");
    Ok(encode(&pb::CreateSessionResponse { session_id }))
}

async fn destroy_session(
    state: &Arc<ServerState>,
    resources: &mut ClientResources,
    body: &Bytes,
) -> ServiceResult {
    let request: pb::DestroySessionRequest = decode(body)?;
    let entry = state
        .sessions
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .remove(request.session_id)
        .ok_or_else(|| format!("session {} not found", request.session_id))?;
    resources.sessions.retain(|id| *id != request.session_id);
    entry.handle.shutdown_and_wait().await.map_err(|e| e.to_string())?;
    state.profiler.record_with_info("destroy_session", request.session_id.to_string());
    Ok(empty())
}

/// Translates the session's player events into wire events on the owning
/// connection.
fn spawn_event_forwarder(
    session_id: i32,
    mut event_rx: mpsc::UnboundedReceiver<PlayerEvent>,
    events: EventSender,
) {
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let frame = match event {
                PlayerEvent::NeedMediaData(ticket) => Frame::event(
                    pb::events::NEED_MEDIA_DATA,
                    &pb::NeedMediaDataEvent {
                        session_id,
                        source_id: ticket.source_id,
                        request_id: ticket.request_id,
                        frame_count: ticket.frame_count,
                        shm_info: Some(pb::ShmInfo {
                            metadata_offset: ticket.region.metadata_offset,
                            max_metadata_bytes: ticket.region.max_metadata_bytes,
                            media_data_offset: ticket.region.media_data_offset,
                            max_media_bytes: ticket.region.max_media_bytes,
                        }),
                    },
                ),
                PlayerEvent::PlaybackState(state) => Frame::event(
                    pb::events::PLAYBACK_STATE,
                    &pb::PlaybackStateChangeEvent {
                        session_id,
                        state: playback_state_to_wire(state) as i32,
                    },
                ),
                PlayerEvent::NetworkState(state) => Frame::event(
                    pb::events::NETWORK_STATE,
                    &pb::NetworkStateChangeEvent {
                        session_id,
                        state: network_state_to_wire(state) as i32,
                    },
                ),
                PlayerEvent::Position(position) => Frame::event(
                    pb::events::POSITION,
                    &pb::PositionChangeEvent { session_id, position },
                ),
                PlayerEvent::Qos { source_id, info } => Frame::event(
                    pb::events::QOS,
                    &pb::QosEvent {
                        session_id,
                        source_id,
                        processed: info.processed,
                        dropped: info.dropped,
                    },
                ),
                PlayerEvent::SourceFlushed { source_id } => Frame::event(
                    pb::events::SOURCE_FLUSHED,
                    &pb::SourceFlushedEvent { session_id, source_id },
                ),
                PlayerEvent::BufferingProgress { percent } => Frame::event(
                    pb::events::BUFFERING_PROGRESS,
                    &pb::BufferingProgressEvent { session_id, percent },
                ),
                PlayerEvent::EosNotification { source_id } => Frame::event(
                    pb::events::EOS_NOTIFICATION,
                    &pb::EosNotificationEvent { session_id, source_id },
                ),
            };
            if events.send(frame).is_err() {
                break;
            }
        }
        tracing::debug!(session_id, "event forwarding ended");
    });
}

async fn session_scoped(state: &Arc<ServerState>, method: &str, body: &Bytes) -> ServiceResult {
    match method {
        pb::methods::LOAD => {
            let request: pb::LoadRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::Load {
                mime_type: request.mime_type,
                url: request.url,
            })
            .await
        }
        pb::methods::ATTACH_SOURCE => {
            let request: pb::AttachSourceRequest = decode(body)?;
            let session_id = request.session_id;
            let spec = source_spec(request)?;
            let handle = handle_of(state, session_id)?;
            match handle.enqueue_and_wait(PlayerTask::AttachSource { spec }).await {
                Ok(TaskOutcome::SourceId(source_id)) => {
                    Ok(encode(&pb::AttachSourceResponse { source_id }))
                }
                Ok(_) => Err("attach did not yield a source id".to_string()),
                Err(e) => Err(e.to_string()),
            }
        }
        pb::methods::REMOVE_SOURCE => {
            let request: pb::RemoveSourceRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::RemoveSource {
                source_id: request.source_id,
            })
            .await
        }
        pb::methods::ALL_SOURCES_ATTACHED => {
            let request: pb::AllSourcesAttachedRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::AllSourcesAttached).await
        }
        pb::methods::PLAY => {
            let request: pb::PlayRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::Play).await
        }
        pb::methods::PAUSE => {
            let request: pb::PauseRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::Pause).await
        }
        pb::methods::STOP => {
            let request: pb::StopRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::Stop).await
        }
        pb::methods::SET_POSITION => {
            let request: pb::SetPositionRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::SetPosition {
                position: request.position,
            })
            .await
        }
        pb::methods::GET_POSITION => {
            let request: pb::GetPositionRequest = decode(body)?;
            let handle = handle_of(state, request.session_id)?;
            let position = handle.position().await.map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetPositionResponse { position }))
        }
        pb::methods::SET_PLAYBACK_RATE => {
            let request: pb::SetPlaybackRateRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::SetPlaybackRate {
                rate: request.rate,
            })
            .await
        }
        pb::methods::SET_VIDEO_WINDOW => {
            let request: pb::SetVideoWindowRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::SetVideoGeometry {
                geometry: VideoGeometry {
                    x: request.x,
                    y: request.y,
                    width: request.width,
                    height: request.height,
                },
            })
            .await
        }
        pb::methods::SET_VOLUME => {
            let request: pb::SetVolumeRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::SetVolume {
                volume: request.volume,
            })
            .await
        }
        pb::methods::GET_VOLUME => {
            let request: pb::GetVolumeRequest = decode(body)?;
            let handle = handle_of(state, request.session_id)?;
            let volume = handle.volume().await.map_err(|e| e.to_string())?;
            Ok(encode(&pb::GetVolumeResponse { volume }))
        }
        pb::methods::SET_MUTE => {
            let request: pb::SetMuteRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::SetMute {
                source_id: request.source_id,
                mute: request.mute,
            })
            .await
        }
        pb::methods::SET_IMMEDIATE_OUTPUT => {
            let request: pb::SetImmediateOutputRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::SetImmediateOutput {
                source_id: request.source_id,
                enabled: request.immediate_output,
            })
            .await
        }
        pb::methods::RENDER_FRAME => {
            let request: pb::RenderFrameRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::RenderFrame).await
        }
        pb::methods::FLUSH => {
            let request: pb::FlushRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::Flush {
                source_id: request.source_id,
                reset_time: request.reset_time,
            })
            .await
        }
        pb::methods::SET_SOURCE_POSITION => {
            let request: pb::SetSourcePositionRequest = decode(body)?;
            run_task(state, request.session_id, PlayerTask::SetSourcePosition {
                source_id: request.source_id,
                position: request.position,
                reset_time: request.reset_time,
            })
            .await
        }
        pb::methods::HAVE_DATA => {
            let request: pb::HaveDataRequest = decode(body)?;
            let status = match pb::HaveDataStatus::try_from(request.status) {
                Ok(pb::HaveDataStatus::HaveDataOk) => MediaSourceStatus::Ok,
                Ok(pb::HaveDataStatus::HaveDataEos) => MediaSourceStatus::Eos,
                Ok(pb::HaveDataStatus::HaveDataNoAvailableSamples) => {
                    MediaSourceStatus::NoAvailableSamples
                }
                _ => MediaSourceStatus::Error,
            };
            run_task(state, request.session_id, PlayerTask::ReadShmDataAndAttachSamples {
                request_id: request.request_id,
                num_frames: request.num_frames,
                status,
            })
            .await
        }
        _ => Err(format!("unknown method {method}")),
    }
}

fn handle_of(
    state: &Arc<ServerState>,
    session_id: i32,
) -> Result<bridgekit_engine::PlayerHandle, String> {
    state
        .sessions
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .handle(session_id)
        .map_err(|e| e.to_string())
}

async fn run_task(state: &Arc<ServerState>, session_id: i32, task: PlayerTask) -> ServiceResult {
    let handle = handle_of(state, session_id)?;
    handle.enqueue_and_wait(task).await.map_err(|e| e.to_string())?;
    Ok(empty())
}

fn source_spec(request: pb::AttachSourceRequest) -> Result<SourceSpec, String> {
    let config = match pb::MediaSourceType::try_from(request.source_type) {
        Ok(pb::MediaSourceType::Audio) => {
            let audio = request.audio_config.ok_or("audio source without audio config")?;
            SourceConfig::Audio {
                sample_rate: audio.sample_rate,
                channels: audio.channels,
                sample_size: audio.sample_size,
                is_big_endian: audio.is_big_endian,
                is_signed: audio.is_signed,
                is_float: audio.is_float,
            }
        }
        Ok(pb::MediaSourceType::Video) => {
            let video = request.video_config.ok_or("video source without video config")?;
            SourceConfig::Video {
                width: video.width,
                height: video.height,
                frame_rate: video.frame_rate,
            }
        }
        Ok(pb::MediaSourceType::Text) => SourceConfig::Text {
            format: match request.text_format.as_deref() {
                Some("ttml") => TextTrackFormat::Ttml,
                Some("cc") => TextTrackFormat::ClosedCaptions,
                _ => TextTrackFormat::WebVtt,
            },
        },
        _ => return Err("unknown source type".to_string()),
    };
    Ok(SourceSpec {
        mime_type: request.mime_type,
        config,
        codec_data: request.codec_data,
        has_drm: request.has_drm,
    })
}

fn playback_state_to_wire(state: bridgekit_core::types::PlaybackState) -> pb::PlaybackState {
    use bridgekit_core::types::PlaybackState as S;
    match state {
        S::Unknown => pb::PlaybackState::UnknownState,
        S::Idle => pb::PlaybackState::Idle,
        S::Buffering => pb::PlaybackState::Buffering,
        S::Playing => pb::PlaybackState::Playing,
        S::Paused => pb::PlaybackState::Paused,
        S::Seeking => pb::PlaybackState::Seeking,
        S::SeekDone => pb::PlaybackState::SeekDone,
        S::Stopped => pb::PlaybackState::Stopped,
        S::EndOfStream => pb::PlaybackState::EndOfStream,
        S::Failure => pb::PlaybackState::Failure,
    }
}

fn network_state_to_wire(state: bridgekit_core::types::NetworkState) -> pb::NetworkState {
    use bridgekit_core::types::NetworkState as S;
    match state {
        S::Unknown => pb::NetworkState::UnknownNetworkState,
        S::Idle => pb::NetworkState::NetworkIdle,
        S::Buffering => pb::NetworkState::NetworkBuffering,
        S::Buffered => pb::NetworkState::Buffered,
        S::FetchError => pb::NetworkState::FetchError,
        S::DecodeError => pb::NetworkState::DecodeError,
    }
}
