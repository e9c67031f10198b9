// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The media-pipeline session object.
//!
//! Control operations translate into RPC calls; segment data goes through
//! the ticket table into shared memory. The struct is owned by the
//! application's single event thread: server events are fed in through
//! [`MediaPipeline::handle_event`], which is what serialises the state
//! machine without any locking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bridgekit_core::keyid::KeyIdMap;
use bridgekit_core::types::{
    ApplicationState, MediaSegment, MediaSourceStatus, MediaType, PlaybackState, SessionId,
    ShmRegion, SourceConfig, SourceId, VideoGeometry,
};
use bridgekit_proto::mediapipeline as pb;
use bridgekit_proto::rpc::IpcError;
use bridgekit_shm::version::{negotiated_version, MetadataVersion};
use bridgekit_shm::SharedMemoryArena;
use bytes::Bytes;
use prost::Message;
use tokio::sync::watch;

use crate::active_requests::{ActiveRequests, AddSegmentError};
use crate::connection::{call, RpcChannel};

/// Notifications the session surfaces to the application after digesting a
/// server event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotification {
    /// A ticket was accepted; the application should push segments and
    /// finalise with [`MediaPipeline::have_data`].
    NeedMediaData { request_id: u32, frame_count: u32 },
    PlaybackState(PlaybackState),
    NetworkState(bridgekit_core::types::NetworkState),
    Position(i64),
    SourceFlushed { source_id: SourceId },
    BufferingProgress { percent: u32 },
    Qos { source_id: SourceId, processed: u64, dropped: u64 },
}

/// Client-side media playback session.
pub struct MediaPipeline {
    channel: Arc<dyn RpcChannel>,
    session_id: SessionId,
    arena: Arc<Mutex<SharedMemoryArena>>,
    metadata_version: MetadataVersion,
    key_id_map: Arc<KeyIdMap>,
    app_state: watch::Receiver<ApplicationState>,

    state: PlaybackState,
    sources: HashMap<SourceId, MediaType>,
    flushing: std::collections::HashSet<SourceId>,
    requests: ActiveRequests,
}

impl MediaPipeline {
    /// Creates a server session and binds it to the mapped arena.
    pub async fn create(
        channel: Arc<dyn RpcChannel>,
        arena: Arc<Mutex<SharedMemoryArena>>,
        key_id_map: Arc<KeyIdMap>,
        app_state: watch::Receiver<ApplicationState>,
        max_width: u32,
        max_height: u32,
    ) -> Result<Self, IpcError> {
        let response: pb::CreateSessionResponse = call(
            channel.as_ref(),
            pb::methods::CREATE_SESSION,
            &pb::CreateSessionRequest { max_width, max_height },
        )
        .await?;
        tracing::info!(session_id = response.session_id, "created media session");
        Ok(Self {
            channel,
            session_id: response.session_id,
            arena,
            metadata_version: negotiated_version(),
            key_id_map,
            app_state,
            state: PlaybackState::Unknown,
            sources: HashMap::new(),
            flushing: std::collections::HashSet::new(),
            requests: ActiveRequests::new(),
        })
    }

    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub const fn playback_state(&self) -> PlaybackState {
        self.state
    }

    pub async fn load(&mut self, mime_type: &str, url: &str) -> Result<(), IpcError> {
        let () = self
            .unit_call(
                pb::methods::LOAD,
                &pb::LoadRequest {
                    session_id: self.session_id,
                    media_type: "mse".to_string(),
                    mime_type: mime_type.to_string(),
                    url: url.to_string(),
                },
            )
            .await?;
        self.state = PlaybackState::Idle;
        Ok(())
    }

    pub async fn attach_source(
        &mut self,
        mime_type: &str,
        config: &SourceConfig,
        codec_data: Option<Bytes>,
        has_drm: bool,
    ) -> Result<SourceId, IpcError> {
        let mut request = pb::AttachSourceRequest {
            session_id: self.session_id,
            source_type: 0,
            mime_type: mime_type.to_string(),
            has_drm,
            audio_config: None,
            video_config: None,
            text_format: None,
            codec_data,
        };
        match config {
            SourceConfig::Audio {
                sample_rate,
                channels,
                sample_size,
                is_big_endian,
                is_signed,
                is_float,
            } => {
                request.source_type = pb::MediaSourceType::Audio as i32;
                request.audio_config = Some(pb::AudioConfig {
                    sample_rate: *sample_rate,
                    channels: *channels,
                    sample_size: *sample_size,
                    is_big_endian: *is_big_endian,
                    is_signed: *is_signed,
                    is_float: *is_float,
                });
            }
            SourceConfig::Video { width, height, frame_rate } => {
                request.source_type = pb::MediaSourceType::Video as i32;
                request.video_config = Some(pb::VideoConfig {
                    width: *width,
                    height: *height,
                    frame_rate: *frame_rate,
                });
            }
            SourceConfig::Text { format } => {
                request.source_type = pb::MediaSourceType::Text as i32;
                request.text_format = Some(
                    match format {
                        bridgekit_core::types::TextTrackFormat::WebVtt => "webvtt",
                        bridgekit_core::types::TextTrackFormat::Ttml => "ttml",
                        bridgekit_core::types::TextTrackFormat::ClosedCaptions => "cc",
                    }
                    .to_string(),
                );
            }
        }
        let response: pb::AttachSourceResponse =
            call(self.channel.as_ref(), pb::methods::ATTACH_SOURCE, &request).await?;
        self.sources.insert(response.source_id, config.media_type());
        Ok(response.source_id)
    }

    /// Removes a source, cancelling any outstanding ticket of its type.
    pub async fn remove_source(&mut self, source_id: SourceId) -> Result<(), IpcError> {
        if let Some(media_type) = self.sources.remove(&source_id) {
            self.requests.erase_type(media_type);
        }
        self.flushing.remove(&source_id);
        self.unit_call(
            pb::methods::REMOVE_SOURCE,
            &pb::RemoveSourceRequest { session_id: self.session_id, source_id },
        )
        .await
    }

    pub async fn all_sources_attached(&mut self) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::ALL_SOURCES_ATTACHED,
            &pb::AllSourcesAttachedRequest { session_id: self.session_id },
        )
        .await
    }

    pub async fn play(&mut self) -> Result<(), IpcError> {
        self.unit_call(pb::methods::PLAY, &pb::PlayRequest { session_id: self.session_id }).await
    }

    pub async fn pause(&mut self) -> Result<(), IpcError> {
        self.unit_call(pb::methods::PAUSE, &pb::PauseRequest { session_id: self.session_id })
            .await
    }

    pub async fn stop(&mut self) -> Result<(), IpcError> {
        self.requests.clear();
        self.unit_call(pb::methods::STOP, &pb::StopRequest { session_id: self.session_id }).await
    }

    /// Seeks. Outstanding tickets die immediately; need-data stays ignored
    /// until the server reports the seek done.
    pub async fn set_position(&mut self, position_ns: i64) -> Result<(), IpcError> {
        self.requests.clear();
        self.state = PlaybackState::Seeking;
        self.unit_call(
            pb::methods::SET_POSITION,
            &pb::SetPositionRequest { session_id: self.session_id, position: position_ns },
        )
        .await
    }

    pub async fn get_position(&self) -> Result<i64, IpcError> {
        let response: pb::GetPositionResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_POSITION,
            &pb::GetPositionRequest { session_id: self.session_id },
        )
        .await?;
        Ok(response.position)
    }

    pub async fn set_playback_rate(&mut self, rate: f64) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_PLAYBACK_RATE,
            &pb::SetPlaybackRateRequest { session_id: self.session_id, rate },
        )
        .await
    }

    pub async fn set_video_window(
        &mut self,
        geometry: VideoGeometry,
    ) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_VIDEO_WINDOW,
            &pb::SetVideoWindowRequest {
                session_id: self.session_id,
                x: geometry.x,
                y: geometry.y,
                width: geometry.width,
                height: geometry.height,
            },
        )
        .await
    }

    pub async fn set_volume(&mut self, volume: f64) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_VOLUME,
            &pb::SetVolumeRequest { session_id: self.session_id, volume },
        )
        .await
    }

    pub async fn get_volume(&self) -> Result<f64, IpcError> {
        let response: pb::GetVolumeResponse = call(
            self.channel.as_ref(),
            pb::methods::GET_VOLUME,
            &pb::GetVolumeRequest { session_id: self.session_id },
        )
        .await?;
        Ok(response.volume)
    }

    pub async fn set_mute(
        &mut self,
        source_id: Option<SourceId>,
        mute: bool,
    ) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_MUTE,
            &pb::SetMuteRequest { session_id: self.session_id, source_id, mute },
        )
        .await
    }

    pub async fn set_immediate_output(
        &mut self,
        source_id: SourceId,
        enabled: bool,
    ) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_IMMEDIATE_OUTPUT,
            &pb::SetImmediateOutputRequest {
                session_id: self.session_id,
                source_id,
                immediate_output: enabled,
            },
        )
        .await
    }

    pub async fn render_frame(&mut self) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::RENDER_FRAME,
            &pb::RenderFrameRequest { session_id: self.session_id },
        )
        .await
    }

    /// Flushes one source. Its tickets die and need-data for it is ignored
    /// until the source-flushed event arrives.
    pub async fn flush(&mut self, source_id: SourceId, reset_time: bool) -> Result<(), IpcError> {
        if let Some(media_type) = self.sources.get(&source_id) {
            self.requests.erase_type(*media_type);
        }
        self.flushing.insert(source_id);
        self.unit_call(
            pb::methods::FLUSH,
            &pb::FlushRequest { session_id: self.session_id, source_id, reset_time },
        )
        .await
    }

    pub async fn set_source_position(
        &mut self,
        source_id: SourceId,
        position_ns: i64,
        reset_time: bool,
        applied_rate: f64,
    ) -> Result<(), IpcError> {
        self.unit_call(
            pb::methods::SET_SOURCE_POSITION,
            &pb::SetSourcePositionRequest {
                session_id: self.session_id,
                source_id,
                position: position_ns,
                reset_time,
                applied_rate,
            },
        )
        .await
    }

    /// Writes one segment against a ticket. When the segment's key session
    /// has a mapped key id, the key id is stamped before the frame writer
    /// runs.
    pub fn add_segment(
        &mut self,
        request_id: u32,
        mut segment: MediaSegment,
    ) -> Result<(), AddSegmentError> {
        if let Some(enc) = segment.encryption.as_mut() {
            let mapped = self.key_id_map.get(enc.media_key_session_id);
            if !mapped.is_empty() {
                enc.key_id = mapped;
            }
        }
        let mut arena = self.arena.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        self.requests.add_segment(request_id, segment, arena.as_mut_slice())
    }

    /// Finalises a ticket. In `Seeking`, `Stopped`, `EndOfStream` and
    /// `Failure` the ticket is discarded without a server round-trip; an
    /// EOS status always forwards, samples or not.
    pub async fn have_data(
        &mut self,
        status: MediaSourceStatus,
        request_id: u32,
    ) -> Result<(), IpcError> {
        let num_frames = self.requests.frames_written(request_id);
        self.requests.erase(request_id);

        if matches!(
            self.state,
            PlaybackState::Seeking
                | PlaybackState::Stopped
                | PlaybackState::EndOfStream
                | PlaybackState::Failure
        ) {
            tracing::debug!(
                session_id = self.session_id,
                request_id,
                state = ?self.state,
                "have-data discarded in a non-forwarding state"
            );
            return Ok(());
        }

        let status = match status {
            MediaSourceStatus::Ok => pb::HaveDataStatus::HaveDataOk,
            MediaSourceStatus::Eos => pb::HaveDataStatus::HaveDataEos,
            MediaSourceStatus::Error => pb::HaveDataStatus::HaveDataError,
            MediaSourceStatus::NoAvailableSamples => {
                pb::HaveDataStatus::HaveDataNoAvailableSamples
            }
        };
        self.unit_call(
            pb::methods::HAVE_DATA,
            &pb::HaveDataRequest {
                session_id: self.session_id,
                status: status as i32,
                num_frames,
                request_id,
            },
        )
        .await
    }

    /// Digests one server event, updating the state machine and returning
    /// what the application should see.
    pub fn handle_event(&mut self, name: &str, body: &Bytes) -> Option<ClientNotification> {
        match name {
            pb::events::NEED_MEDIA_DATA => {
                let event = pb::NeedMediaDataEvent::decode(body.clone()).ok()?;
                if event.session_id != self.session_id {
                    return None;
                }
                self.accept_need_data(&event)
            }
            pb::events::PLAYBACK_STATE => {
                let event = pb::PlaybackStateChangeEvent::decode(body.clone()).ok()?;
                if event.session_id != self.session_id {
                    return None;
                }
                let state = playback_state_from_wire(event.state);
                self.state = state;
                if matches!(
                    state,
                    PlaybackState::Stopped | PlaybackState::Failure | PlaybackState::EndOfStream
                ) {
                    self.requests.clear();
                }
                Some(ClientNotification::PlaybackState(state))
            }
            pb::events::NETWORK_STATE => {
                let event = pb::NetworkStateChangeEvent::decode(body.clone()).ok()?;
                (event.session_id == self.session_id).then(|| {
                    ClientNotification::NetworkState(network_state_from_wire(event.state))
                })
            }
            pb::events::POSITION => {
                let event = pb::PositionChangeEvent::decode(body.clone()).ok()?;
                (event.session_id == self.session_id)
                    .then_some(ClientNotification::Position(event.position))
            }
            pb::events::SOURCE_FLUSHED => {
                let event = pb::SourceFlushedEvent::decode(body.clone()).ok()?;
                if event.session_id != self.session_id {
                    return None;
                }
                self.flushing.remove(&event.source_id);
                Some(ClientNotification::SourceFlushed { source_id: event.source_id })
            }
            pb::events::BUFFERING_PROGRESS => {
                let event = pb::BufferingProgressEvent::decode(body.clone()).ok()?;
                (event.session_id == self.session_id)
                    .then_some(ClientNotification::BufferingProgress { percent: event.percent })
            }
            pb::events::QOS => {
                let event = pb::QosEvent::decode(body.clone()).ok()?;
                (event.session_id == self.session_id).then_some(ClientNotification::Qos {
                    source_id: event.source_id,
                    processed: event.processed,
                    dropped: event.dropped,
                })
            }
            _ => None,
        }
    }

    /// Gatekeeper for need-data: only in a data-accepting playback state,
    /// only while the application is RUNNING, never for a flushing source.
    fn accept_need_data(&mut self, event: &pb::NeedMediaDataEvent) -> Option<ClientNotification> {
        if !matches!(
            self.state,
            PlaybackState::Playing
                | PlaybackState::Paused
                | PlaybackState::Buffering
                | PlaybackState::SeekDone
        ) {
            tracing::debug!(state = ?self.state, "need-data ignored by playback state");
            return None;
        }
        if *self.app_state.borrow() != ApplicationState::Running {
            tracing::debug!("need-data ignored while the application is not running");
            return None;
        }
        if self.flushing.contains(&event.source_id) {
            tracing::debug!(source_id = event.source_id, "need-data ignored while flushing");
            return None;
        }
        let media_type = self.sources.get(&event.source_id).copied()?;
        let shm = event.shm_info?;
        let region = ShmRegion {
            metadata_offset: shm.metadata_offset,
            max_metadata_bytes: shm.max_metadata_bytes,
            media_data_offset: shm.media_data_offset,
            max_media_bytes: shm.max_media_bytes,
        };
        {
            let mut arena =
                self.arena.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Err(e) = self.requests.insert(
                event.request_id,
                media_type,
                region,
                arena.as_mut_slice(),
                self.metadata_version,
            ) {
                tracing::warn!(error = %e, "failed to open the ticket window");
                return None;
            }
        }
        Some(ClientNotification::NeedMediaData {
            request_id: event.request_id,
            frame_count: event.frame_count,
        })
    }

    async fn unit_call<Req: Message>(&self, method: &str, request: &Req) -> Result<(), IpcError> {
        let _: bridgekit_proto::rpc::Empty =
            call(self.channel.as_ref(), method, request).await?;
        Ok(())
    }
}

fn playback_state_from_wire(state: i32) -> PlaybackState {
    match pb::PlaybackState::try_from(state) {
        Ok(pb::PlaybackState::Idle) => PlaybackState::Idle,
        Ok(pb::PlaybackState::Buffering) => PlaybackState::Buffering,
        Ok(pb::PlaybackState::Playing) => PlaybackState::Playing,
        Ok(pb::PlaybackState::Paused) => PlaybackState::Paused,
        Ok(pb::PlaybackState::Seeking) => PlaybackState::Seeking,
        Ok(pb::PlaybackState::SeekDone) => PlaybackState::SeekDone,
        Ok(pb::PlaybackState::Stopped) => PlaybackState::Stopped,
        Ok(pb::PlaybackState::EndOfStream) => PlaybackState::EndOfStream,
        Ok(pb::PlaybackState::Failure) => PlaybackState::Failure,
        _ => PlaybackState::Unknown,
    }
}

fn network_state_from_wire(state: i32) -> bridgekit_core::types::NetworkState {
    use bridgekit_core::types::NetworkState;
    match pb::NetworkState::try_from(state) {
        Ok(pb::NetworkState::NetworkIdle) => NetworkState::Idle,
        Ok(pb::NetworkState::NetworkBuffering) => NetworkState::Buffering,
        Ok(pb::NetworkState::Buffered) => NetworkState::Buffered,
        Ok(pb::NetworkState::FetchError) => NetworkState::FetchError,
        Ok(pb::NetworkState::DecodeError) => NetworkState::DecodeError,
        _ => NetworkState::Unknown,
    }
}
