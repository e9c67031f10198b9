// SPDX-FileCopyrightText: © 2025 BridgeKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The task catalogue.
//!
//! Every mutation of a session — client operations arriving over IPC and
//! pipeline bus reactions alike — is one [`PlayerTask`] executed on the
//! session's actor. Handlers are grouped by family:
//!
//! - [`playback`]: play/pause/stop, rate, position, volume, geometry
//! - [`sources`]: attach/remove, flush, source positions
//! - [`data`]: the need-data/have-data ticket flow and sample attachment
//! - [`bus`]: pipeline bus message decoding

pub mod bus;
pub mod data;
pub mod playback;
pub mod sources;

use bridgekit_core::error::Result;
use bridgekit_core::types::{
    MediaSegment, MediaSourceStatus, MediaType, SourceConfig, SourceId, VideoGeometry,
};
use bytes::Bytes;

use crate::context::PlayerContext;
use crate::pipeline::BusMessage;

/// Specification of a source to attach (the server mints the id).
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub mime_type: String,
    pub config: SourceConfig,
    pub codec_data: Option<Bytes>,
    pub has_drm: bool,
}

/// One serialised mutation of session state.
#[derive(Debug)]
pub enum PlayerTask {
    Load { mime_type: String, url: String },
    AttachSource { spec: SourceSpec },
    RemoveSource { source_id: SourceId },
    AllSourcesAttached,
    Play,
    Pause,
    Stop,
    SetPlaybackRate { rate: f64 },
    SetPosition { position: i64 },
    SetSourcePosition { source_id: SourceId, position: i64, reset_time: bool },
    Flush { source_id: SourceId, reset_time: bool },
    Eos { source_id: SourceId },
    NeedData { media_type: MediaType },
    EnoughData { media_type: MediaType },
    /// A have-data arrived: read the ticket's window and attach samples.
    ReadShmDataAndAttachSamples { request_id: u32, num_frames: u32, status: MediaSourceStatus },
    AttachSamples { segments: Vec<MediaSegment> },
    HandleBusMessage { message: BusMessage },
    Underflow { media_type: MediaType },
    ReportPosition,
    CheckAudioUnderflow,
    RenderFrame,
    SetVideoGeometry { geometry: VideoGeometry },
    SetVolume { volume: f64 },
    SetMute { source_id: Option<SourceId>, mute: bool },
    SetImmediateOutput { source_id: SourceId, enabled: bool },
    /// Liveness probe from the heartbeat; completing it proves the actor
    /// still drains its queue.
    Ping,
    Shutdown,
}

/// Value returned to a caller waiting on a task.
#[derive(Debug, PartialEq)]
pub enum TaskOutcome {
    Done,
    SourceId(SourceId),
    Position(i64),
    Volume(f64),
}

/// Executes one task against the session context.
///
/// After pipeline failure every mutation except `Stop`, `Ping`,
/// `HandleBusMessage` and `Shutdown` is rejected.
pub fn execute(ctx: &mut PlayerContext, task: PlayerTask) -> Result<TaskOutcome> {
    if ctx.failed
        && !matches!(
            task,
            PlayerTask::Stop
                | PlayerTask::Ping
                | PlayerTask::HandleBusMessage { .. }
                | PlayerTask::Shutdown
        )
    {
        return Err(bridgekit_core::BridgeKitError::Pipeline(
            "session is in failure state".to_string(),
        ));
    }

    match task {
        PlayerTask::Load { mime_type, url } => playback::load(ctx, &mime_type, &url),
        PlayerTask::AttachSource { spec } => sources::attach_source(ctx, spec),
        PlayerTask::RemoveSource { source_id } => sources::remove_source(ctx, source_id),
        PlayerTask::AllSourcesAttached => sources::all_sources_attached(ctx),
        PlayerTask::Play => playback::play(ctx),
        PlayerTask::Pause => playback::pause(ctx),
        PlayerTask::Stop => playback::stop(ctx),
        PlayerTask::SetPlaybackRate { rate } => playback::set_playback_rate(ctx, rate),
        PlayerTask::SetPosition { position } => playback::set_position(ctx, position),
        PlayerTask::SetSourcePosition { source_id, position, reset_time } => {
            sources::set_source_position(ctx, source_id, position, reset_time)
        }
        PlayerTask::Flush { source_id, reset_time } => sources::flush(ctx, source_id, reset_time),
        PlayerTask::Eos { source_id } => data::eos(ctx, source_id),
        PlayerTask::NeedData { media_type } => data::need_data(ctx, media_type),
        PlayerTask::EnoughData { media_type } => data::enough_data(ctx, media_type),
        PlayerTask::ReadShmDataAndAttachSamples { request_id, num_frames, status } => {
            data::read_shm_data_and_attach_samples(ctx, request_id, num_frames, status)
        }
        PlayerTask::AttachSamples { segments } => data::attach_samples(ctx, segments),
        PlayerTask::HandleBusMessage { message } => bus::handle_bus_message(ctx, message),
        PlayerTask::Underflow { media_type } => playback::underflow(ctx, media_type),
        PlayerTask::ReportPosition => playback::report_position(ctx),
        PlayerTask::CheckAudioUnderflow => playback::check_audio_underflow(ctx),
        PlayerTask::RenderFrame => playback::render_frame(ctx),
        PlayerTask::SetVideoGeometry { geometry } => playback::set_video_geometry(ctx, geometry),
        PlayerTask::SetVolume { volume } => playback::set_volume(ctx, volume),
        PlayerTask::SetMute { source_id, mute } => playback::set_mute(ctx, source_id, mute),
        PlayerTask::SetImmediateOutput { source_id, enabled } => {
            playback::set_immediate_output(ctx, source_id, enabled)
        }
        PlayerTask::Ping => Ok(TaskOutcome::Done),
        PlayerTask::Shutdown => playback::shutdown(ctx),
    }
}
